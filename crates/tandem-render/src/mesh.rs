// SPDX-License-Identifier: CEPL-1.0
//! Object File Format (`.off`) loader. Vertices get an implicit white colour;
//! faces with more than three corners are fan-triangulated.
use std::fs;
use std::path::Path;

use tandem_core::{RenderError, RenderResult};
use tracing::debug;

use crate::Vertex;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

fn mesh_err(line: usize, message: impl Into<String>) -> RenderError {
    RenderError::Mesh {
        line,
        message: message.into(),
    }
}

impl Mesh {
    pub fn load_off(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| {
            RenderError::Io {
                path: path.to_path_buf(),
                source,
            }
            .report()
        })?;
        let mesh = Self::from_off(&text).map_err(RenderError::report)?;
        debug!(
            "loaded {}: {} vertices, {} triangles",
            path.display(),
            mesh.vertices.len(),
            mesh.indices.len() / 3
        );
        Ok(mesh)
    }

    pub fn from_off(text: &str) -> RenderResult<Self> {
        let mut rows = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.split('#').next().unwrap_or("").trim()))
            .filter(|(_, l)| !l.is_empty());

        let (mut line, mut row) = rows.next().ok_or_else(|| mesh_err(0, "empty file"))?;
        if row.starts_with("OFF") {
            (line, row) = rows.next().ok_or_else(|| mesh_err(line, "missing counts"))?;
        }

        let mut counts = row.split_whitespace().map(str::parse::<usize>);
        let (vertex_count, face_count) = match (counts.next(), counts.next()) {
            (Some(Ok(v)), Some(Ok(f))) => (v, f),
            _ => return Err(mesh_err(line, format!("bad counts `{row}`"))),
        };

        let index_count = face_count
            .checked_mul(3)
            .ok_or_else(|| mesh_err(line, format!("face count {face_count} is too large")))?;
        // Declared counts are untrusted; no more rows than the file has lines.
        let row_budget = text.lines().count();
        let mut mesh = Mesh {
            vertices: Vec::with_capacity(vertex_count.min(row_budget)),
            indices: Vec::with_capacity(index_count.min(row_budget.saturating_mul(3))),
        };

        let mut last = line;
        for _ in 0..vertex_count {
            let (line, row) = rows
                .next()
                .ok_or_else(|| mesh_err(last, "fewer vertices than declared"))?;
            last = line;
            let coords = row
                .split_whitespace()
                .take(3)
                .map(str::parse::<f32>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| mesh_err(line, e.to_string()))?;
            let [x, y, z] = coords.as_slice() else {
                return Err(mesh_err(line, "vertex needs three coordinates"));
            };
            mesh.vertices.push(Vertex::white([*x, *y, *z]));
        }

        for _ in 0..face_count {
            let (line, row) = rows
                .next()
                .ok_or_else(|| mesh_err(last, "fewer faces than declared"))?;
            last = line;
            let values = row
                .split_whitespace()
                .map(str::parse::<u32>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| mesh_err(line, e.to_string()))?;
            let Some((&n, corners)) = values.split_first() else {
                return Err(mesh_err(line, "empty face"));
            };
            let n = n as usize;
            if n < 3 || corners.len() < n {
                return Err(mesh_err(line, format!("face needs {n} >= 3 indices")));
            }
            let corners = &corners[..n];
            if let Some(&bad) = corners.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(mesh_err(line, format!("index {bad} out of range")));
            }
            for k in 1..n - 1 {
                mesh.indices
                    .extend_from_slice(&[corners[0], corners[k], corners[k + 1]]);
            }
        }

        Ok(mesh)
    }
}
