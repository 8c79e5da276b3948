// SPDX-License-Identifier: CEPL-1.0
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tandem_core::{RenderError, RenderResult};
use tandem_render::{split_list, ClearColor, RenderSettings, RenderSize, VulkanSettings};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[value(name = "opengl")]
    OpenGl,
    #[default]
    Vulkan,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::OpenGl => "opengl",
            BackendKind::Vulkan => "vulkan",
        }
    }
}

/// `"a, b"` or `["a", "b"]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListValue {
    Csv(String),
    Items(Vec<String>),
}

impl ListValue {
    fn into_vec(self) -> Vec<String> {
        match self {
            ListValue::Csv(s) => split_list(&s),
            ListValue::Items(items) => items
                .iter()
                .flat_map(|item| split_list(item))
                .collect(),
        }
    }
}

/// `"51,51,51,255"` or `[51, 51, 51, 255]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ColorValue {
    Csv(String),
    Channels([f32; 4]),
}

impl ColorValue {
    fn into_color(self) -> RenderResult<ClearColor> {
        match self {
            ColorValue::Csv(s) => s.parse(),
            ColorValue::Channels(rgba) => Ok(ClearColor(rgba)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileCfg {
    #[serde(default)]
    backend: BackendKind,
    window: WindowCfg,
    scene: SceneCfg,
    #[serde(default)]
    vulkan: VulkanCfg,
    #[serde(default)]
    opengl: OpenGlCfg,
}

#[derive(Debug, Deserialize)]
struct WindowCfg {
    width: u32,
    height: u32,
    #[serde(default = "default_title")]
    title: String,
}

#[derive(Debug, Deserialize)]
struct SceneCfg {
    model: PathBuf,
    vertex_shader: Option<PathBuf>,
    fragment_shader: Option<PathBuf>,
    #[serde(default = "default_fps")]
    fps: u32,
    #[serde(default = "default_frames")]
    frames: u32,
    clear_color: Option<ColorValue>,
}

#[derive(Debug, Default, Deserialize)]
struct VulkanCfg {
    instance_layers: Option<ListValue>,
    instance_extensions: Option<ListValue>,
    device_extensions: Option<ListValue>,
    frame_count: Option<u32>,
    surface_format: Option<i32>,
    wait_idle_after_present: Option<bool>,
    request_coherent_memory: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenGlCfg {
    vertex_shader: Option<PathBuf>,
    fragment_shader: Option<PathBuf>,
}

fn default_title() -> String {
    "tandem".to_owned()
}
fn default_fps() -> u32 {
    60
}
fn default_frames() -> u32 {
    10_000
}

impl VulkanCfg {
    fn into_settings(self) -> VulkanSettings {
        let mut vk = VulkanSettings::default();
        if let Some(layers) = self.instance_layers {
            vk.instance_layers = layers.into_vec();
        }
        if let Some(exts) = self.instance_extensions {
            vk.instance_extensions = exts.into_vec();
        }
        if let Some(exts) = self.device_extensions {
            vk.device_extensions = exts.into_vec();
        }
        vk.frame_count = self.frame_count.unwrap_or(vk.frame_count);
        vk.surface_format = self.surface_format.unwrap_or(vk.surface_format);
        vk.wait_idle_after_present = self
            .wait_idle_after_present
            .unwrap_or(vk.wait_idle_after_present);
        vk.request_coherent_memory = self
            .request_coherent_memory
            .unwrap_or(vk.request_coherent_memory);
        vk
    }
}

/// Everything the frame loop needs, validated.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub backend: BackendKind,
    pub title: String,
    pub model: PathBuf,
    pub fps: u32,
    pub frames: u32,
    pub render: RenderSettings,
}

impl AppConfig {
    pub fn load(path: &Path, backend: Option<BackendKind>) -> RenderResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| {
            RenderError::Io {
                path: path.to_path_buf(),
                source,
            }
            .report()
        })?;
        Self::from_toml(&text, backend)
    }

    /// `backend` overrides the file's `backend` key.
    pub fn from_toml(text: &str, backend: Option<BackendKind>) -> RenderResult<Self> {
        Self::parse(text, backend).map_err(RenderError::report)
    }

    fn parse(text: &str, backend: Option<BackendKind>) -> RenderResult<Self> {
        let file: FileCfg =
            toml::from_str(text).map_err(|e| RenderError::Config(e.to_string()))?;
        let backend = backend.unwrap_or(file.backend);

        if file.window.width == 0 || file.window.height == 0 {
            return Err(RenderError::Config(format!(
                "window size must be non-zero, got {}x{}",
                file.window.width, file.window.height
            )));
        }
        if file.scene.fps == 0 {
            return Err(RenderError::Config("scene.fps must be non-zero".into()));
        }
        if file.scene.frames == 0 {
            return Err(RenderError::Config("scene.frames must be non-zero".into()));
        }

        let vulkan = file.vulkan.into_settings();
        if vulkan.frame_count == 0 {
            return Err(RenderError::Config(
                "vulkan.frame_count must be non-zero".into(),
            ));
        }

        let clear_color = match file.scene.clear_color {
            Some(value) => value.into_color()?,
            None => ClearColor::default(),
        };

        let (vertex_shader, fragment_shader) = match backend {
            BackendKind::OpenGl => (
                file.opengl.vertex_shader.or(file.scene.vertex_shader),
                file.opengl.fragment_shader.or(file.scene.fragment_shader),
            ),
            BackendKind::Vulkan => (file.scene.vertex_shader, file.scene.fragment_shader),
        };
        let vertex_shader = required(vertex_shader, backend, "vertex_shader")?;
        let fragment_shader = required(fragment_shader, backend, "fragment_shader")?;

        Ok(Self {
            backend,
            title: file.window.title,
            model: file.scene.model,
            fps: file.scene.fps,
            frames: file.scene.frames,
            render: RenderSettings {
                size: RenderSize {
                    width: file.window.width,
                    height: file.window.height,
                },
                clear_color,
                vertex_shader,
                fragment_shader,
                vulkan,
            },
        })
    }
}

fn required(path: Option<PathBuf>, backend: BackendKind, key: &str) -> RenderResult<PathBuf> {
    path.ok_or_else(|| {
        RenderError::Config(format!("{key} is required for the {} backend", backend.as_str()))
    })
}
