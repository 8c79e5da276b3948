// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]

mod error;
mod stats;

pub use error::{RenderError, RenderResult};
pub use stats::{FrameStats, FrameSummary};

/// Installs the process-wide subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
