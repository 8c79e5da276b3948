// SPDX-License-Identifier: CEPL-1.0
//! EGL display, window surface and a current GL 3.3 core context.
use std::ffi::CString;
use std::num::NonZeroU32;
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use glow::HasContext as _;
use glutin::{
    config::ConfigTemplateBuilder,
    context::{
        ContextApi, ContextAttributesBuilder, GlProfile, NotCurrentContext,
        PossiblyCurrentContext, Version,
    },
    display::{Display, DisplayApiPreference},
    prelude::*,
    surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface},
};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tandem_render::RenderSize;
use tracing::{debug, error, info, trace, warn, Level};

pub struct GlContext {
    pub gl: Rc<glow::Context>,
    pub context: PossiblyCurrentContext,
    pub surface: Surface<WindowSurface>,
}

impl GlContext {
    pub fn new(
        window: &dyn HasWindowHandle,
        display_handle: &dyn HasDisplayHandle,
        size: RenderSize,
    ) -> Result<Self> {
        let wh = window
            .window_handle()
            .map_err(|e| anyhow!("window handle: {e}"))?
            .as_raw();
        let dh = display_handle
            .display_handle()
            .map_err(|e| anyhow!("display handle: {e}"))?
            .as_raw();

        let display =
            unsafe { Display::new(dh, DisplayApiPreference::Egl) }.context("Display::new")?;

        let template = ConfigTemplateBuilder::new()
            .with_depth_size(24)
            .compatible_with_native_window(wh)
            .build();
        let mut configs = unsafe { display.find_configs(template) }.context("find_configs")?;
        let config = configs.next().ok_or_else(|| anyhow!("no GL configs"))?;

        let w = NonZeroU32::new(size.width).unwrap_or(NonZeroU32::MIN);
        let h = NonZeroU32::new(size.height).unwrap_or(NonZeroU32::MIN);
        let sattrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(wh, w, h);
        let surface = unsafe { display.create_window_surface(&config, &sattrs) }
            .context("create_window_surface")?;

        let ctx_attrs = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .with_profile(GlProfile::Core)
            .build(Some(wh));
        let not_current: NotCurrentContext =
            unsafe { display.create_context(&config, &ctx_attrs) }.context("create_context")?;
        let context = not_current.make_current(&surface).context("make_current")?;

        let mut gl = unsafe {
            glow::Context::from_loader_function(|s| match CString::new(s) {
                Ok(name) => display.get_proc_address(&name),
                Err(_) => std::ptr::null(),
            })
        };

        if let Err(e) = surface.set_swap_interval(&context, SwapInterval::Wait(NonZeroU32::MIN)) {
            warn!("gl: vsync unavailable: {e}");
        }

        unsafe {
            info!(
                "gl: {} / {}",
                gl.get_parameter_string(glow::RENDERER),
                gl.get_parameter_string(glow::VERSION)
            );
            if gl.supports_debug() {
                gl.enable(glow::DEBUG_OUTPUT);
                gl.debug_message_callback(|_source, ty, id, severity, message| {
                    log_debug_message(ty, id, severity, message)
                });
                debug!("gl: debug output enabled");
            }
            gl.viewport(0, 0, size.width as i32, size.height as i32);
        }

        Ok(Self {
            gl: Rc::new(gl),
            context,
            surface,
        })
    }

    pub fn swap_buffers(&self) -> Result<()> {
        self.surface
            .swap_buffers(&self.context)
            .context("swap_buffers")
    }
}

pub(crate) fn severity_level(severity: u32) -> Level {
    match severity {
        glow::DEBUG_SEVERITY_HIGH => Level::ERROR,
        glow::DEBUG_SEVERITY_MEDIUM => Level::WARN,
        glow::DEBUG_SEVERITY_LOW => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn log_debug_message(ty: u32, id: u32, severity: u32, message: &str) {
    let level = severity_level(severity);
    if level == Level::ERROR {
        error!("gl[{ty:#x}/{id}] {message}");
    } else if level == Level::WARN {
        warn!("gl[{ty:#x}/{id}] {message}");
    } else if level == Level::DEBUG {
        debug!("gl[{ty:#x}/{id}] {message}");
    } else {
        trace!("gl[{ty:#x}/{id}] {message}");
    }
}
