// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tandem_core::{init_tracing, FrameStats, RenderError};
use tandem_render::{Mesh, Renderer};
use tandem_render_gl::GlRenderer;
use tandem_render_vk::VkRenderer;
use tracing::{debug, error, info};

use tandem_platform::winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use config::{AppConfig, BackendKind};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long, default_value = "tandem.toml")]
    config: PathBuf,
    /// Overrides the file's `backend` key
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,
    /// Overrides `scene.frames`
    #[arg(long)]
    frames: Option<u32>,
}

enum Backend {
    Gl(Box<GlRenderer>),
    Vk(Box<VkRenderer>),
}

impl Backend {
    fn new(window: &Window, cfg: &AppConfig, mesh: &Mesh) -> Result<Self> {
        Ok(match cfg.backend {
            BackendKind::OpenGl => {
                Backend::Gl(Box::new(GlRenderer::new(window, window, &cfg.render, mesh)?))
            }
            BackendKind::Vulkan => {
                Backend::Vk(Box::new(VkRenderer::new(window, window, &cfg.render, mesh)?))
            }
        })
    }

    fn renderer(&mut self) -> &mut dyn Renderer {
        match self {
            Backend::Gl(r) => r.as_mut(),
            Backend::Vk(r) => r.as_mut(),
        }
    }
}

struct App {
    cfg: AppConfig,
    mesh: Mesh,
    // Dropped before the window it renders into.
    backend: Option<Backend>,
    window: Option<Window>,

    stats: FrameStats,
    frames: u32,
    frame_interval: Duration,
    next_frame_deadline: Option<Instant>,
    exiting: bool,
    failure: Option<anyhow::Error>,
}

impl App {
    fn new(cfg: AppConfig, mesh: Mesh) -> Self {
        let frame_interval = Duration::from_millis(1000 / u64::from(cfg.fps.max(1)));
        Self {
            stats: FrameStats::with_capacity(cfg.frames as usize),
            cfg,
            mesh,
            backend: None,
            window: None,
            frames: 0,
            frame_interval,
            next_frame_deadline: None,
            exiting: false,
            failure: None,
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.exiting = true;
        self.backend = None;
        self.window = None;
        event_loop.exit();
    }

    /// Logged once, by `main`, after the loop returns.
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        self.failure = Some(err);
        self.shutdown(event_loop);
    }

    fn draw_frame(&mut self) -> Result<()> {
        let Some(backend) = self.backend.as_mut() else {
            return Ok(());
        };
        let started = Instant::now();
        let size = self.cfg.render.size;
        let renderer = backend.renderer();
        let clip = renderer.clip_space();
        renderer
            .uniforms_mut()
            .advance(size.width, size.height, clip, 1.0);
        renderer
            .render()
            .with_context(|| format!("frame {}", self.frames))?;
        let elapsed = started.elapsed();
        self.stats.record(elapsed);
        self.frames += 1;
        debug!(frame = self.frames, us = elapsed.as_micros() as u64, "frame done");
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let size = self.cfg.render.size;
        let attributes =
            tandem_platform::window_attributes(&self.cfg.title, size.width, size.height);
        let window = match event_loop.create_window(attributes) {
            Ok(window) => window,
            Err(e) => return self.fail(event_loop, anyhow::Error::new(e).context("create window")),
        };

        let started = Instant::now();
        let backend = match Backend::new(&window, &self.cfg, &self.mesh) {
            Ok(backend) => backend,
            Err(e) => return self.fail(event_loop, e.context("renderer init")),
        };
        info!(
            "backend = {} (init {} ms)",
            self.cfg.backend.as_str(),
            started.elapsed().as_millis()
        );

        window.request_redraw();
        self.window = Some(window);
        self.backend = Some(backend);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(window) = &self.window {
            if window_id != window.id() {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("CloseRequested");
                self.shutdown(event_loop);
            }

            WindowEvent::KeyboardInput { event, .. } if tandem_platform::is_close_key(&event) => {
                info!("Escape released");
                self.shutdown(event_loop);
            }

            WindowEvent::RedrawRequested => {
                if self.exiting {
                    return;
                }
                if frames_remaining(self.frames, self.cfg.frames) {
                    if let Err(e) = self.draw_frame() {
                        return self.fail(event_loop, e);
                    }
                }
                if !frames_remaining(self.frames, self.cfg.frames) {
                    info!("rendered {} frames", self.frames);
                    self.shutdown(event_loop);
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exiting {
            return;
        }

        let now = Instant::now();
        let need_redraw_now = match self.next_frame_deadline {
            None => true,
            Some(t) => now >= t,
        };

        if need_redraw_now {
            let next = now + self.frame_interval;
            self.next_frame_deadline = Some(next);
            event_loop.set_control_flow(ControlFlow::WaitUntil(next));
            if let Some(w) = &self.window {
                w.request_redraw();
            }
        } else if let Some(deadline) = self.next_frame_deadline {
            event_loop.set_control_flow(ControlFlow::WaitUntil(deadline));
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut cfg = AppConfig::load(&args.config, args.backend)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(frames) = args.frames {
        if frames == 0 {
            let err = RenderError::Config("--frames must be non-zero".into()).report();
            return Err(err.into());
        }
        cfg.frames = frames;
    }
    let mesh = Mesh::load_off(&cfg.model)
        .with_context(|| format!("loading model {}", cfg.model.display()))?;
    info!(
        "scene: {} vertices, {} indices, {} frames at {} fps",
        mesh.vertices.len(),
        mesh.indices.len(),
        cfg.frames,
        cfg.fps
    );

    let event_loop: EventLoop<()> = EventLoop::new()?;
    let mut app = App::new(cfg, mesh);
    event_loop.run_app(&mut app)?;

    if let Some(summary) = app.stats.summary() {
        info!(
            "frames {} | average {} us | max {} us | min {} us | max difference {} us",
            summary.frames,
            summary.average_us,
            summary.max_us,
            summary.min_us,
            summary.max_difference_us()
        );
    }

    match app.failure.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn frames_remaining(rendered: u32, limit: u32) -> bool {
    rendered < limit
}

/// `RenderError`s were logged where they were detected; anything else
/// (windowing, GL context, event loop) is logged here.
fn already_reported(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<RenderError>())
}

fn main() -> ExitCode {
    init_tracing();
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if !already_reported(&err) {
                error!("{err:#}");
            }
            ExitCode::FAILURE
        }
    }
}
