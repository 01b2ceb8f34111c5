// src/app.rs
//! Window, event loop and per-frame driver
//!
//! Each redraw runs: build the UI from a scene snapshot, apply the queued
//! edits, update, record the frame, replay it on the GPU with the UI drawn
//! on top, then clear per-frame input.

use anyhow::Context;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowAttributes, WindowId},
};

use crate::config::GameConfig;
use crate::game::Game;
use crate::gfx::rendering::wgpu_device::WgpuDevice;
use crate::input::InputState;
use crate::ui::{debug_panel, PanelState, PendingEdits, UiManager};

/// Opens the window and runs the demo until it quits
///
/// # Arguments
/// * `config` - Window size, vsync and scene settings
///
/// # Returns
/// `Ok` after a normal quit. Setup failures and fatal frame errors end the
/// loop and are returned.
pub fn run(config: GameConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("creating event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop
        .run_app(&mut app)
        .context("running event loop")?;

    match app.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Everything that exists once the window does
struct Running {
    window: Arc<Window>,
    renderer: WgpuDevice,
    ui: UiManager,
    game: Game,
}

struct App {
    config: GameConfig,
    running: Option<Running>,
    input: InputState,
    edits: PendingEdits,
    panel: PanelState,
    started: Instant,
    last_frame: Instant,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: GameConfig) -> Self {
        let now = Instant::now();
        Self {
            config,
            running: None,
            input: InputState::new(),
            edits: PendingEdits::new(),
            panel: PanelState::default(),
            started: now,
            last_frame: now,
            error: None,
        }
    }

    /// Creates the window, the graphics device, the scene and the UI
    fn start(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<Running> {
        let window = event_loop
            .create_window(
                WindowAttributes::default()
                    .with_title(self.config.title.clone())
                    .with_inner_size(PhysicalSize::new(self.config.width, self.config.height)),
            )
            .context("creating window")?;
        let window = Arc::new(window);
        let (width, height) = window.inner_size().into();

        let mut renderer = pollster::block_on(WgpuDevice::new(
            window.clone(),
            width,
            height,
            self.config.vsync,
        ))
        .context("initializing graphics device")?;

        let game = Game::init(&mut renderer, &self.config)?;
        let ui = UiManager::new(
            renderer.device(),
            renderer.queue(),
            renderer.surface_format(),
            &window,
        );
        log::info!("started at {}x{}", width, height);

        Ok(Running {
            window,
            renderer,
            ui,
            game,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    /// Runs one redraw: UI, edits, update, draw, submit
    fn frame(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let Some(running) = self.running.as_mut() else {
            return Ok(());
        };

        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        let total = (now - self.started).as_secs_f32();
        self.last_frame = now;

        let snapshot = running.game.snapshot();
        let (panel, edits) = (&mut self.panel, &mut self.edits);
        running.ui.update_logic(&running.window, |ui| {
            debug_panel(ui, &snapshot, panel, edits);
        });
        let (keyboard, mouse) = running.ui.want_capture();
        self.input.set_captured(keyboard, mouse);

        running
            .game
            .apply_edits(&mut running.renderer, &mut self.edits)?;
        running.game.update(dt, total, &self.input);
        if running.game.quit_requested() {
            log::info!("quit requested");
            event_loop.exit();
            return Ok(());
        }

        let frame = running.game.draw(&running.renderer);
        let ui = &mut running.ui;
        running
            .renderer
            .submit(&frame, |device, queue, encoder, view| {
                ui.render(device, queue, encoder, view)
            })
            .context("submitting frame")?;

        self.input.end_frame();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        let Some(running) = self.running.as_mut() else {
            return Ok(());
        };
        if width == 0 || height == 0 {
            return Ok(());
        }
        running.renderer.resize(width, height);
        running.game.on_resize(&mut running.renderer, width, height)
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }
        match self.start(event_loop) {
            Ok(running) => self.running = Some(running),
            Err(error) => self.fail(event_loop, error.context("startup failed")),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if let Some(running) = self.running.as_mut() {
            running.ui.handle_event(&running.window, window_id, &event);
        }
        self.input.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Err(error) = self.resize(width, height) {
                    self.fail(event_loop, error);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(error) = self.frame(event_loop) {
                    self.fail(event_loop, error);
                }
            }
            _ => (),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        self.input.handle_device_event(&event);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(running) = self.running.as_ref() {
            running.window.request_redraw();
        }
    }
}
