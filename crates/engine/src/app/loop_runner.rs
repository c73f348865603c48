use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{debug, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::window::{Window, WindowBuilder};

use crate::config::FeatureFlag;
use crate::session::{GameSession, TurnOutcome};

use super::input::{apply_input, InputCollector, InputEffect};
use super::metrics::{LoopMetricsSnapshot, MetricsAccumulator};
use super::rendering::DebugOverlay;
use super::Renderer;

const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    /// `None` or `Some(0)` renders as fast as the surface allows.
    pub max_render_fps: Option<u32>,
    pub metrics_log_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "KeyQuest".to_string(),
            window_width: 1280,
            window_height: 720,
            max_render_fps: Some(60),
            metrics_log_interval: DEFAULT_METRICS_INTERVAL,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("could not create the event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("could not open the game window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("could not set up the pixel surface: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop stopped with an error: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Sleeps between presents so rendering stays under a frame rate cap.
#[derive(Debug)]
struct FramePacer {
    cap: Option<u32>,
    frame_budget: Option<Duration>,
    last_present: Instant,
}

impl FramePacer {
    fn new(max_render_fps: Option<u32>) -> Self {
        let cap = max_render_fps.filter(|fps| *fps > 0);
        Self {
            cap,
            frame_budget: cap.map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps))),
            last_present: Instant::now(),
        }
    }

    fn remaining(&self, now: Instant) -> Duration {
        let elapsed = now.saturating_duration_since(self.last_present);
        match self.frame_budget {
            Some(budget) => budget.saturating_sub(elapsed),
            None => Duration::ZERO,
        }
    }

    fn wait(&self) {
        let remaining = self.remaining(Instant::now());
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
    }

    fn presented(&mut self, at: Instant) {
        self.last_present = at;
    }

    fn cap_label(&self) -> String {
        self.cap
            .map_or_else(|| "off".to_string(), |fps| fps.to_string())
    }
}

struct WindowState {
    window: Arc<Window>,
    renderer: Renderer,
    title_base: String,
    shown_zone: String,
    input: InputCollector,
    overlay_allowed: bool,
    overlay_visible: bool,
    pacer: FramePacer,
    metrics: MetricsAccumulator,
    last_metrics: LoopMetricsSnapshot,
    last_frame: Instant,
}

impl WindowState {
    fn handle_window_event(
        &mut self,
        session: &mut GameSession,
        event: WindowEvent,
        target: &EventLoopWindowTarget<()>,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!(reason = "window_close", "shutdown_requested");
                target.exit();
            }
            WindowEvent::Resized(size) => self.resize(session, size.width, size.height, target),
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = self.window.inner_size();
                self.resize(session, size.width, size.height, target);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.input.handle_keyboard_input(&event);
                if self.apply_pending_inputs(session) {
                    info!(reason = "escape_key", "shutdown_requested");
                    target.exit();
                }
                self.sync_title(session);
            }
            WindowEvent::RedrawRequested => {
                if let Err(error) = self.redraw(session) {
                    warn!(error = %error, "renderer_draw_failed");
                    target.exit();
                }
            }
            _ => {}
        }
    }

    fn apply_pending_inputs(&mut self, session: &mut GameSession) -> bool {
        let inputs = self.input.drain().collect::<Vec<_>>();
        for input in inputs {
            self.metrics.record_input();
            match apply_input(session, input) {
                InputEffect::Quit => return true,
                InputEffect::ToggleOverlay if self.overlay_allowed => {
                    self.overlay_visible = !self.overlay_visible;
                    info!(overlay_visible = self.overlay_visible, "overlay_toggled");
                }
                InputEffect::Turn(outcome) => log_turn(&outcome),
                _ => {}
            }
        }
        false
    }

    fn sync_title(&mut self, session: &GameSession) {
        let zone = session.current_zone();
        if zone.zone_id() != self.shown_zone {
            self.window
                .set_title(&window_title_for(&self.title_base, zone.name()));
            self.shown_zone = zone.zone_id().to_string();
        }
    }

    fn resize(
        &mut self,
        session: &mut GameSession,
        width: u32,
        height: u32,
        target: &EventLoopWindowTarget<()>,
    ) {
        match self.renderer.resize(width, height) {
            Ok(()) => session.resize(self.renderer.viewport()),
            Err(error) => {
                warn!(error = %error, width, height, "renderer_resize_failed");
                target.exit();
            }
        }
    }

    fn redraw(&mut self, session: &GameSession) -> Result<(), PixelsError> {
        let frame_start = Instant::now();
        let frame_dt = frame_start.saturating_duration_since(self.last_frame);
        self.last_frame = frame_start;

        self.pacer.wait();
        let overlay = self.overlay_visible.then_some(DebugOverlay {
            metrics: self.last_metrics,
            render_fps_cap: self.pacer.cap,
        });
        let result = self.renderer.render(&session.snapshot(), overlay.as_ref());
        self.pacer.presented(Instant::now());
        self.metrics.record_frame(frame_dt);

        if let Some(snapshot) = self.metrics.maybe_snapshot(frame_start) {
            self.last_metrics = snapshot;
            debug!(
                fps = snapshot.fps,
                frame_time_ms = snapshot.frame_time_ms,
                inputs_per_sec = snapshot.inputs_per_sec,
                "loop_metrics"
            );
        }
        result
    }
}

/// Opens the window and drives `session` from keyboard input until the
/// player quits or closes the window.
pub fn run_app(config: LoopConfig, mut session: GameSession) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(window_title_for(&config.window_title, session.current_zone().name()))
            .with_inner_size(LogicalSize::new(
                f64::from(config.window_width),
                f64::from(config.window_height),
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let renderer = Renderer::new(Arc::clone(&window)).map_err(AppError::CreateRenderer)?;
    session.resize(renderer.viewport());
    event_loop.set_control_flow(ControlFlow::Poll);

    let metrics_interval = if config.metrics_log_interval.is_zero() {
        DEFAULT_METRICS_INTERVAL
    } else {
        config.metrics_log_interval
    };
    let mut state = WindowState {
        window: Arc::clone(&window),
        renderer,
        title_base: config.window_title.clone(),
        shown_zone: session.current_zone().zone_id().to_string(),
        input: InputCollector::default(),
        overlay_allowed: session.flags().is_enabled(FeatureFlag::DebugOverlay),
        overlay_visible: false,
        pacer: FramePacer::new(config.max_render_fps),
        metrics: MetricsAccumulator::new(metrics_interval),
        last_metrics: LoopMetricsSnapshot::default(),
        last_frame: Instant::now(),
    };
    info!(
        window_width = config.window_width,
        window_height = config.window_height,
        render_fps_cap = %state.pacer.cap_label(),
        overlay_allowed = state.overlay_allowed,
        "loop_config"
    );

    event_loop
        .run(move |event, target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => {
                state.handle_window_event(&mut session, event, target);
            }
            Event::AboutToWait => window.request_redraw(),
            Event::LoopExiting => {
                info!(
                    zone_id = %session.current_zone().zone_id(),
                    game_complete = session.is_game_complete(),
                    "shutdown"
                );
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

fn log_turn(outcome: &TurnOutcome) {
    if outcome.ignored {
        return;
    }
    debug!(
        steps = outcome.steps,
        blocked = outcome.blocked,
        collected = outcome.collected.len(),
        gate_opened = outcome.gate_opened,
        "turn_handled"
    );
}

fn window_title_for(base: &str, zone_name: &str) -> String {
    if zone_name.is_empty() {
        base.to_string()
    } else {
        format!("{base} - {zone_name}")
    }
}
