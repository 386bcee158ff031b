//! UI application state.
//!
//! [`App`] holds the reactive state of the UI context, derives the view model
//! from it, and turns user intents into [`WorkerMessage`]s. Playback state is
//! never changed locally; it follows the event batches the worker posts back
//! (see [`App::apply_events`]).

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::protocol::{Command, PatternKind};
use crate::reactive::{Computed, Effect, Signal, Store};
use crate::worker::{Renderer, WorkerEvent, WorkerMessage};

/// Pointer movement, in pixels, before a press turns into a pan.
pub const DRAG_THRESHOLD: f64 = 7.5;
pub const MIN_CELL_SIZE: u16 = 1;
pub const MAX_CELL_SIZE: u16 = 100;
pub const DEFAULT_CELL_COLOUR: u32 = 0xFF_FFFF;

const DRAW_GRID: &str = "drawGrid";
const DRAW_AGE: &str = "drawAge";
const DRAG_X: &str = "x";
const DRAG_Y: &str = "y";

/// Render settings, one reactive key per flag.
#[derive(Debug, Clone)]
pub struct Settings {
    store: Store<bool>,
}

impl Settings {
    pub fn new() -> Self {
        Self {
            store: Store::from_fields([(DRAW_GRID, true), (DRAW_AGE, false)]),
        }
    }

    pub fn draw_grid(&self) -> bool {
        self.store.get(DRAW_GRID).unwrap_or(true)
    }

    pub fn draw_age(&self) -> bool {
        self.store.get(DRAW_AGE).unwrap_or(false)
    }

    pub fn set_draw_grid(&self, on: bool) -> bool {
        self.store.set(DRAW_GRID, on)
    }

    pub fn set_draw_age(&self, on: bool) -> bool {
        self.store.set(DRAW_AGE, on)
    }

    /// The underlying store.
    pub fn store(&self) -> &Store<bool> {
        &self.store
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseState {
    #[default]
    Idle,
    Down,
    Dragging,
}

/// Derived, read-only view state.
#[derive(Debug)]
pub struct ViewModel {
    pub play_pause_label: Computed<&'static str>,
    pub next_disabled: Computed<bool>,
    pub speed_label: Computed<String>,
    /// Slider position for the current speed, the inverse of
    /// [`speed_from_slider`].
    pub speed_slider: Computed<f64>,
    /// Cell colour as `#rrggbb`.
    pub colour_attr: Computed<String>,
    pub canvas_dragging: Computed<bool>,
    pub pattern_drag_over: Computed<bool>,
}

/// UI-context state and intents.
pub struct App {
    worker: mpsc::UnboundedSender<WorkerMessage>,

    playback: Signal<bool>,
    speed: Signal<u16>,
    cell_colour: Signal<u32>,
    cell_size: Signal<u16>,
    notification: Signal<Option<String>>,
    settings: Settings,

    drag_origin: Store<f64>,
    mouse: Signal<MouseState>,
    pattern_over_canvas: Signal<bool>,
    dragged_pattern: Signal<Option<PatternKind>>,

    view: ViewModel,
    _settings_sync: Effect,
}

impl App {
    /// Create the UI state. Settings are posted to the worker immediately and
    /// again on every change.
    pub fn new(worker: mpsc::UnboundedSender<WorkerMessage>, cell_size: u16) -> Self {
        let playback = Signal::new(false);
        let speed = Signal::new(0u16);
        let cell_colour = Signal::new(DEFAULT_CELL_COLOUR);
        let mouse = Signal::new(MouseState::Idle);
        let pattern_over_canvas = Signal::new(false);
        let settings = Settings::new();

        let view = ViewModel {
            play_pause_label: {
                let playback = playback.clone();
                Computed::new(move || if playback.get() { "PAUSE" } else { "PLAY" })
            },
            next_disabled: {
                let playback = playback.clone();
                Computed::new(move || playback.get())
            },
            speed_label: {
                let speed = speed.clone();
                Computed::new(move || format!("{} ms", speed.get()))
            },
            speed_slider: {
                let speed = speed.clone();
                Computed::new(move || slider_from_speed(speed.get()))
            },
            colour_attr: {
                let cell_colour = cell_colour.clone();
                Computed::new(move || format!("#{:06x}", cell_colour.get()))
            },
            canvas_dragging: {
                let mouse = mouse.clone();
                Computed::new(move || mouse.get() == MouseState::Dragging)
            },
            pattern_drag_over: {
                let over = pattern_over_canvas.clone();
                Computed::new(move || over.get())
            },
        };

        let settings_sync = {
            let settings = settings.clone();
            let worker = worker.clone();
            Effect::new(move || {
                let msg = WorkerMessage::SettingsChange {
                    draw_age: settings.draw_age(),
                    draw_grid: settings.draw_grid(),
                };
                if worker.send(msg).is_err() {
                    warn!("worker gone, settings not sent");
                }
            })
        };

        Self {
            worker,
            playback,
            speed,
            cell_colour,
            cell_size: Signal::new(cell_size.clamp(MIN_CELL_SIZE, MAX_CELL_SIZE)),
            notification: Signal::new(None),
            settings,
            drag_origin: Store::from_fields([(DRAG_X, 0.0), (DRAG_Y, 0.0)]),
            mouse,
            pattern_over_canvas,
            dragged_pattern: Signal::new(None),
            view,
            _settings_sync: settings_sync,
        }
    }

    pub fn view(&self) -> &ViewModel {
        &self.view
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn playback(&self) -> Signal<bool> {
        self.playback.clone()
    }

    pub fn speed(&self) -> Signal<u16> {
        self.speed.clone()
    }

    pub fn cell_colour(&self) -> Signal<u32> {
        self.cell_colour.clone()
    }

    pub fn cell_size(&self) -> Signal<u16> {
        self.cell_size.clone()
    }

    pub fn mouse_state(&self) -> Signal<MouseState> {
        self.mouse.clone()
    }

    /// The latest transport problem, until dismissed.
    pub fn notification(&self) -> Signal<Option<String>> {
        self.notification.clone()
    }

    /// Hand the render surface to the worker.
    pub fn initialise(&self, surface: Box<dyn Renderer>, height: f64, width: f64, world_size: u16) {
        self.post(WorkerMessage::Init {
            surface,
            cell_size: f64::from(self.cell_size.get_untracked()),
            height,
            width,
            world_size,
        });
    }

    pub fn next(&self) {
        self.command(Command::Next);
    }

    pub fn toggle_playback(&self) {
        let cmd = if self.playback.get_untracked() {
            Command::Pause
        } else {
            Command::Play
        };
        self.command(cmd);
    }

    pub fn clear(&self) {
        self.command(Command::Clear);
    }

    pub fn randomise(&self) {
        self.command(Command::Randomise);
    }

    /// Request the speed for a slider position. The displayed speed changes
    /// once the server confirms it.
    pub fn set_speed_from_slider(&self, position: f64) {
        self.post(WorkerMessage::SetSpeed {
            speed: speed_from_slider(position),
        });
    }

    /// Set the cell size from the size control.
    pub fn set_cell_size(&self, size: u16) {
        let size = size.clamp(MIN_CELL_SIZE, MAX_CELL_SIZE);
        self.cell_size.set(size);
        self.post(WorkerMessage::CellSizeChange {
            cell_size: f64::from(size),
            mouse_x: -1.0,
            mouse_y: -1.0,
        });
    }

    /// Zoom around the mouse. Positive `delta_y` zooms out.
    pub fn zoom(&self, delta_y: f64, mouse_x: f64, mouse_y: f64) {
        let current = self.cell_size.get_untracked();
        let next = zoomed_cell_size(current, delta_y);
        if next == current {
            return;
        }
        self.cell_size.set(next);
        self.post(WorkerMessage::CellSizeChange {
            cell_size: f64::from(next),
            mouse_x,
            mouse_y,
        });
    }

    pub fn resize(&self, height: f64, width: f64) {
        self.post(WorkerMessage::Resize { height, width });
    }

    pub fn set_cell_colour(&self, colour: u32) {
        self.cell_colour.set(colour & 0xFF_FFFF);
    }

    /// Set the colour from a `#rrggbb` attribute. Returns false if it does
    /// not parse.
    pub fn set_cell_colour_attr(&self, attr: &str) -> bool {
        let Some(hex) = attr.strip_prefix('#') else {
            return false;
        };
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return false;
        }
        match u32::from_str_radix(hex, 16) {
            Ok(colour) => {
                self.set_cell_colour(colour);
                true
            }
            Err(_) => false,
        }
    }

    pub fn set_draw_grid(&self, on: bool) {
        self.settings.set_draw_grid(on);
    }

    pub fn set_draw_age(&self, on: bool) {
        self.settings.set_draw_age(on);
    }

    pub fn pointer_down(&self, x: f64, y: f64) {
        self.drag_origin.set(DRAG_X, x);
        self.drag_origin.set(DRAG_Y, y);
        self.mouse.set(MouseState::Down);
    }

    /// Pan once the pointer has moved past [`DRAG_THRESHOLD`].
    pub fn pointer_move(&self, x: f64, y: f64) {
        let state = self.mouse.get_untracked();
        if state == MouseState::Idle {
            return;
        }
        let dx = x - self.drag_origin.get_untracked(DRAG_X).unwrap_or(x);
        let dy = y - self.drag_origin.get_untracked(DRAG_Y).unwrap_or(y);
        if state != MouseState::Dragging && dx.abs() <= DRAG_THRESHOLD && dy.abs() <= DRAG_THRESHOLD {
            return;
        }

        self.post(WorkerMessage::CanvasDrag { dx, dy });
        self.drag_origin.set(DRAG_X, x);
        self.drag_origin.set(DRAG_Y, y);
        self.mouse.set(MouseState::Dragging);
    }

    /// Release over the canvas. A press that never became a drag places a
    /// single cell at the release point.
    pub fn pointer_up(&self, offset_x: f64, offset_y: f64) {
        if self.mouse.get_untracked() == MouseState::Down {
            self.post(WorkerMessage::SetCells {
                count: 1,
                colour: self.cell_colour.get_untracked(),
                coordinates: vec![0, 0, 0, 0],
                origin_px: offset_x,
                origin_py: offset_y,
            });
        }
        self.mouse.set(MouseState::Idle);
    }

    /// Release anywhere outside the canvas.
    pub fn pointer_release(&self) {
        self.mouse.set(MouseState::Idle);
    }

    pub fn pattern_drag_start(&self, kind: PatternKind) {
        self.dragged_pattern.set(Some(kind));
    }

    pub fn pattern_drag_over(&self) {
        if self.dragged_pattern.get_untracked().is_some() {
            self.pattern_over_canvas.set(true);
        }
    }

    pub fn pattern_drag_leave(&self) {
        self.pattern_over_canvas.set(false);
    }

    /// Drop the dragged pattern centred on the cell under the drop point.
    pub fn pattern_drop(&self, offset_x: f64, offset_y: f64) {
        let Some(kind) = self.dragged_pattern.get_untracked() else {
            return;
        };
        self.post(WorkerMessage::SetPattern {
            pattern: kind.id().to_owned(),
            colour: self.cell_colour.get_untracked(),
            origin_px: offset_x,
            origin_py: offset_y,
        });
        self.pattern_drag_end();
    }

    pub fn pattern_drag_end(&self) {
        self.pattern_over_canvas.set(false);
        self.dragged_pattern.set(None);
    }

    /// Apply one event batch from the worker, in order.
    pub fn apply_events(&self, batch: impl IntoIterator<Item = WorkerEvent>) {
        for event in batch {
            match event {
                WorkerEvent::Ready => debug!("worker ready"),
                WorkerEvent::PlaybackStateChanged { playing } => self.playback.set(playing),
                WorkerEvent::SpeedChanged { speed } => self.speed.set(speed),
                WorkerEvent::TransportError { message } => self.notification.set(Some(message)),
            }
        }
    }

    pub fn dismiss_notification(&self) {
        self.notification.set(None);
    }

    fn command(&self, cmd: Command) {
        self.post(WorkerMessage::Command { cmd });
    }

    fn post(&self, msg: WorkerMessage) {
        if let Err(err) = self.worker.send(msg) {
            warn!(kind = err.0.kind(), "worker gone, message dropped");
            self.notification.set(Some("worker stopped".to_owned()));
        }
    }
}

/// Generation interval in ms for a speed slider position.
pub fn speed_from_slider(position: f64) -> u16 {
    (1000.0 - position.max(0.0).sqrt() * 100.0).max(1.0) as u16
}

/// Slider position for a generation interval.
pub fn slider_from_speed(speed: u16) -> f64 {
    ((1000.0 - f64::from(speed)) * 0.01).powi(2)
}

/// Wheel zoom: coarse steps at small sizes, fine steps above.
pub fn zoomed_cell_size(current: u16, delta_y: f64) -> u16 {
    let zoom_out = delta_y > 0.0;
    let factor = match (current <= 5, zoom_out) {
        (true, true) => 0.5,
        (true, false) => 1.5,
        (false, true) => 0.9,
        (false, false) => 1.1,
    };
    let next = (f64::from(current) * factor).round();
    next.clamp(f64::from(MIN_CELL_SIZE), f64::from(MAX_CELL_SIZE)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> (App, mpsc::UnboundedReceiver<WorkerMessage>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let app = App::new(tx, 10);
        assert!(matches!(
            rx.try_recv(),
            Ok(WorkerMessage::SettingsChange {
                draw_age: false,
                draw_grid: true
            })
        ));
        (app, rx)
    }

    #[test]
    fn playback_events_drive_the_view_model() {
        let (app, _rx) = app();
        assert_eq!(app.view().play_pause_label.get(), "PLAY");
        assert!(!app.view().next_disabled.get());

        app.apply_events([
            WorkerEvent::PlaybackStateChanged { playing: true },
            WorkerEvent::SpeedChanged { speed: 100 },
        ]);

        assert_eq!(app.view().play_pause_label.get(), "PAUSE");
        assert!(app.view().next_disabled.get());
        assert_eq!(app.view().speed_label.get(), "100 ms");
        assert!((app.view().speed_slider.get() - 81.0).abs() < 1e-9);
    }

    #[test]
    fn toggle_playback_follows_the_reported_state() {
        let (app, mut rx) = app();
        app.toggle_playback();
        assert!(matches!(rx.try_recv(), Ok(WorkerMessage::Command { cmd: Command::Play })));

        app.apply_events([WorkerEvent::PlaybackStateChanged { playing: true }]);
        app.toggle_playback();
        assert!(matches!(rx.try_recv(), Ok(WorkerMessage::Command { cmd: Command::Pause })));
    }

    #[test]
    fn each_settings_change_is_posted_once() {
        let (app, mut rx) = app();
        app.set_draw_age(true);
        assert!(matches!(
            rx.try_recv(),
            Ok(WorkerMessage::SettingsChange {
                draw_age: true,
                draw_grid: true
            })
        ));

        app.set_draw_age(true);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn slider_and_speed_are_inverse() {
        assert_eq!(speed_from_slider(0.0), 1000);
        assert_eq!(speed_from_slider(81.0), 100);
        assert_eq!(speed_from_slider(100.0), 1);
        assert_eq!(speed_from_slider(400.0), 1);
        assert_eq!(slider_from_speed(1000), 0.0);
    }

    #[test]
    fn wheel_zoom_steps_and_clamps() {
        assert_eq!(zoomed_cell_size(4, 1.0), 2);
        assert_eq!(zoomed_cell_size(4, -1.0), 6);
        assert_eq!(zoomed_cell_size(20, 1.0), 18);
        assert_eq!(zoomed_cell_size(20, -1.0), 22);
        assert_eq!(zoomed_cell_size(1, 1.0), 1);
        assert_eq!(zoomed_cell_size(100, -1.0), 100);
    }

    #[test]
    fn zoom_posts_only_on_change() {
        let (app, mut rx) = app();
        app.zoom(-1.0, 30.0, 40.0);
        assert_eq!(app.cell_size().get_untracked(), 11);
        assert!(matches!(
            rx.try_recv(),
            Ok(WorkerMessage::CellSizeChange { mouse_x, mouse_y, .. }) if mouse_x == 30.0 && mouse_y == 40.0
        ));

        app.set_cell_size(100);
        rx.try_recv().unwrap();
        app.zoom(-1.0, 0.0, 0.0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn click_places_a_cell() {
        let (app, mut rx) = app();
        app.set_cell_colour(0xFF00FF);
        app.pointer_down(10.0, 10.0);
        app.pointer_move(12.0, 13.0);
        app.pointer_up(35.0, 45.0);

        match rx.try_recv() {
            Ok(WorkerMessage::SetCells {
                count,
                colour,
                coordinates,
                origin_px,
                origin_py,
            }) => {
                assert_eq!((count, colour), (1, 0xFF00FF));
                assert_eq!(coordinates, vec![0, 0, 0, 0]);
                assert_eq!((origin_px, origin_py), (35.0, 45.0));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(app.mouse_state().get_untracked(), MouseState::Idle);
    }

    #[test]
    fn drag_pans_instead_of_placing() {
        let (app, mut rx) = app();
        app.pointer_down(10.0, 10.0);
        app.pointer_move(20.0, 10.0);
        assert!(app.view().canvas_dragging.get());
        assert!(matches!(
            rx.try_recv(),
            Ok(WorkerMessage::CanvasDrag { dx, dy }) if dx == 10.0 && dy == 0.0
        ));

        app.pointer_move(21.0, 11.0);
        assert!(matches!(
            rx.try_recv(),
            Ok(WorkerMessage::CanvasDrag { dx, dy }) if dx == 1.0 && dy == 1.0
        ));

        app.pointer_up(21.0, 11.0);
        assert!(rx.try_recv().is_err());
        assert!(!app.view().canvas_dragging.get());
    }

    #[test]
    fn pattern_drop_sends_the_pattern() {
        let (app, mut rx) = app();
        app.pattern_drag_over();
        assert!(!app.view().pattern_drag_over.get(), "nothing dragged yet");

        app.pattern_drag_start(PatternKind::Glider);
        app.pattern_drag_over();
        assert!(app.view().pattern_drag_over.get());

        app.pattern_drop(50.0, 60.0);
        assert!(matches!(
            rx.try_recv(),
            Ok(WorkerMessage::SetPattern { pattern, colour: DEFAULT_CELL_COLOUR, .. }) if pattern == "glider"
        ));
        assert!(!app.view().pattern_drag_over.get());

        app.pattern_drop(0.0, 0.0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn colour_attribute_round_trips() {
        let (app, _rx) = app();
        assert_eq!(app.view().colour_attr.get(), "#ffffff");
        assert!(app.set_cell_colour_attr("#0a141e"));
        assert_eq!(app.cell_colour().get_untracked(), 0x0A141E);
        assert_eq!(app.view().colour_attr.get(), "#0a141e");
        assert!(!app.set_cell_colour_attr("0a141e"));
        assert!(!app.set_cell_colour_attr("#zzzzzz"));
        assert!(!app.set_cell_colour_attr("#+0a141"));
        assert_eq!(app.view().colour_attr.get(), "#0a141e");
    }

    #[test]
    fn transport_errors_become_a_dismissible_notification() {
        let (app, _rx) = app();
        app.apply_events([WorkerEvent::TransportError {
            message: "connection closed".to_owned(),
        }]);
        assert_eq!(
            app.notification().get_untracked().as_deref(),
            Some("connection closed")
        );
        app.dismiss_notification();
        assert_eq!(app.notification().get_untracked(), None);
    }

    #[test]
    fn a_stopped_worker_is_reported() {
        let (app, rx) = app();
        drop(rx);
        app.next();
        assert_eq!(
            app.notification().get_untracked().as_deref(),
            Some("worker stopped")
        );
    }
}
