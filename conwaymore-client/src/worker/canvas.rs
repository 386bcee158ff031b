//! The render worker's state machine.
//!
//! The worker starts uninitialised and becomes ready on `Init`; ready is
//! terminal and a second `Init` is fatal. Once ready it owns the renderer,
//! the cell buffer and the outbound side of the connection. Every decoded
//! snapshot replaces the buffer and schedules a redraw; the draw itself waits
//! for the next frame boundary.
//!
//! All methods are synchronous. The async plumbing lives in
//! [`driver`](super::driver).

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::frame::RedrawScheduler;
use super::message::{WorkerEvent, WorkerMessage};
use super::renderer::{scale_cell_size, Renderer, SurfaceLayout};
use crate::error::{ProtocolError, TransportError, WorkerError};
use crate::protocol::{decode_into, Cell, CellBuffer, ClientFrame, PatternKind};
use crate::reactive::{Effect, Signal};

/// The parts of `Init` the worker keeps.
pub struct InitParams {
    pub surface: Box<dyn Renderer>,
    pub cell_size: f64,
    pub height: f64,
    pub width: f64,
    pub world_size: u16,
}

impl WorkerMessage {
    /// Split an `Init` message into its parameters.
    pub fn into_init(self) -> Result<InitParams, WorkerMessage> {
        match self {
            WorkerMessage::Init {
                surface,
                cell_size,
                height,
                width,
                world_size,
            } => Ok(InitParams {
                surface,
                cell_size,
                height,
                width,
                world_size,
            }),
            other => Err(other),
        }
    }
}

enum WorkerState {
    Uninitialised,
    Ready(Ready),
}

struct Ready {
    renderer: Box<dyn Renderer>,
    cells: CellBuffer,
    redraw: RedrawScheduler,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    world_size: u16,
}

/// Worker-side state: render surface, cell buffer and playback signals.
pub struct CanvasWorker {
    state: WorkerState,
    events: mpsc::UnboundedSender<Vec<WorkerEvent>>,
    playing: Signal<bool>,
    speed: Signal<u16>,
    _playback_log: Effect,
}

impl CanvasWorker {
    /// Create an uninitialised worker posting event batches to `events`.
    pub fn new(events: mpsc::UnboundedSender<Vec<WorkerEvent>>) -> Self {
        let playing = Signal::new(false);
        let speed = Signal::new(0u16);

        let playback_log = {
            let playing = playing.clone();
            let speed = speed.clone();
            Effect::new(move || {
                let (playing, speed) = (playing.get(), speed.get());
                debug!(playing, speed, "playback state");
            })
        };

        Self {
            state: WorkerState::Uninitialised,
            events,
            playing,
            speed,
            _playback_log: playback_log,
        }
    }

    pub fn is_initialised(&self) -> bool {
        matches!(self.state, WorkerState::Ready(_))
    }

    /// Whether the server last reported the simulation as playing.
    pub fn playing(&self) -> Signal<bool> {
        self.playing.clone()
    }

    /// Generation interval last reported by the server.
    pub fn speed(&self) -> Signal<u16> {
        self.speed.clone()
    }

    /// Number of cells in the current buffer.
    pub fn cell_count(&self) -> usize {
        match &self.state {
            WorkerState::Ready(ready) => ready.cells.len(),
            WorkerState::Uninitialised => 0,
        }
    }

    pub fn redraw_pending(&self) -> bool {
        match &self.state {
            WorkerState::Ready(ready) => ready.redraw.is_pending(),
            WorkerState::Uninitialised => false,
        }
    }

    /// Transition to ready.
    ///
    /// `outbound` is the send half of an open connection.
    pub fn init(
        &mut self,
        params: InitParams,
        outbound: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Result<(), WorkerError> {
        if self.is_initialised() {
            return Err(WorkerError::AlreadyInitialised);
        }

        let InitParams {
            mut surface,
            cell_size,
            height,
            width,
            world_size,
        } = params;

        surface.attach(SurfaceLayout {
            world_size,
            cell_size: scale_cell_size(cell_size),
            height,
            width,
        });

        let mut redraw = RedrawScheduler::new();
        redraw.request();

        self.state = WorkerState::Ready(Ready {
            renderer: surface,
            cells: CellBuffer::with_world_size(world_size),
            redraw,
            outbound,
            world_size,
        });
        info!(world_size, "worker ready");
        self.post(vec![WorkerEvent::Ready]);
        Ok(())
    }

    /// Handle a UI message other than a first `Init`.
    ///
    /// Only fatal errors are returned; everything else is logged.
    pub fn handle_message(&mut self, msg: WorkerMessage) -> Result<(), WorkerError> {
        debug!(kind = msg.kind(), "worker message");

        let ready = match &mut self.state {
            WorkerState::Ready(ready) => ready,
            WorkerState::Uninitialised => {
                warn!(kind = msg.kind(), "message before init ignored");
                return Ok(());
            }
        };

        let outcome = match msg {
            WorkerMessage::Init { .. } => return Err(WorkerError::AlreadyInitialised),
            WorkerMessage::CanvasDrag { dx, dy } => {
                ready.renderer.increment_offset(dx, dy);
                ready.redraw.request();
                Ok(())
            }
            WorkerMessage::CellSizeChange {
                cell_size,
                mouse_x,
                mouse_y,
            } => {
                ready
                    .renderer
                    .set_cell_size(scale_cell_size(cell_size), mouse_x, mouse_y);
                ready.redraw.request();
                Ok(())
            }
            WorkerMessage::Resize { height, width } => {
                ready.renderer.set_dimensions(height, width);
                ready.redraw.request();
                Ok(())
            }
            WorkerMessage::SettingsChange {
                draw_age,
                draw_grid,
            } => {
                ready.renderer.set_settings(draw_age, draw_grid);
                ready.redraw.request();
                Ok(())
            }
            WorkerMessage::SetSpeed { speed } => ready.send(ClientFrame::SetSpeed(speed)),
            WorkerMessage::Command { cmd } => ready.send(ClientFrame::Command(cmd)),
            WorkerMessage::SetCells {
                count,
                colour,
                coordinates,
                origin_px,
                origin_py,
            } => ready
                .offset_cells(count, colour, &coordinates, origin_px, origin_py)
                .map_err(WorkerError::from)
                .and_then(|cells| ready.send(ClientFrame::SetCells(cells))),
            WorkerMessage::SetPattern {
                pattern,
                colour,
                origin_px,
                origin_py,
            } => pattern.parse::<PatternKind>().and_then(|kind| {
                let cells = ready.pattern_cells(kind, colour, origin_px, origin_py);
                ready.send(ClientFrame::SetCells(cells))
            }),
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(WorkerError::Transport(err)) => {
                warn!(%err, "send failed");
                self.report_transport_error(&err);
                Ok(())
            }
            Err(WorkerError::AlreadyInitialised) => Err(WorkerError::AlreadyInitialised),
            Err(err) => {
                warn!(%err, "message ignored");
                Ok(())
            }
        }
    }

    /// Decode one inbound snapshot frame.
    ///
    /// A malformed frame is logged and dropped; the buffer keeps its
    /// previous contents.
    pub fn handle_frame(&mut self, frame: &[u8]) {
        let WorkerState::Ready(ready) = &mut self.state else {
            warn!(len = frame.len(), "frame before init dropped");
            return;
        };

        let header = match decode_into(frame, &mut ready.cells) {
            Ok(header) => header,
            Err(err) => {
                warn!(%err, len = frame.len(), "dropping malformed snapshot");
                return;
            }
        };
        ready.redraw.request();

        self.playing.set(header.playing);
        self.speed.set(header.speed);
        self.post(vec![
            WorkerEvent::PlaybackStateChanged {
                playing: header.playing,
            },
            WorkerEvent::SpeedChanged {
                speed: header.speed,
            },
        ]);
    }

    /// Tell the UI the connection failed. The worker keeps running.
    pub fn report_transport_error(&self, err: &TransportError) {
        self.post(vec![WorkerEvent::TransportError {
            message: err.to_string(),
        }]);
    }

    /// Frame boundary. Draws if a redraw is pending and reports whether it did.
    pub fn on_animation_frame(&mut self) -> bool {
        let WorkerState::Ready(ready) = &mut self.state else {
            return false;
        };
        if ready.redraw.take_due().is_none() {
            return false;
        }
        ready.renderer.draw(&ready.cells);
        true
    }

    fn post(&self, batch: Vec<WorkerEvent>) {
        if self.events.send(batch).is_err() {
            debug!("event receiver gone");
        }
    }
}

impl Ready {
    fn send(&self, frame: ClientFrame) -> Result<(), WorkerError> {
        let bytes = frame.encode()?;
        self.outbound
            .send(bytes)
            .map_err(|_| WorkerError::Transport(TransportError::Closed))
    }

    /// Anchor packed `x:u16 y:u16` offsets on the cell under the origin.
    fn offset_cells(
        &self,
        count: usize,
        colour: u32,
        coordinates: &[u8],
        origin_px: f64,
        origin_py: f64,
    ) -> Result<Vec<Cell>, ProtocolError> {
        let expected = count * 4;
        if coordinates.len() != expected {
            return Err(ProtocolError::CoordinateLengthMismatch {
                count,
                bytes: coordinates.len(),
                expected,
            });
        }

        let (ox, oy) = self.renderer.pixel_to_cell(origin_px, origin_py);
        Ok(coordinates
            .chunks_exact(4)
            .map(|c| {
                let dx = u16::from_be_bytes([c[0], c[1]]);
                let dy = u16::from_be_bytes([c[2], c[3]]);
                Cell::new(
                    self.wrap(i64::from(ox) + i64::from(dx)),
                    self.wrap(i64::from(oy) + i64::from(dy)),
                    colour,
                )
            })
            .collect())
    }

    /// Place a pattern so its centre lands on the cell under the origin.
    fn pattern_cells(&self, kind: PatternKind, colour: u32, origin_px: f64, origin_py: f64) -> Vec<Cell> {
        let pattern = kind.pattern();
        let (ox, oy) = self.renderer.pixel_to_cell(origin_px, origin_py);
        let (cx, cy) = pattern.centre();
        let left = i64::from(ox) - i64::from(cx);
        let top = i64::from(oy) - i64::from(cy);

        pattern
            .cells
            .iter()
            .map(|&(x, y)| {
                Cell::new(
                    self.wrap(left + i64::from(x)),
                    self.wrap(top + i64::from(y)),
                    colour,
                )
            })
            .collect()
    }

    fn wrap(&self, coord: i64) -> u16 {
        coord.rem_euclid(i64::from(self.world_size.max(1))) as u16
    }
}
