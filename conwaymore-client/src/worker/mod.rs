//! The render worker.
//!
//! The worker owns the render surface and the network connection. It decodes
//! snapshots into its cell buffer, forwards view changes to the renderer,
//! encodes user edits for the server, and reports playback state back to the
//! UI as event batches.
//!
//! ```text
//!   UI ──WorkerMessage──▶ driver ──▶ CanvasWorker ──ClientFrame──▶ server
//!   UI ◀──WorkerEvent──── driver ◀── CanvasWorker ◀──Snapshot──── server
//! ```

mod canvas;
mod driver;
mod frame;
mod message;
mod renderer;

pub use canvas::{CanvasWorker, InitParams};
pub use driver::{spawn_worker, WorkerHandle};
pub use frame::{RedrawHandle, RedrawScheduler};
pub use message::{WorkerEvent, WorkerMessage};
pub use renderer::{scale_cell_size, DrawStats, HeadlessRenderer, Renderer, SurfaceLayout, Viewport};
