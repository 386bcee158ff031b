//! Redraw coalescing.
//!
//! Requests made between two frame boundaries collapse into one draw. A new
//! request cancels the pending one and takes its place, so the draw always
//! sees the buffer as it is at the boundary.

use tracing::trace;

/// Handle of a scheduled redraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RedrawHandle(u64);

/// At most one pending redraw, fired at the next frame boundary.
#[derive(Debug, Default)]
pub struct RedrawScheduler {
    pending: Option<RedrawHandle>,
    next_handle: u64,
    requested: u64,
    cancelled: u64,
}

impl RedrawScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a redraw, replacing any pending one.
    pub fn request(&mut self) -> RedrawHandle {
        if let Some(previous) = self.pending.take() {
            self.cancelled += 1;
            trace!(handle = previous.0, "cancelled pending redraw");
        }
        let handle = RedrawHandle(self.next_handle);
        self.next_handle += 1;
        self.requested += 1;
        self.pending = Some(handle);
        trace!(handle = handle.0, "redraw requested");
        handle
    }

    /// Drop the pending redraw, if any.
    pub fn cancel(&mut self) -> Option<RedrawHandle> {
        let cancelled = self.pending.take();
        if cancelled.is_some() {
            self.cancelled += 1;
        }
        cancelled
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Called at a frame boundary. Returns the redraw to perform now.
    pub fn take_due(&mut self) -> Option<RedrawHandle> {
        self.pending.take()
    }

    /// Total requests, including cancelled ones.
    pub fn requested(&self) -> u64 {
        self.requested
    }

    /// Requests replaced or cancelled before their frame.
    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }
}
