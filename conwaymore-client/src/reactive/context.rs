//! Reactive Context
//!
//! The reactive context tracks which subscriber is currently running. When a
//! signal, store key or computed value is read, the runtime registers the
//! innermost active subscriber as a dependent.
//!
//! # Implementation
//!
//! We use a thread-local stack. Entering a subscriber pushes it together with
//! the epoch of the current run; the returned guard pops it on drop. A
//! computed value read (and recomputed) from inside an effect therefore
//! restores the effect as the active subscriber when it returns.
//!
//! [`ReactiveContext::untracked`] pushes an empty frame, so reads inside it
//! register nothing even when called from a running subscriber.

use std::cell::RefCell;

use super::SubscriberId;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Option<Frame>>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    subscriber_id: SubscriberId,
    epoch: u64,
}

/// Guard that pops the context when dropped.
///
/// This keeps the stack balanced even if the computation panics.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber run.
    ///
    /// The context is exited when the returned guard is dropped.
    pub fn enter(subscriber_id: SubscriberId, epoch: u64) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(Some(Frame {
                subscriber_id,
                epoch,
            }));
        });

        Self {
            subscriber_id: Some(subscriber_id),
        }
    }

    /// Run `f` with dependency tracking suspended.
    pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(None));
        let _guard = Self {
            subscriber_id: None,
        };
        f()
    }

    /// Check if a subscriber is currently tracking reads.
    pub fn is_active() -> bool {
        Self::current().is_some()
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        Self::current().map(|(id, _)| id)
    }

    /// The active subscriber and the epoch of its current run.
    pub fn current() -> Option<(SubscriberId, u64)> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .copied()
                .flatten()
                .map(|frame| (frame.subscriber_id, frame.epoch))
        })
    }

    /// Number of frames on this thread's stack.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Catch mismatched enter/exit pairs.
            if let Some(frame) = popped {
                debug_assert_eq!(
                    frame.map(|f| f.subscriber_id),
                    self.subscriber_id,
                    "ReactiveContext mismatch"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tracks_subscriber() {
        let id = SubscriberId::new();

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());

        {
            let _ctx = ReactiveContext::enter(id, 1);

            assert!(ReactiveContext::is_active());
            assert_eq!(ReactiveContext::current(), Some((id, 1)));
        }

        assert!(!ReactiveContext::is_active());
        assert_eq!(ReactiveContext::depth(), 0);
    }

    #[test]
    fn nested_contexts_restore_outer() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();

        {
            let _ctx1 = ReactiveContext::enter(id1, 3);
            assert_eq!(ReactiveContext::current_subscriber(), Some(id1));

            {
                let _ctx2 = ReactiveContext::enter(id2, 1);
                assert_eq!(ReactiveContext::current_subscriber(), Some(id2));
                assert_eq!(ReactiveContext::depth(), 2);
            }

            assert_eq!(ReactiveContext::current(), Some((id1, 3)));
        }

        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn untracked_hides_active_subscriber() {
        let id = SubscriberId::new();
        let _ctx = ReactiveContext::enter(id, 1);

        let inside = ReactiveContext::untracked(ReactiveContext::current_subscriber);
        assert!(inside.is_none());
        assert_eq!(ReactiveContext::current_subscriber(), Some(id));
    }
}
