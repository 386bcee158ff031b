//! The worker task.
//!
//! One tokio task multiplexes UI messages, inbound frames, transport failures
//! and frame ticks. Each handler runs to completion before the next event is
//! taken, so decoding and drawing never interleave.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::canvas::CanvasWorker;
use super::message::{WorkerEvent, WorkerMessage};
use crate::error::{TransportError, WorkerError};
use crate::transport::Connector;

/// The UI side of a running worker.
#[derive(Debug)]
pub struct WorkerHandle {
    messages: mpsc::UnboundedSender<WorkerMessage>,
    events: mpsc::UnboundedReceiver<Vec<WorkerEvent>>,
    task: JoinHandle<Result<(), WorkerError>>,
}

impl WorkerHandle {
    /// Queue a message for the worker.
    pub fn post(&self, msg: WorkerMessage) -> Result<(), WorkerError> {
        self.messages.send(msg).map_err(|_| WorkerError::Stopped)
    }

    /// Another sender for the worker's message queue.
    pub fn sender(&self) -> mpsc::UnboundedSender<WorkerMessage> {
        self.messages.clone()
    }

    /// Wait for the next event batch. `None` once the worker has stopped.
    pub async fn next_events(&mut self) -> Option<Vec<WorkerEvent>> {
        self.events.recv().await
    }

    /// The next event batch, if one is already queued.
    pub fn try_events(&mut self) -> Option<Vec<WorkerEvent>> {
        self.events.try_recv().ok()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Close this handle's message queue and wait for the worker to end.
    ///
    /// The worker stops once every sender from [`sender`](Self::sender) is
    /// dropped too.
    pub async fn join(self) -> Result<(), WorkerError> {
        drop(self.messages);
        match self.task.await {
            Ok(result) => result,
            Err(err) => {
                error!(%err, "worker task failed");
                Err(WorkerError::Stopped)
            }
        }
    }

    /// Stop the worker without waiting for it.
    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Spawn a worker on the current tokio runtime.
///
/// The connection is opened through `connector` when `Init` arrives.
pub fn spawn_worker<C>(connector: C, frame_interval: Duration) -> WorkerHandle
where
    C: Connector + 'static,
{
    let (messages_tx, messages_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let task = tokio::spawn(async move {
        let result = run(connector, messages_rx, events_tx, frame_interval).await;
        if let Err(err) = &result {
            error!(%err, "worker stopped");
        }
        result
    });

    WorkerHandle {
        messages: messages_tx,
        events: events_rx,
        task,
    }
}

async fn run<C: Connector>(
    connector: C,
    mut messages: mpsc::UnboundedReceiver<WorkerMessage>,
    events: mpsc::UnboundedSender<Vec<WorkerEvent>>,
    frame_interval: Duration,
) -> Result<(), WorkerError> {
    let mut worker = CanvasWorker::new(events);
    let mut inbound: Option<mpsc::UnboundedReceiver<Vec<u8>>> = None;
    let mut failures: Option<mpsc::UnboundedReceiver<TransportError>> = None;

    let mut frames = interval(frame_interval);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            msg = messages.recv() => {
                let Some(msg) = msg else {
                    info!("message queue closed, worker exiting");
                    return Ok(());
                };
                match msg.into_init() {
                    Ok(params) => {
                        if worker.is_initialised() {
                            return Err(WorkerError::AlreadyInitialised);
                        }
                        let connection = connector.connect().await?;
                        worker.init(params, connection.outbound)?;
                        inbound = Some(connection.inbound);
                        failures = Some(connection.errors);
                    }
                    Err(msg) => worker.handle_message(msg)?,
                }
            }
            frame = recv_from(&mut inbound) => match frame {
                Some(frame) => worker.handle_frame(&frame),
                None => {
                    debug!("inbound stream ended");
                    inbound = None;
                }
            },
            failure = recv_from(&mut failures) => match failure {
                Some(err) => {
                    warn!(%err, "transport failure");
                    worker.report_transport_error(&err);
                }
                None => failures = None,
            },
            _ = frames.tick() => {
                worker.on_animation_frame();
            }
        }
    }
}

/// Receive from an optional channel; pends forever when there is none.
async fn recv_from<T>(rx: &mut Option<mpsc::UnboundedReceiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
