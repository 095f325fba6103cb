//! Event-loop driver for the coalescer.
//!
//! [`CoalescerService`] owns a [`Coalescer`] and runs it on the current task:
//! it waits out the debounce timer, then processes one slice at a time,
//! yielding back to the runtime between slices. Other tasks and threads talk
//! to it through a [`CoalescerHandle`], which is the only way changes reach
//! the coalescer once the service runs.

use std::path::PathBuf;

use gallerist_core::CollectionStore;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::debug;

use crate::{ChangeEvent, Coalescer, CoalescerStats, Step};

/// Default channel buffer size for service commands.
pub const COMMAND_CHANNEL_SIZE: usize = 100;

/// Errors returned by [`CoalescerHandle`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service loop has exited.
    #[error("coalescer service has stopped")]
    Stopped,
}

#[derive(Debug)]
enum Command {
    Notify(ChangeEvent),
    Flush(oneshot::Sender<CoalescerStats>),
    Shutdown(oneshot::Sender<CoalescerStats>),
}

enum Control {
    Continue,
    Stop,
}

/// Cloneable, thread-safe handle to a running [`CoalescerService`].
#[derive(Debug, Clone)]
pub struct CoalescerHandle {
    tx: mpsc::Sender<Command>,
}

impl CoalescerHandle {
    /// Queue a change event.
    pub async fn notify(&self, event: ChangeEvent) -> Result<(), ServiceError> {
        self.tx
            .send(Command::Notify(event))
            .await
            .map_err(|_| ServiceError::Stopped)
    }

    /// A file was moved or renamed.
    pub async fn moved(
        &self,
        from: impl Into<PathBuf>,
        to: impl Into<PathBuf>,
    ) -> Result<(), ServiceError> {
        self.notify(ChangeEvent::moved(from, to)).await
    }

    /// A file was added to a collection.
    pub async fn added(
        &self,
        file: impl Into<PathBuf>,
        collection: impl Into<PathBuf>,
    ) -> Result<(), ServiceError> {
        self.notify(ChangeEvent::added(file, collection)).await
    }

    /// A file was removed from a collection.
    pub async fn removed(
        &self,
        file: impl Into<PathBuf>,
        collection: impl Into<PathBuf>,
    ) -> Result<(), ServiceError> {
        self.notify(ChangeEvent::removed(file, collection)).await
    }

    /// Write out everything pending and wait for it.
    pub async fn flush(&self) -> Result<CoalescerStats, ServiceError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(reply_tx))
            .await
            .map_err(|_| ServiceError::Stopped)?;
        reply_rx.await.map_err(|_| ServiceError::Stopped)
    }

    /// Flush and stop the service loop.
    pub async fn shutdown(self) -> Result<CoalescerStats, ServiceError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Shutdown(reply_tx))
            .await
            .map_err(|_| ServiceError::Stopped)?;
        reply_rx.await.map_err(|_| ServiceError::Stopped)
    }
}

/// Runs a [`Coalescer`] against the tokio clock.
#[derive(Debug)]
pub struct CoalescerService<S> {
    coalescer: Coalescer<S>,
    rx: mpsc::Receiver<Command>,
}

impl<S: CollectionStore> CoalescerService<S> {
    /// Wrap a coalescer, returning the service and a handle to it.
    pub fn new(coalescer: Coalescer<S>) -> (Self, CoalescerHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        (Self { coalescer, rx }, CoalescerHandle { tx })
    }

    /// Run until shut down or until every handle is dropped.
    ///
    /// Pending changes are flushed before returning. The coalescer is handed
    /// back so callers can inspect it.
    pub async fn run(mut self) -> Coalescer<S> {
        loop {
            if self.coalescer.is_draining() {
                while let Ok(command) = self.rx.try_recv() {
                    if let Control::Stop = self.handle(command) {
                        return self.coalescer;
                    }
                }
                if self.coalescer.step() == Step::Continue {
                    tokio::task::yield_now().await;
                }
                continue;
            }

            let deadline = self.coalescer.deadline();
            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(command) => {
                        if let Control::Stop = self.handle(command) {
                            return self.coalescer;
                        }
                    }
                    None => {
                        debug!(target: "collect", "all handles dropped, flushing");
                        self.coalescer.flush();
                        return self.coalescer;
                    }
                },
                _ = sleep_until(deadline) => {
                    self.coalescer.poll_timer(Instant::now());
                }
            }
        }
    }

    fn handle(&mut self, command: Command) -> Control {
        match command {
            Command::Notify(event) => {
                self.coalescer.notify(event);
                Control::Continue
            }
            Command::Flush(reply) => {
                self.coalescer.flush();
                let _ = reply.send(self.coalescer.stats());
                Control::Continue
            }
            Command::Shutdown(reply) => {
                self.coalescer.flush();
                let _ = reply.send(self.coalescer.stats());
                Control::Stop
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
