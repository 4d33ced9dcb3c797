//! Transfer group: progress step and bounded poll over one handle.

use crate::base::neterror::{NetError, TransportCode};
use crate::http::transaction::TransactionEvent;
use crate::transfer::handle::ConnectionHandle;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Upper bound on a single [`TransferGroup::poll`] wait.
pub const POLL_CEILING: Duration = Duration::from_millis(1000);

/// Receives the output of a transfer as it arrives.
pub trait TransferSink {
    /// One header line, CRLF included.
    fn write_header(&mut self, line: &str);

    fn write_body(&mut self, chunk: &[u8]);
}

/// Registration of one handle's transfer.
///
/// Registering spawns the transfer; dropping the group removes the
/// registration and aborts a transfer that has not finished.
pub struct TransferGroup<'h> {
    handle: &'h mut ConnectionHandle,
    task: Option<JoinHandle<()>>,
    events: UnboundedReceiver<TransactionEvent>,
    pending: VecDeque<TransactionEvent>,
    outcome: Option<Result<(), NetError>>,
}

impl<'h> TransferGroup<'h> {
    pub fn register(handle: &'h mut ConnectionHandle) -> Result<Self, NetError> {
        let (task, events) = handle.start_transfer()?;
        Ok(Self {
            handle,
            task: Some(task),
            events,
            pending: VecDeque::new(),
            outcome: None,
        })
    }

    /// Deliver everything received so far to `sink` without blocking.
    ///
    /// Returns the number of transfers still running (0 or 1).
    pub fn perform(&mut self, sink: &mut dyn TransferSink) -> Result<usize, NetError> {
        while let Some(event) = self.pending.pop_front() {
            self.dispatch(event, sink);
        }

        while self.outcome.is_none() {
            match self.events.try_recv() {
                Ok(event) => self.dispatch(event, sink),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    return Err(NetError::transport(
                        TransportCode::BadTransferGroup,
                        "transfer ended without reporting a result",
                    ));
                }
            }
        }

        Ok(if self.outcome.is_some() { 0 } else { 1 })
    }

    /// Wait up to `timeout` for the transfer to make progress.
    pub fn poll(&mut self, timeout: Duration) -> Result<(), NetError> {
        if self.outcome.is_some() || !self.pending.is_empty() {
            return Ok(());
        }

        let runtime = self.handle.runtime().clone();
        let events = &mut self.events;
        // `None` means the sender is gone; the next perform reports it.
        let waited = runtime.block_on(async { tokio::time::timeout(timeout, events.recv()).await })?;
        if let Ok(Some(event)) = waited {
            self.pending.push_back(event);
        }
        Ok(())
    }

    /// Result of the finished transfer. A transfer that never reported one
    /// counts as a group failure.
    pub fn take_outcome(&mut self) -> Result<(), NetError> {
        self.outcome.take().unwrap_or_else(|| {
            Err(NetError::transport(
                TransportCode::BadTransferGroup,
                "transfer did not complete",
            ))
        })
    }

    fn dispatch(&mut self, event: TransactionEvent, sink: &mut dyn TransferSink) {
        match event {
            TransactionEvent::Status(code) => self.handle.set_response_code(code),
            TransactionEvent::Header(line) => sink.write_header(&line),
            TransactionEvent::Body(chunk) => sink.write_body(&chunk),
            TransactionEvent::Done(result) => self.outcome = Some(result),
        }
    }
}

impl Drop for TransferGroup<'_> {
    fn drop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        if !task.is_finished() {
            task.abort();
            if self.outcome.is_none() {
                tracing::warn!("transfer group removed with a transfer still running");
            }
        }
    }
}
