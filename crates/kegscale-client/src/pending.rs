//! Caller side of a queued command.

use crate::error::CommandError;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{Instant, Sleep};

pub(crate) type Settle = oneshot::Sender<Result<(), CommandError>>;

/// Outcome of a command that has not settled yet.
///
/// Resolves once: with the appliance's reply, with a transport failure, or
/// with [`CommandError::Timeout`] when the deadline passes first. The deadline
/// runs from the moment the command was issued, not from the first poll.
/// Dropping a `PendingResult` does not withdraw the command.
#[must_use = "the command is sent regardless; await this to learn its outcome"]
pub struct PendingResult {
    rx: oneshot::Receiver<Result<(), CommandError>>,
    deadline: Pin<Box<Sleep>>,
    timeout: Duration,
}

impl PendingResult {
    pub(crate) fn new(timeout: Duration) -> (Self, Settle, Instant) {
        let (tx, rx) = oneshot::channel();
        let deadline = Instant::now() + timeout;
        let pending = Self {
            rx,
            deadline: Box::pin(tokio::time::sleep_until(deadline)),
            timeout,
        };
        (pending, tx, deadline)
    }

    /// Deadline after which the command counts as timed out.
    pub fn deadline(&self) -> Instant {
        self.deadline.deadline()
    }
}

impl Future for PendingResult {
    type Output = Result<(), CommandError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Poll::Ready(settled) = Pin::new(&mut self.rx).poll(cx) {
            return Poll::Ready(settled.unwrap_or(Err(CommandError::Shutdown)));
        }
        if self.deadline.as_mut().poll(cx).is_ready() {
            return Poll::Ready(Err(CommandError::Timeout(self.timeout)));
        }
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn resolves_with_sent_value() {
        let (pending, tx, _) = PendingResult::new(Duration::from_secs(10));
        tx.send(Err(CommandError::Rejected("nope".into()))).unwrap();
        assert_eq!(pending.await, Err(CommandError::Rejected("nope".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_from_creation() {
        let (pending, _tx, deadline) = PendingResult::new(Duration::from_secs(10));
        assert_eq!(pending.deadline(), deadline);
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(
            pending.await,
            Err(CommandError::Timeout(Duration::from_secs(10)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_sender_means_shutdown() {
        let (pending, tx, _) = PendingResult::new(Duration::from_secs(10));
        drop(tx);
        assert_eq!(pending.await, Err(CommandError::Shutdown));
    }
}
