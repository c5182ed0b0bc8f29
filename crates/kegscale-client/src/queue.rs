//! Ordering and correlation of commands.
//!
//! Replies carry no request id; the appliance answers commands one at a time
//! and in order. The queue therefore keeps at most one command in flight and
//! attributes every `ack`/`error` to it.

use crate::error::CommandError;
use crate::pending::Settle;
use kegscale_core::Command;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

pub(crate) struct QueuedCommand {
    pub command: Command,
    settle: Settle,
    deadline: Instant,
    timeout: Duration,
}

impl QueuedCommand {
    pub fn new(command: Command, settle: Settle, deadline: Instant, timeout: Duration) -> Self {
        Self {
            command,
            settle,
            deadline,
            timeout,
        }
    }

    /// Settle the caller's result. Returns `false` if nobody is listening.
    fn settle(self, result: Result<(), CommandError>) -> bool {
        self.settle.send(result).is_ok()
    }
}

/// How an inbound `ack`/`error` was attributed.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Reply {
    /// Settled the executing command.
    Settled { action: &'static str, index: usize },
    /// Nothing was executing.
    Unexpected,
}

#[derive(Default)]
pub(crate) struct CommandQueue {
    pending: VecDeque<QueuedCommand>,
    executing: Option<QueuedCommand>,
}

impl CommandQueue {
    pub fn enqueue(&mut self, command: QueuedCommand) {
        self.pending.push_back(command);
    }

    pub fn is_executing(&self) -> bool {
        self.executing.is_some()
    }

    pub fn queued(&self) -> usize {
        self.pending.len()
    }

    pub fn executing_deadline(&self) -> Option<Instant> {
        self.executing.as_ref().map(|c| c.deadline)
    }

    /// Move the head of the queue into the executing slot.
    ///
    /// No-op while a command is executing. Commands whose deadline passed while
    /// they were queued are rejected without being sent.
    pub fn start_next(&mut self, now: Instant) -> Option<&Command> {
        if self.executing.is_some() {
            return None;
        }
        while let Some(next) = self.pending.pop_front() {
            if next.deadline <= now {
                tracing::debug!(
                    action = next.command.action.name(),
                    index = next.command.index,
                    "dropping command that timed out while queued"
                );
                let timeout = next.timeout;
                next.settle(Err(CommandError::Timeout(timeout)));
                continue;
            }
            return Some(&self.executing.insert(next).command);
        }
        None
    }

    /// Attribute an `ack` (`Ok`) or `error` (`Err`) reply.
    pub fn reply(&mut self, result: Result<(), CommandError>) -> Reply {
        match self.executing.take() {
            Some(command) => {
                let action = command.command.action.name();
                let index = command.command.index;
                if !command.settle(result) {
                    tracing::debug!(action, index, "reply for abandoned command");
                }
                Reply::Settled { action, index }
            }
            None => Reply::Unexpected,
        }
    }

    /// Reject the executing command, if any. Returns whether one was rejected.
    pub fn fail(&mut self, error: CommandError) -> bool {
        match self.executing.take() {
            Some(command) => {
                command.settle(Err(error));
                true
            }
            None => false,
        }
    }

    /// Reject the executing command if its deadline has passed.
    ///
    /// The appliance may still answer it, so the caller must not send another
    /// command on the same connection.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.executing.take() {
            Some(command) if command.deadline <= now => {
                let timeout = command.timeout;
                command.settle(Err(CommandError::Timeout(timeout)));
                true
            }
            other => {
                self.executing = other;
                false
            }
        }
    }

    /// Put the executing command back at the head of the queue.
    pub fn requeue(&mut self) -> bool {
        match self.executing.take() {
            Some(command) => {
                self.pending.push_front(command);
                true
            }
            None => false,
        }
    }

    /// Reject every command, executing or queued.
    pub fn drain(&mut self, error: CommandError) {
        if let Some(command) = self.executing.take() {
            command.settle(Err(error.clone()));
        }
        for command in self.pending.drain(..) {
            command.settle(Err(error.clone()));
        }
    }
}
