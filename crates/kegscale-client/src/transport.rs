//! The duplex channel the connection manager runs on.
//!
//! A transport owns reconnection: once opened it keeps trying to stay
//! connected and reports every transition as a [`TransportEvent`] until it is
//! closed.

use crate::error::TransportError;
use tokio::sync::mpsc;

/// Something that happened on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The socket is (re)connected.
    Open,
    /// The socket failed; a reconnect will follow.
    Error(String),
    /// A text frame arrived.
    Message(String),
    /// The peer closed the socket; a reconnect will follow.
    Closed,
}

pub type EventSender = mpsc::UnboundedSender<TransportEvent>;

/// An auto-reconnecting duplex message channel.
pub trait Transport: Send + 'static {
    /// Start connecting. Events for this connection generation go to `events`.
    fn open(&mut self, events: EventSender);

    /// Tear down the connection and stop reconnecting.
    fn close(&mut self);

    /// Queue a text frame for sending on the current connection.
    fn send(&mut self, text: String) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self, events: EventSender) {
        (**self).open(events)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn send(&mut self, text: String) -> Result<(), TransportError> {
        (**self).send(text)
    }
}
