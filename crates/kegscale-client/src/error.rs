use std::time::Duration;

/// Why a command did not succeed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// The appliance answered with an `error` message.
    #[error("appliance rejected command: {0}")]
    Rejected(String),
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    /// The transport failed while the command was in flight.
    #[error("transport error: {0}")]
    Transport(String),
    /// The connection manager was torn down before the command settled.
    #[error("scales connection shut down")]
    Shutdown,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport is not open")]
    NotOpen,
    #[error("connection closed")]
    Closed,
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("appliance answered {0}")]
    Status(reqwest::StatusCode),
}
