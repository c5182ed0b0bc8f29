//! Core types for the keg scale appliance protocol.
//!
//! This crate provides the wire primitives spoken over the appliance's
//! `/scales` socket and the documents served by its HTTP surface. The
//! client crate builds the command queue on top of these types.

mod command;
mod config;
mod endpoint;
mod message;
mod state;

pub use command::{Action, Command, TapEntry};
pub use config::{ApplianceConfig, ScaleConfig, Weight};
pub use endpoint::{ApplianceEndpoint, EndpointError};
pub use message::{ApplianceMessage, MessageError, ScaleData};
pub use state::ScaleState;

use serde::{Deserialize, Serialize};

/// Static identity of one physical scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleDescriptor {
    /// Position of the scale on the appliance; used as `index` on the wire.
    pub index: usize,
    /// Human-readable label.
    pub label: String,
}

impl ScaleDescriptor {
    /// Create a new descriptor.
    pub fn new(index: usize, label: impl Into<String>) -> Self {
        Self {
            index,
            label: label.into(),
        }
    }
}

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No transport, or the transport was torn down.
    #[default]
    Closed,
    /// Transport opened, waiting for the socket to come up.
    Connecting,
    /// Socket is up; commands may be dispatched.
    Open,
}
