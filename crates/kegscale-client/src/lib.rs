//! Client for the keg scale appliance.
//!
//! [`Scales`] keeps one socket to the appliance and funnels the commands of
//! every [`Scale`] through a single queue: commands are sent one at a time, in
//! the order they were issued, and each reply settles the command in flight.
//!
//! ```no_run
//! use kegscale_client::{Scales, WebSocketTransport};
//! use kegscale_core::{ApplianceEndpoint, ScaleDescriptor};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoint = ApplianceEndpoint::parse("http://keg-scale.local")?;
//! let transport = WebSocketTransport::new(endpoint.scales_url());
//! let scales = Scales::new(transport, vec![ScaleDescriptor::new(0, "Left")], |data| {
//!     println!("scale {} -> {}", data.index, data.state);
//! });
//! scales.open();
//!
//! let left = &scales.instances()[0];
//! let tare = left.tare();
//! let calibrate = left.calibrate(1000.0);
//! tare.await?;
//! calibrate.await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod fetch;
mod pending;
mod queue;
mod scale;
mod scales;
mod store;
mod transport;
mod websocket;

pub use error::{CommandError, ConfigError, TransportError};
pub use fetch::{fetch_config, fetch_config_with};
pub use pending::PendingResult;
pub use scale::Scale;
pub use scales::{ClientOptions, CommandSender, DEFAULT_COMMAND_TIMEOUT, DataCallback, Scales};
pub use store::ScaleStates;
pub use transport::{EventSender, Transport, TransportEvent};
pub use websocket::{ReconnectPolicy, WebSocketTransport};
