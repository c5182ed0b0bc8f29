//! Reconnecting WebSocket transport.

use crate::error::TransportError;
use crate::transport::{EventSender, Transport, TransportEvent};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

/// Delay between reconnect attempts, growing geometrically.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            factor: 1.3,
        }
    }
}

impl ReconnectPolicy {
    fn next_delay(&self, current: Duration) -> Duration {
        current.mul_f64(self.factor.max(1.0)).min(self.max_delay)
    }
}

/// WebSocket client that reconnects until closed.
pub struct WebSocketTransport {
    url: String,
    policy: ReconnectPolicy,
    session: Option<Session>,
}

struct Session {
    outbound: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_policy(url, ReconnectPolicy::default())
    }

    pub fn with_policy(url: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self {
            url: url.into(),
            policy,
            session: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for WebSocketTransport {
    fn open(&mut self, events: EventSender) {
        self.close();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_session(
            self.url.clone(),
            self.policy.clone(),
            events,
            outbound_rx,
        ));
        self.session = Some(Session {
            outbound: outbound_tx,
            task,
        });
    }

    fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.task.abort();
        }
    }

    fn send(&mut self, text: String) -> Result<(), TransportError> {
        let session = self.session.as_ref().ok_or(TransportError::NotOpen)?;
        session
            .outbound
            .send(text)
            .map_err(|_| TransportError::Closed)
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Connect, pump frames both ways, and reconnect after every loss.
///
/// Returns once the manager stops listening for events or drops the transport.
async fn run_session(
    url: String,
    policy: ReconnectPolicy,
    events: EventSender,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let mut delay = policy.min_delay;
    loop {
        debug!(%url, "connecting");
        match connect_async(url.as_str()).await {
            Ok((ws, _)) => {
                delay = policy.min_delay;
                // Frames queued for a previous connection must not leak into this one.
                while outbound.try_recv().is_ok() {}
                if events.send(TransportEvent::Open).is_err() {
                    return;
                }
                info!(%url, "websocket connected");

                let (mut sink, mut stream) = ws.split();
                let outcome: Result<(), String> = loop {
                    tokio::select! {
                        frame = outbound.recv() => match frame {
                            Some(text) => {
                                if let Err(e) = sink.send(Message::Text(text.into())).await {
                                    break Err(e.to_string());
                                }
                            }
                            None => {
                                let _ = sink.close().await;
                                return;
                            }
                        },
                        msg = stream.next() => match msg {
                            Some(Ok(Message::Text(text))) => {
                                let text = text.as_str().to_owned();
                                if events.send(TransportEvent::Message(text)).is_err() {
                                    return;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => break Ok(()),
                            Some(Ok(_)) => {}
                            Some(Err(e)) => break Err(e.to_string()),
                        },
                    }
                };

                if let Err(e) = outcome
                    && events.send(TransportEvent::Error(e)).is_err()
                {
                    return;
                }
                if events.send(TransportEvent::Closed).is_err() {
                    return;
                }
            }
            Err(e) => {
                if events.send(TransportEvent::Error(e.to_string())).is_err() {
                    return;
                }
            }
        }

        debug!(?delay, "reconnecting after delay");
        tokio::time::sleep(delay).await;
        delay = policy.next_delay(delay);
    }
}
