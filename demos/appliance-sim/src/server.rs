//! WebSocket server speaking the `/scales` protocol.

use crate::appliance::Appliance;
use futures_util::{SinkExt, StreamExt};
use kegscale_core::{ApplianceMessage, ScaleData};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, broadcast};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

type SharedAppliance = Arc<Mutex<Appliance>>;

pub async fn run(addr: SocketAddr, appliance: Appliance, tick: Duration) -> anyhow::Result<()> {
    let appliance = Arc::new(Mutex::new(appliance));
    let (pushes, _) = broadcast::channel::<String>(100);

    tokio::spawn(ticker(appliance.clone(), pushes.clone(), tick));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on ws://{}/scales", listener.local_addr()?);

    loop {
        let (stream, client_addr) = listener.accept().await?;
        let appliance = appliance.clone();
        let pushes = pushes.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, client_addr, appliance, pushes).await {
                tracing::warn!("Connection error from {}: {}", client_addr, e);
            }
        });
    }
}

fn encode(data: ScaleData) -> anyhow::Result<String> {
    Ok(serde_json::to_string(&ApplianceMessage::Data(data))?)
}

async fn ticker(appliance: SharedAppliance, pushes: broadcast::Sender<String>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let updates = appliance.lock().await.tick();
        for data in updates {
            match encode(data) {
                Ok(text) => {
                    let _ = pushes.send(text);
                }
                Err(e) => tracing::warn!("Dropping push: {}", e),
            }
        }
    }
}

/// Only `/scales` is served.
#[allow(clippy::result_large_err)]
fn check_path(request: &Request, response: Response) -> Result<Response, ErrorResponse> {
    if request.uri().path() == "/scales" {
        return Ok(response);
    }
    let mut error = ErrorResponse::new(Some(format!("no endpoint at {}", request.uri().path())));
    *error.status_mut() = StatusCode::NOT_FOUND;
    Err(error)
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    appliance: SharedAppliance,
    pushes: broadcast::Sender<String>,
) -> anyhow::Result<()> {
    let ws = tokio_tungstenite::accept_hdr_async(stream, check_path).await?;
    let (mut sink, mut stream) = ws.split();

    tracing::info!("Client connected: {}", addr);

    // Subscribe before the snapshot so no push falls in between.
    let mut push_rx = pushes.subscribe();

    let snapshot = appliance.lock().await.snapshot();
    for data in snapshot {
        sink.send(Message::Text(encode(data)?.into())).await?;
    }

    loop {
        tokio::select! {
            msg = stream.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        tracing::debug!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                };

                let Message::Text(text) = msg else { continue };
                let result = appliance.lock().await.handle(text.as_str());
                let reply = match result {
                    Ok(data) => {
                        let _ = pushes.send(encode(data)?);
                        ApplianceMessage::Ack
                    }
                    Err(message) => {
                        tracing::warn!("Rejected command from {}: {}", addr, message);
                        ApplianceMessage::Error { message }
                    }
                };
                sink.send(Message::Text(serde_json::to_string(&reply)?.into())).await?;
            }

            msg = push_rx.recv() => {
                match msg {
                    Ok(text) => sink.send(Message::Text(text.into())).await?,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("{} lagging, skipped {} pushes", addr, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::info!("Client disconnected: {}", addr);
    Ok(())
}
