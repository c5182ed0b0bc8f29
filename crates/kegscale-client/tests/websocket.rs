//! End-to-end tests against an in-process appliance over a real WebSocket.

use futures_util::{SinkExt, StreamExt};
use kegscale_client::{ClientOptions, CommandError, ReconnectPolicy, Scales, WebSocketTransport};
use kegscale_core::{ConnectionState, ScaleData, ScaleDescriptor};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// What the fake appliance does with a command on a given connection.
enum Answer {
    Reply(Value),
    /// Close the connection without answering.
    Hangup,
    /// Keep the connection but never answer.
    Ignore,
}

type Handler = fn(usize, &Value) -> Answer;

/// Serve connections one after another. Every received command is reported
/// together with the number of the connection it arrived on.
async fn spawn_appliance(
    handler: Handler,
) -> (SocketAddr, mpsc::UnboundedReceiver<(usize, Value)>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (log_tx, log_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut connection = 0;
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
                continue;
            };
            let (mut sink, mut stream) = ws.split();

            let hello = json!({
                "type": "data",
                "index": 0,
                "isFull": true,
                "state": { "name": "standby", "data": 0.0 }
            });
            let _ = sink.send(Message::Text(hello.to_string().into())).await;

            while let Some(Ok(msg)) = stream.next().await {
                let Message::Text(text) = msg else { continue };
                let command: Value = serde_json::from_str(&text).unwrap();
                let _ = log_tx.send((connection, command.clone()));
                match handler(connection, &command) {
                    Answer::Reply(reply) => {
                        let _ = sink.send(Message::Text(reply.to_string().into())).await;
                    }
                    Answer::Hangup => {
                        let _ = sink.close().await;
                        break;
                    }
                    Answer::Ignore => {}
                }
            }
            connection += 1;
        }
    });

    (addr, log_rx)
}

fn fast_reconnect() -> ReconnectPolicy {
    ReconnectPolicy {
        min_delay: Duration::from_millis(20),
        max_delay: Duration::from_millis(100),
        factor: 2.0,
    }
}

fn connect(addr: SocketAddr) -> (Scales, mpsc::UnboundedReceiver<ScaleData>) {
    connect_with(addr, ClientOptions::default())
}

fn connect_with(
    addr: SocketAddr,
    options: ClientOptions,
) -> (Scales, mpsc::UnboundedReceiver<ScaleData>) {
    let (data_tx, data_rx) = mpsc::unbounded_channel();
    let transport =
        WebSocketTransport::with_policy(format!("ws://{addr}/scales"), fast_reconnect());
    let scales = Scales::with_options(
        transport,
        vec![ScaleDescriptor::new(0, "Left"), ScaleDescriptor::new(1, "Right")],
        move |data| {
            let _ = data_tx.send(data);
        },
        options,
    );
    (scales, data_rx)
}

fn validating(_connection: usize, command: &Value) -> Answer {
    if command["action"] == "calibrate" && command["knownMass"].as_f64().unwrap_or(0.0) <= 0.0 {
        return Answer::Reply(json!({ "type": "error", "message": "knownMass must be positive" }));
    }
    Answer::Reply(json!({ "type": "ack" }))
}

#[tokio::test]
async fn commands_round_trip() {
    let (addr, mut log) = spawn_appliance(validating).await;
    let (scales, mut data) = connect(addr);
    scales.open();

    let hello = tokio::time::timeout(Duration::from_secs(5), data.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hello.index, 0);
    assert!(hello.is_full);
    assert_eq!(scales.connection_state(), ConnectionState::Open);

    let left = &scales.instances()[0];
    let right = &scales.instances()[1];
    let tare = left.tare();
    let bad = right.calibrate(0.0);
    let good = right.calibrate(1000.0);

    assert_eq!(tare.await, Ok(()));
    assert_eq!(
        bad.await,
        Err(CommandError::Rejected("knownMass must be positive".into()))
    );
    assert_eq!(good.await, Ok(()));

    let mut received = Vec::new();
    for _ in 0..3 {
        received.push(log.recv().await.unwrap().1);
    }
    assert_eq!(
        received,
        vec![
            json!({ "action": "tare", "index": 0 }),
            json!({ "action": "calibrate", "index": 1, "knownMass": 0.0 }),
            json!({ "action": "calibrate", "index": 1, "knownMass": 1000.0 }),
        ]
    );

    scales.shutdown().await;
}

fn hangs_up_once(connection: usize, _command: &Value) -> Answer {
    if connection == 0 {
        Answer::Hangup
    } else {
        Answer::Reply(json!({ "type": "ack" }))
    }
}

#[tokio::test]
async fn command_is_redelivered_after_connection_drop() {
    let (addr, mut log) = spawn_appliance(hangs_up_once).await;
    let (scales, _data) = connect(addr);
    scales.open();

    let scale = &scales.instances()[0];
    let tare = scale.tare();
    let standby = scale.standby();

    assert_eq!(tare.await, Ok(()));
    assert_eq!(standby.await, Ok(()));

    let mut received = Vec::new();
    for _ in 0..3 {
        received.push(log.recv().await.unwrap());
    }
    assert_eq!(received[0], (0, json!({ "action": "tare", "index": 0 })));
    assert_eq!(received[1], (1, json!({ "action": "tare", "index": 0 })));
    assert_eq!(received[2], (1, json!({ "action": "standby", "index": 0 })));

    scales.shutdown().await;
}

fn ignores_first_connection(connection: usize, _command: &Value) -> Answer {
    if connection == 0 {
        Answer::Ignore
    } else {
        Answer::Reply(json!({ "type": "ack" }))
    }
}

#[tokio::test]
async fn unanswered_command_times_out_without_stalling_the_queue() {
    let timeout = Duration::from_millis(500);
    let (addr, mut log) = spawn_appliance(ignores_first_connection).await;
    let (scales, _data) = connect_with(
        addr,
        ClientOptions {
            command_timeout: timeout,
        },
    );
    scales.open();

    let scale = &scales.instances()[0];
    assert_eq!(scale.tare().await, Err(CommandError::Timeout(timeout)));

    let standby = scale.standby();
    let live = scale.live_measurement();
    assert_eq!(standby.await, Ok(()));
    assert_eq!(live.await, Ok(()));

    let mut received = Vec::new();
    for _ in 0..3 {
        received.push(log.recv().await.unwrap());
    }
    assert_eq!(received[0], (0, json!({ "action": "tare", "index": 0 })));
    assert_eq!(received[1], (1, json!({ "action": "standby", "index": 0 })));
    assert_eq!(received[2], (1, json!({ "action": "liveMeasurement", "index": 0 })));

    scales.shutdown().await;
}

#[tokio::test]
async fn explicit_close_then_reopen() {
    let (addr, mut log) = spawn_appliance(validating).await;
    let (scales, mut data) = connect(addr);
    scales.open();
    data.recv().await.unwrap();

    scales.close();
    let mut state = scales.watch_connection();
    state
        .wait_for(|s| *s == ConnectionState::Closed)
        .await
        .unwrap();

    let tare = scales.instances()[0].tare();
    scales.open();
    assert_eq!(tare.await, Ok(()));
    assert_eq!(log.recv().await.unwrap().1["action"], "tare");

    scales.shutdown().await;
}
