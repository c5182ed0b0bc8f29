//! Connection manager.
//!
//! [`Scales`] owns one transport to the appliance and a single command queue
//! shared by every [`Scale`] facade. All state transitions happen inside one
//! spawned task; callers talk to it over a channel, so the queue needs no
//! locking and commands from any number of tasks are serialized in the order
//! they were issued.

use crate::error::CommandError;
use crate::pending::PendingResult;
use crate::queue::{CommandQueue, QueuedCommand, Reply};
use crate::scale::Scale;
use crate::transport::{Transport, TransportEvent};
use kegscale_core::{
    ApplianceMessage, Command, ConnectionState, MessageError, ScaleData, ScaleDescriptor,
};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Round-trip budget for a single command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// How long a caller waits for a reply, counted from when the command is
    /// issued (queueing time included).
    pub command_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

/// Receives every `data` push exactly as the appliance sent it.
pub type DataCallback = Box<dyn FnMut(ScaleData) + Send>;

enum Request {
    Enqueue(QueuedCommand),
    Open,
    Close,
    Shutdown,
}

/// Handle to the shared command queue.
///
/// Cloned into every facade; all clones feed the same queue.
#[derive(Clone)]
pub struct CommandSender {
    requests: mpsc::UnboundedSender<Request>,
    timeout: Duration,
}

impl CommandSender {
    /// Queue a command and return its pending result.
    ///
    /// The command is queued before this returns, so the order of calls is the
    /// order of transmission even if the results are awaited later.
    pub fn send(&self, command: Command) -> PendingResult {
        let (pending, settle, deadline) = PendingResult::new(self.timeout);
        let queued = QueuedCommand::new(command, settle, deadline, self.timeout);
        if self.requests.send(Request::Enqueue(queued)).is_err() {
            debug!("command issued after shutdown");
        }
        pending
    }
}

/// The set of scales behind one appliance connection.
pub struct Scales {
    commands: CommandSender,
    instances: Vec<Scale>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl Scales {
    /// Create the manager. The transport stays closed until [`Scales::open`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<T, F>(transport: T, descriptors: Vec<ScaleDescriptor>, on_data: F) -> Self
    where
        T: Transport,
        F: FnMut(ScaleData) + Send + 'static,
    {
        Self::with_options(transport, descriptors, on_data, ClientOptions::default())
    }

    pub fn with_options<T, F>(
        transport: T,
        descriptors: Vec<ScaleDescriptor>,
        on_data: F,
        options: ClientOptions,
    ) -> Self
    where
        T: Transport,
        F: FnMut(ScaleData) + Send + 'static,
    {
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Closed);

        let connection = Connection {
            transport,
            queue: CommandQueue::default(),
            events: None,
            connected: false,
            state: state_tx,
            on_data: Box::new(on_data),
        };
        let task = tokio::spawn(connection.run(requests_rx));

        let commands = CommandSender {
            requests: requests_tx,
            timeout: options.command_timeout,
        };
        let instances = descriptors
            .into_iter()
            .map(|descriptor| Scale::new(descriptor, commands.clone()))
            .collect();

        Self {
            commands,
            instances,
            state: state_rx,
            task,
        }
    }

    /// Start connecting. Queued commands are sent once the socket is up.
    pub fn open(&self) {
        let _ = self.commands.requests.send(Request::Open);
    }

    /// Disconnect. A command in flight is kept at the head of the queue and
    /// sent again after the next [`Scales::open`]; its caller keeps waiting.
    pub fn close(&self) {
        let _ = self.commands.requests.send(Request::Close);
    }

    pub fn instances(&self) -> &[Scale] {
        &self.instances
    }

    pub fn scale(&self, index: usize) -> Option<&Scale> {
        self.instances.get(index)
    }

    /// Queue a raw command.
    pub fn send_command(&self, command: Command) -> PendingResult {
        self.commands.send(command)
    }

    pub fn commands(&self) -> CommandSender {
        self.commands.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Subscribe to connection state changes.
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Close the transport and reject every command that has not settled.
    pub async fn shutdown(self) {
        let _ = self.commands.requests.send(Request::Shutdown);
        if let Err(e) = self.task.await {
            warn!(error = %e, "scales task ended abnormally");
        }
    }
}

struct Connection<T> {
    transport: T,
    queue: CommandQueue,
    /// Events of the current connection generation; `None` while closed.
    events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    /// Whether the socket is up and commands may be sent.
    connected: bool,
    state: watch::Sender<ConnectionState>,
    on_data: DataCallback,
}

impl<T: Transport> Connection<T> {
    async fn run(mut self, mut requests: mpsc::UnboundedReceiver<Request>) {
        loop {
            let deadline = self.queue.executing_deadline();
            tokio::select! {
                request = requests.recv() => match request {
                    Some(Request::Enqueue(command)) => {
                        self.queue.enqueue(command);
                        self.dispatch();
                    }
                    Some(Request::Open) => self.open(),
                    Some(Request::Close) => self.close(),
                    Some(Request::Shutdown) | None => break,
                },
                event = next_event(&mut self.events) => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        warn!("transport dropped its event channel");
                        self.events = None;
                        self.connected = false;
                        self.set_state(ConnectionState::Closed);
                    }
                },
                _ = wait_until(deadline) => {
                    if self.queue.expire(Instant::now()) {
                        warn!("Scale command timed out; reconnecting.");
                        self.recycle();
                    }
                }
            }
        }
        self.teardown();
    }

    fn open(&mut self) {
        if self.events.is_some() {
            debug!("scales socket already open");
            return;
        }
        info!("Opening scales socket...");
        self.connect();
    }

    fn connect(&mut self) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(rx);
        self.set_state(ConnectionState::Connecting);
        self.transport.open(tx);
    }

    /// Drop the connection and open a fresh one.
    ///
    /// Replies carry no correlation id, so after a command timed out in flight
    /// its answer may still arrive. It must not be read as the answer to the
    /// next command; a new connection never delivers it.
    fn recycle(&mut self) {
        if self.events.is_none() {
            self.dispatch();
            return;
        }
        self.transport.close();
        self.connected = false;
        self.connect();
    }

    fn close(&mut self) {
        if self.events.take().is_none() {
            debug!("scales socket already closed");
            return;
        }
        self.transport.close();
        self.connected = false;
        if self.queue.requeue() {
            info!("Executing scale command re-queued for the next connection.");
        }
        self.set_state(ConnectionState::Closed);
        info!("Scales socket closed.");
    }

    fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Open => {
                info!("Scales socket open.");
                self.connected = true;
                self.set_state(ConnectionState::Open);
                self.dispatch();
            }
            TransportEvent::Error(e) => {
                // The socket is gone; the next command waits for `Open`.
                self.connected = false;
                self.set_state(ConnectionState::Connecting);
                if self.queue.fail(CommandError::Transport(e.clone())) {
                    error!(error = %e, "Scales socket error while a command was executing.");
                } else {
                    warn!(error = %e, "Scales socket error.");
                }
            }
            TransportEvent::Closed => {
                self.connected = false;
                self.set_state(ConnectionState::Connecting);
                if self.queue.requeue() {
                    warn!("Scales socket dropped; executing command re-queued.");
                } else {
                    info!("Scales socket dropped.");
                }
            }
            TransportEvent::Message(text) => self.handle_message(&text),
        }
    }

    fn handle_message(&mut self, text: &str) {
        match ApplianceMessage::parse(text) {
            Ok(ApplianceMessage::Ack) => self.settle(Ok(())),
            Ok(ApplianceMessage::Error { message }) => {
                self.settle(Err(CommandError::Rejected(message)))
            }
            Ok(ApplianceMessage::Data(data)) => (self.on_data)(data),
            Err(MessageError::MissingType) => {
                warn!("Unexpected scale message without type designation.");
            }
            Err(e) => warn!(error = %e, "Dropping unexpected scale message."),
        }
    }

    fn settle(&mut self, result: Result<(), CommandError>) {
        let failed = result.is_err();
        match self.queue.reply(result) {
            Reply::Settled { action, index } => {
                debug!(action, index, failed, "scale command settled");
                self.dispatch();
            }
            Reply::Unexpected if failed => warn!("Scale command failed without execution."),
            Reply::Unexpected => warn!("Scale command acknowledged without execution."),
        }
    }

    /// Send the next queued command if the socket is up and nothing is in flight.
    fn dispatch(&mut self) {
        if !self.connected {
            return;
        }
        let Some(command) = self.queue.start_next(Instant::now()) else {
            return;
        };
        let action = command.action.name();
        let index = command.index;
        let sent = match command.to_wire() {
            Ok(wire) => self.transport.send(wire).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match sent {
            Ok(()) => debug!(action, index, "scale command sent"),
            Err(e) => {
                error!(action, index, error = %e, "unable to send scale command");
                self.queue.fail(CommandError::Transport(e));
                // Wait for the transport to report a fresh connection.
                self.connected = false;
                self.set_state(ConnectionState::Connecting);
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    fn teardown(mut self) {
        if self.events.take().is_some() {
            self.transport.close();
        }
        self.queue.drain(CommandError::Shutdown);
        self.set_state(ConnectionState::Closed);
        info!("Scales connection shut down.");
    }
}

async fn next_event(
    events: &mut Option<mpsc::UnboundedReceiver<TransportEvent>>,
) -> Option<TransportEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
