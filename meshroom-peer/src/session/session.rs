use crate::config::SessionConfig;
use crate::error::{ConnectionError, RelaySendError, SessionError, TransportInitError};
use crate::relay::fan_out;
use crate::session::SessionCommand;
use crate::session::session_command::Reply;
use crate::session::session_handle::SessionHandle;
use crate::session::snapshot::{Notice, Phase, Role, RoomSnapshot, SessionEvent};
use crate::transport::{Connection, ConnectionRole, Transport, TransportEvent};
use meshroom_core::{
    ChatMessage, ConnectionId, ImagePayload, Membership, MessageBody, MessageLog,
    PeerAnnouncement, Participant, PeerId, RelayEnvelope, TextPayload,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const COMMAND_CAPACITY: usize = 64;

/// Outbound dial in flight.
struct PendingDial {
    id: ConnectionId,
    remote: PeerId,
    task: JoinHandle<()>,
}

/// `Transport::open` running off the actor task, with everyone waiting on it.
struct PendingOpen {
    attempt: u64,
    task: JoinHandle<()>,
    waiters: Vec<Reply<PeerId>>,
}

/// Actor owning one room session: transport, membership, log and connections.
///
/// Every handler runs to completion on the actor task; transport callbacks
/// only post [`TransportEvent`]s into the channel handed to [`Transport::open`].
pub struct Session {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) config: SessionConfig,
    pub(crate) self_id: Option<PeerId>,
    pub(crate) role: Role,
    pub(crate) phase: Phase,
    pub(crate) membership: Membership,
    pub(crate) log: MessageLog,
    pub(crate) count: usize,
    pub(crate) inbound: Vec<Connection>,
    pub(crate) outbound: Option<Connection>,
    dial: Option<PendingDial>,
    opening: Option<PendingOpen>,
    open_attempts: u64,
    invite: Option<PeerId>,
    command_rx: mpsc::Receiver<SessionCommand>,
    command_tx: mpsc::WeakSender<SessionCommand>,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    transport_tx: mpsc::UnboundedSender<TransportEvent>,
    pending_prunes: VecDeque<ConnectionId>,
    reinit: Option<JoinHandle<()>>,
    snapshot_tx: watch::Sender<RoomSnapshot>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    /// Starts the actor on the current runtime. It stops on
    /// [`SessionHandle::shutdown`] or once every handle is dropped.
    pub fn spawn(transport: Arc<dyn Transport>, config: SessionConfig) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (snapshot_tx, snapshot_rx) = watch::channel(RoomSnapshot {
            display_name: config.display_name.clone(),
            ..RoomSnapshot::default()
        });

        let session = Session {
            transport,
            invite: config.invite.clone(),
            config,
            self_id: None,
            role: Role::Uninitialized,
            phase: Phase::Idle,
            membership: Membership::new(),
            log: MessageLog::new(),
            count: 0,
            inbound: Vec::new(),
            outbound: None,
            dial: None,
            opening: None,
            open_attempts: 0,
            command_rx,
            command_tx: command_tx.downgrade(),
            transport_rx,
            transport_tx,
            pending_prunes: VecDeque::new(),
            reinit: None,
            snapshot_tx,
            events: events.clone(),
        };
        tokio::spawn(session.run());

        SessionHandle::new(command_tx, snapshot_rx, events)
    }

    async fn run(mut self) {
        info!("Session event loop started for {}", self.config.display_name);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SessionCommand::Shutdown { reply }) => {
                            self.teardown().await;
                            self.publish();
                            let _ = reply.send(());
                            break;
                        }
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("Command channel closed. Shutting down session.");
                            self.teardown().await;
                            break;
                        }
                    }
                }

                Some(evt) = self.transport_rx.recv() => {
                    self.handle_transport_event(evt).await;
                }
            }

            self.drain_prunes().await;
            self.publish();
        }

        info!("Session event loop finished");
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Initialize { reply } => self.initialize(reply),

            SessionCommand::OpenFinished { attempt, result } => {
                self.open_finished(attempt, result).await;
            }

            SessionCommand::JoinRoom { remote, reply } => {
                let result = self.join_room(remote).await;
                if let Err(e) = &result {
                    self.notice(Notice::error(e.to_string()));
                }
                let _ = reply.send(result);
            }

            SessionCommand::SendText { body, reply } => {
                let _ = reply.send(self.send_local(MessageBody::Text(body)).await);
            }

            SessionCommand::SendImage { data_url, reply } => {
                let _ = reply.send(self.send_local(MessageBody::Image(data_url)).await);
            }

            SessionCommand::ResetRoom { reply } => {
                self.reset().await;
                let _ = reply.send(());
            }

            SessionCommand::Messages { reply } => {
                let _ = reply.send(self.log.to_vec());
            }

            // Handled by the loop itself.
            SessionCommand::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened { link, role } => match role {
                ConnectionRole::HubInbound => {
                    if self.role != Role::Hub {
                        warn!("Closing inbound connection from {}: not hosting", link.remote());
                        link.close().await;
                        return;
                    }
                    self.hub_connection_opened(Connection::new(link, role)).await;
                }
                ConnectionRole::SpokeOutbound => {
                    let current = self.dial.as_ref().map(|d| d.id);
                    if current != Some(link.id()) {
                        warn!("Closing outbound connection {}: not the current dial", link.id());
                        link.close().await;
                        return;
                    }
                    self.dial = None;
                    self.spoke_connection_opened(Connection::new(link, role)).await;
                }
            },

            TransportEvent::Message { connection, data } => {
                let envelope = match RelayEnvelope::decode(&data) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        warn!("Dropping undecodable envelope on {}: {}", connection, e);
                        self.notice(Notice::warning(format!("Dropped a malformed message: {e}")));
                        return;
                    }
                };

                if self.outbound.as_ref().map(|c| c.id()) == Some(connection) {
                    self.spoke_message(envelope).await;
                } else if self.inbound_index(connection).is_some() {
                    self.hub_message(connection, envelope).await;
                } else {
                    debug!("Message for unknown connection {} ignored", connection);
                }
            }

            TransportEvent::Closed { connection } => self.connection_closed(connection).await,

            TransportEvent::Error { connection, reason } => {
                warn!("Connection {} reported an error: {}", connection, reason);
                self.notice(Notice::warning(format!("Connection error: {reason}")));
            }

            TransportEvent::DialFailed { connection, error } => {
                self.dial_failed(connection, error);
            }

            TransportEvent::RendezvousLost => {
                warn!("Rendezvous service connection lost");
                self.notice(Notice::warning(
                    "Lost the rendezvous service. Open connections keep working.",
                ));
            }
        }
    }

    /// Starts obtaining the self identifier. `reply` is answered once the
    /// transport has opened; the actor keeps serving commands meanwhile.
    fn initialize(&mut self, reply: Option<Reply<PeerId>>) {
        if let Some(id) = &self.self_id {
            debug!("Initialize ignored, already identified as {}", id);
            if let Some(reply) = reply {
                let _ = reply.send(Ok(id.clone()));
            }
            return;
        }

        if let Some(opening) = self.opening.as_mut() {
            debug!("Initialize joins open attempt {}", opening.attempt);
            opening.waiters.extend(reply);
            return;
        }

        self.open_attempts += 1;
        let attempt = self.open_attempts;
        let transport = self.transport.clone();
        let events = self.transport_tx.clone();
        let commands = self.command_tx.clone();
        let task = tokio::spawn(async move {
            let result = transport.open(events).await;
            if let Some(commands) = commands.upgrade() {
                let _ = commands
                    .send(SessionCommand::OpenFinished { attempt, result })
                    .await;
            }
        });

        debug!("Opening transport, attempt {}", attempt);
        self.opening = Some(PendingOpen {
            attempt,
            task,
            waiters: reply.into_iter().collect(),
        });
    }

    async fn open_finished(&mut self, attempt: u64, result: Result<PeerId, TransportInitError>) {
        if self.opening.as_ref().map(|o| o.attempt) != Some(attempt) {
            debug!("Stale open result for attempt {} ignored", attempt);
            return;
        }
        let Some(opening) = self.opening.take() else {
            return;
        };

        let id = match result {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to obtain a self identifier: {}", e);
                self.notice(Notice::error(format!("Could not reach the network: {e}")));
                self.publish();
                for waiter in opening.waiters {
                    let _ = waiter.send(Err(e.clone().into()));
                }
                return;
            }
        };

        info!("Identified as {} ({})", id, self.config.display_name);
        self.self_id = Some(id.clone());
        self.membership
            .add(Participant::new(id.clone(), self.config.display_name.clone()));
        self.count = 1;
        self.phase = Phase::SelfIdentified;

        match self.invite.clone() {
            None => {
                self.role = Role::Hub;
                self.transport.accept_incoming().await;
                self.phase = Phase::Hosting;
                info!("Hosting room {}", id);
            }
            Some(host) => {
                self.role = Role::Spoke;
                if let Err(e) = self.join_room(host).await {
                    warn!("Joining the invited room failed: {}", e);
                    self.notice(Notice::error(format!("Could not join the room: {e}")));
                }
            }
        }

        self.publish();
        for waiter in opening.waiters {
            let _ = waiter.send(Ok(id.clone()));
        }
    }

    /// Aborts a pending open; its waiters learn the transport went away.
    fn abort_open(&mut self) {
        if let Some(opening) = self.opening.take() {
            debug!("Aborting open attempt {}", opening.attempt);
            opening.task.abort();
            for waiter in opening.waiters {
                let _ = waiter.send(Err(TransportInitError::Shutdown.into()));
            }
        }
    }

    async fn join_room(&mut self, remote: PeerId) -> Result<(), SessionError> {
        let Some(self_id) = self.self_id.clone() else {
            return Err(SessionError::NotInitialized);
        };
        if let Some(outbound) = self.outbound.as_ref().filter(|c| c.is_open()) {
            return Err(SessionError::AlreadyConnected(outbound.remote().clone()));
        }
        if self.role == Role::Hub && !self.inbound.is_empty() {
            return Err(SessionError::HostingActiveRoom);
        }
        if remote == self_id {
            return Err(ConnectionError::Rejected(remote).into());
        }

        if let Some(stale) = self.outbound.take() {
            stale.close().await;
        }
        self.abort_dial();

        self.role = Role::Spoke;
        self.phase = Phase::Joining;

        let id = ConnectionId::new();
        let transport = self.transport.clone();
        let events = self.transport_tx.clone();
        let target = remote.clone();
        let task = tokio::spawn(async move {
            if let Err(error) = transport.connect(&target, id).await {
                let _ = events.send(TransportEvent::DialFailed {
                    connection: id,
                    error,
                });
            }
        });

        info!("Dialing {} on {}", remote, id);
        self.dial = Some(PendingDial { id, remote, task });
        Ok(())
    }

    fn dial_failed(&mut self, connection: ConnectionId, error: ConnectionError) {
        if self.dial.as_ref().map(|d| d.id) != Some(connection) {
            debug!("Stale dial failure on {} ignored", connection);
            return;
        }
        let dial = self.dial.take();
        let remote = dial.map(|d| d.remote.to_string()).unwrap_or_default();
        error!("Connecting to {} failed: {}", remote, error);
        self.phase = Phase::SelfIdentified;
        self.notice(Notice::error(format!("Could not join the room: {error}")));
    }

    fn abort_dial(&mut self) {
        if let Some(dial) = self.dial.take() {
            debug!("Aborting dial to {}", dial.remote);
            dial.task.abort();
        }
    }

    async fn send_local(&mut self, body: MessageBody) -> Result<(), SessionError> {
        let empty = match &body {
            MessageBody::Text(text) => text.trim().is_empty(),
            MessageBody::Image(data_url) => data_url.is_empty(),
        };
        if empty {
            return Err(SessionError::EmptyMessage);
        }
        if !self.is_connected() {
            self.notice(Notice::warning("Not connected to anyone yet"));
            return Err(SessionError::NotConnected);
        }

        let username = self.config.display_name.clone();
        let envelope = match &body {
            MessageBody::Text(text) => RelayEnvelope::Text(TextPayload {
                username: username.clone(),
                text: text.clone(),
            }),
            MessageBody::Image(image) => RelayEnvelope::Image(ImagePayload {
                username: username.clone(),
                image: image.clone(),
            }),
        };
        self.append(ChatMessage::local(username, body));

        match self.role {
            Role::Spoke => {
                let Some(outbound) = self.outbound.clone() else {
                    return Err(SessionError::NotConnected);
                };
                if let Err(e) = outbound.send(&envelope).await {
                    self.prune(outbound.id(), &e);
                    return Err(e.into());
                }
            }
            _ => self.broadcast(&envelope, None).await,
        }
        Ok(())
    }

    async fn reset(&mut self) {
        info!("Resetting room");

        if let Some(local) = self.local_participant() {
            let leave = RelayEnvelope::Leave(PeerAnnouncement::from(&local));
            let outcome = fan_out(&self.all_connections(), &leave, None).await;
            debug!("LEAVE delivered to {} connection(s)", outcome.delivered);
        }
        self.teardown().await;

        // Events of the old transport are dropped with the old receiver.
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        self.transport_tx = transport_tx;
        self.transport_rx = transport_rx;

        self.self_id = None;
        self.role = Role::Uninitialized;
        self.phase = Phase::Idle;
        self.membership.clear();
        self.log.clear();
        self.count = 0;
        self.invite = None;
        self.pending_prunes.clear();
        let _ = self.events.send(SessionEvent::Cleared);

        let commands = self.command_tx.clone();
        let settle = self.config.reset_settle;
        self.reinit = Some(tokio::spawn(async move {
            tokio::time::sleep(settle).await;
            if let Some(commands) = commands.upgrade() {
                let _ = commands.send(SessionCommand::Initialize { reply: None }).await;
            }
        }));
    }

    /// Closes every link and releases the transport. Safe to call repeatedly.
    async fn teardown(&mut self) {
        self.abort_open();
        self.abort_dial();
        if let Some(reinit) = self.reinit.take() {
            reinit.abort();
        }
        for connection in self.inbound.drain(..) {
            connection.close().await;
        }
        if let Some(outbound) = self.outbound.take() {
            outbound.close().await;
        }
        self.transport.shutdown().await;
    }

    async fn connection_closed(&mut self, connection: ConnectionId) {
        if self.outbound.as_ref().map(|c| c.id()) == Some(connection) {
            self.spoke_connection_closed().await;
        } else if self.inbound_index(connection).is_some() {
            self.hub_connection_closed(connection).await;
        } else if let Some(dial) = self.dial.as_ref().filter(|d| d.id == connection) {
            // Closed before it ever opened.
            let remote = dial.remote.clone();
            self.dial_failed(connection, ConnectionError::Unreachable(remote));
        } else {
            debug!("Close of untracked connection {} ignored", connection);
        }
    }

    /// Sends to every inbound connection except `except`; failed links are queued for pruning.
    pub(crate) async fn broadcast(&mut self, envelope: &RelayEnvelope, except: Option<ConnectionId>) {
        let outcome = fan_out(&self.inbound, envelope, except).await;
        for (connection, error) in outcome.failed {
            self.prune(connection, &error);
        }
    }

    /// Queues a connection to be handled as closed once the current handler returns.
    pub(crate) fn prune(&mut self, connection: ConnectionId, error: &RelaySendError) {
        if self.pending_prunes.contains(&connection) {
            return;
        }
        warn!("Pruning connection {}: {}", connection, error);
        self.pending_prunes.push_back(connection);
    }

    async fn drain_prunes(&mut self) {
        while let Some(connection) = self.pending_prunes.pop_front() {
            self.connection_closed(connection).await;
        }
    }

    pub(crate) fn append(&mut self, message: ChatMessage) {
        let message = self.log.push(message).clone();
        let _ = self.events.send(SessionEvent::Message(message));
    }

    pub(crate) fn notice(&self, notice: Notice) {
        let _ = self.events.send(SessionEvent::Notice(notice));
    }

    pub(crate) fn local_participant(&self) -> Option<Participant> {
        self.self_id
            .as_ref()
            .map(|id| Participant::new(id.clone(), self.config.display_name.clone()))
    }

    pub(crate) fn inbound_index(&self, connection: ConnectionId) -> Option<usize> {
        self.inbound.iter().position(|c| c.id() == connection)
    }

    fn all_connections(&self) -> Vec<Connection> {
        self.inbound
            .iter()
            .cloned()
            .chain(self.outbound.iter().cloned())
            .collect()
    }

    fn is_connected(&self) -> bool {
        match self.role {
            Role::Spoke => self.outbound.as_ref().is_some_and(|c| c.is_open()),
            Role::Hub => self.inbound.iter().any(|c| c.is_open()),
            Role::Uninitialized => false,
        }
    }

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            self_id: self.self_id.clone(),
            display_name: self.config.display_name.clone(),
            role: self.role,
            phase: self.phase,
            participants: self.membership.to_vec(),
            count: self.count,
            open_connections: self.all_connections().iter().filter(|c| c.is_open()).count(),
            message_count: self.log.len(),
        }
    }

    fn publish(&self) {
        let next = self.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}
