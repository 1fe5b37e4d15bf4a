//! # MQTT Message Bridge
//!
//! Keeps a live connection to the MQTT broker and turns messages on the status
//! and last-change topics into writes on the shared [`StatusRecord`].
//!
//! ## Lifecycle
//!
//! ```text
//! Disconnected --connack--> Connected --drop/error--> Disconnected (retry after delay)
//!      |                        |
//!      +--------stop()----------+-----> Stopped (terminal, clean DISCONNECT)
//! ```
//!
//! Every successful connection (re)subscribes both topics, so a broker that
//! forgot our session after a drop still delivers to us. All broker events are
//! handled sequentially on one spawned task; the record is the only thing it
//! shares with the rest of the process.

use std::future::Future;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::core::StatusRecord;

use super::error::BridgeError;
use super::topic_router::TopicRouter;

/// Keep-alive interval negotiated with the broker.
pub const KEEP_ALIVE: Duration = Duration::from_secs(60);
/// Upper bound for [`BridgeHandle::stop`].
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);
/// Upper bound for flushing the DISCONNECT packet on stop.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Connection settings of the bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Broker host name.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Keep-alive interval.
    pub keep_alive: Duration,
    /// Topic carrying `true`/anything-else.
    pub status_topic: String,
    /// Topic carrying the last-change epoch seconds.
    pub lastchange_topic: String,
    /// Pause between a lost connection and the next connect attempt.
    pub reconnect_delay: Duration,
    /// Capacity of the client request channel.
    pub channel_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "mqtt".to_string(),
            port: 1883,
            client_id: format!("spaceapi-{}", process::id()),
            keep_alive: KEEP_ALIVE,
            status_topic: "status".to_string(),
            lastchange_topic: "lastchange".to_string(),
            reconnect_delay: Duration::from_secs(5),
            channel_capacity: 10,
        }
    }
}

/// Connection state of a running bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Not connected; a connect attempt is pending or in flight.
    Disconnected,
    /// Connected and subscribed.
    Connected,
    /// Stopped on request. No further reconnects.
    Stopped,
}

/// What a broker session reports to the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    /// A connection was (re)established.
    Connected,
    /// A message was published on one of our subscriptions.
    Message {
        /// Topic name.
        topic: String,
        /// Raw payload.
        payload: Bytes,
    },
    /// Protocol traffic the bridge does not care about (acks, pings).
    Other,
}

/// I/O seam between the bridge state machine and an MQTT client.
///
/// `next_event` drives the connection: it connects when needed and yields the
/// next event. An `Err` means the connection is gone; calling `next_event`
/// again is the reconnect attempt.
pub trait BrokerSession: Send {
    /// Waits for the next broker event.
    fn next_event(&mut self) -> impl Future<Output = Result<BrokerEvent, BridgeError>> + Send;

    /// Queues a subscription for `topic`.
    fn subscribe(&mut self, topic: &str) -> Result<(), BridgeError>;

    /// Sends a clean DISCONNECT and closes the connection.
    fn disconnect(&mut self) -> impl Future<Output = ()> + Send;
}

/// [`BrokerSession`] backed by `rumqttc`.
pub struct RumqttSession {
    client: AsyncClient,
    eventloop: EventLoop,
    connected: bool,
}

impl RumqttSession {
    /// Builds the client; nothing touches the network until the first poll.
    pub fn new(config: &BridgeConfig) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(config.keep_alive);
        let (client, eventloop) = AsyncClient::new(options, config.channel_capacity);
        Self {
            client,
            eventloop,
            connected: false,
        }
    }
}

impl BrokerSession for RumqttSession {
    async fn next_event(&mut self) -> Result<BrokerEvent, BridgeError> {
        match self.eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                self.connected = true;
                Ok(BrokerEvent::Connected)
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => Ok(BrokerEvent::Message {
                topic: publish.topic,
                payload: publish.payload,
            }),
            Ok(Event::Incoming(Packet::Disconnect)) => {
                self.connected = false;
                Err(BridgeError::ConnectionLost(
                    "broker sent DISCONNECT".to_string(),
                ))
            }
            Ok(_) => Ok(BrokerEvent::Other),
            Err(e) => {
                self.connected = false;
                Err(BridgeError::ConnectionLost(e.to_string()))
            }
        }
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), BridgeError> {
        self.client
            .try_subscribe(topic, QoS::AtMostOnce)
            .map_err(|e| BridgeError::Subscribe {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }

    async fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        if let Err(e) = self.client.try_disconnect() {
            log::warn!("Failed to queue MQTT disconnect: {}", e);
            return;
        }

        let eventloop = &mut self.eventloop;
        let flush = async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        if tokio::time::timeout(DISCONNECT_TIMEOUT, flush).await.is_err() {
            log::warn!("MQTT disconnect was not flushed within {:?}", DISCONNECT_TIMEOUT);
        }
        self.connected = false;
    }
}

/// # Message Bridge
///
/// Owns the write side of the status record. Build it with the shared record,
/// then [`start`](MessageBridge::start) it to get a [`BridgeHandle`].
pub struct MessageBridge {
    config: BridgeConfig,
    record: Arc<StatusRecord>,
}

impl MessageBridge {
    /// Creates a bridge that will write into `record`.
    pub fn new(config: BridgeConfig, record: Arc<StatusRecord>) -> Self {
        Self { config, record }
    }

    /// Connects to the configured broker with `rumqttc` and starts the bridge task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> BridgeHandle {
        let session = RumqttSession::new(&self.config);
        self.start_with(session)
    }

    /// Starts the bridge task over an arbitrary session.
    pub fn start_with<S>(self, session: S) -> BridgeHandle
    where
        S: BrokerSession + 'static,
    {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (state_tx, state_rx) = watch::channel(BridgeState::Disconnected);

        log::info!(
            "Connecting to MQTT broker {}:{} as {} (keep-alive {}s)",
            self.config.host,
            self.config.port,
            self.config.client_id,
            self.config.keep_alive.as_secs()
        );

        let worker = BridgeWorker {
            session,
            router: TopicRouter::new(
                self.config.status_topic.clone(),
                self.config.lastchange_topic.clone(),
            ),
            record: self.record,
            state: state_tx,
            reconnect_delay: self.config.reconnect_delay,
        };
        let task = tokio::spawn(worker.run(shutdown_rx));

        BridgeHandle {
            shutdown: shutdown_tx,
            task,
            state: state_rx,
        }
    }
}

/// Handle of a running bridge.
///
/// [`stop`](BridgeHandle::stop) consumes the handle, so a bridge can be stopped
/// at most once. Dropping the handle without stopping also shuts the task down.
pub struct BridgeHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
    state: watch::Receiver<BridgeState>,
}

impl BridgeHandle {
    /// Current connection state.
    pub fn state(&self) -> BridgeState {
        *self.state.borrow()
    }

    /// A receiver that is notified on every state transition.
    pub fn watch_state(&self) -> watch::Receiver<BridgeState> {
        self.state.clone()
    }

    /// Disconnects cleanly and waits for the task to finish.
    ///
    /// Never triggers a reconnect. If the task does not finish within
    /// [`STOP_TIMEOUT`] it is aborted.
    pub async fn stop(self) -> Result<(), BridgeError> {
        let BridgeHandle {
            shutdown, mut task, ..
        } = self;

        // The task may already be gone; joining below reports how it ended.
        let _ = shutdown.send(());

        match tokio::time::timeout(STOP_TIMEOUT, &mut task).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(BridgeError::TaskFailed(e.to_string())),
            Err(_) => {
                task.abort();
                Err(BridgeError::StopTimeout(STOP_TIMEOUT))
            }
        }
    }
}

struct BridgeWorker<S> {
    session: S,
    router: TopicRouter,
    record: Arc<StatusRecord>,
    state: watch::Sender<BridgeState>,
    reconnect_delay: Duration,
}

impl<S: BrokerSession> BridgeWorker<S> {
    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        loop {
            let event = tokio::select! {
                _ = &mut shutdown => break,
                event = self.session.next_event() => event,
            };

            match event {
                Ok(event) => self.handle_event(event),
                Err(e) => {
                    log::warn!(
                        "{}. Reconnecting in {}ms...",
                        e,
                        self.reconnect_delay.as_millis()
                    );
                    self.state.send_replace(BridgeState::Disconnected);
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(self.reconnect_delay) => {}
                    }
                }
            }
        }

        log::info!("MQTT bridge shutting down...");
        self.session.disconnect().await;
        self.state.send_replace(BridgeState::Stopped);
        log::info!("MQTT bridge stopped.");
    }

    fn handle_event(&mut self, event: BrokerEvent) {
        match event {
            BrokerEvent::Connected => {
                log::info!("Connected to MQTT broker");
                self.state.send_replace(BridgeState::Connected);
                for topic in self.router.topics() {
                    log::info!("Subscribing to topic {}", topic);
                    if let Err(e) = self.session.subscribe(topic) {
                        log::error!("{}", e);
                    }
                }
            }
            BrokerEvent::Message { topic, payload } => {
                log::debug!(
                    "Message received on topic {}: {}",
                    topic,
                    String::from_utf8_lossy(&payload)
                );
                match self.router.route(&topic, &payload) {
                    Ok(update) => update.apply(&self.record),
                    Err(e @ BridgeError::UnrecognizedTopic(_)) => log::debug!("Ignoring {}", e),
                    Err(e) => log::warn!("{}; keeping previous value", e),
                }
            }
            BrokerEvent::Other => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_deployment_conventions() {
        let config = BridgeConfig::default();
        assert_eq!(config.host, "mqtt");
        assert_eq!(config.port, 1883);
        assert_eq!(config.keep_alive, Duration::from_secs(60));
        assert_eq!(config.status_topic, "status");
        assert_eq!(config.lastchange_topic, "lastchange");
        assert!(config.client_id.starts_with("spaceapi-"));
    }

    #[tokio::test]
    async fn rumqtt_session_disconnect_without_connection_is_a_no_op() {
        let mut session = RumqttSession::new(&BridgeConfig::default());
        tokio::time::timeout(Duration::from_millis(100), session.disconnect())
            .await
            .unwrap();
    }
}
