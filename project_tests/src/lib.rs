//! # Project Test Support
//!
//! A scripted stand-in for the MQTT broker. `ScriptedSession` plays back a list
//! of broker events (connects, messages, connection drops) into a
//! `MessageBridge` and records what the bridge did in return, so lifecycle
//! tests can run without a broker.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use lib_common::ingestors::{BridgeError, BrokerEvent, BrokerSession};

/// Everything the bridge asked of the session so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionLog {
    /// Calls to `next_event`.
    pub polls: usize,
    /// Polls made while not connected, i.e. connect attempts.
    pub connect_attempts: usize,
    /// Topics subscribed, in order.
    pub subscriptions: Vec<String>,
    /// Calls to `disconnect`.
    pub disconnects: usize,
}

/// Scripted [`BrokerSession`]. Once the script runs out, `next_event` never
/// resolves, like a quiet but healthy connection.
pub struct ScriptedSession {
    script: VecDeque<Result<BrokerEvent, BridgeError>>,
    connected: bool,
    log: Arc<Mutex<SessionLog>>,
}

/// Read access to a [`ScriptedSession`]'s log after the session moved into the bridge.
#[derive(Clone)]
pub struct SessionProbe {
    log: Arc<Mutex<SessionLog>>,
}

impl ScriptedSession {
    /// Creates a session and the probe that observes it.
    pub fn new(
        script: impl IntoIterator<Item = Result<BrokerEvent, BridgeError>>,
    ) -> (Self, SessionProbe) {
        let log = Arc::new(Mutex::new(SessionLog::default()));
        let session = Self {
            script: script.into_iter().collect(),
            connected: false,
            log: Arc::clone(&log),
        };
        (session, SessionProbe { log })
    }

    fn with_log<R>(&self, f: impl FnOnce(&mut SessionLog) -> R) -> R {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut log)
    }
}

impl BrokerSession for ScriptedSession {
    async fn next_event(&mut self) -> Result<BrokerEvent, BridgeError> {
        let connected = self.connected;
        self.with_log(|log| {
            log.polls += 1;
            if !connected {
                log.connect_attempts += 1;
            }
        });

        let Some(step) = self.script.pop_front() else {
            return std::future::pending().await;
        };
        match &step {
            Ok(BrokerEvent::Connected) => self.connected = true,
            Err(_) => self.connected = false,
            Ok(_) => {}
        }
        tokio::task::yield_now().await;
        step
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), BridgeError> {
        self.with_log(|log| log.subscriptions.push(topic.to_string()));
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.connected = false;
        self.with_log(|log| log.disconnects += 1);
    }
}

impl SessionProbe {
    /// Copy of the current log.
    pub fn snapshot(&self) -> SessionLog {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Polls the log until `condition` holds or `timeout` expires.
    pub async fn wait_until(
        &self,
        timeout: Duration,
        condition: impl Fn(&SessionLog) -> bool,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if condition(&self.snapshot()) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

/// A successful (re)connection.
pub fn connected() -> Result<BrokerEvent, BridgeError> {
    Ok(BrokerEvent::Connected)
}

/// A message on `topic`.
pub fn message(topic: &str, payload: &str) -> Result<BrokerEvent, BridgeError> {
    Ok(BrokerEvent::Message {
        topic: topic.to_string(),
        payload: Bytes::copy_from_slice(payload.as_bytes()),
    })
}

/// A non-clean connection drop.
pub fn connection_lost(reason: &str) -> Result<BrokerEvent, BridgeError> {
    Err(BridgeError::ConnectionLost(reason.to_string()))
}
