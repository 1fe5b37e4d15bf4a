//! Broker messages in, SpaceAPI projections out.

use std::sync::Arc;
use std::time::Duration;

use lib_common::core::{SpaceApiDocument, StateIcon, StatusReader, StatusRecord};
use lib_common::ingestors::{BridgeConfig, MessageBridge};
use project_tests::{ScriptedSession, connected, message};

#[tokio::test]
async fn closed_status_and_lastchange_reach_every_projection() {
    let record = Arc::new(StatusRecord::default());
    let reader = StatusReader::new(Arc::clone(&record));
    let (session, probe) = ScriptedSession::new([
        connected(),
        message("status", "false"),
        message("lastchange", "1700000000"),
    ]);

    let handle = MessageBridge::new(BridgeConfig::default(), Arc::clone(&record)).start_with(session);
    assert!(
        probe
            .wait_until(Duration::from_secs(2), |log| log.polls == 4)
            .await
    );

    let state = reader.document().state;
    assert!(!state.open);
    assert_eq!(state.lastchange, 1_700_000_000);
    assert_eq!(
        state.icon,
        StateIcon {
            open: "https://www.netz39.de/open.png".to_string(),
            closed: "https://www.netz39.de/closed.png".to_string(),
        }
    );
    assert_eq!(reader.state_token(), "closed");
    assert_eq!(reader.select_payload(b"A".as_slice(), b"B".as_slice()), b"B");

    handle.stop().await.unwrap();

    // Stopping leaves the last known state readable.
    assert_eq!(reader.state_token(), "closed");
}

#[tokio::test]
async fn custom_topics_are_honoured() {
    let record = Arc::new(StatusRecord::default());
    let config = BridgeConfig {
        status_topic: "space/door/open".to_string(),
        lastchange_topic: "space/door/changed".to_string(),
        ..BridgeConfig::default()
    };
    let (session, probe) = ScriptedSession::new([
        connected(),
        message("status", "false"),
        message("space/door/changed", "42"),
    ]);

    let handle = MessageBridge::new(config, Arc::clone(&record)).start_with(session);
    assert!(
        probe
            .wait_until(Duration::from_secs(2), |log| log.polls == 4)
            .await
    );

    assert_eq!(
        probe.snapshot().subscriptions,
        vec!["space/door/open", "space/door/changed"]
    );
    assert!(record.is_open(), "default topic names are not subscribed");
    assert_eq!(record.last_change(), 42);

    handle.stop().await.unwrap();
}

#[test]
fn document_round_trips_through_json() {
    let record = StatusRecord::default();
    record.set_open(false);
    record.set_last_change(1_700_000_000);

    let json = serde_json::to_string(&record.snapshot()).unwrap();
    let parsed: SpaceApiDocument = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, record.snapshot());
    assert_eq!(parsed.issue_report_channels, vec!["email", "twitter", "ml"]);
}
