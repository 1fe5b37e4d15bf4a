//! The rumqttc-backed bridge against a minimal MQTT 3.1.1 broker on loopback.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use lib_common::core::StatusRecord;
use lib_common::ingestors::{BridgeConfig, BridgeState, MessageBridge};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const WAIT: Duration = Duration::from_secs(5);

const CONNECT: u8 = 0x10;
const CONNACK: [u8; 4] = [0x20, 0x02, 0x00, 0x00];
const PUBLISH_QOS0: u8 = 0x30;
const SUBSCRIBE: u8 = 0x82;
const SUBACK: u8 = 0x90;
const DISCONNECT: u8 = 0xE0;

/// Reads one control packet: fixed header byte and body.
async fn read_packet(stream: &mut TcpStream) -> io::Result<(u8, Vec<u8>)> {
    let header = stream.read_u8().await?;
    let mut remaining = 0usize;
    let mut shift = 0;
    loop {
        let byte = stream.read_u8().await?;
        remaining |= usize::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    let mut body = vec![0; remaining];
    stream.read_exact(&mut body).await?;
    Ok((header, body))
}

/// Accepts the bridge, answers CONNECT, and acknowledges its two
/// subscriptions. Returns the stream and the subscribed topics in order.
async fn accept_session(listener: &TcpListener) -> (TcpStream, Vec<String>) {
    let (mut stream, _) = tokio::time::timeout(WAIT, listener.accept())
        .await
        .expect("bridge did not connect")
        .unwrap();

    let (header, _) = tokio::time::timeout(WAIT, read_packet(&mut stream))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header, CONNECT);
    stream.write_all(&CONNACK).await.unwrap();

    let mut topics = Vec::new();
    while topics.len() < 2 {
        let (header, body) = tokio::time::timeout(WAIT, read_packet(&mut stream))
            .await
            .expect("bridge did not subscribe")
            .unwrap();
        assert_eq!(header, SUBSCRIBE);

        // packet id (2), topic length (2), topic, requested QoS (1)
        let topic_len = usize::from(u16::from_be_bytes([body[2], body[3]]));
        topics.push(String::from_utf8(body[4..4 + topic_len].to_vec()).unwrap());
        stream
            .write_all(&[SUBACK, 0x03, body[0], body[1], 0x00])
            .await
            .unwrap();
    }
    (stream, topics)
}

async fn publish(stream: &mut TcpStream, topic: &str, payload: &str) {
    let remaining = 2 + topic.len() + payload.len();
    let mut packet = vec![PUBLISH_QOS0, u8::try_from(remaining).unwrap()];
    packet.extend_from_slice(&u16::try_from(topic.len()).unwrap().to_be_bytes());
    packet.extend_from_slice(topic.as_bytes());
    packet.extend_from_slice(payload.as_bytes());
    stream.write_all(&packet).await.unwrap();
}

async fn eventually(condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn reconnects_resubscribes_and_disconnects_cleanly_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let record = Arc::new(StatusRecord::default());
    let config = BridgeConfig {
        host: "127.0.0.1".to_string(),
        port,
        reconnect_delay: Duration::from_millis(50),
        ..BridgeConfig::default()
    };
    let handle = MessageBridge::new(config, Arc::clone(&record)).start();

    let (mut first, topics) = accept_session(&listener).await;
    assert_eq!(topics, ["status", "lastchange"]);
    publish(&mut first, "status", "false").await;
    assert!(eventually(|| !record.is_open()).await);

    // Broker goes away without a DISCONNECT.
    drop(first);

    let (mut second, topics) = accept_session(&listener).await;
    assert_eq!(topics, ["status", "lastchange"]);
    assert!(!record.is_open(), "state survives the reconnect");

    publish(&mut second, "lastchange", "1700000000").await;
    publish(&mut second, "lastchange", "not-a-number").await;
    publish(&mut second, "status", "true").await;
    assert!(eventually(|| record.is_open()).await);
    assert_eq!(record.last_change(), 1_700_000_000);
    assert_eq!(handle.state(), BridgeState::Connected);

    let stop = tokio::spawn(handle.stop());
    let (header, _) = tokio::time::timeout(WAIT, read_packet(&mut second))
        .await
        .expect("no DISCONNECT on stop")
        .unwrap();
    assert_eq!(header, DISCONNECT);
    stop.await.unwrap().unwrap();

    assert!(
        tokio::time::timeout(Duration::from_millis(300), listener.accept())
            .await
            .is_err(),
        "no reconnect after stop"
    );
}
