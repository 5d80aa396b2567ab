//! Loopback tests running the gateway on an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use omni_gateway::{DeviceConfig, Gateway, GatewayConfig};
use omni_protocol::{Alarm, AttributeKey, Command, CommandKind, PositionProvider, TelemetryUpdate};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;

const IMEI: &str = "862205059172132";
const WAIT: Duration = Duration::from_secs(5);

fn config(max_sentence_len: usize) -> GatewayConfig {
    GatewayConfig {
        listen: "127.0.0.1:0".parse().unwrap(),
        max_sentence_len,
        devices: vec![DeviceConfig {
            id: 1,
            unique_id: IMEI.to_string(),
            name: Some("scooter-17".to_string()),
            last_fix: None,
        }],
        ..GatewayConfig::default()
    }
}

async fn start(
    config: GatewayConfig,
) -> (Arc<Gateway>, mpsc::Receiver<TelemetryUpdate>, SocketAddr) {
    start_with_capacity(config, 1024).await
}

async fn start_with_capacity(
    config: GatewayConfig,
    capacity: usize,
) -> (Arc<Gateway>, mpsc::Receiver<TelemetryUpdate>, SocketAddr) {
    let (gateway, updates) = Gateway::with_update_capacity(config, capacity);
    let listener = gateway.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(Arc::clone(&gateway).serve(listener));
    (gateway, updates, addr)
}

/// Read one outbound frame, up to and including its terminator.
async fn read_frame(stream: &mut TcpStream) -> Vec<u8> {
    let mut frame = Vec::new();
    let mut byte = [0u8; 1];
    while !frame.ends_with(b"<LF>\n") {
        let n = timeout(WAIT, stream.read(&mut byte)).await.unwrap().unwrap();
        assert_eq!(n, 1, "connection closed mid-frame");
        frame.push(byte[0]);
    }
    frame
}

async fn next_update(updates: &mut mpsc::Receiver<TelemetryUpdate>) -> TelemetryUpdate {
    timeout(WAIT, updates.recv()).await.unwrap().unwrap()
}

#[tokio::test]
async fn test_alarm_is_acknowledged_and_delivered() {
    let (_gateway, mut updates, addr) = start(config(1024)).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream
        .write_all(b"*CMDR,OM,862205059172132,000000000000,W0,3#<LF>\n")
        .await
        .unwrap();

    let reply = read_frame(&mut stream).await;
    assert_eq!(&reply[..2], &[0xFF, 0xFF]);
    let text = String::from_utf8(reply[2..].to_vec()).unwrap();
    assert!(text.starts_with("*CMDS,OM,862205059172132,"), "{}", text);
    assert!(text.ends_with(",Re,W0#<LF>\n"), "{}", text);
    let timestamp = text.split(',').nth(3).unwrap();
    assert_eq!(timestamp.len(), 12);

    let update = next_update(&mut updates).await;
    assert_eq!(update.device_id, 1);
    assert_eq!(update.protocol, "omni");
    assert_eq!(update.alarm(), Some(Alarm::Tampering));
}

#[tokio::test]
async fn test_commands_reach_the_bound_connection() {
    let (gateway, mut updates, addr) = start(config(1024)).await;

    assert!(!gateway
        .send_command(&Command::new(1, CommandKind::PositionSingle))
        .unwrap());

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"*CMDR,OM,862205059172132,000000000000,Q0,412,80#<LF>\n")
        .await
        .unwrap();
    let update = next_update(&mut updates).await;
    assert_eq!(update.get(AttributeKey::BatteryLevel).and_then(|v| v.as_i64()), Some(80));
    assert!(gateway.is_connected(1));

    assert!(gateway
        .send_command(&Command::new(1, CommandKind::PositionSingle))
        .unwrap());
    let frame = read_frame(&mut stream).await;
    let text = String::from_utf8_lossy(&frame[2..]).into_owned();
    assert!(text.starts_with("*CMDS,OM,862205059172132,"), "{}", text);
    assert!(text.ends_with(",D0#<LF>\n"), "{}", text);

    assert!(gateway
        .send_command(&Command::position_periodic(1, 30))
        .unwrap());
    let frame = read_frame(&mut stream).await;
    assert!(String::from_utf8_lossy(&frame).ends_with(",D1,30#<LF>\n"));

    assert!(!gateway
        .send_command(&Command::new(1, CommandKind::RebootDevice))
        .unwrap());
}

#[tokio::test]
async fn test_command_error_is_reported() {
    let (gateway, mut updates, addr) = start(config(1024)).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"*CMDR,OM,862205059172132,000000000000,Q0,412,80#")
        .await
        .unwrap();
    next_update(&mut updates).await;

    let missing_frequency = Command::new(1, CommandKind::PositionPeriodic);
    assert!(gateway.send_command(&missing_frequency).is_err());
}

#[tokio::test]
async fn test_location_refreshes_registry_fix() {
    let (gateway, mut updates, addr) = start(config(1024)).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream
        .write_all(
            b"*CMDR,OM,862205059172132,000000000000,D0,1,151644.000,A,0640.2063,S,03912.6205,E,10,0.83,,3.0,M,A#<LF>\n",
        )
        .await
        .unwrap();

    let update = next_update(&mut updates).await;
    assert!(!update.outdated);
    assert!(update.fix.valid);

    let fix = gateway.registry().last_fix(1).unwrap();
    assert_eq!(fix, update.fix);
    assert!(fix.latitude < 0.0);
}

#[tokio::test]
async fn test_oversized_garbage_does_not_stall_connection() {
    let (_gateway, mut updates, addr) = start(config(64)).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream.write_all(&[b'x'; 100]).await.unwrap();
    stream.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    stream
        .write_all(b"*CMDR,OM,862205059172132,000000000000,Q0,398,55#<LF>\n")
        .await
        .unwrap();

    let update = next_update(&mut updates).await;
    assert_eq!(update.get(AttributeKey::BatteryLevel).and_then(|v| v.as_i64()), Some(55));
}

#[tokio::test]
async fn test_disconnect_unbinds_device() {
    let (gateway, mut updates, addr) = start(config(1024)).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"*CMDR,OM,862205059172132,000000000000,Q0,412,80#")
        .await
        .unwrap();
    next_update(&mut updates).await;
    assert!(gateway.is_connected(1));

    drop(stream);
    timeout(WAIT, async {
        while gateway.is_connected(1) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_full_update_queue_does_not_block_replies() {
    let (_gateway, mut updates, addr) = start_with_capacity(config(1024), 1).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream
        .write_all(
            b"*CMDR,OM,862205059172132,000000000000,W0,3#<LF>\n\
              *CMDR,OM,862205059172132,000000000000,W0,2#<LF>\n\
              *CMDR,OM,862205059172132,000000000000,W0,1#<LF>\n",
        )
        .await
        .unwrap();

    for _ in 0..3 {
        let reply = read_frame(&mut stream).await;
        assert!(String::from_utf8_lossy(&reply).ends_with(",Re,W0#<LF>\n"));
    }

    let first = next_update(&mut updates).await;
    assert_eq!(first.alarm(), Some(Alarm::Tampering));
}
