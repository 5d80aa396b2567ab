//! Platform command encoding tests.

use std::net::SocketAddr;

use omni_protocol::{
    Command, CommandKind, ConnectionSession, DeviceLookup, DeviceSession, Encoder, FixedClock,
    ProtocolConfig, ProtocolError,
};

// 2024-03-22 22:21:40 UTC
const NOW: i64 = 1_711_146_100;

struct SingleDevice;

impl DeviceLookup for SingleDevice {
    fn resolve(&self, _remote: Option<SocketAddr>, unique_id: &str) -> Option<DeviceSession> {
        (unique_id == "862205059172132").then(|| DeviceSession {
            device_id: 1,
            unique_id: unique_id.to_string(),
        })
    }

    fn unique_id(&self, device_id: u64) -> Option<String> {
        (device_id == 1).then(|| "862205059172132".to_string())
    }
}

fn encoder() -> Encoder<FixedClock> {
    Encoder::with_clock(ProtocolConfig::default(), FixedClock::at(0, NOW).unwrap())
}

fn encode_text(command: &Command) -> Option<String> {
    encoder()
        .encode(command, &SingleDevice, None)
        .expect("encodes")
        .map(|bytes| {
            assert_eq!(&bytes[..2], &[0xFF, 0xFF]);
            String::from_utf8(bytes[2..].to_vec()).unwrap()
        })
}

#[test]
fn test_position_single() {
    let text = encode_text(&Command::new(1, CommandKind::PositionSingle)).unwrap();
    assert_eq!(text, "*CMDS,OM,862205059172132,240322222140,D0#<LF>\n");
}

#[test]
fn test_position_periodic() {
    let text = encode_text(&Command::position_periodic(1, 30)).unwrap();
    assert_eq!(text, "*CMDS,OM,862205059172132,240322222140,D1,30#<LF>\n");
}

#[test]
fn test_custom_body_is_verbatim() {
    let text = encode_text(&Command::custom(1, "S5")).unwrap();
    assert_eq!(text, "*CMDS,OM,862205059172132,240322222140,S5#<LF>\n");
}

#[test]
fn test_engine_stop_records_pending_command() {
    let mut connection = ConnectionSession::new(None);
    let bytes = encoder()
        .encode(
            &Command::new(1, CommandKind::EngineStop),
            &SingleDevice,
            Some(&mut connection),
        )
        .unwrap()
        .expect("sentence");

    assert_eq!(
        String::from_utf8(bytes[2..].to_vec()).unwrap(),
        "*CMDS,OM,862205059172132,240322222140,L0,0,1234,1711146100#<LF>\n"
    );
    assert_eq!(connection.pending_command(), Some(&CommandKind::EngineStop));
}

#[test]
fn test_disarm_replaces_pending_command() {
    let mut connection = ConnectionSession::new(None);
    connection.set_pending_command(CommandKind::EngineStop);

    encoder()
        .encode(
            &Command::new(1, CommandKind::AlarmDisarm),
            &SingleDevice,
            Some(&mut connection),
        )
        .unwrap()
        .expect("sentence");
    assert_eq!(connection.pending_command(), Some(&CommandKind::AlarmDisarm));
}

#[test]
fn test_disarm_without_connection() {
    let text = encode_text(&Command::new(1, CommandKind::AlarmDisarm)).unwrap();
    assert!(text.contains(",L0,0,1234,1711146100#"));
}

#[test]
fn test_unlock_code_from_config() {
    let encoder = Encoder::with_clock(
        ProtocolConfig {
            unlock_code: "0000".to_string(),
            ..ProtocolConfig::default()
        },
        FixedClock::at(0, NOW).unwrap(),
    );
    let bytes = encoder
        .encode(&Command::new(1, CommandKind::EngineStop), &SingleDevice, None)
        .unwrap()
        .unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains(",L0,0,0000,1711146100#"));
}

#[test]
fn test_unsupported_commands_produce_nothing() {
    let mut connection = ConnectionSession::new(None);
    for kind in [
        CommandKind::EngineResume,
        CommandKind::AlarmArm,
        CommandKind::RebootDevice,
        CommandKind::Other("setTimezone".to_string()),
    ] {
        let result = encoder()
            .encode(&Command::new(1, kind), &SingleDevice, Some(&mut connection))
            .unwrap();
        assert_eq!(result, None);
    }
    assert!(connection.pending_command().is_none());
}

#[test]
fn test_missing_payloads() {
    let custom = Command::new(1, CommandKind::Custom);
    assert_eq!(
        encoder().encode(&custom, &SingleDevice, None),
        Err(ProtocolError::MissingCommandData("data"))
    );

    let periodic = Command::new(1, CommandKind::PositionPeriodic);
    assert_eq!(
        encoder().encode(&periodic, &SingleDevice, None),
        Err(ProtocolError::MissingCommandData("frequency"))
    );
}

#[test]
fn test_unknown_target_device() {
    let mut connection = ConnectionSession::new(None);
    let result = encoder().encode(
        &Command::new(9, CommandKind::EngineStop),
        &SingleDevice,
        Some(&mut connection),
    );
    assert_eq!(result, Err(ProtocolError::UnknownDevice(9)));
    assert!(connection.pending_command().is_none());
}
