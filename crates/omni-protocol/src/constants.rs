//! Protocol constants for the Omni tracker sentence format.

// ============================================================================
// Framing
// ============================================================================

/// Start-of-payload marker.
pub const FRAME_START: char = '*';

/// End-of-payload marker.
pub const FRAME_END: char = '#';

/// Field separator inside a payload.
pub const FIELD_SEPARATOR: char = ',';

/// Two `0xFF` wake bytes that precede every outbound sentence.
pub const OUTBOUND_PREAMBLE: [u8; 2] = [0xFF, 0xFF];

/// Marker field of sentences sent from the server to the device.
pub const SERVER_MARKER: &str = "CMDS";

/// Sub-protocol marker used for platform-initiated commands.
pub const SUB_PROTOCOL: &str = "OM";

/// Terminator appended after the closing `#` of outbound sentences.
///
/// `<LF>` is the literal four-character token, followed by a real line feed.
pub const OUTBOUND_TERMINATOR: &str = "<LF>\n";

/// Timestamp format of outbound sentences (`yyMMddHHmmss`).
pub const TIMESTAMP_FORMAT: &str = "%y%m%d%H%M%S";

// ============================================================================
// Field positions
// ============================================================================

/// Index of the device identity field.
pub const IDENTITY_INDEX: usize = 2;

/// Index of the message type code.
pub const TYPE_CODE_INDEX: usize = 4;

/// First type-specific field.
pub const BODY_START_INDEX: usize = 5;

/// Sentences with this many fields or fewer are discarded without decoding.
pub const MIN_FIELDS: usize = TYPE_CODE_INDEX + 1;

// ============================================================================
// Fault codes (S5 / W0)
// ============================================================================

/// Illegal movement, reported by the platform as fatigue driving.
pub const FAULT_MOVEMENT_ILLEGAL: i64 = 1;
/// Vehicle has fallen over.
pub const FAULT_FALL_DOWN: i64 = 2;
/// Lock has been dismantled.
pub const FAULT_TAMPERING: i64 = 3;
/// Fall-down alarm cleared (vehicle lifted).
pub const FAULT_FALL_DOWN_CLEARED: i64 = 6;
/// Tampering alarm cleared (connection restored).
pub const FAULT_TAMPERING_CLEARED: i64 = 7;

// ============================================================================
// Defaults
// ============================================================================

/// Protocol name stamped on telemetry updates.
pub const DEFAULT_PROTOCOL_NAME: &str = "omni";

/// Code sent with the L0 unlock command.
pub const DEFAULT_UNLOCK_CODE: &str = "1234";
