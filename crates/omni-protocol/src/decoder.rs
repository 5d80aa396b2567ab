//! Sentence decoder.
//!
//! Turns one received line into a [`TelemetryUpdate`]. The update is seeded
//! with the device's last known fix and overlaid with whatever the sentence's
//! type carries. Some types also get an acknowledgement written back to the
//! device through the [`ReplySink`].
//!
//! Outcomes:
//! - `Ok(Some(update))`: the sentence produced telemetry.
//! - `Ok(None)`: discarded. Too few fields, unknown device, unknown type, or a
//!   type that carries nothing.
//! - `Err(_)`: a field was missing or malformed. The whole sentence is dropped,
//!   no partial telemetry and no reply.

use chrono::{NaiveTime, Utc};
use omni_metrics::{metric_defs, metrics, MetricLabels};

use crate::config::ProtocolConfig;
use crate::constants::{IDENTITY_INDEX, MIN_FIELDS, TYPE_CODE_INDEX};
use crate::cursor::FieldCursor;
use crate::encoder::build_reply;
use crate::error::{ProtocolError, ProtocolResult};
use crate::frame::Sentence;
use crate::message::MessageType;
use crate::session::{
    Clock, ConnectionSession, DeviceLookup, PositionProvider, ReplySink, SystemClock,
};
use crate::types::{Alarm, AttributeKey, TelemetryUpdate};

/// Collaborators a decode call needs.
pub struct DecodeContext<'a> {
    /// State of the connection the sentence arrived on.
    pub connection: &'a mut ConnectionSession,
    /// Device identity resolution.
    pub devices: &'a dyn DeviceLookup,
    /// Last known fixes.
    pub positions: &'a dyn PositionProvider,
    /// Where acknowledgements go.
    pub replies: &'a mut dyn ReplySink,
}

/// Decodes device sentences.
#[derive(Debug, Clone)]
pub struct Decoder<C = SystemClock> {
    config: ProtocolConfig,
    clock: C,
    labels: MetricLabels,
}

impl Decoder<SystemClock> {
    /// Create a decoder using the system clock.
    pub fn new(config: ProtocolConfig) -> Self {
        Decoder::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Decoder<C> {
    /// Create a decoder with an explicit clock.
    pub fn with_clock(config: ProtocolConfig, clock: C) -> Self {
        let labels = MetricLabels::new(config.protocol.clone());
        Decoder {
            config,
            clock,
            labels,
        }
    }

    /// Decoder settings.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Decode one received line.
    pub fn decode(
        &self,
        ctx: &mut DecodeContext<'_>,
        raw: &str,
    ) -> ProtocolResult<Option<TelemetryUpdate>> {
        log::debug!("received sentence: {}", raw);

        let sentence = Sentence::parse(raw);
        if sentence.fields().len() < MIN_FIELDS {
            self.discard("short");
            return Ok(None);
        }
        let fields = sentence.fields();
        let unique_id = fields[IDENTITY_INDEX];
        let type_code = fields[TYPE_CODE_INDEX];

        let Some(device) = ctx.devices.resolve(ctx.connection.remote(), unique_id) else {
            log::debug!("no device for unique id {}", unique_id);
            self.discard("unknown_device");
            return Ok(None);
        };

        let Some(message_type) = MessageType::from_code(type_code) else {
            log::trace!("ignoring type {} from {}", type_code, unique_id);
            self.discard("empty");
            return Ok(None);
        };

        metrics::counter!(
            metric_defs::DECODER_SENTENCES.name,
            &self.labels.with(&[("type_code", message_type.code().to_string())])
        )
        .increment(1);

        let now = self.clock.now();
        let mut update = TelemetryUpdate::seeded(
            device.device_id,
            self.config.protocol.as_str(),
            now.with_timezone(&Utc),
            ctx.positions.last_fix(device.device_id).unwrap_or_default(),
        );

        if let Err(err) = self.decode_body(message_type, &sentence, &mut update) {
            log::warn!("dropping {} sentence from {}: {}", message_type, unique_id, err);
            metrics::counter!(
                metric_defs::DECODER_ERRORS.name,
                &self.labels.with(&[("type_code", message_type.code().to_string())])
            )
            .increment(1);
            return Err(err);
        }

        if message_type == MessageType::UnlockResult {
            if let Some(pending) = ctx.connection.pending_command() {
                log::debug!("unlock result from {} answers pending {}", unique_id, pending);
            }
        }

        if let Some(body) = message_type.reply_body() {
            if self.config.send_replies {
                let reply = build_reply(fields, body, &now);
                log::debug!("replying to {}: {}", unique_id, body);
                ctx.replies.send(reply, ctx.connection.remote());
                metrics::counter!(
                    metric_defs::DECODER_REPLIES.name,
                    &self.labels.with(&[("type_code", message_type.code().to_string())])
                )
                .increment(1);
            }
        }

        if update.has_content() {
            Ok(Some(update))
        } else {
            self.discard("empty");
            Ok(None)
        }
    }

    fn discard(&self, reason: &'static str) {
        metrics::counter!(
            metric_defs::DECODER_DISCARDED.name,
            &self.labels.with(&[("reason", reason.to_string())])
        )
        .increment(1);
    }

    fn decode_body(
        &self,
        message_type: MessageType,
        sentence: &Sentence<'_>,
        update: &mut TelemetryUpdate,
    ) -> ProtocolResult<()> {
        let fields = sentence.fields();
        if fields.len() < message_type.leading_len() {
            return Err(ProtocolError::MissingField {
                type_code: message_type.code().to_string(),
                index: fields.len(),
                len: fields.len(),
            });
        }

        let mut cursor = FieldCursor::new(fields, message_type.body_start(), message_type.code());
        match message_type {
            MessageType::UnlockResult => {
                // 0 means the lock opened, anything else means it stayed shut
                let unlocked = cursor.next_int()? == 0;
                update.set(AttributeKey::Lock, !unlocked);
                update.set(AttributeKey::DriverUniqueId, cursor.next_str()?);
                update.set(
                    AttributeKey::Alarm,
                    if unlocked { Alarm::Unlock } else { Alarm::Lock },
                );
            }
            MessageType::Locked => {
                update.set(AttributeKey::DriverUniqueId, cursor.next_str()?);
                cursor.skip()?; // lock timestamp
                update.set(AttributeKey::DrivingTime, cursor.next_str()?);
                update.set(AttributeKey::Lock, true);
                update.set(AttributeKey::Alarm, Alarm::Lock);
            }
            MessageType::Ignition => {
                update.set(AttributeKey::Ignition, cursor.next_int()? > 1);
            }
            MessageType::ExternalLock | MessageType::BatteryLock => {}
            MessageType::Location => self.decode_location(&mut cursor, update)?,
            MessageType::Battery => {
                update.set(AttributeKey::Battery, cursor.next_int()? as f64 * 0.01);
                update.set(AttributeKey::BatteryLevel, cursor.next_int()?);
            }
            MessageType::Heartbeat => {
                update.set(AttributeKey::Lock, cursor.next_int()? == 1);
                update.set(AttributeKey::Battery, cursor.next_int()? as f64 * 0.01);
                update.set(AttributeKey::Rssi, cursor.next_int()?);
                update.set(AttributeKey::Status, cursor.next_int()?);
                update.set(AttributeKey::BatteryLevel, cursor.next_int()?);
            }
            MessageType::Status => {
                update.set(AttributeKey::Battery, cursor.next_int()? as f64 * 0.01);
                update.set(AttributeKey::Rssi, cursor.next_int()?);
                update.set(AttributeKey::Satellites, cursor.next_int()?);
                let locked = cursor.next_int()? == 1;
                update.set(AttributeKey::Lock, locked);
                update.set(
                    AttributeKey::Alarm,
                    if locked { Alarm::Locked } else { Alarm::Unlocked },
                );
                if let Some(alarm) = Alarm::from_fault_code(cursor.next_int()?) {
                    update.set(AttributeKey::Alarm, alarm);
                }
                update.set(AttributeKey::BatteryLevel, cursor.next_int()?);
            }
            MessageType::Alarm => {
                if let Some(alarm) = Alarm::from_fault_code(cursor.next_int()?) {
                    update.set(AttributeKey::Alarm, alarm);
                }
            }
            MessageType::RawResult(_) => {
                update.set(AttributeKey::Result, sentence.raw());
            }
        }

        log::trace!(
            "decoded {} through field {} of {}",
            message_type,
            cursor.position(),
            fields.len()
        );
        Ok(())
    }

    /// `D0`: time of day, validity, packed or decimal coordinates, then
    /// optional satellites, HDOP and altitude.
    fn decode_location(
        &self,
        cursor: &mut FieldCursor<'_>,
        update: &mut TelemetryUpdate,
    ) -> ProtocolResult<()> {
        let time = cursor.next_str()?;
        if time.is_empty() {
            return Ok(());
        }
        let rest = MessageType::Location.arity() - 1;
        if cursor.remaining() < rest {
            let len = cursor.position() + cursor.remaining();
            return Err(ProtocolError::MissingField {
                type_code: MessageType::Location.code().to_string(),
                index: len,
                len,
            });
        }
        let time_of_day = parse_time_of_day(time)?;
        // The sentence carries no date; the fix is taken to be from today (UTC)
        let fix_time = self
            .clock
            .now()
            .with_timezone(&Utc)
            .date_naive()
            .and_time(time_of_day)
            .and_utc();
        update.fix.time = fix_time;
        update.device_time = fix_time;
        update.outdated = false;

        let validity = cursor.next_str()?;
        let lat_index = cursor.position();
        let lat_text = cursor.next_str()?;
        let south = cursor.next_str()? == "S";
        let lon_index = cursor.position();
        let lon_text = cursor.next_str()?;
        let west = cursor.next_str()? == "W";
        let satellites = cursor.next_opt_int()?;
        let hdop = cursor.next_opt_f64()?;
        let altitude = cursor.next_opt_f64()?;

        if !validity.is_empty() {
            update.fix.valid = validity == "A";
        }
        if !lat_text.is_empty() && !lon_text.is_empty() {
            let lat = crate::cursor::parse_f64(lat_index, lat_text)?;
            let lon = crate::cursor::parse_f64(lon_index, lon_text)?;
            let (lat, lon) = normalize_coordinates(lat, lon);
            update.fix.latitude = if south { -lat } else { lat };
            update.fix.longitude = if west { -lon } else { lon };
        }
        if let Some(satellites) = satellites {
            update.set(AttributeKey::Satellites, satellites);
        }
        if let Some(hdop) = hdop {
            update.set(AttributeKey::Hdop, hdop);
        }
        if let Some(altitude) = altitude {
            update.fix.altitude = altitude;
        }
        Ok(())
    }
}

/// Parse the leading `HHMMSS` of a time field; fractional seconds are ignored.
fn parse_time_of_day(text: &str) -> ProtocolResult<NaiveTime> {
    let part = |range: std::ops::Range<usize>| -> ProtocolResult<u32> {
        text.get(range)
            .and_then(|digits| digits.parse().ok())
            .ok_or_else(|| ProtocolError::InvalidTime(text.to_string()))
    };
    let (hour, minute, second) = (part(0..2)?, part(2..4)?, part(4..6)?);
    NaiveTime::from_hms_opt(hour, minute, second)
        .ok_or_else(|| ProtocolError::InvalidTime(text.to_string()))
}

/// Convert coordinates to decimal degrees.
///
/// When either axis is out of decimal range both are taken to be packed
/// `DDDMM.MMMM` degrees-minutes. Hemisphere signs are applied by the caller.
pub fn normalize_coordinates(lat: f64, lon: f64) -> (f64, f64) {
    if lat > 90.0 || lon > 180.0 {
        (unpack_degrees_minutes(lat), unpack_degrees_minutes(lon))
    } else {
        (lat, lon)
    }
}

fn unpack_degrees_minutes(value: f64) -> f64 {
    let degrees = (value * 0.01).trunc();
    degrees + (value - degrees * 100.0) / 60.0
}
