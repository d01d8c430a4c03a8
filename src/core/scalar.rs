// Temporal casting for a fixed set of timestamp-bearing field names.
// Values that do not parse stay raw; casting a scalar never fails.
use crate::core::node::FieldValue;
use serde_json::{Number, Value};
use std::fmt;
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

pub const TEMPORAL_FIELDS: &[&str] = &[
    "created_at",
    "updated_at",
    "start_time",
    "end_time",
    "backdated_time",
    "issued_at",
    "expires_at",
];

const COMPACT_OFFSET_FORMAT: &str =
    "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]";
const COMPACT_FRACTION_FORMAT: &str =
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory][offset_minute]";
const SPACED_FORMAT: &str = "[year]-[month]-[day] [hour]:[minute]:[second]";

#[derive(Clone, Debug)]
pub struct Timestamp {
    at: OffsetDateTime,
    text: Option<String>,
}

impl Timestamp {
    pub fn from_unix(seconds: i64) -> Option<Self> {
        let at = OffsetDateTime::from_unix_timestamp(seconds).ok()?;
        Some(Self { at, text: None })
    }

    pub fn at(&self) -> OffsetDateTime {
        self.at
    }

    pub fn unix_timestamp(&self) -> i64 {
        self.at.unix_timestamp()
    }

    /// Renders back to ISO-8601. A timestamp cast from a string renders as
    /// that exact string; one cast from epoch seconds uses `YYYY-MM-DDTHH:MM:SS+HHMM`,
    /// with a seconds fraction when the epoch had one.
    pub fn to_iso8601(&self) -> String {
        if let Some(text) = &self.text {
            return text.clone();
        }
        format_compact(self.at)
    }

    fn parse(text: &str) -> Option<Self> {
        let at = parse_iso8601(text.trim())?;
        Some(Self {
            at,
            text: Some(text.to_string()),
        })
    }

    fn from_number(number: &Number) -> Option<Self> {
        if let Some(seconds) = number.as_i64() {
            return Self::from_unix(seconds);
        }
        let seconds = number.as_f64()?;
        if !seconds.is_finite() {
            return None;
        }
        let whole = seconds.floor();
        let fraction = ((seconds - whole) * 1_000_000_000.0).round() as i128;
        let nanos = (whole as i128) * 1_000_000_000 + fraction;
        let at = OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?;
        Some(Self { at, text: None })
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

pub fn is_temporal_field(field_name: &str) -> bool {
    TEMPORAL_FIELDS.contains(&field_name)
}

pub fn cast_scalar(field_name: &str, raw: &Value) -> FieldValue {
    if is_temporal_field(field_name) {
        let cast = match raw {
            Value::Number(number) => Timestamp::from_number(number),
            Value::String(text) => Timestamp::parse(text),
            _ => None,
        };
        if let Some(timestamp) = cast {
            return FieldValue::Timestamp(timestamp);
        }
    }
    FieldValue::Raw(raw.clone())
}

pub fn is_iso8601(text: &str) -> bool {
    parse_iso8601(text.trim()).is_some()
}

fn parse_iso8601(text: &str) -> Option<OffsetDateTime> {
    if text.is_empty() {
        return None;
    }
    if let Ok(at) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(at);
    }
    if let Ok(at) = OffsetDateTime::parse(text, &Iso8601::DEFAULT) {
        return Some(at);
    }
    if let Ok(at) = PrimitiveDateTime::parse(text, &Iso8601::DEFAULT) {
        return Some(at.assume_utc());
    }
    if let Ok(date) = Date::parse(text, &Iso8601::DEFAULT) {
        return Some(date.midnight().assume_utc());
    }
    if let Some(at) = parse_with(text, COMPACT_OFFSET_FORMAT, true) {
        return Some(at);
    }
    if let Some(at) = parse_with(text, COMPACT_FRACTION_FORMAT, true) {
        return Some(at);
    }
    parse_with(text, SPACED_FORMAT, false)
}

fn parse_with(text: &str, description: &str, with_offset: bool) -> Option<OffsetDateTime> {
    let format = time::format_description::parse(description).ok()?;
    if with_offset {
        OffsetDateTime::parse(text, &format).ok()
    } else {
        PrimitiveDateTime::parse(text, &format)
            .ok()
            .map(PrimitiveDateTime::assume_utc)
    }
}

fn format_compact(at: OffsetDateTime) -> String {
    let fallback = || {
        at.to_offset(UtcOffset::UTC)
            .format(&Rfc3339)
            .unwrap_or_default()
    };
    let description = if at.nanosecond() == 0 {
        COMPACT_OFFSET_FORMAT
    } else {
        COMPACT_FRACTION_FORMAT
    };
    let Ok(format) = time::format_description::parse(description) else {
        return fallback();
    };
    at.format(&format).unwrap_or_else(|_| fallback())
}

#[cfg(test)]
mod tests {
    use super::{Timestamp, cast_scalar, is_iso8601};
    use crate::core::node::FieldValue;
    use serde_json::json;

    fn timestamp(value: FieldValue) -> Timestamp {
        match value {
            FieldValue::Timestamp(ts) => ts,
            other => panic!("expected timestamp, got {other:?}"),
        }
    }

    #[test]
    fn epoch_seconds_cast_for_allow_listed_fields() {
        let ts = timestamp(cast_scalar("created_at", &json!(1_500_000_000)));
        assert_eq!(ts.unix_timestamp(), 1_500_000_000);
        assert_eq!(ts.to_iso8601(), "2017-07-14T02:40:00+0000");
    }

    #[test]
    fn fractional_epoch_keeps_subseconds_through_rendering() {
        let ts = timestamp(cast_scalar("created_at", &json!(1_500_000_000.5)));
        assert_eq!(ts.at().nanosecond(), 500_000_000);
        let rendered = ts.to_iso8601();
        assert_eq!(rendered, "2017-07-14T02:40:00.5+0000");
        let recast = timestamp(cast_scalar("created_at", &json!(rendered)));
        assert_eq!(recast, ts);
        assert_eq!(recast.at().nanosecond(), 500_000_000);
    }

    #[test]
    fn iso_strings_round_trip_verbatim() {
        for text in [
            "2017-07-14T02:40:00+0000",
            "2017-07-14T02:40:00Z",
            "2017-07-14T05:40:00+03:00",
            "2017-07-14",
        ] {
            let ts = timestamp(cast_scalar("updated_at", &json!(text)));
            assert_eq!(ts.to_iso8601(), text);
        }
    }

    #[test]
    fn equivalent_instants_compare_equal() {
        let utc = timestamp(cast_scalar("start_time", &json!("2017-07-14T02:40:00Z")));
        let shifted = timestamp(cast_scalar("start_time", &json!("2017-07-14T05:40:00+03:00")));
        let epoch = timestamp(cast_scalar("start_time", &json!(1_500_000_000)));
        assert_eq!(utc, shifted);
        assert_eq!(utc, epoch);
    }

    #[test]
    fn other_fields_are_left_untouched() {
        assert_eq!(
            cast_scalar("name", &json!("2017-07-14T02:40:00Z")),
            FieldValue::Raw(json!("2017-07-14T02:40:00Z"))
        );
        assert_eq!(cast_scalar("likes", &json!(12)), FieldValue::Raw(json!(12)));
    }

    #[test]
    fn unparseable_values_stay_raw() {
        assert_eq!(
            cast_scalar("expires_at", &json!("next tuesday")),
            FieldValue::Raw(json!("next tuesday"))
        );
        assert_eq!(
            cast_scalar("expires_at", &json!(true)),
            FieldValue::Raw(json!(true))
        );
        assert_eq!(cast_scalar("expires_at", &json!(null)), FieldValue::Raw(json!(null)));
    }

    #[test]
    fn iso_detection_accepts_spaced_form() {
        assert!(is_iso8601("2020-02-29 23:59:59"));
        assert!(!is_iso8601("2020-02-30"));
        assert!(!is_iso8601(""));
    }
}
