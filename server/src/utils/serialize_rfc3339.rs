use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serializer;

/// Serializes an optional timestamp as RFC 3339 in UTC, `null` when missing.
pub fn option_serialize_rfc3339<S>(
    dt: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let Some(dt) = dt else {
        return serializer.serialize_none();
    };
    serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, false))
}
