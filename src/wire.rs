//! Wire formats shared by the todo, subtask and calendar endpoints.

use std::{fmt, str::FromStr};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize};

time::serde::format_description!(pub ymd, Date, "[year]-[month]-[day]");

/// Row identifier taken from a request.
///
/// Clients send ids either as JSON numbers or as decimal strings. Both are
/// accepted; floats, signs, blanks and zero are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    pub fn get(self) -> i64 {
        self.0
    }
}

#[derive(Debug, thiserror::Error)]
#[error("expected a positive integer id")]
pub struct InvalidId;

impl FromStr for RecordId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidId);
        }
        match s.parse::<i64>() {
            Ok(n) if n > 0 => Ok(RecordId(n)),
            _ => Err(InvalidId),
        }
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl<'de> de::Visitor<'de> for IdVisitor {
            type Value = RecordId;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a positive integer or a string of digits")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<RecordId, E> {
                match i64::try_from(v) {
                    Ok(n) if n > 0 => Ok(RecordId(n)),
                    _ => Err(E::custom(InvalidId)),
                }
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<RecordId, E> {
                if v > 0 {
                    Ok(RecordId(v))
                } else {
                    Err(E::custom(InvalidId))
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<RecordId, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

lazy_static! {
    static ref TIME_OF_DAY: Regex = Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").unwrap();
}

fn parse_time<E: de::Error>(raw: Option<String>) -> Result<Option<String>, E> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(t) if TIME_OF_DAY.is_match(t) => Ok(Some(t.to_string())),
        Some(t) => Err(E::custom(format!("invalid time {t:?}, expected HH:MM"))),
    }
}

/// Optional `HH:MM`; empty string and `null` mean "no time".
pub fn time_of_day<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    parse_time(Option::<String>::deserialize(d)?)
}

/// Like [`time_of_day`] for partial updates: the outer `None` (field absent,
/// via `#[serde(default)]`) keeps the stored value, `Some(None)` clears it.
pub fn time_of_day_update<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Option<String>>, D::Error> {
    time_of_day(d).map(Some)
}
