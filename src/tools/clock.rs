//! `get_datetime` tool.

use chrono::{DateTime, Local, TimeZone};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct DatetimeResponse {
    /// Current local time in RFC 3339 form.
    pub datetime: String,
}

pub fn now() -> DatetimeResponse {
    at(Local::now())
}

fn at<Tz: TimeZone>(instant: DateTime<Tz>) -> DatetimeResponse
where
    Tz::Offset: std::fmt::Display,
{
    DatetimeResponse {
        datetime: instant.to_rfc3339(),
    }
}
