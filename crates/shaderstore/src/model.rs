//! JSON-facing shapes of the chapter/exercise listing. Field names follow the
//! browser client's expectations (`createdAt`, `hasVertex`), and maps are
//! ordered so repeated listings of the same tree serialize identically.
use std::collections::BTreeMap;
use std::fs::Metadata;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const FRAGMENT_FILE: &str = "fragment.glsl";
pub const VERTEX_FILE: &str = "vertex.glsl";

/// Chapter id to chapter, exactly as returned by the listing endpoint.
pub type Structure = BTreeMap<String, Chapter>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub name: String,
    pub exercises: BTreeMap<String, Exercise>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub name: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub has_vertex: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Birth time when the filesystem records one, modification time otherwise.
pub fn creation_time(metadata: &Metadata) -> SystemTime {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .unwrap_or(UNIX_EPOCH)
}

/// ISO-8601 in UTC with millisecond precision, e.g. `2024-03-01T10:20:30.123Z`.
pub fn format_timestamp(time: SystemTime) -> String {
    let datetime: DateTime<Utc> = time.into();
    datetime.to_rfc3339_opts(SecondsFormat::Millis, true)
}
