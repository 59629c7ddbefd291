//! Versioned snapshot documents: the unit of transfer between local and
//! remote state.
//!
//! Wire form:
//!
//! ```json
//! {
//!   "formatVersion": "2.0",
//!   "createdAt": "2025-03-20T15:00:00Z",
//!   "data": { "staff": [...], "recurringSchedules": [...], ... }
//! }
//! ```

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::record::{Collection, Payload, Record, TemporalValue};

/// Version stamped on every snapshot this build writes.
pub const FORMAT_VERSION: &str = "2.0";

/// Versions this build knows how to reconcile.
pub const SUPPORTED_VERSIONS: &[&str] = &["1.0", "1.1", "2.0"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub format_version: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "data")]
    pub payload: Payload,
}

impl Snapshot {
    pub fn to_bytes(&self) -> SyncResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn is_version_supported(&self) -> bool {
        is_supported_version(&self.format_version)
    }
}

/// Build a snapshot of `payload` stamped with the current version and time.
pub fn encode(payload: Payload) -> Snapshot {
    encode_at(payload, Utc::now())
}

pub fn encode_at(payload: Payload, created_at: DateTime<Utc>) -> Snapshot {
    Snapshot {
        format_version: FORMAT_VERSION.to_string(),
        created_at,
        payload,
    }
}

pub fn is_version_supported(snapshot: &Snapshot) -> bool {
    snapshot.is_version_supported()
}

fn is_supported_version(version: &str) -> bool {
    SUPPORTED_VERSIONS.contains(&version)
}

fn malformed(reason: impl Into<String>) -> SyncError {
    SyncError::MalformedSnapshot(reason.into())
}

/// Parse and validate a snapshot document.
///
/// The version is checked before the payload so an unknown format is always
/// reported as [`SyncError::VersionUnsupported`], never as malformed.
pub fn decode(bytes: &[u8]) -> SyncResult<Snapshot> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| malformed(format!("not valid JSON: {e}")))?;

    let Value::Object(mut root) = value else {
        return Err(malformed("top level is not an object"));
    };

    let format_version = match root.get("formatVersion") {
        Some(Value::String(v)) => v.clone(),
        Some(_) => return Err(malformed("formatVersion is not a string")),
        None => return Err(malformed("missing formatVersion")),
    };

    if !is_supported_version(&format_version) {
        return Err(SyncError::VersionUnsupported(format_version));
    }

    let created_at = root
        .get("createdAt")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("missing createdAt"))?;
    let created_at = DateTime::parse_from_rfc3339(created_at)
        .map_err(|e| malformed(format!("createdAt is not a timestamp: {e}")))?
        .with_timezone(&Utc);

    let Some(Value::Object(mut data)) = root.remove("data") else {
        return Err(malformed("missing data object"));
    };

    let mut payload = Payload::default();

    for collection in Collection::ALL {
        match data.remove(collection.key()) {
            None | Some(Value::Null) if collection.may_be_absent() => {}
            None | Some(Value::Null) => {
                return Err(malformed(format!("missing {collection}")));
            }
            Some(Value::Array(items)) => {
                *payload.collection_mut(collection) = decode_records(collection, items)?;
            }
            Some(_) => return Err(malformed(format!("{collection} is not an array"))),
        }
    }

    Ok(Snapshot {
        format_version,
        created_at,
        payload,
    })
}

fn decode_records(collection: Collection, items: Vec<Value>) -> SyncResult<Vec<Record>> {
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        let id = match &item {
            Value::Object(obj) => match obj.get("id") {
                Some(Value::String(id)) if !id.is_empty() => id.clone(),
                _ => {
                    return Err(malformed(format!(
                        "{collection}[{index}] has no string id"
                    )));
                }
            },
            _ => return Err(malformed(format!("{collection}[{index}] is not an object"))),
        };

        if !seen.insert(id.clone()) {
            return Err(malformed(format!("{collection} contains duplicate id '{id}'")));
        }

        let record: Record = serde_json::from_value(item)
            .map_err(|e| malformed(format!("{collection}[{index}]: {e}")))?;
        records.push(record);
    }

    Ok(records)
}

/// Convert the known date fields of every record to canonical temporal form.
///
/// Values that do not parse as a date are left untouched.
pub fn hydrate_dates(payload: &mut Payload) {
    for collection in Collection::ALL {
        let fields = collection.date_fields();

        for record in payload.collection_mut(collection) {
            for field in fields {
                let Some(Value::String(raw)) = record.fields.get_mut(*field) else {
                    continue;
                };

                match TemporalValue::parse(raw) {
                    Some(value) => *raw = value.to_wire(),
                    None => debug!(
                        %collection,
                        id = %record.id,
                        field,
                        "leaving unparseable date value as-is"
                    ),
                }
            }
        }
    }
}
