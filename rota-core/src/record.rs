//! Roster records and the six collections that hold them.
//!
//! Records are opaque JSON objects as far as synchronization is concerned:
//! only the `id`, the collection a record belongs to, and a handful of known
//! date fields are ever inspected.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The six record collections of a roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Staff,
    RecurringSchedules,
    LeaveRequests,
    OneOffShifts,
    OnCallAssignments,
    NurseOnCallAssignments,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Staff,
        Collection::RecurringSchedules,
        Collection::LeaveRequests,
        Collection::OneOffShifts,
        Collection::OnCallAssignments,
        Collection::NurseOnCallAssignments,
    ];

    /// Key used for this collection in the snapshot wire format and on disk.
    pub fn key(&self) -> &'static str {
        match self {
            Collection::Staff => "staff",
            Collection::RecurringSchedules => "recurringSchedules",
            Collection::LeaveRequests => "leaveRequests",
            Collection::OneOffShifts => "oneOffShifts",
            Collection::OnCallAssignments => "onCallAssignments",
            Collection::NurseOnCallAssignments => "nurseOnCallAssignments",
        }
    }

    /// Snapshot format version that introduced this collection.
    pub fn since_version(&self) -> &'static str {
        match self {
            Collection::Staff | Collection::RecurringSchedules | Collection::LeaveRequests => "1.0",
            Collection::OneOffShifts | Collection::OnCallAssignments => "1.1",
            Collection::NurseOnCallAssignments => "2.0",
        }
    }

    /// Collections added after the first format may be absent from older
    /// snapshots and default to empty.
    pub fn may_be_absent(&self) -> bool {
        self.since_version() != "1.0"
    }

    /// Fields holding dates, converted to native values on load.
    pub fn date_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::Staff => &["createdAt", "updatedAt"],
            Collection::RecurringSchedules | Collection::LeaveRequests => {
                &["startDate", "endDate", "createdAt", "updatedAt"]
            }
            Collection::OneOffShifts
            | Collection::OnCallAssignments
            | Collection::NurseOnCallAssignments => &["date", "createdAt", "updatedAt"],
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A single roster record. Everything except `id` is carried verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Record {
            id: id.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Read a date-valued field as a native value.
    pub fn date(&self, key: &str) -> Option<TemporalValue> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .and_then(TemporalValue::parse)
    }
}

/// A date or instant read from a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalValue {
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl TemporalValue {
    /// Accepts RFC 3339 instants, naive `YYYY-MM-DDTHH:MM:SS[.f]` (read as
    /// UTC) and plain `YYYY-MM-DD` dates.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(TemporalValue::DateTime(dt.with_timezone(&Utc)));
        }

        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(TemporalValue::DateTime(naive.and_utc()));
        }

        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .map(TemporalValue::Date)
    }

    /// Canonical wire form.
    pub fn to_wire(&self) -> String {
        match self {
            TemporalValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            TemporalValue::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// The six record sequences carried by a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    #[serde(default)]
    pub staff: Vec<Record>,
    #[serde(default)]
    pub recurring_schedules: Vec<Record>,
    #[serde(default)]
    pub leave_requests: Vec<Record>,
    #[serde(default)]
    pub one_off_shifts: Vec<Record>,
    #[serde(default)]
    pub on_call_assignments: Vec<Record>,
    #[serde(default)]
    pub nurse_on_call_assignments: Vec<Record>,
}

impl Payload {
    pub fn collection(&self, collection: Collection) -> &[Record] {
        match collection {
            Collection::Staff => &self.staff,
            Collection::RecurringSchedules => &self.recurring_schedules,
            Collection::LeaveRequests => &self.leave_requests,
            Collection::OneOffShifts => &self.one_off_shifts,
            Collection::OnCallAssignments => &self.on_call_assignments,
            Collection::NurseOnCallAssignments => &self.nurse_on_call_assignments,
        }
    }

    pub fn collection_mut(&mut self, collection: Collection) -> &mut Vec<Record> {
        match collection {
            Collection::Staff => &mut self.staff,
            Collection::RecurringSchedules => &mut self.recurring_schedules,
            Collection::LeaveRequests => &mut self.leave_requests,
            Collection::OneOffShifts => &mut self.one_off_shifts,
            Collection::OnCallAssignments => &mut self.on_call_assignments,
            Collection::NurseOnCallAssignments => &mut self.nurse_on_call_assignments,
        }
    }

    /// Total number of records across all collections.
    pub fn len(&self) -> usize {
        Collection::ALL
            .iter()
            .map(|c| self.collection(*c).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
