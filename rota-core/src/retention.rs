//! Local retention guards: the advisory export counter and the time-gated
//! automatic local backup with bounded history.
//!
//! Both are plain state values. Callers load them from the local store, pass
//! them through these methods and save them back; nothing here touches the
//! remote backend.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RetentionSettings;
use crate::snapshot::Snapshot;

/// Number of local export files written since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportCounter {
    pub count: u32,
}

impl ExportCounter {
    /// True once `max` exports have been written; the next one should be
    /// confirmed by the user. Never blocks an export on its own.
    pub fn needs_confirmation(&self, max: u32) -> bool {
        self.count >= max
    }

    pub fn record_export(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoBackupPolicy {
    pub interval: Duration,
    pub history_cap: usize,
}

impl From<&RetentionSettings> for AutoBackupPolicy {
    fn from(settings: &RetentionSettings) -> Self {
        AutoBackupPolicy {
            interval: settings.auto_backup_interval,
            history_cap: settings.auto_backup_history,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoBackupLedger {
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub history: VecDeque<Snapshot>,
}

impl AutoBackupLedger {
    pub fn should_run_auto_backup(&self, policy: &AutoBackupPolicy, now: DateTime<Utc>) -> bool {
        let Some(last) = self.last_run_at else {
            return true;
        };

        let interval = TimeDelta::from_std(policy.interval).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(last) >= interval
    }

    /// Append `snapshot`, evicting the oldest entries beyond the cap.
    pub fn record_auto_backup(
        &mut self,
        snapshot: Snapshot,
        policy: &AutoBackupPolicy,
        now: DateTime<Utc>,
    ) {
        self.history.push_back(snapshot);
        while self.history.len() > policy.history_cap {
            self.history.pop_front();
        }
        self.last_run_at = Some(now);
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.history.back()
    }
}
