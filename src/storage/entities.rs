use chrono::Duration;
use chrono::Utc;

use chrono::DateTime;
use serde::Deserialize;
use serde::Serialize;

use std::collections::BTreeMap;
use std::sync::Arc;

/// The whole persisted state: one record per domain, keyed by domain name.
/// Every storage operation reads or replaces this mapping as a unit, so the
/// last writer wins across concurrent watchers. Ordered keys keep the file
/// stable between rewrites.
pub type DomainTimers = BTreeMap<Arc<str>, DomainTimerRecord>;

/// Accumulated usage for one domain. `total_time` holds every closed session
/// for the current day, `session_start` anchors the session that is still
/// open. Field names and units (milliseconds) are part of the file format.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DomainTimerRecord {
    #[serde(with = "millis_ser")]
    pub total_time: Duration,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub session_start: DateTime<Utc>,
    pub date: String,
}

impl DomainTimerRecord {
    /// A zeroed record anchored at `now`, attributed to the day `today`.
    pub fn fresh(now: DateTime<Utc>, today: String) -> Self {
        Self {
            total_time: Duration::zero(),
            session_start: now,
            date: today,
        }
    }

    /// A record belongs to exactly one calendar day. Once the key stops
    /// matching, the accumulated time must not leak into the new day.
    pub fn is_stale(&self, today: &str) -> bool {
        self.date != today
    }

    /// Time the currently open session has been running.
    pub fn open_session_elapsed(&self, now: DateTime<Utc>) -> Duration {
        now - self.session_start
    }
}

mod millis_ser {
    use chrono::Duration;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_milliseconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = i64::deserialize(deserializer)?;
        let duration = Duration::milliseconds(ms);
        Ok(duration)
    }
}
