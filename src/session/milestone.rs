use chrono::Duration;

/// Banner threshold. A notification fires each time the displayed total
/// crosses another multiple of this many minutes.
pub const MILESTONE_MINUTES: i64 = 5;

/// Decides when the elapsed total has earned a banner. Whole minutes only,
/// and every milestone fires at most once per run: restarting the watcher
/// re-announces the current multiple, which is accepted.
pub struct MilestoneTracker {
    last_notified: i64,
}

impl MilestoneTracker {
    pub fn new() -> Self {
        Self { last_notified: 0 }
    }

    /// Returns the crossed multiple of [MILESTONE_MINUTES], if any. Skipped
    /// multiples are not announced retroactively: jumping from 4 to 16
    /// minutes stays silent until 20.
    pub fn check(&mut self, elapsed: Duration) -> Option<i64> {
        let minutes = elapsed.num_minutes();
        if minutes > 0 && minutes % MILESTONE_MINUTES == 0 && minutes > self.last_notified {
            self.last_notified = minutes;
            return Some(minutes);
        }
        None
    }
}

impl Default for MilestoneTracker {
    fn default() -> Self {
        Self::new()
    }
}
