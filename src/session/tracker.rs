use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, instrument};

use crate::{
    storage::{
        entities::{DomainTimerRecord, DomainTimers},
        store::TimerStore,
    },
    utils::{clock::Clock, time::local_day_key},
};

/// Drives the persisted record for a single domain. Every operation loads the
/// whole mapping fresh, touches only this domain's record, and writes the
/// whole mapping back. Concurrent watchers therefore race on the file, and
/// the last writer wins.
pub struct DomainTimer<S> {
    domain: Arc<str>,
    store: S,
    clock: Box<dyn Clock>,
}

impl<S: TimerStore> DomainTimer<S> {
    pub fn new(domain: Arc<str>, store: S, clock: Box<dyn Clock>) -> Self {
        Self {
            domain,
            store,
            clock,
        }
    }

    pub fn domain(&self) -> &Arc<str> {
        &self.domain
    }

    /// Opens a session anchored at now. Same-day records keep their
    /// accumulated total, a stale or missing record starts the day from zero.
    #[instrument(skip(self))]
    pub fn initialize_session(&mut self) -> DomainTimerRecord {
        let mut timers = self.store.load();
        let now = self.clock.time();
        let today = local_day_key(now);

        let record = match timers.get_mut(&*self.domain) {
            Some(record) if !record.is_stale(&today) => {
                record.session_start = now;
                record.clone()
            }
            _ => {
                debug!("Starting {} from zero for {today}", self.domain);
                let fresh = DomainTimerRecord::fresh(now, today);
                timers.insert(self.domain.clone(), fresh.clone());
                fresh
            }
        };

        self.store.save(&timers);
        record
    }

    /// Folds the open session into the total and re-anchors at now. Does not
    /// look at the calendar: a flush straddling midnight still credits the
    /// day the record was opened on. Rollover happens on the next
    /// [Self::initialize_session] or [Self::current_elapsed].
    #[instrument(skip(self))]
    pub fn flush(&mut self) -> Option<DomainTimerRecord> {
        let mut timers = self.store.load();
        let record = timers.get_mut(&*self.domain)?;

        let now = self.clock.time();
        record.total_time = record.total_time + record.open_session_elapsed(now);
        record.session_start = now;
        let record = record.clone();

        self.store.save(&timers);
        Some(record)
    }

    /// Total plus the open session, as of now. Noticing a stale record here
    /// resets it for the new day, which is what makes the display tick the
    /// rollover point even when nothing else touches the mapping.
    pub fn current_elapsed(&mut self) -> Duration {
        let timers: DomainTimers = self.store.load();
        let Some(record) = timers.get(&*self.domain) else {
            return Duration::zero();
        };

        let now = self.clock.time();
        if record.is_stale(&local_day_key(now)) {
            self.initialize_session();
            return Duration::zero();
        }

        record.total_time + record.open_session_elapsed(now)
    }
}
