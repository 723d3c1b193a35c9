use crate::errors::ScheduleError;
use chrono::{DateTime, NaiveTime, TimeDelta, Utc};

/// A fixed set of UTC times-of-day at which funding settles, repeating daily.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementSchedule {
    // offsets from UTC midnight, ascending and unique
    offsets: Vec<TimeDelta>,
}

impl SettlementSchedule {
    /// Builds a schedule from whole UTC hours, e.g. `[0, 8, 16]`.
    pub fn from_hours(hours: &[u32]) -> Result<Self, ScheduleError> {
        if hours.is_empty() {
            return Err(ScheduleError::Empty);
        }

        if let Some(&bad) = hours.iter().find(|&&h| h >= 24) {
            return Err(ScheduleError::OutOfRange(bad));
        }

        let mut offsets: Vec<TimeDelta> = hours
            .iter()
            .map(|&h| TimeDelta::hours(i64::from(h)))
            .collect();
        offsets.sort();
        offsets.dedup();

        Ok(Self { offsets })
    }

    /// Earliest scheduled instant strictly after `now`. Rolls over to the
    /// first slot of the next UTC day once today's slots have all passed.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();

        self.offsets
            .iter()
            .map(|&offset| midnight + offset)
            .find(|&slot| slot > now)
            .unwrap_or_else(|| midnight + TimeDelta::days(1) + self.offsets[0])
    }
}
