// src/scheduler/schedule.rs

use chrono::{Days, NaiveDateTime, NaiveTime};

/// "Every day at HH:MM" in local wall-clock time.
///
/// The next run is today at `run_at` while that is still ahead, otherwise
/// tomorrow. Once a poll finds the run due, [`advance`](Self::advance) moves
/// it to the first slot strictly after the poll time, so a late poll fires
/// once and never catches up on missed days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    run_at: NaiveTime,
    next_run: NaiveDateTime,
}

impl DailySchedule {
    pub fn new(run_at: NaiveTime, now: NaiveDateTime) -> Self {
        Self {
            run_at,
            next_run: next_slot_after(run_at, now),
        }
    }

    pub fn run_at(&self) -> NaiveTime {
        self.run_at
    }

    pub fn next_run(&self) -> NaiveDateTime {
        self.next_run
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        now >= self.next_run
    }

    pub fn advance(&mut self, now: NaiveDateTime) {
        self.next_run = next_slot_after(self.run_at, now);
    }
}

fn next_slot_after(run_at: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(run_at);
    if today > now {
        return today;
    }
    // Saturates at the end of chrono's calendar, far beyond any real run.
    now.date()
        .checked_add_days(Days::new(1))
        .map_or(today, |tomorrow| tomorrow.and_time(run_at))
}
