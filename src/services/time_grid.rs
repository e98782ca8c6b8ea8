use chrono::{DateTime, Duration, Utc};

use crate::models::schedule::FreeRange;
use crate::services::schedule_utils::{day_index, minutes_from_midnight, SLOT_MINUTES};

pub const DAYS_PER_WEEK: usize = 7;

/// The weekly occupancy grid: 7 days of 15-minute slots between the day's
/// start and end hour. A short-lived value rebuilt for every scheduling
/// call; never shared between calls.
#[derive(Debug, Clone)]
pub struct TimeGrid {
    week_start: DateTime<Utc>,
    start_hour: u32,
    end_hour: u32,
    slots_per_day: usize,
    occupied: Vec<Vec<bool>>,
}

impl TimeGrid {
    /// `week_start` must sit on a midnight boundary (request validation
    /// guarantees this before a grid is built).
    pub fn new(week_start: DateTime<Utc>, start_hour: u32, end_hour: u32) -> Self {
        let day_minutes = (end_hour as i64 - start_hour as i64) * 60;
        let slots_per_day = (((day_minutes + SLOT_MINUTES - 1) / SLOT_MINUTES).max(1)) as usize;
        Self {
            week_start,
            start_hour,
            end_hour,
            slots_per_day,
            occupied: vec![vec![false; slots_per_day]; DAYS_PER_WEEK],
        }
    }

    pub fn week_start(&self) -> DateTime<Utc> {
        self.week_start
    }

    pub fn start_hour(&self) -> u32 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u32 {
        self.end_hour
    }

    pub fn slots_per_day(&self) -> usize {
        self.slots_per_day
    }

    pub fn day_of(&self, instant: DateTime<Utc>) -> i64 {
        day_index(instant, self.week_start)
    }

    fn day_start_minute(&self) -> i64 {
        self.start_hour as i64 * 60
    }

    /// Mark `[start_min, end_min)` (minutes from midnight) occupied on one
    /// day. The range is clipped to the day window; the start slot floors
    /// and the end slot ceils onto the 15-minute grid. Out-of-window days
    /// are ignored, they cannot affect the current week.
    pub fn mark_range(&mut self, day: i64, start_min: i64, end_min: i64) {
        if !(0..DAYS_PER_WEEK as i64).contains(&day) {
            return;
        }
        let limit = self.slots_per_day as i64;
        let start_slot = ((start_min - self.day_start_minute()) / SLOT_MINUTES).clamp(0, limit);
        let end_slot =
            ((end_min - self.day_start_minute() + SLOT_MINUTES - 1) / SLOT_MINUTES).clamp(0, limit);
        for slot in start_slot..end_slot {
            self.occupied[day as usize][slot as usize] = true;
        }
    }

    /// Occupy everything at or before `now`: full days strictly before
    /// now's day, and on now's own day every slot up to and including the
    /// one containing the current minute.
    pub fn mark_past(&mut self, now: DateTime<Utc>) {
        let now_day = self.day_of(now);
        for day in 0..DAYS_PER_WEEK as i64 {
            if day < now_day {
                for slot in self.occupied[day as usize].iter_mut() {
                    *slot = true;
                }
            } else if day == now_day {
                let now_min = minutes_from_midnight(now);
                let cutoff = ((now_min - self.day_start_minute() + SLOT_MINUTES - 1)
                    / SLOT_MINUTES)
                    .clamp(0, self.slots_per_day as i64);
                for slot in 0..cutoff {
                    self.occupied[day as usize][slot as usize] = true;
                }
            }
        }
    }

    pub fn is_run_free(&self, day: usize, start_slot: usize, len: usize) -> bool {
        if day >= DAYS_PER_WEEK || start_slot + len > self.slots_per_day {
            return false;
        }
        self.occupied[day][start_slot..start_slot + len]
            .iter()
            .all(|slot| !slot)
    }

    pub fn mark_run(&mut self, day: usize, start_slot: usize, len: usize) {
        for slot in self.occupied[day][start_slot..start_slot + len].iter_mut() {
            *slot = true;
        }
    }

    /// Absolute instant of a slot boundary on a given day.
    pub fn instant_at(&self, day: usize, slot: usize) -> DateTime<Utc> {
        self.week_start
            + Duration::days(day as i64)
            + Duration::minutes(self.day_start_minute() + slot as i64 * SLOT_MINUTES)
    }

    /// Convert a whole-hour window of the day to clamped slot bounds.
    pub fn hour_window_slots(&self, start_h: u32, end_h: u32) -> (usize, usize) {
        let limit = self.slots_per_day as i64;
        let start_slot =
            (((start_h as i64 * 60) - self.day_start_minute()) / SLOT_MINUTES).clamp(0, limit);
        let end_slot = (((end_h as i64 * 60) - self.day_start_minute()) / SLOT_MINUTES)
            .clamp(start_slot, limit);
        (start_slot as usize, end_slot as usize)
    }

    /// Resolve an absolute block to `(day, start_slot, end_slot)` if it
    /// lies on a single day of this grid. A block ending exactly at the
    /// following midnight maps onto the end of its start day.
    pub fn slot_span(&self, start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Option<(usize, usize, usize)> {
        let day = self.day_of(start_at);
        if !(0..DAYS_PER_WEEK as i64).contains(&day) {
            return None;
        }
        let start_offset = minutes_from_midnight(start_at) - self.day_start_minute();
        let end_day = self.day_of(end_at);
        let end_offset = if end_day == day {
            minutes_from_midnight(end_at) - self.day_start_minute()
        } else if end_day == day + 1 && minutes_from_midnight(end_at) == 0 {
            24 * 60 - self.day_start_minute()
        } else {
            return None;
        };
        if start_offset < 0
            || start_offset % SLOT_MINUTES != 0
            || end_offset % SLOT_MINUTES != 0
        {
            return None;
        }
        let start_slot = start_offset / SLOT_MINUTES;
        let end_slot = end_offset / SLOT_MINUTES;
        if start_slot >= end_slot || end_slot > self.slots_per_day as i64 {
            return None;
        }
        Some((day as usize, start_slot as usize, end_slot as usize))
    }

    /// The maximal free contiguous runs of the grid as absolute ranges.
    /// This is the only occupancy information disclosed to the external
    /// proposer.
    pub fn free_ranges(&self) -> Vec<FreeRange> {
        let mut ranges = Vec::new();
        for day in 0..DAYS_PER_WEEK {
            let mut run_start: Option<usize> = None;
            for slot in 0..=self.slots_per_day {
                let is_free = slot < self.slots_per_day && !self.occupied[day][slot];
                if is_free && run_start.is_none() {
                    run_start = Some(slot);
                }
                if !is_free {
                    if let Some(start) = run_start.take() {
                        ranges.push(FreeRange {
                            start_at: self.instant_at(day, start),
                            end_at: self.instant_at(day, slot),
                        });
                    }
                }
            }
        }
        ranges
    }
}
