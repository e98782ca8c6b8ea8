use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::task::SchedulableTask;

/// A block already committed on the calendar. Read-only occupancy input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExistingBlock {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

/// A weekly recurring busy interval: fixed commitments and blocked
/// templates share this shape, they differ only in semantic category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecurringSlot {
    pub days: Vec<u32>,
    pub start: String,
    pub end: String,
}

/// A one-off manual block on a single day, as minute offsets from midnight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockedRange {
    pub date: DateTime<Utc>,
    pub start_min: i64,
    pub end_min: i64,
}

/// One scheduling call: the week window, the tasks, and every occupancy
/// source the grid is built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub week_start: DateTime<Utc>,
    pub week_end: DateTime<Utc>,
    pub start_hour: u32,
    pub end_hour: u32,
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
    pub tasks: Vec<SchedulableTask>,
    #[serde(default)]
    pub existing_blocks: Vec<ExistingBlock>,
    #[serde(default)]
    pub fixed_commitments: Vec<RecurringSlot>,
    #[serde(default)]
    pub blocked_templates: Vec<RecurringSlot>,
    #[serde(default)]
    pub blocked_ranges: Vec<BlockedRange>,
}

impl ScheduleRequest {
    /// Reject malformed request shapes before the pipeline runs. The grid
    /// is structurally seven days, so a week window of any other length
    /// would silently mis-index occupancy sources.
    pub fn validate(&self) -> AppResult<()> {
        if self.week_end <= self.week_start {
            return Err(AppError::validation("week_end must be after week_start"));
        }
        if self.week_end - self.week_start != Duration::days(7) {
            return Err(AppError::validation(
                "week window must span exactly 7 days",
            ));
        }
        if self.week_start.time().num_seconds_from_midnight() != 0 {
            return Err(AppError::validation(
                "week_start must be aligned to a day boundary",
            ));
        }
        if self.start_hour >= self.end_hour || self.end_hour > 24 {
            return Err(AppError::validation(
                "day window requires 0 <= start_hour < end_hour <= 24",
            ));
        }
        Ok(())
    }

    /// The reference instant for "past" marking and deadline scoring.
    pub fn effective_now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }
}

/// A block the pipeline proposes for a task (or one chunk of it).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProposedBlock {
    pub task_id: String,
    pub title: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnscheduledReason {
    InvalidDuration,
    NoFreeSlot,
    NotScheduledByAi,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnscheduledTask {
    pub task_id: String,
    pub remaining_minutes: i64,
    pub reason: UnscheduledReason,
}

/// Both strategies produce this shape; the invariants hold either way.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ScheduleOutcome {
    pub proposed_blocks: Vec<ProposedBlock>,
    pub unscheduled: Vec<UnscheduledTask>,
}

/// A maximal free run of the grid, disclosed to the external proposer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FreeRange {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

/// A committed block as stored. `task_id` is absent for plain calendar
/// entries that never came from a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockRecord {
    pub id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub note: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl BlockRecord {
    pub fn duration_minutes(&self) -> i64 {
        (self.end_at - self.start_at).num_minutes().max(0)
    }
}

/// Reschedule scope: the engine derives tasks and occupancy from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleRequest {
    pub week_start: DateTime<Utc>,
    pub week_end: DateTime<Utc>,
    pub start_hour: u32,
    pub end_hour: u32,
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
    #[serde(default)]
    pub blocked_ranges: Vec<BlockedRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RescheduleOutcome {
    pub proposed_blocks: Vec<ProposedBlock>,
    pub unscheduled: Vec<UnscheduledTask>,
    pub notifications: Vec<String>,
}
