use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::schedule::{
    BlockRecord, ExistingBlock, RescheduleOutcome, RescheduleRequest, ScheduleRequest,
};
use crate::models::task::{TaskRecord, TaskStatus};
use crate::services::planner::SchedulePlanner;
use crate::store::ScheduleStore;

pub const RESCHEDULE_NOTE: &str = "AI 재배치";

/// Unplaced minutes of a task whose week blocks are all in the past.
/// `None` means the task is not due for rescheduling: it is done, still
/// scheduled (a block ends at or after `now`), or fully covered already.
fn remaining_minutes(task: &TaskRecord, blocks: &[BlockRecord], now: DateTime<Utc>) -> Option<i64> {
    if task.status == TaskStatus::Done {
        return None;
    }
    let task_blocks: Vec<&BlockRecord> = blocks
        .iter()
        .filter(|block| block.task_id.as_deref() == Some(task.id.as_str()))
        .collect();
    if task_blocks.iter().any(|block| block.end_at >= now) {
        return None;
    }
    let past_minutes: i64 = task_blocks
        .iter()
        .map(|block| block.duration_minutes())
        .sum();
    let remaining = (task.estimated_minutes - past_minutes).max(0);
    if remaining <= 0 {
        return None;
    }
    Some(remaining)
}

/// Recomputes remaining work for tasks whose prior placement was missed or
/// only partially completed, re-runs the scheduling pipeline over the
/// remainders, and commits the accepted blocks.
pub struct RescheduleEngine {
    planner: SchedulePlanner,
}

impl RescheduleEngine {
    pub fn new(planner: SchedulePlanner) -> Self {
        Self { planner }
    }

    pub async fn reschedule(
        &self,
        store: &dyn ScheduleStore,
        request: &RescheduleRequest,
    ) -> AppResult<RescheduleOutcome> {
        let now = request.now.unwrap_or_else(Utc::now);

        let tasks = store.tasks()?;
        let blocks = store.blocks_in_window(request.week_start, request.week_end)?;

        let overdue: Vec<_> = tasks
            .iter()
            .filter_map(|task| {
                remaining_minutes(task, &blocks, now)
                    .map(|remaining| task.to_schedulable(remaining))
            })
            .collect();

        if overdue.is_empty() {
            debug!(target: "timegrid::reschedule", "nothing due for rescheduling");
            return Ok(RescheduleOutcome::default());
        }

        let schedule_request = ScheduleRequest {
            week_start: request.week_start,
            week_end: request.week_end,
            start_hour: request.start_hour,
            end_hour: request.end_hour,
            now: Some(now),
            tasks: overdue,
            existing_blocks: blocks
                .iter()
                .map(|block| ExistingBlock {
                    start_at: block.start_at,
                    end_at: block.end_at,
                })
                .collect(),
            fixed_commitments: store.fixed_commitments()?,
            blocked_templates: store.blocked_templates()?,
            blocked_ranges: request.blocked_ranges.clone(),
        };

        let outcome = self.planner.plan(&schedule_request).await?;

        let mut records = Vec::with_capacity(outcome.proposed_blocks.len());
        let mut notifications = Vec::with_capacity(outcome.proposed_blocks.len());
        for block in &outcome.proposed_blocks {
            records.push(BlockRecord {
                id: Uuid::new_v4().to_string(),
                task_id: Some(block.task_id.clone()),
                title: block.title.clone(),
                note: Some(RESCHEDULE_NOTE.to_string()),
                start_at: block.start_at,
                end_at: block.end_at,
            });
            notifications.push(format!(
                "'{}' 태스크가 자동 재배치되었습니다.",
                block.title
            ));
        }

        // One commit for the whole batch; no blocks proposed, nothing persisted.
        if !records.is_empty() {
            store.insert_blocks(&records)?;
        }

        debug!(
            target: "timegrid::reschedule",
            committed = records.len(),
            unscheduled = outcome.unscheduled.len(),
            "reschedule complete"
        );

        Ok(RescheduleOutcome {
            proposed_blocks: outcome.proposed_blocks,
            unscheduled: outcome.unscheduled,
            notifications,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record(id: &str, estimated: i64, status: TaskStatus) -> TaskRecord {
        TaskRecord {
            id: id.to_string(),
            title: id.to_string(),
            estimated_minutes: estimated,
            deadline: Utc.with_ymd_and_hms(2025, 3, 8, 0, 0, 0).unwrap(),
            importance: 3,
            priority_tag: None,
            splittable: true,
            preferred_time: Default::default(),
            focus_need: Default::default(),
            status,
        }
    }

    fn block_for(task_id: &str, start: DateTime<Utc>, minutes: i64) -> BlockRecord {
        BlockRecord {
            id: Uuid::new_v4().to_string(),
            task_id: Some(task_id.to_string()),
            title: task_id.to_string(),
            note: None,
            start_at: start,
            end_at: start + Duration::minutes(minutes),
        }
    }

    #[test]
    fn past_blocks_reduce_the_remainder() {
        let now = Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap();
        let task = record("t1", 120, TaskStatus::Pending);
        let blocks = vec![block_for("t1", now - Duration::hours(5), 45)];
        assert_eq!(remaining_minutes(&task, &blocks, now), Some(75));
    }

    #[test]
    fn tasks_with_a_current_or_future_block_are_skipped() {
        let now = Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap();
        let task = record("t1", 120, TaskStatus::Pending);
        let blocks = vec![
            block_for("t1", now - Duration::hours(5), 45),
            block_for("t1", now + Duration::hours(1), 60),
        ];
        assert_eq!(remaining_minutes(&task, &blocks, now), None);
    }

    #[test]
    fn done_and_fully_covered_tasks_are_skipped() {
        let now = Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap();
        let done = record("t1", 120, TaskStatus::Done);
        assert_eq!(remaining_minutes(&done, &[], now), None);

        let covered = record("t2", 60, TaskStatus::Pending);
        let blocks = vec![block_for("t2", now - Duration::hours(3), 60)];
        assert_eq!(remaining_minutes(&covered, &blocks, now), None);
    }

    #[test]
    fn tasks_without_blocks_keep_their_full_estimate() {
        let now = Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap();
        let task = record("t1", 90, TaskStatus::InProgress);
        assert_eq!(remaining_minutes(&task, &[], now), Some(90));
    }
}
