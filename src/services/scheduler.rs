use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::schedule::{
    ProposedBlock, ScheduleOutcome, ScheduleRequest, UnscheduledReason, UnscheduledTask,
};
use crate::models::settings::PlannerConfig;
use crate::models::task::{PreferredTime, SchedulableTask};
use crate::services::schedule_utils::{clamp01, SLOT_MINUTES};
use crate::services::time_grid::{TimeGrid, DAYS_PER_WEEK};

/// Urgency in [0,1]: 1 when the deadline is now or past, falling to 0 over
/// the configured horizon. Whole days, floored at zero.
fn deadline_score(deadline: DateTime<Utc>, now: DateTime<Utc>, horizon_days: i64) -> f64 {
    let days_left = ((deadline - now).num_seconds() / 86_400).max(0);
    clamp01(1.0 - days_left as f64 / horizon_days as f64)
}

fn importance_score(importance: i64) -> f64 {
    clamp01((importance - 1) as f64 / 4.0)
}

fn priority_score(task: &SchedulableTask, now: DateTime<Utc>, config: &PlannerConfig) -> f64 {
    config.deadline_weight * deadline_score(task.deadline, now, config.deadline_horizon_days)
        + importance_score(task.importance)
}

/// Order tasks front-loading urgent and important work; among equal scores
/// the earlier deadline wins, then the longer task, so long tasks' chunks
/// land before short ones thread in.
fn order_tasks<'a>(
    tasks: &'a [SchedulableTask],
    now: DateTime<Utc>,
    config: &PlannerConfig,
) -> Vec<&'a SchedulableTask> {
    let mut ordered: Vec<&SchedulableTask> = tasks.iter().collect();
    ordered.sort_by(|a, b| {
        let score_a = priority_score(a, now, config);
        let score_b = priority_score(b, now, config);
        score_b
            .partial_cmp(&score_a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.deadline.cmp(&b.deadline))
            .then_with(|| b.estimated_minutes.cmp(&a.estimated_minutes))
    });
    ordered
}

/// Split a duration into chunk-sized slot counts, with a shorter remainder
/// chunk when the duration is not an exact multiple.
fn chunk_slots(total_minutes: i64, chunk_minutes: i64, splittable: bool) -> Vec<i64> {
    let total_slots = ((total_minutes + SLOT_MINUTES - 1) / SLOT_MINUTES).max(1);
    if !splittable {
        return vec![total_slots];
    }
    let per_chunk = (chunk_minutes / SLOT_MINUTES).max(1);
    let mut chunks = Vec::new();
    let mut remaining = total_slots;
    while remaining > 0 {
        let size = remaining.min(per_chunk);
        chunks.push(size);
        remaining -= size;
    }
    chunks
}

/// Day-major search for a free run: the preferred time-of-day window first
/// (when the task has one), then the whole day, before moving on.
fn find_run(
    grid: &TimeGrid,
    config: &PlannerConfig,
    preferred: PreferredTime,
    len: usize,
) -> Option<(usize, usize)> {
    for day in 0..DAYS_PER_WEEK {
        if let Some((start_h, end_h)) = config.preferred_hours(preferred) {
            let (window_start, window_end) = grid.hour_window_slots(start_h, end_h);
            if let Some(slot) = scan_day(grid, day, window_start, window_end, len) {
                return Some((day, slot));
            }
        }
        if let Some(slot) = scan_day(grid, day, 0, grid.slots_per_day(), len) {
            return Some((day, slot));
        }
    }
    None
}

fn scan_day(
    grid: &TimeGrid,
    day: usize,
    from_slot: usize,
    to_slot: usize,
    len: usize,
) -> Option<usize> {
    if to_slot < from_slot + len {
        return None;
    }
    (from_slot..=to_slot - len).find(|&slot| grid.is_run_free(day, slot, len))
}

/// The deterministic greedy packer. Total: every input task ends up either
/// proposed (possibly split) or reported unscheduled with a reason; partial
/// placement is expected and not an error.
pub fn greedy_schedule(
    request: &ScheduleRequest,
    mut grid: TimeGrid,
    config: &PlannerConfig,
) -> ScheduleOutcome {
    let now = request.effective_now();
    let mut proposed = Vec::new();
    let mut unscheduled = Vec::new();

    for task in order_tasks(&request.tasks, now, config) {
        if task.estimated_minutes <= 0 {
            unscheduled.push(UnscheduledTask {
                task_id: task.id.clone(),
                remaining_minutes: 0,
                reason: UnscheduledReason::InvalidDuration,
            });
            continue;
        }

        let chunks = chunk_slots(
            task.estimated_minutes,
            config.chunk_minutes(task.focus_need),
            task.splittable,
        );

        let mut failed_minutes = 0;
        for &chunk in &chunks {
            let mut len = chunk as usize;
            let mut placement = find_run(&grid, config, task.preferred_time, len);
            if placement.is_none() && len > 1 && task.splittable {
                placement = find_run(&grid, config, task.preferred_time, 1);
                if placement.is_some() {
                    // Only one slot fits; the rest of this chunk stays due.
                    failed_minutes += (chunk - 1) * SLOT_MINUTES;
                    len = 1;
                }
            }

            match placement {
                Some((day, slot)) => {
                    grid.mark_run(day, slot, len);
                    proposed.push(ProposedBlock {
                        task_id: task.id.clone(),
                        title: task.title.clone(),
                        start_at: grid.instant_at(day, slot),
                        end_at: grid.instant_at(day, slot + len),
                    });
                }
                None => {
                    failed_minutes += chunk * SLOT_MINUTES;
                }
            }
        }

        if failed_minutes > 0 {
            unscheduled.push(UnscheduledTask {
                task_id: task.id.clone(),
                remaining_minutes: failed_minutes,
                reason: UnscheduledReason::NoFreeSlot,
            });
        }
    }

    debug!(
        target: "timegrid::scheduler",
        tasks = request.tasks.len(),
        proposed = proposed.len(),
        unscheduled = unscheduled.len(),
        "greedy schedule complete"
    );

    ScheduleOutcome {
        proposed_blocks: proposed,
        unscheduled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::FocusNeed;
    use chrono::{Duration, TimeZone};

    fn task(id: &str, minutes: i64, deadline: DateTime<Utc>, importance: i64) -> SchedulableTask {
        SchedulableTask {
            id: id.to_string(),
            title: id.to_string(),
            estimated_minutes: minutes,
            deadline,
            importance,
            priority_tag: None,
            splittable: true,
            preferred_time: PreferredTime::Any,
            focus_need: FocusNeed::Medium,
        }
    }

    #[test]
    fn ordering_front_loads_urgent_and_important_work() {
        let now = Utc.with_ymd_and_hms(2025, 3, 2, 8, 0, 0).unwrap();
        let config = PlannerConfig::default();
        let tasks = vec![
            task("far-low", 60, now + Duration::days(13), 1),
            task("soon-high", 60, now + Duration::days(1), 5),
            task("soon-low", 60, now + Duration::days(1), 1),
        ];
        let ordered = order_tasks(&tasks, now, &config);
        assert_eq!(ordered[0].id, "soon-high");
        assert_eq!(ordered[1].id, "soon-low");
        assert_eq!(ordered[2].id, "far-low");
    }

    #[test]
    fn ties_break_by_deadline_then_longer_duration() {
        let now = Utc.with_ymd_and_hms(2025, 3, 2, 8, 0, 0).unwrap();
        let config = PlannerConfig::default();
        let deadline = now + Duration::days(2);
        let tasks = vec![
            task("short", 30, deadline, 3),
            task("long", 180, deadline, 3),
            task("earlier", 60, now + Duration::days(1), 3),
        ];
        let ordered = order_tasks(&tasks, now, &config);
        assert_eq!(ordered[0].id, "earlier");
        assert_eq!(ordered[1].id, "long");
        assert_eq!(ordered[2].id, "short");
    }

    #[test]
    fn chunking_follows_focus_need_with_remainder() {
        assert_eq!(chunk_slots(120, 60, true), vec![4, 4]);
        assert_eq!(chunk_slots(100, 60, true), vec![4, 3]);
        assert_eq!(chunk_slots(90, 90, true), vec![6]);
        assert_eq!(chunk_slots(20, 30, true), vec![2]);
        // Non-splittable tasks are one chunk, rounded up to whole slots.
        assert_eq!(chunk_slots(100, 60, false), vec![7]);
    }

    #[test]
    fn deadline_score_uses_whole_days_floored_at_zero() {
        let now = Utc.with_ymd_and_hms(2025, 3, 2, 8, 0, 0).unwrap();
        assert_eq!(deadline_score(now - Duration::days(3), now, 14), 1.0);
        assert_eq!(deadline_score(now, now, 14), 1.0);
        assert_eq!(deadline_score(now + Duration::days(14), now, 14), 0.0);
        let halfway = deadline_score(now + Duration::days(7), now, 14);
        assert!((halfway - 0.5).abs() < f64::EPSILON);
    }
}
