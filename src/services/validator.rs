use std::collections::{HashMap, HashSet};

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::models::schedule::{
    ProposedBlock, ScheduleOutcome, ScheduleRequest, UnscheduledReason, UnscheduledTask,
};
use crate::models::task::SchedulableTask;
use crate::services::schedule_utils::parse_datetime;
use crate::services::time_grid::TimeGrid;

/// Recover a JSON document from loosely-structured reply text: direct parse
/// first, then the outermost brace/bracket-delimited substring.
pub fn extract_json(text: &str) -> Option<JsonValue> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }
    let start = [trimmed.find('{'), trimmed.find('[')]
        .into_iter()
        .flatten()
        .min()?;
    let end = [trimmed.rfind('}'), trimmed.rfind(']')]
        .into_iter()
        .flatten()
        .max()?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

/// Check an untrusted proposal batch against the seeded occupancy grid.
/// Acceptance is all-or-nothing: a single malformed, conflicting, or
/// unknown-task block rejects the whole batch (`None`), and the caller
/// falls back to the deterministic strategy. Partial trust would let a
/// conflicting block silently drop a task.
pub fn validate_proposal(
    request: &ScheduleRequest,
    grid: &TimeGrid,
    reply_text: &str,
) -> Option<ScheduleOutcome> {
    let parsed = match extract_json(reply_text) {
        Some(value) => value,
        None => {
            warn!(target: "timegrid::validator", "proposal reply is not recoverable JSON");
            return None;
        }
    };
    let blocks = parsed.get("proposed_blocks")?.as_array()?;

    let tasks_by_id: HashMap<&str, &SchedulableTask> = request
        .tasks
        .iter()
        .map(|task| (task.id.as_str(), task))
        .collect();

    let now = request.effective_now();
    // Accepted blocks mark this copy so duplicates within the batch conflict.
    let mut working = grid.clone();
    let mut proposed = Vec::new();
    let mut scheduled_ids: HashSet<&str> = HashSet::new();

    for item in blocks {
        let (block, (day, start_slot, end_slot)) =
            match check_block(item, request, &working, &tasks_by_id, now) {
                Some(checked) => checked,
                None => {
                    warn!(
                        target: "timegrid::validator",
                        block = %item,
                        "rejecting proposal batch on invalid block"
                    );
                    return None;
                }
            };

        working.mark_run(day, start_slot, end_slot - start_slot);
        if let Some(task) = tasks_by_id.get(block.task_id.as_str()) {
            scheduled_ids.insert(task.id.as_str());
        }
        proposed.push(block);
    }

    let unscheduled = request
        .tasks
        .iter()
        .filter(|task| !scheduled_ids.contains(task.id.as_str()))
        .map(|task| UnscheduledTask {
            task_id: task.id.clone(),
            remaining_minutes: task.estimated_minutes.max(0),
            reason: UnscheduledReason::NotScheduledByAi,
        })
        .collect();

    debug!(
        target: "timegrid::validator",
        accepted = proposed.len(),
        "proposal batch accepted"
    );

    Some(ScheduleOutcome {
        proposed_blocks: proposed,
        unscheduled,
    })
}

fn check_block(
    item: &JsonValue,
    request: &ScheduleRequest,
    working: &TimeGrid,
    tasks_by_id: &HashMap<&str, &SchedulableTask>,
    now: chrono::DateTime<chrono::Utc>,
) -> Option<(ProposedBlock, (usize, usize, usize))> {
    let task_id = item.get("task_id")?.as_str()?;
    let title = item.get("title")?.as_str()?;
    if task_id.is_empty() || title.is_empty() {
        return None;
    }
    // A block for a task we never asked about means the reply cannot be
    // trusted as a whole.
    if !tasks_by_id.contains_key(task_id) {
        return None;
    }

    let start_at = parse_datetime(item.get("start_at")?.as_str()?).ok()?;
    let end_at = parse_datetime(item.get("end_at")?.as_str()?).ok()?;

    if start_at >= end_at || start_at < now {
        return None;
    }
    if start_at < request.week_start || end_at > request.week_end {
        return None;
    }

    let (day, start_slot, end_slot) = working.slot_span(start_at, end_at)?;
    if !working.is_run_free(day, start_slot, end_slot - start_slot) {
        return None;
    }

    Some((
        ProposedBlock {
            task_id: task_id.to_string(),
            title: title.to_string(),
            start_at,
            end_at,
        },
        (day, start_slot, end_slot),
    ))
}
