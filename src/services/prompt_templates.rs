use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};

use crate::models::schedule::FreeRange;
use crate::models::task::SchedulableTask;
use crate::services::schedule_utils::SLOT_MINUTES;

/// System prompt for the block proposer. The rules restate the grid
/// invariants; the validator still enforces every one of them.
pub fn block_proposal_system_prompt() -> &'static str {
    r#"You are scheduling tasks into free time ranges.
Return ONLY JSON with a single key 'proposed_blocks'.
Each block must have task_id, title, start_at, end_at.
Times must be ISO-8601, aligned to 15-minute slots.
Only use the provided free_ranges, avoid overlaps, and avoid past times.
If a task is not splittable, place it as one block equal to its duration.
Prefer earlier times for closer deadlines.
Do not wrap the response in markdown code blocks."#
}

/// System prompt for the duration estimation helper.
pub fn duration_estimation_system_prompt() -> &'static str {
    r#"You are estimating how long a student task might take.
Return ONLY a single integer number of minutes (multiple of 15),
between 15 and 600. If unsure, return 60."#
}

/// The user payload for a block proposal: task summaries, the free ranges,
/// and the restated rules. Occupancy sources themselves are never disclosed.
pub fn build_proposal_payload(
    tasks: &[SchedulableTask],
    free_ranges: &[FreeRange],
) -> JsonValue {
    let tasks: Vec<JsonValue> = tasks
        .iter()
        .map(|task| {
            json!({
                "id": task.id,
                "title": task.title,
                "estimated_minutes": task.estimated_minutes,
                "deadline": task.deadline.to_rfc3339(),
                "importance": task.importance,
                "priority_tag": task.priority_tag,
                "splittable": task.splittable,
                "preferred_time": task.preferred_time,
                "focus_need": task.focus_need,
            })
        })
        .collect();

    let ranges: Vec<JsonValue> = free_ranges
        .iter()
        .map(|range| {
            json!({
                "start_at": range.start_at.to_rfc3339(),
                "end_at": range.end_at.to_rfc3339(),
            })
        })
        .collect();

    json!({
        "tasks": tasks,
        "free_ranges": ranges,
        "rules": {
            "slot_minutes": SLOT_MINUTES,
            "avoid_past": true,
        },
    })
}

/// The user payload for a duration estimate.
pub fn build_estimation_payload(
    title: &str,
    description: Option<&str>,
    deadline: Option<DateTime<Utc>>,
) -> JsonValue {
    let mut detail = format!("Task title: {title}\n");
    if let Some(description) = description {
        detail.push_str(&format!("Details: {description}\n"));
    }
    if let Some(deadline) = deadline {
        detail.push_str(&format!("Deadline: {}\n", deadline.to_rfc3339()));
    }
    json!({ "task": detail })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{FocusNeed, PreferredTime};
    use chrono::TimeZone;

    #[test]
    fn proposal_payload_discloses_only_tasks_ranges_and_rules() {
        let deadline = Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap();
        let tasks = vec![SchedulableTask {
            id: "t1".to_string(),
            title: "Essay".to_string(),
            estimated_minutes: 90,
            deadline,
            importance: 4,
            priority_tag: Some("school".to_string()),
            splittable: true,
            preferred_time: PreferredTime::Morning,
            focus_need: FocusNeed::High,
        }];
        let ranges = vec![FreeRange {
            start_at: Utc.with_ymd_and_hms(2025, 3, 2, 9, 0, 0).unwrap(),
            end_at: Utc.with_ymd_and_hms(2025, 3, 2, 12, 0, 0).unwrap(),
        }];

        let payload = build_proposal_payload(&tasks, &ranges);
        assert_eq!(payload["tasks"][0]["id"], "t1");
        assert_eq!(payload["tasks"][0]["preferred_time"], "morning");
        assert_eq!(payload["free_ranges"].as_array().unwrap().len(), 1);
        assert_eq!(payload["rules"]["slot_minutes"], 15);
        assert_eq!(payload["rules"]["avoid_past"], true);
        assert!(payload.get("existing_blocks").is_none());
    }

    #[test]
    fn estimation_payload_includes_optional_context() {
        let payload = build_estimation_payload("Read chapter 4", None, None);
        let text = payload["task"].as_str().unwrap();
        assert!(text.contains("Read chapter 4"));
        assert!(!text.contains("Details:"));

        let deadline = Utc.with_ymd_and_hms(2025, 3, 4, 18, 0, 0).unwrap();
        let payload =
            build_estimation_payload("Read chapter 4", Some("pages 80-120"), Some(deadline));
        let text = payload["task"].as_str().unwrap();
        assert!(text.contains("Details: pages 80-120"));
        assert!(text.contains("Deadline: 2025-03-04T18:00:00+00:00"));
    }
}
