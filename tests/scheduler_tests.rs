use chrono::{DateTime, Duration, TimeZone, Utc};
use timegrid::{
    ExistingBlock, FocusNeed, PlannerConfig, PreferredTime, RecurringSlot, SchedulableTask,
    SchedulePlanner, ScheduleRequest, UnscheduledReason,
};

fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// 2025-03-02 is a Sunday. 06:00-23:00 gives 68 slots per day.
fn base_request(tasks: Vec<SchedulableTask>) -> ScheduleRequest {
    let week_start = dt(2025, 3, 2, 0, 0);
    ScheduleRequest {
        week_start,
        week_end: week_start + Duration::days(7),
        start_hour: 6,
        end_hour: 23,
        now: Some(dt(2025, 3, 2, 8, 0)),
        tasks,
        existing_blocks: Vec::new(),
        fixed_commitments: Vec::new(),
        blocked_templates: Vec::new(),
        blocked_ranges: Vec::new(),
    }
}

fn task(id: &str, minutes: i64) -> SchedulableTask {
    SchedulableTask {
        id: id.to_string(),
        title: format!("Task {id}"),
        estimated_minutes: minutes,
        deadline: dt(2025, 3, 5, 0, 0),
        importance: 3,
        priority_tag: None,
        splittable: true,
        preferred_time: PreferredTime::Any,
        focus_need: FocusNeed::Medium,
    }
}

fn planner() -> SchedulePlanner {
    SchedulePlanner::new(PlannerConfig::default())
}

#[test]
fn morning_non_splittable_task_lands_at_nine() {
    let mut t = task("t1", 90);
    t.importance = 5;
    t.deadline = dt(2025, 3, 3, 8, 0);
    t.splittable = false;
    t.preferred_time = PreferredTime::Morning;

    let outcome = planner().plan_deterministic(&base_request(vec![t])).unwrap();

    assert_eq!(outcome.proposed_blocks.len(), 1);
    let block = &outcome.proposed_blocks[0];
    assert_eq!(block.start_at, dt(2025, 3, 2, 9, 0));
    assert_eq!(block.end_at, dt(2025, 3, 2, 10, 30));
    assert!(outcome.unscheduled.is_empty());
}

#[test]
fn splittable_task_breaks_into_focus_sized_chunks() {
    let outcome = planner()
        .plan_deterministic(&base_request(vec![task("t1", 120)]))
        .unwrap();

    assert_eq!(outcome.proposed_blocks.len(), 2);
    let first = &outcome.proposed_blocks[0];
    let second = &outcome.proposed_blocks[1];
    assert_eq!((first.end_at - first.start_at).num_minutes(), 60);
    assert_eq!((second.end_at - second.start_at).num_minutes(), 60);
    // Contiguous free space means the chunks land back-to-back.
    assert_eq!(second.start_at, first.end_at);
    assert!(outcome.unscheduled.is_empty());
}

#[test]
fn zero_duration_task_is_reported_without_slot_search() {
    let outcome = planner()
        .plan_deterministic(&base_request(vec![task("t1", 0)]))
        .unwrap();

    assert!(outcome.proposed_blocks.is_empty());
    assert_eq!(outcome.unscheduled.len(), 1);
    assert_eq!(outcome.unscheduled[0].task_id, "t1");
    assert_eq!(outcome.unscheduled[0].remaining_minutes, 0);
    assert_eq!(
        outcome.unscheduled[0].reason,
        UnscheduledReason::InvalidDuration
    );
}

#[test]
fn identical_inputs_give_identical_outputs() {
    let request = base_request(vec![task("a", 90), task("b", 45), task("c", 180)]);
    let p = planner();
    let first = p.plan_deterministic(&request).unwrap();
    let second = p.plan_deterministic(&request).unwrap();
    assert_eq!(first, second);
}

#[test]
fn preferred_window_falls_back_to_the_whole_day() {
    let mut t = task("t1", 60);
    t.preferred_time = PreferredTime::Evening;

    let mut request = base_request(vec![t]);
    // Evenings blocked all week.
    request.blocked_templates.push(RecurringSlot {
        days: vec![0, 1, 2, 3, 4, 5, 6],
        start: "18:00".to_string(),
        end: "21:00".to_string(),
    });

    let outcome = planner().plan_deterministic(&request).unwrap();
    assert_eq!(outcome.proposed_blocks.len(), 1);
    // Day 0 outside the evening window, not day 1 inside it.
    let block = &outcome.proposed_blocks[0];
    assert_eq!(block.start_at, dt(2025, 3, 2, 8, 0));
}

#[test]
fn exhausted_grid_reports_one_entry_per_task() {
    let mut request = base_request(vec![task("t1", 120)]);
    request.start_hour = 6;
    request.end_hour = 7;
    request.blocked_templates.push(RecurringSlot {
        days: vec![0, 1, 2, 3, 4, 5, 6],
        start: "06:00".to_string(),
        end: "07:00".to_string(),
    });

    let outcome = planner().plan_deterministic(&request).unwrap();
    assert!(outcome.proposed_blocks.is_empty());
    assert_eq!(outcome.unscheduled.len(), 1);
    assert_eq!(outcome.unscheduled[0].remaining_minutes, 120);
    assert_eq!(outcome.unscheduled[0].reason, UnscheduledReason::NoFreeSlot);
}

#[test]
fn outputs_respect_occupancy_alignment_and_now() {
    let mut request = base_request(vec![
        task("a", 90),
        task("b", 120),
        task("c", 45),
        task("d", 30),
    ]);
    request.existing_blocks.push(ExistingBlock {
        start_at: dt(2025, 3, 2, 9, 0),
        end_at: dt(2025, 3, 2, 11, 0),
    });
    request.fixed_commitments.push(RecurringSlot {
        days: vec![1, 3],
        start: "09:00".to_string(),
        end: "12:00".to_string(),
    });
    request.tasks[1].preferred_time = PreferredTime::Afternoon;
    request.tasks[2].focus_need = FocusNeed::High;

    let now = request.now.unwrap();
    let outcome = planner().plan_deterministic(&request).unwrap();

    let blocks = &outcome.proposed_blocks;
    assert!(!blocks.is_empty());

    for block in blocks {
        // Alignment and week-window bounds.
        assert_eq!(block.start_at.timestamp() % (15 * 60), 0);
        assert_eq!(block.end_at.timestamp() % (15 * 60), 0);
        assert!(block.start_at >= now);
        assert!(block.start_at >= request.week_start);
        assert!(block.end_at <= request.week_end);
        // Never over the pre-existing block.
        assert!(
            block.end_at <= dt(2025, 3, 2, 9, 0) || block.start_at >= dt(2025, 3, 2, 11, 0)
                || block.start_at.date_naive() != dt(2025, 3, 2, 9, 0).date_naive()
        );
    }

    // Pairwise non-overlap.
    for (i, a) in blocks.iter().enumerate() {
        for b in blocks.iter().skip(i + 1) {
            assert!(a.end_at <= b.start_at || b.end_at <= a.start_at);
        }
    }

    // Accounting: proposed minutes plus reported remainder covers each task.
    for t in &request.tasks {
        let proposed: i64 = blocks
            .iter()
            .filter(|b| b.task_id == t.id)
            .map(|b| (b.end_at - b.start_at).num_minutes())
            .sum();
        let remaining: i64 = outcome
            .unscheduled
            .iter()
            .filter(|u| u.task_id == t.id)
            .map(|u| u.remaining_minutes)
            .sum();
        assert!(proposed + remaining >= t.estimated_minutes);
        let entries = outcome
            .unscheduled
            .iter()
            .filter(|u| u.task_id == t.id)
            .count();
        assert!(entries <= 1);
    }
}

#[test]
fn malformed_week_windows_are_rejected() {
    let mut request = base_request(vec![task("t1", 60)]);
    request.week_end = request.week_start + Duration::days(5);
    assert!(planner().plan_deterministic(&request).is_err());

    let mut request = base_request(vec![task("t1", 60)]);
    request.week_end = request.week_start - Duration::days(7);
    assert!(planner().plan_deterministic(&request).is_err());

    let mut request = base_request(vec![task("t1", 60)]);
    request.start_hour = 23;
    request.end_hour = 6;
    assert!(planner().plan_deterministic(&request).is_err());

    let mut request = base_request(vec![task("t1", 60)]);
    request.week_start = dt(2025, 3, 2, 8, 30);
    request.week_end = request.week_start + Duration::days(7);
    assert!(planner().plan_deterministic(&request).is_err());
}

#[test]
fn empty_task_list_yields_an_empty_outcome() {
    let outcome = planner().plan_deterministic(&base_request(Vec::new())).unwrap();
    assert!(outcome.proposed_blocks.is_empty());
    assert!(outcome.unscheduled.is_empty());
}

#[test]
fn urgent_tasks_take_the_earliest_slots() {
    let mut urgent = task("urgent", 60);
    urgent.deadline = dt(2025, 3, 3, 0, 0);
    urgent.importance = 5;
    let mut relaxed = task("relaxed", 60);
    relaxed.deadline = dt(2025, 3, 14, 0, 0);
    relaxed.importance = 1;

    // Supply in reverse order; priority must reorder them.
    let outcome = planner()
        .plan_deterministic(&base_request(vec![relaxed, urgent]))
        .unwrap();

    assert_eq!(outcome.proposed_blocks[0].task_id, "urgent");
    assert!(outcome.proposed_blocks[0].start_at < outcome.proposed_blocks[1].start_at);
}
