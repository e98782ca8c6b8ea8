use tracing::debug;

use crate::error::AppResult;
use crate::models::schedule::{RecurringSlot, ScheduleRequest};
use crate::services::schedule_utils::{minutes_from_midnight, parse_clock_minutes};
use crate::services::time_grid::{TimeGrid, DAYS_PER_WEEK};

/// Fold every occupancy source of the request into a fresh grid: existing
/// blocks, each weekday occurrence of fixed commitments and blocked
/// templates, one-off blocked ranges, then the past. All markings are
/// monotonic ORs, so their order is irrelevant.
pub fn build_occupancy(request: &ScheduleRequest) -> AppResult<TimeGrid> {
    let mut grid = TimeGrid::new(request.week_start, request.start_hour, request.end_hour);

    for block in &request.existing_blocks {
        let day = grid.day_of(block.start_at);
        grid.mark_range(
            day,
            minutes_from_midnight(block.start_at),
            minutes_from_midnight(block.end_at),
        );
    }

    mark_recurring(&mut grid, &request.fixed_commitments)?;
    mark_recurring(&mut grid, &request.blocked_templates)?;

    for range in &request.blocked_ranges {
        let day = grid.day_of(range.date);
        grid.mark_range(day, range.start_min, range.end_min);
    }

    let now = request.effective_now();
    grid.mark_past(now);

    debug!(
        target: "timegrid::occupancy",
        slots_per_day = grid.slots_per_day(),
        sources = request.existing_blocks.len()
            + request.fixed_commitments.len()
            + request.blocked_templates.len()
            + request.blocked_ranges.len(),
        "occupancy grid built"
    );

    Ok(grid)
}

fn mark_recurring(grid: &mut TimeGrid, slots: &[RecurringSlot]) -> AppResult<()> {
    for item in slots {
        let start_min = parse_clock_minutes(&item.start)?;
        let end_min = parse_clock_minutes(&item.end)?;
        for &day in &item.days {
            if (day as usize) < DAYS_PER_WEEK {
                grid.mark_range(day as i64, start_min, end_min);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schedule::{BlockedRange, ExistingBlock};
    use chrono::{TimeZone, Utc};

    fn base_request() -> ScheduleRequest {
        let week_start = Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap();
        ScheduleRequest {
            week_start,
            week_end: week_start + chrono::Duration::days(7),
            start_hour: 6,
            end_hour: 23,
            now: Some(week_start), // midnight: nothing is past yet
            tasks: Vec::new(),
            existing_blocks: Vec::new(),
            fixed_commitments: Vec::new(),
            blocked_templates: Vec::new(),
            blocked_ranges: Vec::new(),
        }
    }

    #[test]
    fn all_sources_mark_the_grid() {
        let mut request = base_request();
        request.existing_blocks.push(ExistingBlock {
            start_at: Utc.with_ymd_and_hms(2025, 3, 2, 9, 0, 0).unwrap(),
            end_at: Utc.with_ymd_and_hms(2025, 3, 2, 10, 0, 0).unwrap(),
        });
        request.fixed_commitments.push(RecurringSlot {
            days: vec![1, 3],
            start: "13:00".to_string(),
            end: "15:00".to_string(),
        });
        request.blocked_templates.push(RecurringSlot {
            days: vec![2],
            start: "06:00".to_string(),
            end: "07:00".to_string(),
        });
        request.blocked_ranges.push(BlockedRange {
            date: Utc.with_ymd_and_hms(2025, 3, 6, 0, 0, 0).unwrap(),
            start_min: 18 * 60,
            end_min: 19 * 60,
        });

        let grid = build_occupancy(&request).unwrap();
        assert!(!grid.is_run_free(0, 12, 4)); // existing block 09:00-10:00
        assert!(!grid.is_run_free(1, 28, 8)); // commitment 13:00-15:00 on Monday
        assert!(!grid.is_run_free(3, 28, 8)); // and on Wednesday
        assert!(!grid.is_run_free(2, 0, 4)); // template 06:00-07:00 on Tuesday
        assert!(!grid.is_run_free(4, 48, 4)); // blocked range 18:00-19:00 on Thursday
        assert!(grid.is_run_free(5, 0, grid.slots_per_day())); // Friday untouched
    }

    #[test]
    fn malformed_clock_times_reject_the_request() {
        let mut request = base_request();
        request.fixed_commitments.push(RecurringSlot {
            days: vec![0],
            start: "morning".to_string(),
            end: "10:00".to_string(),
        });
        assert!(build_occupancy(&request).is_err());
    }

    #[test]
    fn out_of_range_days_are_skipped() {
        let mut request = base_request();
        request.blocked_templates.push(RecurringSlot {
            days: vec![9],
            start: "06:00".to_string(),
            end: "23:00".to_string(),
        });
        let grid = build_occupancy(&request).unwrap();
        for day in 0..DAYS_PER_WEEK {
            assert!(grid.is_run_free(day, 0, grid.slots_per_day()));
        }
    }
}
