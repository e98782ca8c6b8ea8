use crate::models::task::{FocusNeed, PreferredTime};

/// Fallback estimate when neither the caller nor the estimation helper
/// produced a duration.
pub const DEFAULT_ESTIMATED_MINUTES: i64 = 60;

/// Policy knobs of the deterministic scheduler. The defaults reproduce the
/// production behavior; they are configuration, not structure, so tuning
/// them never touches the algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    /// Weight of the deadline score relative to the importance score.
    pub deadline_weight: f64,
    /// Deadlines further out than this many days score zero urgency.
    pub deadline_horizon_days: i64,
    /// Chunk sizes in minutes keyed by focus need.
    pub chunk_minutes_high: i64,
    pub chunk_minutes_medium: i64,
    pub chunk_minutes_low: i64,
    /// Preferred time-of-day windows as whole hours of the day.
    pub morning_hours: (u32, u32),
    pub afternoon_hours: (u32, u32),
    pub evening_hours: (u32, u32),
    /// Bounds and default for the duration estimation helper.
    pub estimate_min_minutes: i64,
    pub estimate_max_minutes: i64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            deadline_weight: 1.3,
            deadline_horizon_days: 14,
            chunk_minutes_high: 90,
            chunk_minutes_medium: 60,
            chunk_minutes_low: 30,
            morning_hours: (9, 12),
            afternoon_hours: (13, 17),
            evening_hours: (18, 21),
            estimate_min_minutes: 15,
            estimate_max_minutes: 600,
        }
    }
}

impl PlannerConfig {
    pub fn chunk_minutes(&self, focus: FocusNeed) -> i64 {
        match focus {
            FocusNeed::High => self.chunk_minutes_high,
            FocusNeed::Medium => self.chunk_minutes_medium,
            FocusNeed::Low => self.chunk_minutes_low,
        }
    }

    /// The hour window a preference maps to, if it restricts search at all.
    pub fn preferred_hours(&self, preferred: PreferredTime) -> Option<(u32, u32)> {
        match preferred {
            PreferredTime::Morning => Some(self.morning_hours),
            PreferredTime::Afternoon => Some(self.afternoon_hours),
            PreferredTime::Evening => Some(self.evening_hours),
            PreferredTime::Any => None,
        }
    }
}
