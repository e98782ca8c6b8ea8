use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Time-of-day preference used to bias slot search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PreferredTime {
    Morning,
    Afternoon,
    Evening,
    #[default]
    Any,
}

/// Focus need determines the chunk size a splittable task is broken into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FocusNeed {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

fn default_splittable() -> bool {
    true
}

/// A task as seen by one scheduling call. Immutable for the call's duration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulableTask {
    pub id: String,
    pub title: String,
    pub estimated_minutes: i64,
    pub deadline: DateTime<Utc>,
    pub importance: i64,
    #[serde(default)]
    pub priority_tag: Option<String>,
    #[serde(default = "default_splittable")]
    pub splittable: bool,
    #[serde(default)]
    pub preferred_time: PreferredTime,
    #[serde(default)]
    pub focus_need: FocusNeed,
}

/// A stored task, as the reschedule engine reads it from the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub estimated_minutes: i64,
    pub deadline: DateTime<Utc>,
    pub importance: i64,
    #[serde(default)]
    pub priority_tag: Option<String>,
    #[serde(default = "default_splittable")]
    pub splittable: bool,
    #[serde(default)]
    pub preferred_time: PreferredTime,
    #[serde(default)]
    pub focus_need: FocusNeed,
    #[serde(default)]
    pub status: TaskStatus,
}

impl TaskRecord {
    /// Carry the task's attributes into a scheduling call with a
    /// recomputed remaining duration.
    pub fn to_schedulable(&self, remaining_minutes: i64) -> SchedulableTask {
        SchedulableTask {
            id: self.id.clone(),
            title: self.title.clone(),
            estimated_minutes: remaining_minutes,
            deadline: self.deadline,
            importance: self.importance,
            priority_tag: self.priority_tag.clone(),
            splittable: self.splittable,
            preferred_time: self.preferred_time,
            focus_need: self.focus_need,
        }
    }
}
