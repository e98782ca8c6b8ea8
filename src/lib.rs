//! Weekly time-grid scheduling engine.
//!
//! A week is 7 days of 15-minute slots between a configurable start and
//! end hour. Tasks are placed into the free slots by one of two
//! interchangeable strategies: a deterministic greedy packer, and a
//! validated pass-through for proposals produced by an external
//! generative service. The validator enforces the same invariants either
//! way, so the proposer is reduced to suggesting numbers.

pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use error::{AppError, AppResult, ProposerErrorCode};
pub use models::schedule::{
    BlockRecord, BlockedRange, ExistingBlock, FreeRange, ProposedBlock, RecurringSlot,
    RescheduleOutcome, RescheduleRequest, ScheduleOutcome, ScheduleRequest, UnscheduledReason,
    UnscheduledTask,
};
pub use models::settings::{PlannerConfig, DEFAULT_ESTIMATED_MINUTES};
pub use models::task::{FocusNeed, PreferredTime, SchedulableTask, TaskRecord, TaskStatus};
pub use services::estimator::DurationEstimator;
pub use services::planner::SchedulePlanner;
pub use services::proposer::{BlockProposer, LlmProposer, ProposerConfig};
pub use services::reschedule::RescheduleEngine;
pub use store::{InMemoryStore, ScheduleStore};
