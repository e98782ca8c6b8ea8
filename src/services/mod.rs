pub mod estimator;
pub mod occupancy;
pub mod planner;
pub mod prompt_templates;
pub mod proposer;
pub mod reschedule;
pub mod scheduler;
pub mod schedule_utils;
pub mod time_grid;
pub mod validator;
