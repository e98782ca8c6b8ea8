use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::models::settings::PlannerConfig;
use crate::services::prompt_templates::build_estimation_payload;
use crate::services::proposer::BlockProposer;

static MINUTES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("static regex"));

/// Clamp to the configured bounds and round to the nearest 15 minutes.
pub fn quantize_minutes(minutes: i64, config: &PlannerConfig) -> i64 {
    let clamped = minutes.clamp(config.estimate_min_minutes, config.estimate_max_minutes);
    let rounded = ((clamped as f64 / 15.0).round() as i64) * 15;
    rounded.clamp(config.estimate_min_minutes, config.estimate_max_minutes)
}

/// Pull the first integer out of free-form reply text and quantize it.
pub fn parse_minutes(text: &str, config: &PlannerConfig) -> Option<i64> {
    let digits = MINUTES_RE.find(text)?;
    let minutes: i64 = digits.as_str().parse().ok()?;
    Some(quantize_minutes(minutes, config))
}

/// Stateless duration estimation helper. Any failure yields "no estimate";
/// the caller substitutes its own default.
pub struct DurationEstimator {
    proposer: Option<Arc<dyn BlockProposer>>,
    config: PlannerConfig,
}

impl DurationEstimator {
    pub fn new(config: PlannerConfig, proposer: Option<Arc<dyn BlockProposer>>) -> Self {
        Self { proposer, config }
    }

    pub async fn estimate(
        &self,
        title: &str,
        description: Option<&str>,
        deadline: Option<DateTime<Utc>>,
    ) -> Option<i64> {
        let proposer = self.proposer.as_ref()?;
        let payload = build_estimation_payload(title, description, deadline);
        let reply = match proposer.estimate_duration(&payload).await {
            Ok(reply) => reply,
            Err(_) => return None, // already logged at the transport layer
        };
        let minutes = parse_minutes(&reply, &self.config);
        debug!(target: "timegrid::estimator", ?minutes, "duration estimate parsed");
        minutes
    }
}
