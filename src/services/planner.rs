use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::AppResult;
use crate::models::schedule::{ScheduleOutcome, ScheduleRequest};
use crate::models::settings::PlannerConfig;
use crate::services::occupancy::build_occupancy;
use crate::services::prompt_templates::build_proposal_payload;
use crate::services::proposer::{BlockProposer, ProposerConfig};
use crate::services::scheduler::greedy_schedule;
use crate::services::validator::validate_proposal;

/// The strategy chain: try the configured generative proposer, validate its
/// batch, and fall back to the deterministic packer on any rejection or
/// transport failure. The deterministic path is total, so `plan` always
/// answers for every task.
pub struct SchedulePlanner {
    proposer: Option<Arc<dyn BlockProposer>>,
    config: PlannerConfig,
}

impl SchedulePlanner {
    /// A planner without a proposer runs the deterministic strategy only.
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            proposer: None,
            config,
        }
    }

    pub fn with_proposer(config: PlannerConfig, proposer: Arc<dyn BlockProposer>) -> Self {
        Self {
            proposer: Some(proposer),
            config,
        }
    }

    /// Wire the proposer from the process environment; no API key means
    /// deterministic-only, which is not an error.
    pub fn from_env(config: PlannerConfig) -> AppResult<Self> {
        let proposer = ProposerConfig::from_env()
            .build()?
            .map(|provider| Arc::new(provider) as Arc<dyn BlockProposer>);
        Ok(Self { proposer, config })
    }

    pub fn planner_config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn has_proposer(&self) -> bool {
        self.proposer.is_some()
    }

    pub async fn plan(&self, request: &ScheduleRequest) -> AppResult<ScheduleOutcome> {
        request.validate()?;
        if request.tasks.is_empty() {
            return Ok(ScheduleOutcome::default());
        }

        let grid = build_occupancy(request)?;

        if let Some(proposer) = &self.proposer {
            let payload = build_proposal_payload(&request.tasks, &grid.free_ranges());
            match proposer.propose_blocks(&payload).await {
                Ok(reply) => {
                    if let Some(outcome) = validate_proposal(request, &grid, &reply) {
                        debug!(
                            target: "timegrid::planner",
                            blocks = outcome.proposed_blocks.len(),
                            "generative proposal accepted"
                        );
                        return Ok(outcome);
                    }
                    debug!(
                        target: "timegrid::planner",
                        "generative proposal rejected, falling back"
                    );
                }
                Err(error) => {
                    warn!(
                        target: "timegrid::planner",
                        error = %error,
                        "proposer call failed, falling back"
                    );
                }
            }
        }

        Ok(greedy_schedule(request, grid, &self.config))
    }

    /// The deterministic strategy alone, bypassing any configured proposer.
    pub fn plan_deterministic(&self, request: &ScheduleRequest) -> AppResult<ScheduleOutcome> {
        request.validate()?;
        if request.tasks.is_empty() {
            return Ok(ScheduleOutcome::default());
        }
        let grid = build_occupancy(request)?;
        Ok(greedy_schedule(request, grid, &self.config))
    }
}
