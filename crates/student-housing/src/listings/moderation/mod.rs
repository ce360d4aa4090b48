mod config;
mod policy;
mod report;
mod rules;

pub use config::{
    CoherenceThresholds, ContentPatterns, ModerationConfig, ModerationConfigError,
    QualityThresholds, ScoringWeights,
};
pub use policy::{
    CheckVerdict, CoherenceIssue, ContactKind, ModerationCheck, ModerationDecision,
    ModerationFault, QualityIssue, RejectionReason,
};
pub use report::{CheckReport, ModerationReport};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::domain::{Listing, ModerationSnapshot};
use rules::CompiledPatterns;

/// Pure evaluator applying the configured moderation policy to a listing.
pub struct ModerationEngine {
    config: ModerationConfig,
    patterns: CompiledPatterns,
}

impl ModerationEngine {
    pub fn new(config: ModerationConfig) -> Result<Self, ModerationConfigError> {
        let patterns = CompiledPatterns::compile(&config.patterns)?;
        Ok(Self { config, patterns })
    }

    pub fn config(&self) -> &ModerationConfig {
        &self.config
    }

    pub fn evaluate(&self, listing: &Listing) -> ModerationOutcome {
        let verdicts: Vec<(ModerationCheck, CheckVerdict)> = ModerationCheck::ordered()
            .into_iter()
            .map(|check| {
                let verdict = rules::run_check(check, listing, &self.config, &self.patterns);
                if let CheckVerdict::Faulted(fault) = &verdict {
                    error!(
                        listing_id = %listing.id,
                        check = check.label(),
                        error = %fault,
                        "moderation check faulted"
                    );
                }
                (check, verdict)
            })
            .collect();

        let decision = policy::decide(&verdicts);
        let (components, trust_score) = rules::score_listing(listing, &verdicts, &self.config);
        let watch_term = rules::watch_term(listing, &self.config).map(str::to_string);
        let manual_review =
            trust_score < self.config.scoring.manual_review_below || watch_term.is_some();

        debug!(
            listing_id = %listing.id,
            decision = %decision.summary(),
            trust_score,
            manual_review,
            "listing evaluated"
        );

        ModerationOutcome {
            decision,
            trust_score,
            manual_review,
            watch_term,
            components,
            verdicts,
        }
    }

    pub fn report(&self, listing: &Listing) -> ModerationReport {
        ModerationReport::from_outcome(listing.id, &self.evaluate(listing))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSignal {
    Check(ModerationCheck),
    Gallery,
    RichDescription,
    Coordinates,
}

/// Discrete contribution to the trust score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub signal: ScoreSignal,
    pub points: i16,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationOutcome {
    pub decision: ModerationDecision,
    pub trust_score: u8,
    pub manual_review: bool,
    pub watch_term: Option<String>,
    pub components: Vec<ScoreComponent>,
    pub verdicts: Vec<(ModerationCheck, CheckVerdict)>,
}

impl ModerationOutcome {
    pub fn snapshot(&self, evaluated_at: DateTime<Utc>) -> ModerationSnapshot {
        ModerationSnapshot {
            trust_score: self.trust_score,
            manual_review: self.manual_review,
            evaluated_at,
        }
    }
}
