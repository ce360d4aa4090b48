use serde::Serialize;

use super::super::domain::ListingId;
use super::policy::{CheckVerdict, ModerationCheck};
use super::ModerationOutcome;

/// Moderator facing breakdown of an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModerationReport {
    pub listing_id: ListingId,
    pub decision: String,
    pub trust_score: u8,
    pub checks: Vec<CheckReport>,
    pub manual_review: bool,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub check: ModerationCheck,
    pub verdict: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ModerationReport {
    pub(crate) fn from_outcome(listing_id: ListingId, outcome: &ModerationOutcome) -> Self {
        let checks = outcome
            .verdicts
            .iter()
            .map(|(check, verdict)| CheckReport {
                check: *check,
                verdict: verdict.label(),
                detail: match verdict {
                    CheckVerdict::Passed => None,
                    CheckVerdict::Flagged(reason) => Some(reason.summary()),
                    CheckVerdict::Faulted(fault) => Some(fault.to_string()),
                },
            })
            .collect();

        let recommendation = match (&outcome.watch_term, outcome.manual_review) {
            (Some(term), _) => format!("review manually: text mentions '{term}'"),
            (None, true) => format!(
                "review manually: trust score {} is low",
                outcome.trust_score
            ),
            (None, false) => "no manual review needed".to_string(),
        };

        Self {
            listing_id,
            decision: outcome.decision.summary(),
            trust_score: outcome.trust_score,
            checks,
            manual_review: outcome.manual_review,
            recommendation,
        }
    }
}
