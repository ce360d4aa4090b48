use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Automatic checks, evaluated in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationCheck {
    ForbiddenTerms,
    SuspiciousContent,
    ContentQuality,
    DataCoherence,
}

impl ModerationCheck {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::ForbiddenTerms,
            Self::SuspiciousContent,
            Self::ContentQuality,
            Self::DataCoherence,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ForbiddenTerms => "forbidden terms",
            Self::SuspiciousContent => "suspicious content",
            Self::ContentQuality => "content quality",
            Self::DataCoherence => "data coherence",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    Email,
    Phone,
    Url,
    FreePrice,
}

impl ContactKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Email => "e-mail address",
            Self::Phone => "phone number",
            Self::Url => "external link",
            Self::FreePrice => "free or zero price",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum QualityIssue {
    TitleTooShort { chars: usize },
    DescriptionTooShort { chars: usize },
    ShoutingTitle { uppercase_percent: u8 },
    RepeatedPunctuation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum CoherenceIssue {
    PriceOutOfRange { price: Decimal },
    AreaOutOfRange { area_sqm: u32 },
    AreaPerRoomOutOfRange { sqm_per_room: f64 },
}

/// Reasons attached to an automatic rejection, surfaced to the owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectionReason {
    ForbiddenTerm { term: String },
    SuspiciousContent(ContactKind),
    InsufficientQuality(QualityIssue),
    IncoherentData(CoherenceIssue),
}

impl RejectionReason {
    pub fn summary(&self) -> String {
        match self {
            Self::ForbiddenTerm { term } => {
                format!("listing contains the forbidden term '{term}'")
            }
            Self::SuspiciousContent(kind) => {
                format!("listing exposes a {} outside the platform", kind.label())
            }
            Self::InsufficientQuality(issue) => match issue {
                QualityIssue::TitleTooShort { chars } => {
                    format!("title is too short ({chars} characters)")
                }
                QualityIssue::DescriptionTooShort { chars } => {
                    format!("description is too short ({chars} characters)")
                }
                QualityIssue::ShoutingTitle { uppercase_percent } => {
                    format!("title is {uppercase_percent}% uppercase")
                }
                QualityIssue::RepeatedPunctuation => {
                    "text contains repeated punctuation".to_string()
                }
            },
            Self::IncoherentData(issue) => match issue {
                CoherenceIssue::PriceOutOfRange { price } => {
                    format!("price {price} is outside the plausible range")
                }
                CoherenceIssue::AreaOutOfRange { area_sqm } => {
                    format!("area {area_sqm} m² is outside the plausible range")
                }
                CoherenceIssue::AreaPerRoomOutOfRange { sqm_per_room } => {
                    format!("{sqm_per_room:.1} m² per room is not plausible")
                }
            },
        }
    }
}

/// Internal failure of a check; never turns into a rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ModerationFault {
    #[error("room count of zero cannot be evaluated")]
    ZeroRooms,
    #[error("threshold '{name}' is not a finite number")]
    NonFiniteThreshold { name: String },
}

/// Outcome of a single check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "detail", rename_all = "snake_case")]
pub enum CheckVerdict {
    Passed,
    Flagged(RejectionReason),
    Faulted(ModerationFault),
}

impl CheckVerdict {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Flagged(_) => "flagged",
            Self::Faulted(_) => "faulted",
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModerationDecision {
    Approved,
    Rejected(RejectionReason),
    PendingReview { reason: String },
}

impl ModerationDecision {
    pub fn summary(&self) -> String {
        match self {
            Self::Approved => "listing approved".to_string(),
            Self::Rejected(reason) => format!("listing rejected: {}", reason.summary()),
            Self::PendingReview { reason } => format!("manual review required: {reason}"),
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// First non-passing verdict in check order decides.
pub(crate) fn decide(verdicts: &[(ModerationCheck, CheckVerdict)]) -> ModerationDecision {
    for (check, verdict) in verdicts {
        match verdict {
            CheckVerdict::Passed => continue,
            CheckVerdict::Flagged(reason) => return ModerationDecision::Rejected(reason.clone()),
            CheckVerdict::Faulted(fault) => {
                return ModerationDecision::PendingReview {
                    reason: format!("{} check failed: {fault}", check.label()),
                }
            }
        }
    }
    ModerationDecision::Approved
}
