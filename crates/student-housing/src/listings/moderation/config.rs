use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Moderation policy loaded as data so word lists can change without a rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    pub forbidden_terms: Vec<String>,
    pub watch_terms: Vec<String>,
    pub patterns: ContentPatterns,
    pub quality: QualityThresholds,
    pub coherence: CoherenceThresholds,
    pub scoring: ScoringWeights,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            forbidden_terms: to_owned(&[
                "arnaque",
                "fraude",
                "scam",
                "fake",
                "bitcoin",
                "crypto",
                "pyramide",
                "mlm",
                "ponzi",
                "gratuit",
                "urgent",
                "rapide",
                "facile",
                "sans effort",
                "miracle",
                "garanti",
                "100%",
                "prostitution",
                "escort",
                "sex",
                "drogue",
                "cannabis",
            ]),
            watch_terms: to_owned(&[
                "accident",
                "décès",
                "urgent",
                "déménagement",
                "divorce",
                "expulsion",
                "eviction",
                "saisie",
                "vente",
                "succession",
            ]),
            patterns: ContentPatterns::default(),
            quality: QualityThresholds::default(),
            coherence: CoherenceThresholds::default(),
            scoring: ScoringWeights::default(),
        }
    }
}

impl ModerationConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ModerationConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ModerationConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| match source {
            ModerationConfigError::Parse { source, .. } => ModerationConfigError::Parse {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, ModerationConfigError> {
        serde_json::from_str(raw).map_err(|source| ModerationConfigError::Parse { path: None, source })
    }
}

/// Regular expressions flagging off-platform contact details and bogus prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPatterns {
    pub email: String,
    pub phone: String,
    pub url: String,
    pub free_price: String,
    pub repeated_punctuation: String,
}

impl Default for ContentPatterns {
    fn default() -> Self {
        Self {
            email: r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}".to_string(),
            phone: r"(?:\+33|\b0)[1-9](?:[\s.-]?[0-9]{2}){4}\b".to_string(),
            url: r"(?i)(?:https?://[\w.-]+|\bwww\.[\w-]+\.[a-z]{2,})".to_string(),
            free_price: r"(?i)(?:\b0+\s*(?:€|eur\b|euros?\b|mad\b|dh\b)|€\s*0+\b|\bgratuit|\bfree\b)"
                .to_string(),
            repeated_punctuation: r"!{3,}|\?{3,}|\.{4,}".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    pub min_title_chars: usize,
    pub min_description_chars: usize,
    /// Share of uppercase letters in the title above which it reads as shouting.
    pub max_uppercase_ratio: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_title_chars: 10,
            min_description_chars: 50,
            max_uppercase_ratio: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoherenceThresholds {
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub min_area_sqm: u32,
    pub max_area_sqm: u32,
    pub min_area_per_room: f64,
    pub max_area_per_room: f64,
}

impl Default for CoherenceThresholds {
    fn default() -> Self {
        Self {
            min_price: Decimal::from(50),
            max_price: Decimal::from(50_000),
            min_area_sqm: 5,
            max_area_sqm: 1000,
            min_area_per_room: 5.0,
            max_area_per_room: 200.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub forbidden_terms_penalty: i16,
    pub suspicious_content_penalty: i16,
    pub quality_penalty: i16,
    pub coherence_penalty: i16,
    pub gallery_bonus: i16,
    pub gallery_min_images: usize,
    pub rich_description_bonus: i16,
    pub rich_description_chars: usize,
    pub coordinates_bonus: i16,
    pub manual_review_below: u8,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            forbidden_terms_penalty: 50,
            suspicious_content_penalty: 30,
            quality_penalty: 20,
            coherence_penalty: 25,
            gallery_bonus: 10,
            gallery_min_images: 3,
            rich_description_bonus: 5,
            rich_description_chars: 200,
            coordinates_bonus: 5,
            manual_review_below: 60,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModerationConfigError {
    #[error("unable to read moderation policy {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("moderation policy {path:?} is not valid JSON: {source}")]
    Parse {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },
    #[error("moderation pattern '{name}' does not compile: {source}")]
    InvalidPattern {
        name: &'static str,
        source: regex::Error,
    },
}

fn to_owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
