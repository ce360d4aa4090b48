use regex::Regex;

use super::super::domain::Listing;
use super::config::{ContentPatterns, ModerationConfig, ModerationConfigError};
use super::policy::{
    CheckVerdict, CoherenceIssue, ContactKind, ModerationCheck, ModerationFault, QualityIssue,
    RejectionReason,
};
use super::{ScoreComponent, ScoreSignal};

pub(crate) struct CompiledPatterns {
    email: Regex,
    phone: Regex,
    url: Regex,
    free_price: Regex,
    repeated_punctuation: Regex,
}

impl CompiledPatterns {
    pub(crate) fn compile(patterns: &ContentPatterns) -> Result<Self, ModerationConfigError> {
        Ok(Self {
            email: compile("email", &patterns.email)?,
            phone: compile("phone", &patterns.phone)?,
            url: compile("url", &patterns.url)?,
            free_price: compile("free_price", &patterns.free_price)?,
            repeated_punctuation: compile(
                "repeated_punctuation",
                &patterns.repeated_punctuation,
            )?,
        })
    }
}

fn compile(name: &'static str, pattern: &str) -> Result<Regex, ModerationConfigError> {
    Regex::new(pattern).map_err(|source| ModerationConfigError::InvalidPattern { name, source })
}

pub(crate) fn run_check(
    check: ModerationCheck,
    listing: &Listing,
    config: &ModerationConfig,
    patterns: &CompiledPatterns,
) -> CheckVerdict {
    let result = match check {
        ModerationCheck::ForbiddenTerms => forbidden_terms(listing, config),
        ModerationCheck::SuspiciousContent => suspicious_content(listing, patterns),
        ModerationCheck::ContentQuality => content_quality(listing, config, patterns),
        ModerationCheck::DataCoherence => data_coherence(listing, config),
    };

    match result {
        Ok(None) => CheckVerdict::Passed,
        Ok(Some(reason)) => CheckVerdict::Flagged(reason),
        Err(fault) => CheckVerdict::Faulted(fault),
    }
}

fn combined_text(listing: &Listing) -> String {
    format!("{} {}", listing.title, listing.description)
}

fn forbidden_terms(
    listing: &Listing,
    config: &ModerationConfig,
) -> Result<Option<RejectionReason>, ModerationFault> {
    let content = combined_text(listing).to_lowercase();
    let hit = config
        .forbidden_terms
        .iter()
        .map(|term| term.trim().to_lowercase())
        .find(|term| !term.is_empty() && content.contains(term.as_str()));

    Ok(hit.map(|term| RejectionReason::ForbiddenTerm { term }))
}

fn suspicious_content(
    listing: &Listing,
    patterns: &CompiledPatterns,
) -> Result<Option<RejectionReason>, ModerationFault> {
    let content = combined_text(listing);

    let kind = if patterns.email.is_match(&content) {
        Some(ContactKind::Email)
    } else if patterns.phone.is_match(&content) {
        Some(ContactKind::Phone)
    } else if patterns.url.is_match(&content) {
        Some(ContactKind::Url)
    } else if patterns.free_price.is_match(&content.to_lowercase()) {
        Some(ContactKind::FreePrice)
    } else {
        None
    };

    Ok(kind.map(RejectionReason::SuspiciousContent))
}

fn content_quality(
    listing: &Listing,
    config: &ModerationConfig,
    patterns: &CompiledPatterns,
) -> Result<Option<RejectionReason>, ModerationFault> {
    let thresholds = &config.quality;
    if !thresholds.max_uppercase_ratio.is_finite() {
        return Err(ModerationFault::NonFiniteThreshold {
            name: "max_uppercase_ratio".to_string(),
        });
    }

    let title_chars = listing.title.chars().count();
    if title_chars < thresholds.min_title_chars {
        return Ok(Some(RejectionReason::InsufficientQuality(
            QualityIssue::TitleTooShort { chars: title_chars },
        )));
    }

    let description_chars = listing.description.chars().count();
    if description_chars < thresholds.min_description_chars {
        return Ok(Some(RejectionReason::InsufficientQuality(
            QualityIssue::DescriptionTooShort {
                chars: description_chars,
            },
        )));
    }

    let letters = listing.title.chars().filter(|ch| ch.is_alphabetic()).count();
    let uppercase = listing.title.chars().filter(|ch| ch.is_uppercase()).count();
    if letters > 0 {
        let ratio = uppercase as f64 / letters as f64;
        if ratio > thresholds.max_uppercase_ratio {
            return Ok(Some(RejectionReason::InsufficientQuality(
                QualityIssue::ShoutingTitle {
                    uppercase_percent: (ratio * 100.0).round() as u8,
                },
            )));
        }
    }

    if patterns.repeated_punctuation.is_match(&listing.title)
        || patterns.repeated_punctuation.is_match(&listing.description)
    {
        return Ok(Some(RejectionReason::InsufficientQuality(
            QualityIssue::RepeatedPunctuation,
        )));
    }

    Ok(None)
}

fn data_coherence(
    listing: &Listing,
    config: &ModerationConfig,
) -> Result<Option<RejectionReason>, ModerationFault> {
    let thresholds = &config.coherence;

    if listing.price < thresholds.min_price || listing.price > thresholds.max_price {
        return Ok(Some(RejectionReason::IncoherentData(
            CoherenceIssue::PriceOutOfRange {
                price: listing.price,
            },
        )));
    }

    if listing.area_sqm < thresholds.min_area_sqm || listing.area_sqm > thresholds.max_area_sqm {
        return Ok(Some(RejectionReason::IncoherentData(
            CoherenceIssue::AreaOutOfRange {
                area_sqm: listing.area_sqm,
            },
        )));
    }

    if let Some(rooms) = listing.rooms {
        if rooms == 0 {
            return Err(ModerationFault::ZeroRooms);
        }
        let per_room = f64::from(listing.area_sqm) / f64::from(rooms);
        if !per_room.is_finite() {
            return Err(ModerationFault::NonFiniteThreshold {
                name: "area_per_room".to_string(),
            });
        }
        if per_room < thresholds.min_area_per_room || per_room > thresholds.max_area_per_room {
            return Ok(Some(RejectionReason::IncoherentData(
                CoherenceIssue::AreaPerRoomOutOfRange {
                    sqm_per_room: per_room,
                },
            )));
        }
    }

    Ok(None)
}

/// Trust score from the per-check verdicts plus presentation bonuses, clamped to 0..=100.
pub(crate) fn score_listing(
    listing: &Listing,
    verdicts: &[(ModerationCheck, CheckVerdict)],
    config: &ModerationConfig,
) -> (Vec<ScoreComponent>, u8) {
    let weights = &config.scoring;
    let mut components = Vec::new();
    let mut total: i32 = 100;

    for (check, verdict) in verdicts {
        let penalty = match check {
            ModerationCheck::ForbiddenTerms => weights.forbidden_terms_penalty,
            ModerationCheck::SuspiciousContent => weights.suspicious_content_penalty,
            ModerationCheck::ContentQuality => weights.quality_penalty,
            ModerationCheck::DataCoherence => weights.coherence_penalty,
        };
        let notes = match verdict {
            CheckVerdict::Passed => continue,
            CheckVerdict::Flagged(reason) => reason.summary(),
            CheckVerdict::Faulted(fault) => format!("check could not complete: {fault}"),
        };
        components.push(ScoreComponent {
            signal: ScoreSignal::Check(*check),
            points: -penalty,
            notes,
        });
        total -= i32::from(penalty);
    }

    if listing.images.len() >= weights.gallery_min_images {
        components.push(ScoreComponent {
            signal: ScoreSignal::Gallery,
            points: weights.gallery_bonus,
            notes: format!("{} images attached", listing.images.len()),
        });
        total += i32::from(weights.gallery_bonus);
    }

    let description_chars = listing.description.chars().count();
    if description_chars > weights.rich_description_chars {
        components.push(ScoreComponent {
            signal: ScoreSignal::RichDescription,
            points: weights.rich_description_bonus,
            notes: format!("description has {description_chars} characters"),
        });
        total += i32::from(weights.rich_description_bonus);
    }

    if listing.coordinates.is_some() {
        components.push(ScoreComponent {
            signal: ScoreSignal::Coordinates,
            points: weights.coordinates_bonus,
            notes: "listing is geolocated".to_string(),
        });
        total += i32::from(weights.coordinates_bonus);
    }

    (components, total.clamp(0, 100) as u8)
}

pub(crate) fn watch_term<'a>(listing: &Listing, config: &'a ModerationConfig) -> Option<&'a str> {
    let content = combined_text(listing).to_lowercase();
    config
        .watch_terms
        .iter()
        .map(String::as_str)
        .find(|term| {
            let needle = term.trim().to_lowercase();
            !needle.is_empty() && content.contains(&needle)
        })
}
