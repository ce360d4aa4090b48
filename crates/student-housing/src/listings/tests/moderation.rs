use super::common::*;
use crate::listings::domain::GeoPoint;
use crate::listings::moderation::{
    CheckVerdict, ContactKind, ModerationCheck, ModerationConfig, ModerationConfigError,
    ModerationDecision, ModerationEngine, ModerationFault, QualityIssue, RejectionReason,
    ScoreSignal,
};

#[test]
fn coherent_listing_is_approved_with_full_score() {
    let (_, locations) = seeded_store();
    let outcome = engine().evaluate(&listing_from(draft(&locations)));

    assert_eq!(outcome.decision, ModerationDecision::Approved);
    assert_eq!(outcome.trust_score, 100);
    assert!(!outcome.manual_review);
    assert!(outcome.watch_term.is_none());
    assert!(outcome.verdicts.iter().all(|(_, verdict)| verdict.is_passed()));
}

#[test]
fn short_title_and_description_fail_quality() {
    let (_, locations) = seeded_store();
    let mut listing = listing_from(draft(&locations));
    listing.title = "Studio".to_string();
    listing.description = "Small studio close to the campus, bright.".to_string();

    let outcome = engine().evaluate(&listing);

    assert_eq!(
        outcome.decision,
        ModerationDecision::Rejected(RejectionReason::InsufficientQuality(
            QualityIssue::TitleTooShort { chars: 6 }
        ))
    );
    assert_eq!(outcome.trust_score, 80);
}

#[test]
fn phone_number_is_rejected_as_suspicious() {
    let (_, locations) = seeded_store();
    let outcome = engine().evaluate(&listing_from(phone_draft(&locations)));

    assert_eq!(
        outcome.decision,
        ModerationDecision::Rejected(RejectionReason::SuspiciousContent(ContactKind::Phone))
    );
    assert_eq!(outcome.trust_score, 70);
}

#[test]
fn email_is_reported_before_phone() {
    let (_, locations) = seeded_store();
    let mut listing = listing_from(phone_draft(&locations));
    listing.description.push_str(" Or write to owner@example.org.");

    let outcome = engine().evaluate(&listing);

    assert_eq!(
        outcome.decision,
        ModerationDecision::Rejected(RejectionReason::SuspiciousContent(ContactKind::Email))
    );
}

#[test]
fn forbidden_term_wins_over_later_checks() {
    let (_, locations) = seeded_store();
    let mut listing = listing_from(phone_draft(&locations));
    listing.title = "Cheap room, certainly not a SCAM".to_string();

    let outcome = engine().evaluate(&listing);

    assert_eq!(
        outcome.decision,
        ModerationDecision::Rejected(RejectionReason::ForbiddenTerm {
            term: "scam".to_string()
        })
    );
    // forbidden terms and suspicious content both cost points
    assert_eq!(outcome.trust_score, 20);
    assert!(outcome.manual_review);
}

#[test]
fn zero_rooms_faults_into_pending_review() {
    let (_, locations) = seeded_store();
    let mut listing = listing_from(draft(&locations));
    listing.rooms = Some(0);

    let outcome = engine().evaluate(&listing);

    assert!(matches!(
        outcome.decision,
        ModerationDecision::PendingReview { ref reason } if reason.contains("data coherence")
    ));
    let coherence = outcome
        .verdicts
        .iter()
        .find(|(check, _)| *check == ModerationCheck::DataCoherence)
        .map(|(_, verdict)| verdict.clone());
    assert_eq!(
        coherence,
        Some(CheckVerdict::Faulted(ModerationFault::ZeroRooms))
    );
    assert_eq!(outcome.trust_score, 75);
}

#[test]
fn non_finite_threshold_faults_quality_check() {
    let (_, locations) = seeded_store();
    let mut config = ModerationConfig::default();
    config.quality.max_uppercase_ratio = f64::NAN;
    let engine = ModerationEngine::new(config).expect("patterns compile");

    let outcome = engine.evaluate(&listing_from(draft(&locations)));

    assert!(matches!(
        outcome.decision,
        ModerationDecision::PendingReview { .. }
    ));
}

#[test]
fn incoherent_area_per_room_is_rejected() {
    let (_, locations) = seeded_store();
    let mut listing = listing_from(draft(&locations));
    listing.area_sqm = 12;
    listing.rooms = Some(6);

    let outcome = engine().evaluate(&listing);

    assert!(matches!(
        outcome.decision,
        ModerationDecision::Rejected(RejectionReason::IncoherentData(_))
    ));
    assert_eq!(outcome.trust_score, 75);
}

#[test]
fn shouting_title_is_rejected() {
    let (_, locations) = seeded_store();
    let mut listing = listing_from(draft(&locations));
    listing.title = "BRIGHT STUDIO NEAR CAMPUS".to_string();

    let outcome = engine().evaluate(&listing);

    assert_eq!(
        outcome.decision,
        ModerationDecision::Rejected(RejectionReason::InsufficientQuality(
            QualityIssue::ShoutingTitle {
                uppercase_percent: 100
            }
        ))
    );
}

#[test]
fn presentation_bonuses_offset_penalties() {
    let (_, locations) = seeded_store();
    let mut listing = listing_from(draft(&locations));
    listing.title = "Studio".to_string();
    listing.images = vec![
        "a.jpg".to_string(),
        "b.jpg".to_string(),
        "c.jpg".to_string(),
    ];
    listing.coordinates = Some(GeoPoint::new(45.76, 4.85));

    let outcome = engine().evaluate(&listing);

    assert_eq!(outcome.trust_score, 95);
    let signals: Vec<ScoreSignal> = outcome.components.iter().map(|c| c.signal).collect();
    assert_eq!(
        signals,
        vec![
            ScoreSignal::Check(ModerationCheck::ContentQuality),
            ScoreSignal::Gallery,
            ScoreSignal::Coordinates,
        ]
    );
}

#[test]
fn watch_term_requests_manual_review_without_rejecting() {
    let (_, locations) = seeded_store();
    let mut listing = listing_from(draft(&locations));
    listing
        .description
        .push_str(" Available after a divorce, the flat is ready now.");

    let outcome = engine().evaluate(&listing);

    assert_eq!(outcome.decision, ModerationDecision::Approved);
    assert!(outcome.manual_review);
    assert_eq!(outcome.watch_term.as_deref(), Some("divorce"));
}

#[test]
fn evaluation_is_deterministic() {
    let (_, locations) = seeded_store();
    let engine = engine();
    let listing = listing_from(phone_draft(&locations));

    assert_eq!(engine.evaluate(&listing), engine.evaluate(&listing));
}

#[test]
fn report_lists_every_check() {
    let (_, locations) = seeded_store();
    let report = engine().report(&listing_from(phone_draft(&locations)));

    assert_eq!(report.checks.len(), 4);
    assert_eq!(report.checks[1].check, ModerationCheck::SuspiciousContent);
    assert_eq!(report.checks[1].verdict, "flagged");
    assert!(report.decision.starts_with("listing rejected"));
    assert_eq!(report.recommendation, "no manual review needed");
}

#[test]
fn policy_overrides_load_from_json() {
    let config = ModerationConfig::from_json(r#"{"forbidden_terms": ["colocation"]}"#)
        .expect("partial policy parses");

    assert_eq!(config.forbidden_terms, vec!["colocation".to_string()]);
    assert_eq!(config.quality.min_title_chars, 10);
}

#[test]
fn invalid_pattern_is_rejected_at_construction() {
    let config = ModerationConfig::from_json(r#"{"patterns": {"email": "("}}"#)
        .expect("policy parses");

    match ModerationEngine::new(config) {
        Err(ModerationConfigError::InvalidPattern { name, .. }) => assert_eq!(name, "email"),
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("pattern should not compile"),
    }
}

#[test]
fn score_floors_at_zero_when_every_check_fails() {
    let (_, locations) = seeded_store();
    let mut listing = listing_from(phone_draft(&locations));
    listing.title = "SCAM ROOM FOR STUDENTS".to_string();
    listing.price = rust_decimal::Decimal::from(10);

    let outcome = engine().evaluate(&listing);

    assert!(outcome
        .verdicts
        .iter()
        .all(|(_, verdict)| !verdict.is_passed()));
    assert_eq!(
        outcome.decision,
        ModerationDecision::Rejected(RejectionReason::ForbiddenTerm {
            term: "scam".to_string()
        })
    );
    assert_eq!(outcome.trust_score, 0);
    assert!(outcome.manual_review);
}

#[test]
fn score_caps_at_one_hundred_with_every_bonus() {
    let (_, locations) = seeded_store();
    let mut listing = listing_from(draft(&locations));
    listing.images = vec![
        "front.jpg".to_string(),
        "kitchen.jpg".to_string(),
        "bedroom.jpg".to_string(),
    ];
    listing.description = "Bright furnished studio on the third floor with a fitted kitchen, \
                           a separate shower room, a large desk by the window and fibre \
                           internet, five minutes on foot from the university library and \
                           the tram stop, in a quiet street with bakeries nearby."
        .to_string();
    listing.coordinates = Some(GeoPoint::new(45.7606, 4.859));

    let outcome = engine().evaluate(&listing);

    assert_eq!(outcome.decision, ModerationDecision::Approved);
    assert_eq!(outcome.trust_score, 100);
    let bonus: i16 = outcome
        .components
        .iter()
        .map(|component| component.points)
        .filter(|points| *points > 0)
        .sum();
    assert_eq!(bonus, 20);
}
