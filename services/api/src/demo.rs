use crate::infra::{load_engine, seed_locations};
use chrono::{Duration, Utc};
use clap::Args;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use student_housing::error::AppError;
use student_housing::listings::{
    Actor, Amenities, City, HousingType, InMemoryListingStore, Listing, ListingDraft,
    ListingRepository, ListingService, LogNotifier, Neighborhood, PageRequest, RepositoryError,
    Role, SearchCriteria, UserId,
};

#[derive(Args, Debug)]
pub(crate) struct ModerateArgs {
    /// JSON listing draft to evaluate.
    pub(crate) draft: PathBuf,
    /// Moderation policy overriding the built-in defaults.
    #[arg(long)]
    pub(crate) policy: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Location seed file; the built-in cities are used otherwise.
    #[arg(long)]
    pub(crate) locations: Option<PathBuf>,
    /// How far ahead the demo clock jumps before sweeping expired listings.
    #[arg(long, default_value_t = 31)]
    pub(crate) sweep_after_days: i64,
}

/// Evaluates a draft without storing it and prints the moderation report.
pub(crate) fn run_moderation_report(args: ModerateArgs) -> Result<(), AppError> {
    let ModerateArgs { draft, policy } = args;

    let engine = load_engine(policy.as_deref())?;
    let raw = std::fs::read_to_string(&draft)?;
    let draft: ListingDraft = serde_json::from_str(&raw).map_err(|err| {
        AppError::InvalidInput(format!("{}: {err}", draft.display()))
    })?;

    let now = Utc::now();
    let listing = Listing::from_draft(draft, UserId(0), now, now + Duration::days(30));
    let report = engine.report(&listing);
    let rendered = serde_json::to_string_pretty(&report)
        .map_err(|err| AppError::InvalidInput(err.to_string()))?;
    println!("{rendered}");
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        locations,
        sweep_after_days,
    } = args;

    let store = Arc::new(InMemoryListingStore::new());
    let seeded = seed_locations(&store, locations.as_deref())?;
    let service = ListingService::new(store.clone(), Arc::new(LogNotifier), load_engine(None)?);

    println!("== Student housing listings demo ==");
    println!(
        "Seeded {} cities and {} neighborhoods",
        seeded.cities, seeded.neighborhoods
    );

    let (city, neighborhood) = first_location(&store)?;
    println!("Publishing into {}", city.display_name());

    let student = Actor::new(UserId(100), Role::User, "student@example.org");
    let visitor = Actor::new(UserId(101), Role::User, "visitor@example.org");

    let drafts = [
        (
            "clean",
            sample_draft(
                &city,
                &neighborhood,
                "Sunny studio next to the campus",
                "Quiet furnished studio with a kitchenette, a large desk and fast fibre, \
                 a short walk from the main lecture halls and the tram stop.",
            ),
        ),
        (
            "phone",
            sample_draft(
                &city,
                &neighborhood,
                "Room in a shared flat downtown",
                "Large bedroom in a friendly flat share, utilities included. Call me on \
                 06 12 34 56 78 to arrange a visit any evening this week.",
            ),
        ),
        (
            "watch term",
            sample_draft(
                &city,
                &neighborhood,
                "Family apartment available quickly",
                "Spacious apartment freed up after a divorce, available from next month, \
                 ideal for two students looking for a calm place to study.",
            ),
        ),
    ];

    let mut published = Vec::new();
    for (label, draft) in drafts {
        let listing = service.create_listing(draft, &student)?;
        let score = listing
            .moderation
            .as_ref()
            .map(|snapshot| snapshot.trust_score.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "- [{label}] #{} {} -> {} (trust score {score})",
            listing.id, listing.title, listing.status
        );
        if let Some(comment) = listing.moderation_comment.as_deref() {
            println!("    comment: {comment}");
        }
        published.push(listing);
    }

    let page = service.search_listings(
        SearchCriteria {
            city_id: Some(city.id),
            max_price: Some(Decimal::from(600)),
            ..SearchCriteria::default()
        },
        PageRequest::default(),
    )?;
    println!(
        "\nSearch in {} under 600: {} result(s)",
        city.name, page.total_elements
    );
    for listing in &page.items {
        println!("- #{} {} at {}", listing.id, listing.title, listing.price);
    }

    if let Some(first) = published.first() {
        let favorite = service.toggle_favorite(first.id, true, &visitor)?;
        println!(
            "\nListing #{} now has {} favorite(s)",
            favorite.id, favorite.favorite_count
        );
    }

    let sweep_at = Utc::now() + Duration::days(sweep_after_days);
    let sweep = service.sweep_expired_at(sweep_at)?;
    println!(
        "\nExpiration sweep at +{sweep_after_days} days: {} expired, {} failed",
        sweep.processed, sweep.failed
    );

    let stats = service.statistics()?;
    println!("\nStatistics ({} listings)", stats.total);
    for (status, count) in &stats.by_status {
        println!("- {status}: {count}");
    }
    for (city, count) in &stats.by_city {
        println!("- live in {city}: {count}");
    }

    Ok(())
}

fn first_location(store: &InMemoryListingStore) -> Result<(City, Neighborhood), AppError> {
    for city in store.cities().map_err(listing_store_error)? {
        let neighborhoods = store.neighborhoods(city.id).map_err(listing_store_error)?;
        if let Some(neighborhood) = neighborhoods.into_iter().next() {
            return Ok((city, neighborhood));
        }
    }
    Err(AppError::InvalidInput(
        "location seed has no city with a neighborhood".to_string(),
    ))
}

fn listing_store_error(err: RepositoryError) -> AppError {
    AppError::Listing(err.into())
}

fn sample_draft(
    city: &City,
    neighborhood: &Neighborhood,
    title: &str,
    description: &str,
) -> ListingDraft {
    ListingDraft {
        title: title.to_string(),
        description: description.to_string(),
        price: Decimal::new(52_000, 2),
        housing_type: HousingType::Studio,
        area_sqm: 24,
        rooms: Some(1),
        address: format!("8 avenue des Facultes, {}", city.name),
        city_id: city.id,
        neighborhood_id: neighborhood.id,
        coordinates: neighborhood.coordinates.or(city.coordinates),
        images: Vec::new(),
        amenities: Amenities {
            furnished: true,
            internet: true,
            ..Amenities::default()
        },
        expires_at: None,
    }
}
