use std::sync::Arc;

use chrono::{Duration, Utc};

use super::common::*;
use crate::listings::domain::ListingStatus;
use crate::listings::repository::{ListingRepository, RepositoryError};
use crate::listings::{CounterMaintainer, CounterSnapshot, ListingService, ListingServiceError};

#[test]
fn creation_counts_listing_in_city_and_neighborhood() {
    let (service, _, locations) = build_service();

    service
        .create_listing(draft(&locations), &owner())
        .expect("approved listing");
    service
        .create_listing(phone_draft(&locations), &owner())
        .expect("rejected listing");

    assert_eq!(city(&service, locations.lyon).listing_count, 2);
    assert_eq!(neighborhood(&service, locations.part_dieu).listing_count, 2);
    assert_eq!(neighborhood(&service, locations.croix_rousse).listing_count, 0);
    assert_eq!(city(&service, locations.paris).listing_count, 0);
}

#[test]
fn relocation_transfers_one_count() {
    let (service, _, locations) = build_service();
    let listing = service
        .create_listing(draft(&locations), &owner())
        .expect("created");

    let mut moved = draft(&locations);
    moved.neighborhood_id = locations.croix_rousse;
    service
        .update_listing(listing.id, moved, &admin())
        .expect("moved within the city");
    assert_eq!(city(&service, locations.lyon).listing_count, 1);
    assert_eq!(neighborhood(&service, locations.part_dieu).listing_count, 0);
    assert_eq!(neighborhood(&service, locations.croix_rousse).listing_count, 1);

    let mut relocated = draft(&locations);
    relocated.city_id = locations.paris;
    relocated.neighborhood_id = locations.latin_quarter;
    service
        .update_listing(listing.id, relocated, &admin())
        .expect("moved to another city");
    assert_eq!(city(&service, locations.lyon).listing_count, 0);
    assert_eq!(neighborhood(&service, locations.croix_rousse).listing_count, 0);
    assert_eq!(city(&service, locations.paris).listing_count, 1);
    assert_eq!(neighborhood(&service, locations.latin_quarter).listing_count, 1);
}

#[test]
fn content_update_in_place_keeps_counts() {
    let (service, _, locations) = build_service();
    let listing = service
        .create_listing(phone_draft(&locations), &owner())
        .expect("created");

    service
        .update_listing(listing.id, draft(&locations), &owner())
        .expect("updated");

    assert_eq!(city(&service, locations.lyon).listing_count, 1);
    assert_eq!(neighborhood(&service, locations.part_dieu).listing_count, 1);
}

#[test]
fn deletion_releases_counts_exactly_once() {
    let (service, _, locations) = build_service();
    let listing = service
        .create_listing(draft(&locations), &owner())
        .expect("created");

    service.delete_listing(listing.id, &owner()).expect("deleted");
    service
        .delete_listing(listing.id, &owner())
        .expect("repeat delete");

    assert_eq!(city(&service, locations.lyon).listing_count, 0);
    assert_eq!(neighborhood(&service, locations.part_dieu).listing_count, 0);
}

#[test]
fn status_changes_do_not_touch_counts() {
    let (service, _, locations) = build_service();
    let listing = service
        .create_listing(draft(&locations), &owner())
        .expect("created");

    service
        .sweep_expired_at(Utc::now() + Duration::days(31))
        .expect("sweep");
    assert_eq!(stored(&service, listing.id).status, ListingStatus::Expired);
    assert_eq!(city(&service, locations.lyon).listing_count, 1);

    service
        .delete_listing(listing.id, &owner())
        .expect("expired listings can be deleted");
    assert_eq!(city(&service, locations.lyon).listing_count, 0);
}

#[test]
fn counter_failure_rolls_back_the_whole_creation() {
    let (store, locations) = seeded_store();
    let service = ListingService::new(
        Arc::new(CounterOutageStore {
            inner: store.clone(),
        }),
        Arc::new(RecordingNotifier::default()),
        engine(),
    );

    match service.create_listing(draft(&locations), &owner()) {
        Err(ListingServiceError::Repository(RepositoryError::Unavailable(_))) => {}
        other => panic!("expected repository failure, got {other:?}"),
    }

    assert!(store.all_listings().expect("list").is_empty());
    let lyon = store
        .fetch_city(locations.lyon)
        .expect("fetch")
        .expect("city exists");
    assert_eq!(lyon.listing_count, 0);
}

#[test]
fn decrements_stop_at_zero() {
    let (store, locations) = seeded_store();
    let counters = CounterMaintainer;

    let snapshot = store
        .transaction(|uow| -> Result<CounterSnapshot, RepositoryError> {
            counters.listing_removed(uow, locations.lyon, locations.part_dieu)
        })
        .expect("decrement");

    assert_eq!(
        snapshot,
        CounterSnapshot {
            city: 0,
            neighborhood: 0
        }
    );
}

#[test]
fn unchanged_location_is_not_transferred() {
    let (store, locations) = seeded_store();
    let counters = CounterMaintainer;
    let here = (locations.lyon, locations.part_dieu);

    store
        .transaction(|uow| -> Result<(), RepositoryError> {
            counters.listing_created(uow, here.0, here.1)?;
            counters.listing_relocated(uow, here, here)
        })
        .expect("transfer");

    let part_dieu = store
        .fetch_neighborhood(locations.part_dieu)
        .expect("fetch")
        .expect("neighborhood exists");
    assert_eq!(part_dieu.listing_count, 1);
}

#[test]
fn unknown_location_fails_the_counter_update() {
    let (store, locations) = seeded_store();
    let counters = CounterMaintainer;

    let result = store.transaction(|uow| -> Result<CounterSnapshot, RepositoryError> {
        counters.listing_created(uow, crate::listings::CityId(404), locations.part_dieu)
    });

    assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    let part_dieu = store
        .fetch_neighborhood(locations.part_dieu)
        .expect("fetch")
        .expect("neighborhood exists");
    assert_eq!(part_dieu.listing_count, 0);
}

#[test]
fn restoring_an_archived_listing_counts_it_again() {
    let (service, _, locations) = build_service();
    let restored = service
        .create_listing(draft(&locations), &owner())
        .expect("created");
    let other = service
        .create_listing(draft(&locations), &owner())
        .expect("created");

    service.delete_listing(restored.id, &owner()).expect("deleted");
    assert_eq!(city(&service, locations.lyon).listing_count, 1);

    service
        .moderate_listing(restored.id, ListingStatus::Approved, None)
        .expect("administrator restores");
    assert_eq!(city(&service, locations.lyon).listing_count, 2);
    assert_eq!(neighborhood(&service, locations.part_dieu).listing_count, 2);

    service.delete_listing(restored.id, &owner()).expect("deleted again");
    assert_eq!(city(&service, locations.lyon).listing_count, 1);
    assert_eq!(neighborhood(&service, locations.part_dieu).listing_count, 1);
    assert!(stored(&service, other.id).active);
}

#[test]
fn archiving_through_moderation_releases_counts_once() {
    let (service, _, locations) = build_service();
    let listing = service
        .create_listing(draft(&locations), &owner())
        .expect("created");

    service
        .moderate_listing(listing.id, ListingStatus::Archived, Some("duplicate".to_string()))
        .expect("administrator archives");
    assert_eq!(city(&service, locations.lyon).listing_count, 0);
    assert_eq!(neighborhood(&service, locations.part_dieu).listing_count, 0);

    service
        .delete_listing(listing.id, &owner())
        .expect("already archived");
    assert_eq!(city(&service, locations.lyon).listing_count, 0);
}

#[test]
fn suspension_keeps_counts() {
    let (service, _, locations) = build_service();
    let listing = service
        .create_listing(draft(&locations), &owner())
        .expect("created");

    service
        .moderate_listing(listing.id, ListingStatus::Suspended, None)
        .expect("administrator suspends");
    assert_eq!(city(&service, locations.lyon).listing_count, 1);
}
