use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::listings::domain::{
    Amenities, City, CityId, GeoPoint, HousingType, Listing, ListingDraft, ListingId,
    ListingStatus, Neighborhood, NeighborhoodId, NewCity, NewNeighborhood, UserId,
};
use crate::listings::repository::{ListingRepository, ListingUnitOfWork, RepositoryError};
use crate::listings::search::ListingQuery;
use crate::listings::{
    Actor, InMemoryListingStore, ListingEvent, ListingNotifier, ListingService, ModerationConfig,
    ModerationEngine, NotificationError, Role,
};

pub(super) const OWNER: UserId = UserId(7);
pub(super) const STRANGER: UserId = UserId(8);

/// Ids of the locations registered by [`seeded_store`].
#[derive(Debug, Clone, Copy)]
pub(super) struct Locations {
    pub lyon: CityId,
    pub part_dieu: NeighborhoodId,
    pub croix_rousse: NeighborhoodId,
    pub paris: CityId,
    pub latin_quarter: NeighborhoodId,
}

pub(super) fn seeded_store() -> (Arc<InMemoryListingStore>, Locations) {
    let store = Arc::new(InMemoryListingStore::new());
    let lyon = store
        .register_city(NewCity {
            name: "Lyon".to_string(),
            postal_code: "69003".to_string(),
            country: "France".to_string(),
            coordinates: Some(GeoPoint::new(45.764, 4.8357)),
        })
        .expect("register lyon");
    let part_dieu = store
        .register_neighborhood(NewNeighborhood {
            city_id: lyon.id,
            name: "Part-Dieu".to_string(),
            coordinates: None,
        })
        .expect("register part-dieu");
    let croix_rousse = store
        .register_neighborhood(NewNeighborhood {
            city_id: lyon.id,
            name: "Croix-Rousse".to_string(),
            coordinates: None,
        })
        .expect("register croix-rousse");
    let paris = store
        .register_city(NewCity {
            name: "Paris".to_string(),
            postal_code: "75005".to_string(),
            country: "France".to_string(),
            coordinates: Some(GeoPoint::new(48.8566, 2.3522)),
        })
        .expect("register paris");
    let latin_quarter = store
        .register_neighborhood(NewNeighborhood {
            city_id: paris.id,
            name: "Quartier Latin".to_string(),
            coordinates: None,
        })
        .expect("register latin quarter");

    (
        store,
        Locations {
            lyon: lyon.id,
            part_dieu: part_dieu.id,
            croix_rousse: croix_rousse.id,
            paris: paris.id,
            latin_quarter: latin_quarter.id,
        },
    )
}

pub(super) fn engine() -> ModerationEngine {
    ModerationEngine::new(ModerationConfig::default()).expect("default policy compiles")
}

pub(super) type TestService = ListingService<InMemoryListingStore, RecordingNotifier>;

pub(super) fn build_service() -> (TestService, Arc<RecordingNotifier>, Locations) {
    let (store, locations) = seeded_store();
    let notifier = Arc::new(RecordingNotifier::default());
    let service = ListingService::new(store, notifier.clone(), engine());
    (service, notifier, locations)
}

pub(super) fn draft(locations: &Locations) -> ListingDraft {
    ListingDraft {
        title: "Bright studio near the university".to_string(),
        description: "Quiet furnished studio on the second floor, five minutes walk from the \
                      campus and the tram line."
            .to_string(),
        price: Decimal::from(500),
        housing_type: HousingType::Studio,
        area_sqm: 20,
        rooms: Some(2),
        address: "12 rue des Lilas, Lyon".to_string(),
        city_id: locations.lyon,
        neighborhood_id: locations.part_dieu,
        coordinates: None,
        images: Vec::new(),
        amenities: Amenities {
            furnished: true,
            heating: true,
            ..Amenities::default()
        },
        expires_at: None,
    }
}

/// Draft exposing a phone number, rejected by automatic moderation.
pub(super) fn phone_draft(locations: &Locations) -> ListingDraft {
    ListingDraft {
        description: "Call me at 0612345678 to visit this quiet furnished studio close to the \
                      campus."
            .to_string(),
        ..draft(locations)
    }
}

/// Listing built directly from a draft, bypassing validation.
pub(super) fn listing_from(draft: ListingDraft) -> Listing {
    let now = Utc::now();
    let mut listing = Listing::from_draft(draft, OWNER, now, now + Duration::days(30));
    listing.id = ListingId(1);
    listing
}

pub(super) fn owner() -> Actor {
    Actor::new(OWNER, Role::User, "owner@example.org")
}

pub(super) fn stranger() -> Actor {
    Actor::new(STRANGER, Role::User, "stranger@example.org")
}

pub(super) fn admin() -> Actor {
    Actor::new(UserId(1), Role::Admin, "admin@example.org")
}

pub(super) fn city(service: &TestService, id: CityId) -> City {
    service
        .repository()
        .fetch_city(id)
        .expect("fetch city")
        .expect("city exists")
}

pub(super) fn neighborhood(service: &TestService, id: NeighborhoodId) -> Neighborhood {
    service
        .repository()
        .fetch_neighborhood(id)
        .expect("fetch neighborhood")
        .expect("neighborhood exists")
}

pub(super) fn stored(service: &TestService, id: ListingId) -> Listing {
    service
        .repository()
        .fetch_listing(id)
        .expect("fetch listing")
        .expect("listing exists")
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    events: Mutex<Vec<ListingEvent>>,
}

impl RecordingNotifier {
    pub(super) fn events(&self) -> Vec<ListingEvent> {
        self.events.lock().expect("events mutex").clone()
    }
}

impl ListingNotifier for RecordingNotifier {
    fn notify(&self, event: ListingEvent) -> Result<(), NotificationError> {
        self.events.lock().expect("events mutex").push(event);
        Ok(())
    }
}

pub(super) struct OfflineNotifier;

impl ListingNotifier for OfflineNotifier {
    fn notify(&self, _event: ListingEvent) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay offline".to_string()))
    }
}

/// Store whose neighborhood counters fail, to exercise transaction rollback.
pub(super) struct CounterOutageStore {
    pub inner: Arc<InMemoryListingStore>,
}

struct CounterOutage<'a> {
    inner: &'a mut dyn ListingUnitOfWork,
}

impl ListingUnitOfWork for CounterOutage<'_> {
    fn listing(&self, id: ListingId) -> Result<Option<Listing>, RepositoryError> {
        self.inner.listing(id)
    }

    fn city(&self, id: CityId) -> Result<Option<City>, RepositoryError> {
        self.inner.city(id)
    }

    fn neighborhood(&self, id: NeighborhoodId) -> Result<Option<Neighborhood>, RepositoryError> {
        self.inner.neighborhood(id)
    }

    fn insert_listing(&mut self, listing: Listing) -> Result<Listing, RepositoryError> {
        self.inner.insert_listing(listing)
    }

    fn save_listing(&mut self, listing: &Listing) -> Result<(), RepositoryError> {
        self.inner.save_listing(listing)
    }

    fn insert_city(&mut self, city: NewCity) -> Result<City, RepositoryError> {
        self.inner.insert_city(city)
    }

    fn insert_neighborhood(
        &mut self,
        neighborhood: NewNeighborhood,
    ) -> Result<Neighborhood, RepositoryError> {
        self.inner.insert_neighborhood(neighborhood)
    }

    fn increment_city_listings(&mut self, id: CityId) -> Result<u64, RepositoryError> {
        self.inner.increment_city_listings(id)
    }

    fn decrement_city_listings(&mut self, id: CityId) -> Result<u64, RepositoryError> {
        self.inner.decrement_city_listings(id)
    }

    fn increment_neighborhood_listings(
        &mut self,
        _id: NeighborhoodId,
    ) -> Result<u64, RepositoryError> {
        Err(RepositoryError::Unavailable("counter table locked".to_string()))
    }

    fn decrement_neighborhood_listings(
        &mut self,
        _id: NeighborhoodId,
    ) -> Result<u64, RepositoryError> {
        Err(RepositoryError::Unavailable("counter table locked".to_string()))
    }
}

impl ListingRepository for CounterOutageStore {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn ListingUnitOfWork) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        self.inner.transaction(|uow| {
            let mut outage = CounterOutage { inner: uow };
            work(&mut outage)
        })
    }

    fn fetch_listing(&self, id: ListingId) -> Result<Option<Listing>, RepositoryError> {
        self.inner.fetch_listing(id)
    }

    fn fetch_city(&self, id: CityId) -> Result<Option<City>, RepositoryError> {
        self.inner.fetch_city(id)
    }

    fn fetch_neighborhood(
        &self,
        id: NeighborhoodId,
    ) -> Result<Option<Neighborhood>, RepositoryError> {
        self.inner.fetch_neighborhood(id)
    }

    fn cities(&self) -> Result<Vec<City>, RepositoryError> {
        self.inner.cities()
    }

    fn neighborhoods(&self, city: CityId) -> Result<Vec<Neighborhood>, RepositoryError> {
        self.inner.neighborhoods(city)
    }

    fn register_city(&self, city: NewCity) -> Result<City, RepositoryError> {
        self.inner.register_city(city)
    }

    fn register_neighborhood(
        &self,
        neighborhood: NewNeighborhood,
    ) -> Result<Neighborhood, RepositoryError> {
        self.inner.register_neighborhood(neighborhood)
    }

    fn matching(&self, query: &ListingQuery) -> Result<Vec<Listing>, RepositoryError> {
        self.inner.matching(query)
    }

    fn owned_by(&self, owner: UserId) -> Result<Vec<Listing>, RepositoryError> {
        self.inner.owned_by(owner)
    }

    fn with_status(&self, statuses: &[ListingStatus]) -> Result<Vec<Listing>, RepositoryError> {
        self.inner.with_status(statuses)
    }

    fn expired_candidates(&self, now: DateTime<Utc>) -> Result<Vec<ListingId>, RepositoryError> {
        self.inner.expired_candidates(now)
    }

    fn all_listings(&self) -> Result<Vec<Listing>, RepositoryError> {
        self.inner.all_listings()
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
