use chrono::{DateTime, Utc};

use super::domain::{
    City, CityId, Listing, ListingId, ListingStatus, Neighborhood, NeighborhoodId, NewCity,
    NewNeighborhood, UserId,
};
use super::search::ListingQuery;

/// Storage abstraction so the lifecycle service can be exercised in isolation.
///
/// Writes only happen inside [`ListingRepository::transaction`]; the work either
/// commits as a whole or leaves the store untouched.
pub trait ListingRepository: Send + Sync {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn ListingUnitOfWork) -> Result<T, E>,
        E: From<RepositoryError>;

    fn fetch_listing(&self, id: ListingId) -> Result<Option<Listing>, RepositoryError>;
    fn fetch_city(&self, id: CityId) -> Result<Option<City>, RepositoryError>;
    fn fetch_neighborhood(
        &self,
        id: NeighborhoodId,
    ) -> Result<Option<Neighborhood>, RepositoryError>;

    fn cities(&self) -> Result<Vec<City>, RepositoryError>;
    fn neighborhoods(&self, city: CityId) -> Result<Vec<Neighborhood>, RepositoryError>;
    fn register_city(&self, city: NewCity) -> Result<City, RepositoryError>;
    fn register_neighborhood(
        &self,
        neighborhood: NewNeighborhood,
    ) -> Result<Neighborhood, RepositoryError>;

    /// Listings satisfying the query, in no particular order.
    fn matching(&self, query: &ListingQuery) -> Result<Vec<Listing>, RepositoryError>;
    /// Active listings of an owner, in no particular order.
    fn owned_by(&self, owner: UserId) -> Result<Vec<Listing>, RepositoryError>;
    fn with_status(&self, statuses: &[ListingStatus]) -> Result<Vec<Listing>, RepositoryError>;
    /// APPROVED and active listings whose expiration lies before `now`.
    fn expired_candidates(&self, now: DateTime<Utc>) -> Result<Vec<ListingId>, RepositoryError>;
    fn all_listings(&self) -> Result<Vec<Listing>, RepositoryError>;
}

/// Writes available inside a transaction.
pub trait ListingUnitOfWork {
    fn listing(&self, id: ListingId) -> Result<Option<Listing>, RepositoryError>;
    fn city(&self, id: CityId) -> Result<Option<City>, RepositoryError>;
    fn neighborhood(&self, id: NeighborhoodId) -> Result<Option<Neighborhood>, RepositoryError>;

    /// Stores a new listing and returns it with its assigned id.
    fn insert_listing(&mut self, listing: Listing) -> Result<Listing, RepositoryError>;
    /// Replaces an existing listing; `NotFound` when the id is unknown.
    fn save_listing(&mut self, listing: &Listing) -> Result<(), RepositoryError>;

    /// Registers a city; `Conflict` when the name and postal code already exist.
    fn insert_city(&mut self, city: NewCity) -> Result<City, RepositoryError>;
    /// Registers a neighborhood under an existing city, names unique per city.
    fn insert_neighborhood(
        &mut self,
        neighborhood: NewNeighborhood,
    ) -> Result<Neighborhood, RepositoryError>;

    /// Counter updates return the new value; decrements stop at zero.
    fn increment_city_listings(&mut self, id: CityId) -> Result<u64, RepositoryError>;
    fn decrement_city_listings(&mut self, id: CityId) -> Result<u64, RepositoryError>;
    fn increment_neighborhood_listings(
        &mut self,
        id: NeighborhoodId,
    ) -> Result<u64, RepositoryError>;
    fn decrement_neighborhood_listings(
        &mut self,
        id: NeighborhoodId,
    ) -> Result<u64, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
