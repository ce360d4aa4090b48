use serde::Serialize;
use tracing::debug;

use super::domain::{CityId, NeighborhoodId};
use super::repository::{ListingUnitOfWork, RepositoryError};

/// City and neighborhood counts after an adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub city: u64,
    pub neighborhood: u64,
}

/// Keeps the denormalized listing counts in step with listing writes.
///
/// Only called from inside a listing transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterMaintainer;

impl CounterMaintainer {
    pub fn listing_created(
        &self,
        uow: &mut dyn ListingUnitOfWork,
        city: CityId,
        neighborhood: NeighborhoodId,
    ) -> Result<CounterSnapshot, RepositoryError> {
        let snapshot = CounterSnapshot {
            city: uow.increment_city_listings(city)?,
            neighborhood: uow.increment_neighborhood_listings(neighborhood)?,
        };
        debug!(
            %city,
            %neighborhood,
            city_count = snapshot.city,
            neighborhood_count = snapshot.neighborhood,
            "listing counters incremented"
        );
        Ok(snapshot)
    }

    pub fn listing_removed(
        &self,
        uow: &mut dyn ListingUnitOfWork,
        city: CityId,
        neighborhood: NeighborhoodId,
    ) -> Result<CounterSnapshot, RepositoryError> {
        let snapshot = CounterSnapshot {
            city: uow.decrement_city_listings(city)?,
            neighborhood: uow.decrement_neighborhood_listings(neighborhood)?,
        };
        debug!(
            %city,
            %neighborhood,
            city_count = snapshot.city,
            neighborhood_count = snapshot.neighborhood,
            "listing counters decremented"
        );
        Ok(snapshot)
    }

    /// Moves one count from the old location to the new one; no-op when unchanged.
    pub fn listing_relocated(
        &self,
        uow: &mut dyn ListingUnitOfWork,
        from: (CityId, NeighborhoodId),
        to: (CityId, NeighborhoodId),
    ) -> Result<(), RepositoryError> {
        if from == to {
            return Ok(());
        }
        if from.0 != to.0 {
            uow.decrement_city_listings(from.0)?;
            uow.increment_city_listings(to.0)?;
        }
        if from.1 != to.1 {
            uow.decrement_neighborhood_listings(from.1)?;
            uow.increment_neighborhood_listings(to.1)?;
        }
        debug!(
            from_city = %from.0,
            to_city = %to.0,
            from_neighborhood = %from.1,
            to_neighborhood = %to.1,
            "listing counters transferred"
        );
        Ok(())
    }
}
