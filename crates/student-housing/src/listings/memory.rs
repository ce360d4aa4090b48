use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{
    City, CityId, Listing, ListingId, ListingStatus, Neighborhood, NeighborhoodId, NewCity,
    NewNeighborhood, UserId,
};
use super::repository::{ListingRepository, ListingUnitOfWork, RepositoryError};
use super::search::ListingQuery;

/// Arena of listings, cities and neighborhoods keyed by identifier.
#[derive(Debug, Clone, Default)]
struct ListingTables {
    listings: BTreeMap<ListingId, Listing>,
    cities: BTreeMap<CityId, City>,
    neighborhoods: BTreeMap<NeighborhoodId, Neighborhood>,
    next_listing: u64,
    next_city: u64,
    next_neighborhood: u64,
}

impl ListingTables {
    fn city_mut(&mut self, id: CityId) -> Result<&mut City, RepositoryError> {
        self.cities
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("city {id}")))
    }

    fn neighborhood_mut(&mut self, id: NeighborhoodId) -> Result<&mut Neighborhood, RepositoryError> {
        self.neighborhoods
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("neighborhood {id}")))
    }
}

impl ListingUnitOfWork for ListingTables {
    fn listing(&self, id: ListingId) -> Result<Option<Listing>, RepositoryError> {
        Ok(self.listings.get(&id).cloned())
    }

    fn city(&self, id: CityId) -> Result<Option<City>, RepositoryError> {
        Ok(self.cities.get(&id).cloned())
    }

    fn neighborhood(&self, id: NeighborhoodId) -> Result<Option<Neighborhood>, RepositoryError> {
        Ok(self.neighborhoods.get(&id).cloned())
    }

    fn insert_listing(&mut self, mut listing: Listing) -> Result<Listing, RepositoryError> {
        self.next_listing += 1;
        listing.id = ListingId(self.next_listing);
        self.listings.insert(listing.id, listing.clone());
        Ok(listing)
    }

    fn save_listing(&mut self, listing: &Listing) -> Result<(), RepositoryError> {
        match self.listings.get_mut(&listing.id) {
            Some(slot) => {
                *slot = listing.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("listing {}", listing.id))),
        }
    }

    fn insert_city(&mut self, city: NewCity) -> Result<City, RepositoryError> {
        let name = city.name.trim().to_string();
        let duplicate = self.cities.values().any(|existing| {
            existing.name.eq_ignore_ascii_case(&name) && existing.postal_code == city.postal_code
        });
        if duplicate {
            return Err(RepositoryError::Conflict(format!("city {name}")));
        }

        self.next_city += 1;
        let created = City {
            id: CityId(self.next_city),
            name,
            postal_code: city.postal_code,
            country: city.country,
            coordinates: city.coordinates,
            active: true,
            listing_count: 0,
        };
        self.cities.insert(created.id, created.clone());
        Ok(created)
    }

    fn insert_neighborhood(
        &mut self,
        neighborhood: NewNeighborhood,
    ) -> Result<Neighborhood, RepositoryError> {
        if !self.cities.contains_key(&neighborhood.city_id) {
            return Err(RepositoryError::NotFound(format!(
                "city {}",
                neighborhood.city_id
            )));
        }
        let name = neighborhood.name.trim().to_string();
        let duplicate = self.neighborhoods.values().any(|existing| {
            existing.city_id == neighborhood.city_id && existing.name.eq_ignore_ascii_case(&name)
        });
        if duplicate {
            return Err(RepositoryError::Conflict(format!(
                "neighborhood {name} in city {}",
                neighborhood.city_id
            )));
        }

        self.next_neighborhood += 1;
        let created = Neighborhood {
            id: NeighborhoodId(self.next_neighborhood),
            city_id: neighborhood.city_id,
            name,
            coordinates: neighborhood.coordinates,
            listing_count: 0,
        };
        self.neighborhoods.insert(created.id, created.clone());
        Ok(created)
    }

    fn increment_city_listings(&mut self, id: CityId) -> Result<u64, RepositoryError> {
        let city = self.city_mut(id)?;
        city.listing_count += 1;
        Ok(city.listing_count)
    }

    fn decrement_city_listings(&mut self, id: CityId) -> Result<u64, RepositoryError> {
        let city = self.city_mut(id)?;
        city.listing_count = city.listing_count.saturating_sub(1);
        Ok(city.listing_count)
    }

    fn increment_neighborhood_listings(
        &mut self,
        id: NeighborhoodId,
    ) -> Result<u64, RepositoryError> {
        let neighborhood = self.neighborhood_mut(id)?;
        neighborhood.listing_count += 1;
        Ok(neighborhood.listing_count)
    }

    fn decrement_neighborhood_listings(
        &mut self,
        id: NeighborhoodId,
    ) -> Result<u64, RepositoryError> {
        let neighborhood = self.neighborhood_mut(id)?;
        neighborhood.listing_count = neighborhood.listing_count.saturating_sub(1);
        Ok(neighborhood.listing_count)
    }
}

/// In-process store; transactions run on a copy that replaces the tables on success.
#[derive(Debug, Default)]
pub struct InMemoryListingStore {
    tables: Mutex<ListingTables>,
}

impl InMemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, ListingTables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("listing store lock poisoned".to_string()))
    }

    fn collect<P>(&self, predicate: P) -> Result<Vec<Listing>, RepositoryError>
    where
        P: Fn(&Listing) -> bool,
    {
        let tables = self.lock()?;
        Ok(tables
            .listings
            .values()
            .filter(|listing| predicate(listing))
            .cloned()
            .collect())
    }
}

impl ListingRepository for InMemoryListingStore {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn ListingUnitOfWork) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut tables = self.lock()?;
        let mut draft = tables.clone();
        let value = work(&mut draft)?;
        *tables = draft;
        Ok(value)
    }

    fn fetch_listing(&self, id: ListingId) -> Result<Option<Listing>, RepositoryError> {
        Ok(self.lock()?.listings.get(&id).cloned())
    }

    fn fetch_city(&self, id: CityId) -> Result<Option<City>, RepositoryError> {
        Ok(self.lock()?.cities.get(&id).cloned())
    }

    fn fetch_neighborhood(
        &self,
        id: NeighborhoodId,
    ) -> Result<Option<Neighborhood>, RepositoryError> {
        Ok(self.lock()?.neighborhoods.get(&id).cloned())
    }

    fn cities(&self) -> Result<Vec<City>, RepositoryError> {
        Ok(self.lock()?.cities.values().cloned().collect())
    }

    fn neighborhoods(&self, city: CityId) -> Result<Vec<Neighborhood>, RepositoryError> {
        Ok(self
            .lock()?
            .neighborhoods
            .values()
            .filter(|neighborhood| neighborhood.city_id == city)
            .cloned()
            .collect())
    }

    fn register_city(&self, city: NewCity) -> Result<City, RepositoryError> {
        self.transaction(|uow| uow.insert_city(city))
    }

    fn register_neighborhood(
        &self,
        neighborhood: NewNeighborhood,
    ) -> Result<Neighborhood, RepositoryError> {
        self.transaction(|uow| uow.insert_neighborhood(neighborhood))
    }

    fn matching(&self, query: &ListingQuery) -> Result<Vec<Listing>, RepositoryError> {
        self.collect(|listing| query.matches(listing))
    }

    fn owned_by(&self, owner: UserId) -> Result<Vec<Listing>, RepositoryError> {
        self.collect(|listing| listing.owner_id == owner && listing.active)
    }

    fn with_status(&self, statuses: &[ListingStatus]) -> Result<Vec<Listing>, RepositoryError> {
        self.collect(|listing| statuses.contains(&listing.status))
    }

    fn expired_candidates(&self, now: DateTime<Utc>) -> Result<Vec<ListingId>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .listings
            .values()
            .filter(|listing| listing.is_public() && listing.is_expired_at(now))
            .map(|listing| listing.id)
            .collect())
    }

    fn all_listings(&self) -> Result<Vec<Listing>, RepositoryError> {
        self.collect(|_| true)
    }
}
