use rust_decimal::Decimal;
use serde::Serialize;

use super::super::domain::{CityId, GeoPoint, HousingType, Listing, NeighborhoodId};
use super::criteria::AmenityFilter;
use super::geo;

/// Conjunctive filter over the structured listing fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListingFilters {
    pub housing_type: Option<HousingType>,
    pub city_id: Option<CityId>,
    pub neighborhood_id: Option<NeighborhoodId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_area: Option<u32>,
    pub max_area: Option<u32>,
    pub min_rooms: Option<u32>,
    pub max_rooms: Option<u32>,
    pub amenities: AmenityFilter,
}

impl ListingFilters {
    pub fn matches(&self, listing: &Listing) -> bool {
        if self.housing_type.is_some_and(|kind| kind != listing.housing_type) {
            return false;
        }
        if self.city_id.is_some_and(|city| city != listing.city_id) {
            return false;
        }
        if self
            .neighborhood_id
            .is_some_and(|neighborhood| neighborhood != listing.neighborhood_id)
        {
            return false;
        }
        if self.min_price.is_some_and(|min| listing.price < min)
            || self.max_price.is_some_and(|max| listing.price > max)
        {
            return false;
        }
        if self.min_area.is_some_and(|min| listing.area_sqm < min)
            || self.max_area.is_some_and(|max| listing.area_sqm > max)
        {
            return false;
        }
        if self.min_rooms.is_some() || self.max_rooms.is_some() {
            let Some(rooms) = listing.rooms else {
                return false;
            };
            if self.min_rooms.is_some_and(|min| rooms < min)
                || self.max_rooms.is_some_and(|max| rooms > max)
            {
                return false;
            }
        }
        self.amenities.matches(&listing.amenities)
    }
}

/// Exactly one retrieval strategy, always limited to public listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ListingQuery {
    Text { term: String },
    Radius { center: GeoPoint, radius_km: f64 },
    Filters(ListingFilters),
}

impl ListingQuery {
    pub const fn strategy(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Radius { .. } => "radius",
            Self::Filters(_) => "filters",
        }
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        if !listing.is_public() {
            return false;
        }
        match self {
            Self::Text { term } => {
                let needle = term.to_lowercase();
                [&listing.title, &listing.description, &listing.address]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
            Self::Radius { center, radius_km } => listing
                .coordinates
                .is_some_and(|point| geo::distance_km(*center, point) <= *radius_km),
            Self::Filters(filters) => filters.matches(listing),
        }
    }
}
