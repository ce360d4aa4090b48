//! Search composition: optional criteria in, one query strategy out.

mod criteria;
pub mod geo;
mod page;
mod query;

pub use criteria::{
    AmenityFilter, GeoRadius, SearchCriteria, SortDirection, SortField, SortSpec,
    UnknownSortField,
};
pub use page::{AppliedFilters, Page, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use query::{ListingFilters, ListingQuery};

use std::cmp::Ordering;

use super::domain::Listing;

/// Picks the strategy for a set of criteria: a non-blank term wins, then a
/// geo radius, then the conjunctive filters.
pub fn compose(criteria: &SearchCriteria) -> ListingQuery {
    if let Some(term) = criteria.effective_term() {
        return ListingQuery::Text {
            term: term.to_string(),
        };
    }

    if let Some(geo) = criteria.geo {
        return ListingQuery::Radius {
            center: geo.center,
            radius_km: geo.radius_km,
        };
    }

    ListingQuery::Filters(ListingFilters {
        housing_type: criteria.housing_type,
        city_id: criteria.city_id,
        neighborhood_id: criteria.neighborhood_id,
        min_price: criteria.min_price,
        max_price: criteria.max_price,
        min_area: criteria.min_area,
        max_area: criteria.max_area,
        min_rooms: criteria.min_rooms,
        max_rooms: criteria.max_rooms,
        amenities: criteria.amenities,
    })
}

/// Total order for a sort spec; ties fall back to the listing id.
pub fn compare(sort: SortSpec, left: &Listing, right: &Listing) -> Ordering {
    let primary = match sort.field {
        SortField::CreatedAt => left.created_at.cmp(&right.created_at),
        SortField::Price => left.price.cmp(&right.price),
        SortField::Area => left.area_sqm.cmp(&right.area_sqm),
        SortField::Views => left.view_count.cmp(&right.view_count),
    };
    let ordered = primary.then_with(|| left.id.cmp(&right.id));
    match sort.direction {
        SortDirection::Asc => ordered,
        SortDirection::Desc => ordered.reverse(),
    }
}

pub fn sort_listings(listings: &mut [Listing], sort: SortSpec) {
    listings.sort_by(|left, right| compare(sort, left, right));
}
