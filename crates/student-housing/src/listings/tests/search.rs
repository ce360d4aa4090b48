use rust_decimal::Decimal;

use super::common::*;
use crate::listings::domain::{GeoPoint, HousingType, ListingId};
use crate::listings::search::{
    self, AmenityFilter, GeoRadius, ListingQuery, SortDirection, SortField, SortSpec,
};
use crate::listings::{ListingServiceError, PageRequest, SearchCriteria};

struct Catalog {
    service: TestService,
    cheap_room: ListingId,
    studio: ListingId,
    apartment: ListingId,
    hidden: ListingId,
}

/// Three public listings around Lyon, one in Paris is rejected.
fn catalog() -> Catalog {
    let (service, _, locations) = build_service();

    let mut cheap_room = draft(&locations);
    cheap_room.title = "Furnished room in a shared flat".to_string();
    cheap_room.housing_type = HousingType::Room;
    cheap_room.price = Decimal::from(350);
    cheap_room.area_sqm = 12;
    cheap_room.rooms = None;
    cheap_room.neighborhood_id = locations.croix_rousse;
    cheap_room.coordinates = Some(GeoPoint::new(45.774, 4.831));
    let cheap_room = service
        .create_listing(cheap_room, &owner())
        .expect("room created");

    let mut studio = draft(&locations);
    studio.address = "3 place Bellecour, Lyon".to_string();
    studio.coordinates = Some(GeoPoint::new(45.757, 4.832));
    let studio = service
        .create_listing(studio, &owner())
        .expect("studio created");

    let mut apartment = draft(&locations);
    apartment.title = "Spacious apartment with balcony".to_string();
    apartment.housing_type = HousingType::Apartment;
    apartment.price = Decimal::from(820);
    apartment.area_sqm = 55;
    apartment.rooms = Some(3);
    apartment.address = "40 cours Lafayette, Lyon".to_string();
    apartment.amenities.furnished = false;
    apartment.amenities.balcony = true;
    let apartment = service
        .create_listing(apartment, &owner())
        .expect("apartment created");

    let mut hidden = phone_draft(&locations);
    hidden.city_id = locations.paris;
    hidden.neighborhood_id = locations.latin_quarter;
    hidden.coordinates = Some(GeoPoint::new(48.85, 2.35));
    let hidden = service
        .create_listing(hidden, &owner())
        .expect("hidden created");

    Catalog {
        service,
        cheap_room: cheap_room.id,
        studio: studio.id,
        apartment: apartment.id,
        hidden: hidden.id,
    }
}

fn ids(page: &crate::listings::Page<crate::listings::Listing>) -> Vec<ListingId> {
    page.items.iter().map(|listing| listing.id).collect()
}

#[test]
fn compose_prefers_term_then_radius_then_filters() {
    let geo = GeoRadius {
        center: GeoPoint::new(45.76, 4.83),
        radius_km: 5.0,
    };
    let with_term = SearchCriteria {
        term: Some("  lilas ".to_string()),
        geo: Some(geo),
        housing_type: Some(HousingType::Room),
        ..SearchCriteria::default()
    };
    assert_eq!(
        search::compose(&with_term),
        ListingQuery::Text {
            term: "lilas".to_string()
        }
    );

    let blank_term = SearchCriteria {
        term: Some("   ".to_string()),
        ..with_term.clone()
    };
    assert_eq!(search::compose(&blank_term).strategy(), "radius");

    let filters_only = SearchCriteria {
        geo: None,
        ..blank_term
    };
    assert!(matches!(
        search::compose(&filters_only),
        ListingQuery::Filters(filters) if filters.housing_type == Some(HousingType::Room)
    ));
}

#[test]
fn empty_criteria_return_every_public_listing_newest_first() {
    let catalog = catalog();

    let page = catalog
        .service
        .search_listings(SearchCriteria::default(), PageRequest::default())
        .expect("search");

    assert_eq!(
        ids(&page),
        vec![catalog.apartment, catalog.studio, catalog.cheap_room]
    );
    assert!(!ids(&page).contains(&catalog.hidden));
    assert_eq!(page.filters.as_ref().map(|f| f.strategy), Some("filters"));
}

#[test]
fn term_matches_address_case_insensitively_and_ignores_filters() {
    let catalog = catalog();
    let criteria = SearchCriteria {
        term: Some("BELLECOUR".to_string()),
        housing_type: Some(HousingType::House),
        ..SearchCriteria::default()
    };

    let page = catalog
        .service
        .search_listings(criteria, PageRequest::default())
        .expect("search");

    assert_eq!(ids(&page), vec![catalog.studio]);
    assert_eq!(page.filters.as_ref().map(|f| f.strategy), Some("text"));
}

#[test]
fn radius_keeps_nearby_geolocated_listings() {
    let catalog = catalog();
    let criteria = SearchCriteria {
        geo: Some(GeoRadius {
            center: GeoPoint::new(45.764, 4.8357),
            radius_km: 5.0,
        }),
        sort: SortSpec::new(SortField::Price, SortDirection::Asc),
        ..SearchCriteria::default()
    };

    let page = catalog
        .service
        .search_listings(criteria, PageRequest::default())
        .expect("search");

    // the apartment has no coordinates
    assert_eq!(ids(&page), vec![catalog.cheap_room, catalog.studio]);
}

#[test]
fn filters_combine_conjunctively() {
    let catalog = catalog();
    let criteria = SearchCriteria {
        min_price: Some(Decimal::from(400)),
        amenities: AmenityFilter {
            furnished: Some(true),
            ..AmenityFilter::default()
        },
        ..SearchCriteria::default()
    };

    let page = catalog
        .service
        .search_listings(criteria, PageRequest::default())
        .expect("search");
    assert_eq!(ids(&page), vec![catalog.studio]);

    let by_rooms = SearchCriteria {
        min_rooms: Some(1),
        sort: SortSpec::new(SortField::Area, SortDirection::Desc),
        ..SearchCriteria::default()
    };
    let page = catalog
        .service
        .search_listings(by_rooms, PageRequest::default())
        .expect("search");
    // listings without a room count never satisfy a room bound
    assert_eq!(ids(&page), vec![catalog.apartment, catalog.studio]);
}

#[test]
fn pages_carry_position_flags() {
    let catalog = catalog();
    let sort = SortSpec::new(SortField::Price, SortDirection::Asc);
    let criteria = SearchCriteria {
        sort,
        ..SearchCriteria::default()
    };

    let first = catalog
        .service
        .search_listings(criteria.clone(), PageRequest::new(0, 2))
        .expect("first page");
    assert_eq!(ids(&first), vec![catalog.cheap_room, catalog.studio]);
    assert_eq!(first.total_elements, 3);
    assert_eq!(first.total_pages, 2);
    assert!(first.first);
    assert!(!first.last);
    assert_eq!(first.sort_by, "price");
    assert_eq!(first.sort_direction, "asc");

    let second = catalog
        .service
        .search_listings(criteria.clone(), PageRequest::new(1, 2))
        .expect("second page");
    assert_eq!(ids(&second), vec![catalog.apartment]);
    assert!(!second.first);
    assert!(second.last);

    let beyond = catalog
        .service
        .search_listings(criteria, PageRequest::new(5, 2))
        .expect("past the end");
    assert!(beyond.empty);
    assert!(beyond.last);
}

#[test]
fn invalid_radius_is_a_validation_error() {
    let catalog = catalog();
    let criteria = SearchCriteria {
        geo: Some(GeoRadius {
            center: GeoPoint::new(95.0, 4.8),
            radius_km: 0.0,
        }),
        ..SearchCriteria::default()
    };

    match catalog
        .service
        .search_listings(criteria, PageRequest::default())
    {
        Err(ListingServiceError::Validation(errors)) => {
            assert!(errors.get("center").is_some());
            assert!(errors.get("radius_km").is_some());
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn sort_field_accepts_aliases_and_rejects_unknown_names() {
    assert_eq!(SortField::parse("prix"), Ok(SortField::Price));
    assert_eq!(SortField::parse("dateCreation"), Ok(SortField::CreatedAt));
    assert!(SortField::parse("popularity").is_err());
    assert_eq!(SortDirection::parse("ASC"), SortDirection::Asc);
    assert_eq!(SortDirection::parse("sideways"), SortDirection::Desc);
}
