use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{City, CityId, Listing};

/// Administrator dashboard figures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListingStatistics {
    pub total: usize,
    pub by_status: BTreeMap<&'static str, usize>,
    /// Public listings only.
    pub by_housing_type: BTreeMap<&'static str, usize>,
    /// Public listings only, keyed by city name.
    pub by_city: BTreeMap<String, usize>,
    pub awaiting_expiration: usize,
    pub created_since_midnight: usize,
}

impl ListingStatistics {
    pub fn collect(listings: &[Listing], cities: &[City], now: DateTime<Utc>) -> Self {
        let names: BTreeMap<CityId, &str> = cities
            .iter()
            .map(|city| (city.id, city.name.as_str()))
            .collect();
        let today = now.date_naive();

        let mut stats = Self {
            total: listings.len(),
            ..Self::default()
        };
        for listing in listings {
            *stats.by_status.entry(listing.status.label()).or_default() += 1;
            if listing.created_at.date_naive() == today {
                stats.created_since_midnight += 1;
            }
            if !listing.is_public() {
                continue;
            }
            *stats
                .by_housing_type
                .entry(listing.housing_type.label())
                .or_default() += 1;
            let city = names
                .get(&listing.city_id)
                .map(|name| name.to_string())
                .unwrap_or_else(|| format!("city {}", listing.city_id));
            *stats.by_city.entry(city).or_default() += 1;
            if listing.is_expired_at(now) {
                stats.awaiting_expiration += 1;
            }
        }
        stats
    }
}
