use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::super::domain::{Amenities, CityId, GeoPoint, HousingType, NeighborhoodId};
use super::super::validation::ValidationErrors;

/// Optional search inputs; absent fields never constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCriteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub housing_type: Option<HousingType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_id: Option<CityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood_id: Option<NeighborhoodId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_area: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_area: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rooms: Option<u32>,
    #[serde(skip_serializing_if = "AmenityFilter::is_empty")]
    pub amenities: AmenityFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoRadius>,
    pub sort: SortSpec,
}

impl SearchCriteria {
    /// Term after trimming, `None` when blank.
    pub fn effective_term(&self) -> Option<&str> {
        self.term
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(geo) = &self.geo {
            if !geo.center.is_valid() {
                errors.add("center", "center must be a valid latitude/longitude pair");
            }
            if !geo.radius_km.is_finite() || geo.radius_km <= 0.0 {
                errors.add("radius_km", "radius must be a positive number of kilometres");
            }
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoRadius {
    pub center: GeoPoint,
    pub radius_km: f64,
}

/// Tri-state amenity constraints: `Some(flag)` requires the amenity to equal `flag`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmenityFilter {
    pub furnished: Option<bool>,
    pub parking: Option<bool>,
    pub balcony: Option<bool>,
    pub garden: Option<bool>,
    pub air_conditioning: Option<bool>,
    pub heating: Option<bool>,
    pub internet: Option<bool>,
    pub pets_allowed: Option<bool>,
}

impl AmenityFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, amenities: &Amenities) -> bool {
        let pairs = [
            (self.furnished, amenities.furnished),
            (self.parking, amenities.parking),
            (self.balcony, amenities.balcony),
            (self.garden, amenities.garden),
            (self.air_conditioning, amenities.air_conditioning),
            (self.heating, amenities.heating),
            (self.internet, amenities.internet),
            (self.pets_allowed, amenities.pets_allowed),
        ];
        pairs
            .iter()
            .all(|(wanted, actual)| wanted.map_or(true, |flag| flag == *actual))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    Price,
    Area,
    Views,
}

impl SortField {
    pub const fn label(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Price => "price",
            Self::Area => "area",
            Self::Views => "views",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, UnknownSortField> {
        match raw.trim() {
            "created_at" | "createdAt" | "dateCreation" => Ok(Self::CreatedAt),
            "price" | "prix" => Ok(Self::Price),
            "area" | "area_sqm" | "superficie" => Ok(Self::Area),
            "views" | "view_count" | "viewCount" => Ok(Self::Views),
            other => Err(UnknownSortField(other.to_string())),
        }
    }
}

impl FromStr for SortField {
    type Err = UnknownSortField;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort field '{0}'")]
pub struct UnknownSortField(pub String);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Lenient: anything other than `asc` sorts descending.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub const fn newest_first() -> Self {
        Self::new(SortField::CreatedAt, SortDirection::Desc)
    }

    pub const fn oldest_first() -> Self {
        Self::new(SortField::CreatedAt, SortDirection::Asc)
    }
}
