use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::ListingDraft;

/// Field level violations collected before anything is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "invalid listing ({joined})")
    }
}

impl std::error::Error for ValidationErrors {}

/// Declared bounds of the listing data model.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingLimits {
    pub title_chars: (usize, usize),
    pub description_chars: (usize, usize),
    pub address_chars: (usize, usize),
    pub max_price: Decimal,
    pub area_sqm: (u32, u32),
    pub rooms: (u32, u32),
    pub max_images: usize,
}

impl Default for ListingLimits {
    fn default() -> Self {
        Self {
            title_chars: (10, 100),
            description_chars: (50, 2000),
            address_chars: (10, 200),
            max_price: Decimal::new(99_999_999, 2),
            area_sqm: (10, 500),
            rooms: (1, 15),
            max_images: 10,
        }
    }
}

/// Guard that rejects drafts violating the data model bounds.
#[derive(Debug, Clone, Default)]
pub struct ListingGuard {
    limits: ListingLimits,
}

impl ListingGuard {
    pub fn validate(&self, draft: &ListingDraft) -> Result<(), ValidationErrors> {
        let limits = &self.limits;
        let mut errors = ValidationErrors::new();

        check_text(&mut errors, "title", &draft.title, limits.title_chars);
        check_text(
            &mut errors,
            "description",
            &draft.description,
            limits.description_chars,
        );
        check_text(&mut errors, "address", &draft.address, limits.address_chars);

        if draft.price <= Decimal::ZERO {
            errors.add("price", "price must be greater than 0");
        } else if draft.price > limits.max_price {
            errors.add("price", format!("price cannot exceed {}", limits.max_price));
        } else if draft.price.normalize().scale() > 2 {
            errors.add("price", "price accepts at most two decimals");
        }

        let (min_area, max_area) = limits.area_sqm;
        if draft.area_sqm < min_area || draft.area_sqm > max_area {
            errors.add(
                "area_sqm",
                format!("area must be between {min_area} and {max_area} m²"),
            );
        }

        if let Some(rooms) = draft.rooms {
            let (min_rooms, max_rooms) = limits.rooms;
            if rooms < min_rooms || rooms > max_rooms {
                errors.add(
                    "rooms",
                    format!("room count must be between {min_rooms} and {max_rooms}"),
                );
            }
        }

        if let Some(point) = &draft.coordinates {
            if !(-90.0..=90.0).contains(&point.latitude) {
                errors.add("coordinates.latitude", "latitude must be within [-90, 90]");
            }
            if !(-180.0..=180.0).contains(&point.longitude) {
                errors.add(
                    "coordinates.longitude",
                    "longitude must be within [-180, 180]",
                );
            }
        }

        if draft.images.len() > limits.max_images {
            errors.add(
                "images",
                format!("at most {} images per listing", limits.max_images),
            );
        } else if draft.images.iter().any(|image| image.trim().is_empty()) {
            errors.add("images", "image references cannot be blank");
        }

        errors.into_result()
    }
}

fn check_text(errors: &mut ValidationErrors, field: &str, value: &str, (min, max): (usize, usize)) {
    if value.trim().is_empty() {
        errors.add(field, format!("{field} is required"));
        return;
    }
    let chars = value.chars().count();
    if chars < min || chars > max {
        errors.add(
            field,
            format!("{field} must contain between {min} and {max} characters"),
        );
    }
}
