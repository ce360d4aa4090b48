use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a persisted listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub u64);

impl ListingId {
    /// Placeholder carried by a listing until the store assigns its identity.
    pub const UNASSIGNED: Self = Self(0);
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityId(pub u64);

impl fmt::Display for CityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NeighborhoodId(pub u64);

impl fmt::Display for NeighborhoodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HousingType {
    Room,
    Studio,
    Apartment,
    House,
}

impl HousingType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Room => "room",
            Self::Studio => "studio",
            Self::Apartment => "apartment",
            Self::House => "house",
        }
    }
}

/// Lifecycle status of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
    Suspended,
    Archived,
}

impl ListingStatus {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Pending,
            Self::Approved,
            Self::Rejected,
            Self::Expired,
            Self::Suspended,
            Self::Archived,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Suspended => "suspended",
            Self::Archived => "archived",
        }
    }

    /// Statuses an owner may still edit.
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Pending | Self::Rejected)
    }

    /// Statuses the automatic sweep never leaves; only an administrator can.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Expired | Self::Archived | Self::Suspended)
    }

    /// Transitions reachable through the normal lifecycle.
    pub const fn successors(self) -> &'static [ListingStatus] {
        match self {
            Self::Pending => &[Self::Approved, Self::Rejected],
            Self::Approved => &[Self::Expired, Self::Archived, Self::Suspended],
            Self::Rejected => &[Self::Approved, Self::Archived],
            Self::Expired | Self::Suspended | Self::Archived => &[],
        }
    }

    pub fn can_transition_to(self, next: ListingStatus, by_administrator: bool) -> bool {
        if self == next {
            return false;
        }
        if self.successors().contains(&next) {
            return true;
        }
        by_administrator && self.is_terminal()
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Amenities {
    pub furnished: bool,
    pub parking: bool,
    pub balcony: bool,
    pub garden: bool,
    pub air_conditioning: bool,
    pub heating: bool,
    pub internet: bool,
    pub pets_allowed: bool,
}

/// Result of the last automatic evaluation, kept for moderators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationSnapshot {
    pub trust_score: u8,
    pub manual_review: bool,
    pub evaluated_at: DateTime<Utc>,
}

/// Owner supplied content used for both creation and full updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub housing_type: HousingType,
    pub area_sqm: u32,
    #[serde(default)]
    pub rooms: Option<u32>,
    pub address: String,
    pub city_id: CityId,
    pub neighborhood_id: NeighborhoodId,
    #[serde(default)]
    pub coordinates: Option<GeoPoint>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub amenities: Amenities,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub housing_type: HousingType,
    pub area_sqm: u32,
    pub rooms: Option<u32>,
    pub address: String,
    pub city_id: CityId,
    pub neighborhood_id: NeighborhoodId,
    pub coordinates: Option<GeoPoint>,
    pub images: Vec<String>,
    pub amenities: Amenities,
    pub status: ListingStatus,
    pub active: bool,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub modified_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub view_count: u64,
    pub favorite_count: u64,
    pub moderation_comment: Option<String>,
    pub moderation: Option<ModerationSnapshot>,
}

impl Listing {
    /// Fresh PENDING listing built from a draft; identity is assigned on insert.
    pub fn from_draft(
        draft: ListingDraft,
        owner_id: UserId,
        now: DateTime<Utc>,
        default_expiration: DateTime<Utc>,
    ) -> Self {
        let expires_at = draft.expires_at.unwrap_or(default_expiration);
        Self {
            id: ListingId::UNASSIGNED,
            title: draft.title,
            description: draft.description,
            price: draft.price,
            housing_type: draft.housing_type,
            area_sqm: draft.area_sqm,
            rooms: draft.rooms,
            address: draft.address,
            city_id: draft.city_id,
            neighborhood_id: draft.neighborhood_id,
            coordinates: draft.coordinates,
            images: draft.images,
            amenities: draft.amenities,
            status: ListingStatus::Pending,
            active: true,
            owner_id,
            created_at: now,
            modified_at: None,
            published_at: None,
            expires_at,
            view_count: 0,
            favorite_count: 0,
            moderation_comment: None,
            moderation: None,
        }
    }

    /// Overwrite the owner editable fields, keeping lifecycle metadata intact.
    pub fn apply_draft(&mut self, draft: ListingDraft) {
        self.title = draft.title;
        self.description = draft.description;
        self.price = draft.price;
        self.housing_type = draft.housing_type;
        self.area_sqm = draft.area_sqm;
        self.rooms = draft.rooms;
        self.address = draft.address;
        self.city_id = draft.city_id;
        self.neighborhood_id = draft.neighborhood_id;
        self.coordinates = draft.coordinates;
        self.images = draft.images;
        self.amenities = draft.amenities;
        if let Some(expires_at) = draft.expires_at {
            self.expires_at = expires_at;
        }
    }

    pub fn is_public(&self) -> bool {
        self.status == ListingStatus::Approved && self.active
    }

    pub fn is_editable(&self) -> bool {
        self.active && self.status.is_editable()
    }

    /// Archived and inactive: no longer counted against its city and neighborhood.
    pub fn is_removed(&self) -> bool {
        self.status == ListingStatus::Archived && !self.active
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Title normalized for URLs, e.g. `bright-studio-near-campus`.
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.title.len());
        for ch in self.title.to_lowercase().chars() {
            if ch.is_ascii_alphanumeric() {
                slug.push(ch);
            } else if (ch.is_whitespace() || ch == '-') && !slug.is_empty() && !slug.ends_with('-')
            {
                slug.push('-');
            }
        }
        while slug.ends_with('-') {
            slug.pop();
        }
        slug
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: CityId,
    pub name: String,
    pub postal_code: String,
    pub country: String,
    pub coordinates: Option<GeoPoint>,
    pub active: bool,
    pub listing_count: u64,
}

impl City {
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name, self.postal_code)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighborhood {
    pub id: NeighborhoodId,
    pub city_id: CityId,
    pub name: String,
    pub coordinates: Option<GeoPoint>,
    pub listing_count: u64,
}

/// Registration payload for a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCity {
    pub name: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub coordinates: Option<GeoPoint>,
}

/// Registration payload for a neighborhood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNeighborhood {
    pub city_id: CityId,
    pub name: String,
    #[serde(default)]
    pub coordinates: Option<GeoPoint>,
}
