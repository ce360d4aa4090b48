//! Student housing listings: lifecycle, automated moderation, search and
//! denormalized location counters.

pub mod counters;
pub mod domain;
pub mod locations;
pub mod memory;
pub mod moderation;
pub mod notifications;
pub mod principal;
pub mod repository;
pub mod router;
pub mod search;
pub mod service;
pub mod statistics;
pub mod validation;

#[cfg(test)]
mod tests;

pub use counters::{CounterMaintainer, CounterSnapshot};
pub use domain::{
    Amenities, City, CityId, GeoPoint, HousingType, Listing, ListingDraft, ListingId,
    ListingStatus, ModerationSnapshot, Neighborhood, NeighborhoodId, NewCity, NewNeighborhood,
    UserId,
};
pub use locations::{LocationSeed, LocationSeedError, SeedSummary};
pub use memory::InMemoryListingStore;
pub use moderation::{
    ModerationConfig, ModerationConfigError, ModerationDecision, ModerationEngine,
    ModerationOutcome, ModerationReport,
};
pub use notifications::{ListingEvent, ListingNotifier, LogNotifier, NotificationError};
pub use principal::{Actor, Role};
pub use repository::{ListingRepository, ListingUnitOfWork, RepositoryError};
pub use router::{listing_router, ErrorResponse};
pub use search::{Page, PageRequest, SearchCriteria, SortDirection, SortField, SortSpec};
pub use service::{LifecycleSettings, ListingService, ListingServiceError, SweepReport};
pub use statistics::ListingStatistics;
pub use validation::{ListingGuard, ListingLimits, ValidationErrors};
