use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::counters::CounterMaintainer;
use super::domain::{
    City, CityId, Listing, ListingDraft, ListingId, ListingStatus, Neighborhood, NeighborhoodId,
    NewCity, NewNeighborhood, UserId,
};
use super::moderation::{ModerationDecision, ModerationEngine, ModerationOutcome, ModerationReport};
use super::notifications::{ListingEvent, ListingNotifier};
use super::principal::Actor;
use super::repository::{ListingRepository, ListingUnitOfWork, RepositoryError};
use super::search::{self, AppliedFilters, Page, PageRequest, SearchCriteria, SortSpec};
use super::statistics::ListingStatistics;
use super::validation::{ListingGuard, ValidationErrors};

/// Tunables of the listing lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// Days a listing stays published when the owner gives no expiration.
    pub validity_days: u32,
    pub default_page_size: usize,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            validity_days: 30,
            default_page_size: search::DEFAULT_PAGE_SIZE,
        }
    }
}

/// Outcome of one expiration sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub processed: usize,
    pub failed: usize,
}

/// Lifecycle controller composing validation, moderation, storage and counters.
pub struct ListingService<R, N> {
    guard: Arc<ListingGuard>,
    repository: Arc<R>,
    notifier: Arc<N>,
    engine: Arc<ModerationEngine>,
    counters: CounterMaintainer,
    settings: LifecycleSettings,
}

impl<R, N> ListingService<R, N>
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, engine: ModerationEngine) -> Self {
        Self::with_settings(repository, notifier, engine, LifecycleSettings::default())
    }

    pub fn with_settings(
        repository: Arc<R>,
        notifier: Arc<N>,
        engine: ModerationEngine,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            guard: Arc::new(ListingGuard::default()),
            repository,
            notifier,
            engine: Arc::new(engine),
            counters: CounterMaintainer,
            settings,
        }
    }

    pub fn settings(&self) -> LifecycleSettings {
        self.settings
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub fn engine(&self) -> &ModerationEngine {
        &self.engine
    }

    /// Validate, moderate and persist a new listing, counting it in its city and neighborhood.
    pub fn create_listing(
        &self,
        draft: ListingDraft,
        owner: &Actor,
    ) -> Result<Listing, ListingServiceError> {
        self.guard.validate(&draft)?;

        let now = Utc::now();
        let default_expiration = now + Duration::days(i64::from(self.settings.validity_days));

        let (listing, outcome) =
            self.repository.transaction(|uow| -> Result<_, ListingServiceError> {
                let (city, neighborhood) =
                    resolve_location(uow, draft.city_id, draft.neighborhood_id)?;
                let listing = Listing::from_draft(draft, owner.id, now, default_expiration);
                let mut listing = uow.insert_listing(listing)?;

                let outcome = self.engine.evaluate(&listing);
                apply_outcome(&mut listing, &outcome, now);
                uow.save_listing(&listing)?;

                self.counters
                    .listing_created(uow, city.id, neighborhood.id)?;
                Ok((listing, outcome))
            })?;

        info!(
            listing_id = %listing.id,
            owner_id = %owner.id,
            status = %listing.status,
            trust_score = outcome.trust_score,
            manual_review = outcome.manual_review,
            "listing created"
        );
        self.notify_decision(&listing, &outcome.decision);
        Ok(listing)
    }

    /// Replace a listing's content; non-administrators send it back to moderation.
    pub fn update_listing(
        &self,
        id: ListingId,
        draft: ListingDraft,
        actor: &Actor,
    ) -> Result<Listing, ListingServiceError> {
        self.guard.validate(&draft)?;

        let listing = self.repository.transaction(|uow| -> Result<_, ListingServiceError> {
            let mut listing = uow
                .listing(id)?
                .ok_or_else(|| ListingServiceError::listing_not_found(id))?;

            if !actor.can_manage(listing.owner_id) {
                return Err(ListingServiceError::Forbidden {
                    actor: actor.id,
                    listing: id,
                });
            }
            if !listing.is_editable() && !actor.is_administrator() {
                return Err(ListingServiceError::NotEditable {
                    id,
                    status: listing.status,
                });
            }

            let (city, neighborhood) =
                resolve_location(uow, draft.city_id, draft.neighborhood_id)?;
            let previous = (listing.city_id, listing.neighborhood_id);

            listing.apply_draft(draft);
            listing.modified_at = Some(Utc::now());
            if !actor.is_administrator() {
                listing.status = ListingStatus::Pending;
                listing.moderation_comment = None;
            }
            uow.save_listing(&listing)?;

            if !listing.is_removed() {
                self.counters
                    .listing_relocated(uow, previous, (city.id, neighborhood.id))?;
            }
            Ok(listing)
        })?;

        info!(
            listing_id = %listing.id,
            actor_id = %actor.id,
            status = %listing.status,
            "listing updated"
        );
        Ok(listing)
    }

    /// Soft delete: archive and deactivate, releasing the location counts once.
    pub fn delete_listing(&self, id: ListingId, actor: &Actor) -> Result<(), ListingServiceError> {
        let archived = self.repository.transaction(|uow| -> Result<_, ListingServiceError> {
            let mut listing = uow
                .listing(id)?
                .ok_or_else(|| ListingServiceError::listing_not_found(id))?;

            if !actor.can_manage(listing.owner_id) {
                return Err(ListingServiceError::Forbidden {
                    actor: actor.id,
                    listing: id,
                });
            }
            if listing.is_removed() {
                return Ok(false);
            }

            listing.active = false;
            listing.status = ListingStatus::Archived;
            listing.modified_at = Some(Utc::now());
            uow.save_listing(&listing)?;
            self.counters
                .listing_removed(uow, listing.city_id, listing.neighborhood_id)?;
            Ok(true)
        })?;

        if archived {
            info!(listing_id = %id, actor_id = %actor.id, "listing archived");
        } else {
            debug!(listing_id = %id, "listing already archived");
        }
        Ok(())
    }

    /// Public read; optionally counts a view.
    pub fn get_listing(
        &self,
        id: ListingId,
        increment_views: bool,
    ) -> Result<Listing, ListingServiceError> {
        if !increment_views {
            return self
                .repository
                .fetch_listing(id)?
                .filter(Listing::is_public)
                .ok_or_else(|| ListingServiceError::listing_not_found(id));
        }

        self.repository.transaction(|uow| -> Result<_, ListingServiceError> {
            let mut listing = uow
                .listing(id)?
                .filter(Listing::is_public)
                .ok_or_else(|| ListingServiceError::listing_not_found(id))?;
            listing.view_count = listing.view_count.saturating_add(1);
            uow.save_listing(&listing)?;
            Ok(listing)
        })
    }

    pub fn search_listings(
        &self,
        criteria: SearchCriteria,
        page: PageRequest,
    ) -> Result<Page<Listing>, ListingServiceError> {
        criteria.validate()?;

        let query = search::compose(&criteria);
        let mut listings = self.repository.matching(&query)?;
        search::sort_listings(&mut listings, criteria.sort);
        debug!(
            strategy = query.strategy(),
            matches = listings.len(),
            page = page.page,
            "listing search"
        );

        let sort = criteria.sort;
        Ok(Page::from_sorted(listings, page, sort).with_filters(AppliedFilters {
            strategy: query.strategy(),
            criteria,
        }))
    }

    /// Add or remove a favorite mark; the counter never drops below zero.
    pub fn toggle_favorite(
        &self,
        id: ListingId,
        on: bool,
        actor: &Actor,
    ) -> Result<Listing, ListingServiceError> {
        let listing = self.repository.transaction(|uow| -> Result<_, ListingServiceError> {
            let mut listing = uow
                .listing(id)?
                .ok_or_else(|| ListingServiceError::listing_not_found(id))?;
            listing.favorite_count = if on {
                listing.favorite_count.saturating_add(1)
            } else {
                listing.favorite_count.saturating_sub(1)
            };
            uow.save_listing(&listing)?;
            Ok(listing)
        })?;

        debug!(
            listing_id = %id,
            actor_id = %actor.id,
            favorite = on,
            favorite_count = listing.favorite_count,
            "favorite toggled"
        );
        Ok(listing)
    }

    pub fn expire_listing(&self, id: ListingId) -> Result<Listing, ListingServiceError> {
        self.expire_at(id, Utc::now())
    }

    /// APPROVED to EXPIRED; repeating it on an expired listing changes nothing.
    pub fn expire_at(
        &self,
        id: ListingId,
        now: DateTime<Utc>,
    ) -> Result<Listing, ListingServiceError> {
        let (listing, changed) =
            self.repository.transaction(|uow| -> Result<_, ListingServiceError> {
                let mut listing = uow
                    .listing(id)?
                    .ok_or_else(|| ListingServiceError::listing_not_found(id))?;
                match listing.status {
                    ListingStatus::Expired => Ok((listing, false)),
                    ListingStatus::Approved => {
                        listing.status = ListingStatus::Expired;
                        listing.active = false;
                        listing.modified_at = Some(now);
                        uow.save_listing(&listing)?;
                        Ok((listing, true))
                    }
                    from => Err(ListingServiceError::InvalidTransition {
                        id,
                        from,
                        to: ListingStatus::Expired,
                    }),
                }
            })?;

        if changed {
            info!(listing_id = %id, "listing expired");
            self.send(ListingEvent::Expired {
                listing_id: listing.id,
                owner_id: listing.owner_id,
                title: listing.title.clone(),
            });
        }
        Ok(listing)
    }

    pub fn sweep_expired(&self) -> Result<SweepReport, ListingServiceError> {
        self.sweep_expired_at(Utc::now())
    }

    /// Expire every public listing past its expiration; one failure never stops the sweep.
    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> Result<SweepReport, ListingServiceError> {
        let candidates = self.repository.expired_candidates(now)?;
        let mut report = SweepReport::default();

        for id in candidates {
            match self.expire_at(id, now) {
                Ok(_) => report.processed += 1,
                Err(err) => {
                    report.failed += 1;
                    error!(listing_id = %id, error = %err, "failed to expire listing");
                }
            }
        }

        info!(
            processed = report.processed,
            failed = report.failed,
            "expiration sweep finished"
        );
        Ok(report)
    }

    /// Approve a listing that automatic moderation rejected.
    pub fn approve_rejected_listing(
        &self,
        id: ListingId,
        comment: Option<String>,
    ) -> Result<(), ListingServiceError> {
        let listing = self.repository.transaction(|uow| -> Result<_, ListingServiceError> {
            let mut listing = uow
                .listing(id)?
                .filter(|listing| listing.status == ListingStatus::Rejected)
                .ok_or_else(|| ListingServiceError::NotFound(format!("rejected listing {id}")))?;
            let now = Utc::now();
            listing.status = ListingStatus::Approved;
            listing.moderation_comment = comment;
            listing.published_at.get_or_insert(now);
            listing.modified_at = Some(now);
            uow.save_listing(&listing)?;
            Ok(listing)
        })?;

        info!(listing_id = %id, "rejected listing approved by administrator");
        self.send(ListingEvent::Approved {
            listing_id: listing.id,
            owner_id: listing.owner_id,
            title: listing.title,
        });
        Ok(())
    }

    /// Administrator status change checked against the transition table.
    pub fn moderate_listing(
        &self,
        id: ListingId,
        target: ListingStatus,
        comment: Option<String>,
    ) -> Result<Listing, ListingServiceError> {
        let validity = Duration::days(i64::from(self.settings.validity_days));

        let (listing, from) =
            self.repository.transaction(|uow| -> Result<_, ListingServiceError> {
                let mut listing = uow
                    .listing(id)?
                    .ok_or_else(|| ListingServiceError::listing_not_found(id))?;
                let from = listing.status;
                if !from.can_transition_to(target, true) {
                    return Err(ListingServiceError::InvalidTransition {
                        id,
                        from,
                        to: target,
                    });
                }

                let was_removed = listing.is_removed();
                let now = Utc::now();
                listing.status = target;
                listing.moderation_comment = comment;
                listing.modified_at = Some(now);
                match target {
                    ListingStatus::Approved => {
                        listing.active = true;
                        listing.published_at.get_or_insert(now);
                        if listing.is_expired_at(now) {
                            listing.expires_at = now + validity;
                        }
                    }
                    ListingStatus::Expired | ListingStatus::Archived => listing.active = false,
                    _ => {}
                }
                uow.save_listing(&listing)?;

                match (was_removed, listing.is_removed()) {
                    (true, false) => {
                        self.counters
                            .listing_created(uow, listing.city_id, listing.neighborhood_id)?;
                    }
                    (false, true) => {
                        self.counters
                            .listing_removed(uow, listing.city_id, listing.neighborhood_id)?;
                    }
                    _ => {}
                }
                Ok((listing, from))
            })?;

        info!(
            listing_id = %id,
            from = %from,
            to = %listing.status,
            "listing moderated by administrator"
        );
        match listing.status {
            ListingStatus::Approved => self.send(ListingEvent::Approved {
                listing_id: listing.id,
                owner_id: listing.owner_id,
                title: listing.title.clone(),
            }),
            ListingStatus::Rejected => self.send(ListingEvent::Rejected {
                listing_id: listing.id,
                owner_id: listing.owner_id,
                title: listing.title.clone(),
                reason: listing.moderation_comment.clone().unwrap_or_default(),
            }),
            ListingStatus::Expired => self.send(ListingEvent::Expired {
                listing_id: listing.id,
                owner_id: listing.owner_id,
                title: listing.title.clone(),
            }),
            _ => {}
        }
        Ok(listing)
    }

    /// Run automatic moderation again on a PENDING listing.
    pub fn rerun_moderation(&self, id: ListingId) -> Result<ModerationOutcome, ListingServiceError> {
        let (listing, outcome) =
            self.repository.transaction(|uow| -> Result<_, ListingServiceError> {
                let mut listing = uow
                    .listing(id)?
                    .ok_or_else(|| ListingServiceError::listing_not_found(id))?;
                if listing.status != ListingStatus::Pending {
                    return Err(ListingServiceError::InvalidTransition {
                        id,
                        from: listing.status,
                        to: ListingStatus::Pending,
                    });
                }
                let outcome = self.engine.evaluate(&listing);
                apply_outcome(&mut listing, &outcome, Utc::now());
                uow.save_listing(&listing)?;
                Ok((listing, outcome))
            })?;

        info!(
            listing_id = %id,
            status = %listing.status,
            trust_score = outcome.trust_score,
            "moderation re-run"
        );
        self.notify_decision(&listing, &outcome.decision);
        Ok(outcome)
    }

    pub fn moderation_report(&self, id: ListingId) -> Result<ModerationReport, ListingServiceError> {
        let listing = self
            .repository
            .fetch_listing(id)?
            .ok_or_else(|| ListingServiceError::listing_not_found(id))?;
        Ok(self.engine.report(&listing))
    }

    /// The owner's active listings, newest first.
    pub fn listings_by_owner(
        &self,
        owner: UserId,
        page: PageRequest,
    ) -> Result<Page<Listing>, ListingServiceError> {
        let mut listings = self.repository.owned_by(owner)?;
        let sort = SortSpec::newest_first();
        search::sort_listings(&mut listings, sort);
        Ok(Page::from_sorted(listings, page, sort))
    }

    /// Public listings of the same city and housing type, closest price first.
    pub fn similar_listings(
        &self,
        id: ListingId,
        limit: usize,
    ) -> Result<Vec<Listing>, ListingServiceError> {
        let source = self
            .repository
            .fetch_listing(id)?
            .ok_or_else(|| ListingServiceError::listing_not_found(id))?;
        if !source.is_public() {
            return Ok(Vec::new());
        }

        let query = search::compose(&SearchCriteria {
            city_id: Some(source.city_id),
            housing_type: Some(source.housing_type),
            ..SearchCriteria::default()
        });
        let mut similar: Vec<Listing> = self
            .repository
            .matching(&query)?
            .into_iter()
            .filter(|listing| listing.id != source.id)
            .collect();
        similar.sort_by(|left, right| {
            (left.price - source.price)
                .abs()
                .cmp(&(right.price - source.price).abs())
                .then_with(|| left.id.cmp(&right.id))
        });
        similar.truncate(limit);
        Ok(similar)
    }

    /// PENDING and REJECTED listings, oldest first.
    pub fn pending_moderation(&self) -> Result<Vec<Listing>, ListingServiceError> {
        let mut listings = self
            .repository
            .with_status(&[ListingStatus::Pending, ListingStatus::Rejected])?;
        search::sort_listings(&mut listings, SortSpec::oldest_first());
        Ok(listings)
    }

    pub fn statistics(&self) -> Result<ListingStatistics, ListingServiceError> {
        let listings = self.repository.all_listings()?;
        let cities = self.repository.cities()?;
        Ok(ListingStatistics::collect(&listings, &cities, Utc::now()))
    }

    pub fn cities(&self) -> Result<Vec<City>, ListingServiceError> {
        Ok(self.repository.cities()?)
    }

    pub fn neighborhoods(&self, city: CityId) -> Result<Vec<Neighborhood>, ListingServiceError> {
        if self.repository.fetch_city(city)?.is_none() {
            return Err(ListingServiceError::NotFound(format!("city {city}")));
        }
        Ok(self.repository.neighborhoods(city)?)
    }

    pub fn register_city(&self, city: NewCity) -> Result<City, ListingServiceError> {
        let mut errors = ValidationErrors::new();
        if city.name.trim().is_empty() {
            errors.add("name", "name is required");
        }
        if city.postal_code.trim().is_empty() {
            errors.add("postal_code", "postal code is required");
        }
        if city.coordinates.is_some_and(|point| !point.is_valid()) {
            errors.add("coordinates", "coordinates are out of range");
        }
        errors.into_result()?;

        let city = self.repository.register_city(city)?;
        info!(city_id = %city.id, name = %city.name, "city registered");
        Ok(city)
    }

    pub fn register_neighborhood(
        &self,
        neighborhood: NewNeighborhood,
    ) -> Result<Neighborhood, ListingServiceError> {
        let mut errors = ValidationErrors::new();
        if neighborhood.name.trim().is_empty() {
            errors.add("name", "name is required");
        }
        if neighborhood.coordinates.is_some_and(|point| !point.is_valid()) {
            errors.add("coordinates", "coordinates are out of range");
        }
        errors.into_result()?;

        let neighborhood = match self.repository.register_neighborhood(neighborhood) {
            Err(RepositoryError::NotFound(resource)) => {
                return Err(ListingServiceError::NotFound(resource))
            }
            other => other?,
        };
        info!(
            neighborhood_id = %neighborhood.id,
            city_id = %neighborhood.city_id,
            "neighborhood registered"
        );
        Ok(neighborhood)
    }

    fn notify_decision(&self, listing: &Listing, decision: &ModerationDecision) {
        match decision {
            ModerationDecision::Approved => self.send(ListingEvent::Approved {
                listing_id: listing.id,
                owner_id: listing.owner_id,
                title: listing.title.clone(),
            }),
            ModerationDecision::Rejected(reason) => self.send(ListingEvent::Rejected {
                listing_id: listing.id,
                owner_id: listing.owner_id,
                title: listing.title.clone(),
                reason: reason.summary(),
            }),
            ModerationDecision::PendingReview { .. } => {}
        }
    }

    fn send(&self, event: ListingEvent) {
        let label = event.label();
        let listing_id = event.listing_id();
        if let Err(err) = self.notifier.notify(event) {
            warn!(%listing_id, event = label, error = %err, "listing notification failed");
        }
    }
}

fn resolve_location(
    uow: &mut dyn ListingUnitOfWork,
    city_id: CityId,
    neighborhood_id: NeighborhoodId,
) -> Result<(City, Neighborhood), ListingServiceError> {
    let city = uow
        .city(city_id)?
        .ok_or_else(|| ListingServiceError::NotFound(format!("city {city_id}")))?;
    let neighborhood = uow
        .neighborhood(neighborhood_id)?
        .ok_or_else(|| ListingServiceError::NotFound(format!("neighborhood {neighborhood_id}")))?;
    if neighborhood.city_id != city.id {
        return Err(ListingServiceError::InvalidRelation {
            city: city.id,
            neighborhood: neighborhood.id,
        });
    }
    Ok((city, neighborhood))
}

fn apply_outcome(listing: &mut Listing, outcome: &ModerationOutcome, now: DateTime<Utc>) {
    listing.moderation = Some(outcome.snapshot(now));
    match &outcome.decision {
        ModerationDecision::Approved => {
            listing.status = ListingStatus::Approved;
            listing.published_at = Some(now);
            listing.moderation_comment = None;
        }
        ModerationDecision::Rejected(reason) => {
            listing.status = ListingStatus::Rejected;
            listing.moderation_comment = Some(reason.summary());
        }
        ModerationDecision::PendingReview { reason } => {
            listing.status = ListingStatus::Pending;
            listing.moderation_comment = Some(reason.clone());
        }
    }
}

/// Error raised by the listing service.
#[derive(Debug, thiserror::Error)]
pub enum ListingServiceError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("neighborhood {neighborhood} does not belong to city {city}")]
    InvalidRelation {
        city: CityId,
        neighborhood: NeighborhoodId,
    },
    #[error("user {actor} may not modify listing {listing}")]
    Forbidden { actor: UserId, listing: ListingId },
    #[error("listing {id} can no longer be edited ({status})")]
    NotEditable { id: ListingId, status: ListingStatus },
    #[error("listing {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: ListingId,
        from: ListingStatus,
        to: ListingStatus,
    },
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ListingServiceError {
    fn listing_not_found(id: ListingId) -> Self {
        Self::NotFound(format!("listing {id}"))
    }
}
