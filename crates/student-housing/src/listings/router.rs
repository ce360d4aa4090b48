use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::error;

use super::domain::{
    CityId, GeoPoint, HousingType, Listing, ListingDraft, ListingId, ListingStatus, NewCity,
    NewNeighborhood, NeighborhoodId, UserId,
};
use super::notifications::ListingNotifier;
use super::principal::{Actor, Role};
use super::repository::{ListingRepository, RepositoryError};
use super::search::{
    AmenityFilter, GeoRadius, PageRequest, SearchCriteria, SortDirection, SortField, SortSpec,
};
use super::service::{ListingService, ListingServiceError};
use super::validation::ValidationErrors;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

const SIMILAR_DEFAULT_LIMIT: usize = 4;

/// Router exposing the listing lifecycle, search and moderation endpoints.
///
/// Caller identity is read from the `x-user-*` headers set by the
/// authentication gateway in front of this service.
pub fn listing_router<R, N>(service: Arc<ListingService<R, N>>) -> Router
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/listings",
            get(search_handler::<R, N>).post(create_handler::<R, N>),
        )
        .route("/api/v1/listings/mine", get(mine_handler::<R, N>))
        .route(
            "/api/v1/listings/:id",
            get(detail_handler::<R, N>)
                .put(update_handler::<R, N>)
                .delete(delete_handler::<R, N>),
        )
        .route(
            "/api/v1/listings/:id/favorite/:on",
            put(favorite_handler::<R, N>),
        )
        .route("/api/v1/listings/:id/similar", get(similar_handler::<R, N>))
        .route("/api/v1/cities", get(cities_handler::<R, N>))
        .route(
            "/api/v1/cities/:id/neighborhoods",
            get(neighborhoods_handler::<R, N>),
        )
        .route("/api/v1/admin/cities", post(register_city_handler::<R, N>))
        .route(
            "/api/v1/admin/cities/:id/neighborhoods",
            post(register_neighborhood_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/listings/pending",
            get(pending_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/listings/sweep",
            post(sweep_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/listings/:id/approve",
            put(approve_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/listings/:id/status",
            put(status_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/listings/:id/moderation",
            post(rerun_handler::<R, N>).get(report_handler::<R, N>),
        )
        .route(
            "/api/v1/admin/statistics",
            get(statistics_handler::<R, N>),
        )
        .with_state(service)
}

/// Structured error body shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<ValidationErrors>,
}

impl ErrorResponse {
    fn new(status: StatusCode, message: impl Into<String>, path: &Uri) -> Self {
        Self {
            timestamp: Utc::now(),
            status: status.as_u16(),
            error: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message: message.into(),
            path: path.path().to_string(),
            validation_errors: None,
        }
    }

    fn into_response_with(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

fn error_response(status: StatusCode, message: impl Into<String>, uri: &Uri) -> Response {
    ErrorResponse::new(status, message, uri).into_response_with()
}

fn bad_request(message: String, uri: &Uri) -> Response {
    error_response(StatusCode::BAD_REQUEST, message, uri)
}

fn validation_response(errors: ValidationErrors, uri: &Uri) -> Response {
    let mut body = ErrorResponse::new(StatusCode::BAD_REQUEST, "validation failed", uri);
    body.validation_errors = Some(errors);
    body.into_response_with()
}

fn service_error_response(err: ListingServiceError, uri: &Uri) -> Response {
    match err {
        ListingServiceError::NotFound(_) => {
            error_response(StatusCode::NOT_FOUND, err.to_string(), uri)
        }
        ListingServiceError::InvalidRelation { .. } => {
            error_response(StatusCode::BAD_REQUEST, err.to_string(), uri)
        }
        ListingServiceError::Validation(errors) => validation_response(errors, uri),
        ListingServiceError::Forbidden { .. } => {
            error_response(StatusCode::FORBIDDEN, err.to_string(), uri)
        }
        ListingServiceError::NotEditable { .. } | ListingServiceError::InvalidTransition { .. } => {
            error_response(StatusCode::CONFLICT, err.to_string(), uri)
        }
        ListingServiceError::Repository(RepositoryError::Conflict(_)) => {
            error_response(StatusCode::CONFLICT, err.to_string(), uri)
        }
        ListingServiceError::Repository(inner) => {
            error!(error = %inner, path = %uri.path(), "listing repository failure");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "an internal error occurred",
                uri,
            )
        }
    }
}

/// Resolve the caller from gateway headers; 401 when absent or malformed.
pub(crate) fn actor_from_headers(headers: &HeaderMap, uri: &Uri) -> Result<Actor, Response> {
    let unauthorized =
        || error_response(StatusCode::UNAUTHORIZED, "authentication required", uri);

    let id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .ok_or_else(unauthorized)?;
    let role = match headers.get(USER_ROLE_HEADER) {
        None => Role::User,
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|raw| raw.parse::<Role>().ok())
            .ok_or_else(unauthorized)?,
    };
    let email = headers
        .get(USER_EMAIL_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    Ok(Actor::new(UserId(id), role, email))
}

fn require_moderator(headers: &HeaderMap, uri: &Uri) -> Result<Actor, Response> {
    let actor = actor_from_headers(headers, uri)?;
    if actor.can_moderate() {
        Ok(actor)
    } else {
        Err(error_response(
            StatusCode::FORBIDDEN,
            "moderator role required",
            uri,
        ))
    }
}

fn require_administrator(headers: &HeaderMap, uri: &Uri) -> Result<Actor, Response> {
    let actor = actor_from_headers(headers, uri)?;
    if actor.is_administrator() {
        Ok(actor)
    } else {
        Err(error_response(
            StatusCode::FORBIDDEN,
            "administrator role required",
            uri,
        ))
    }
}

/// Listing as exposed over HTTP, with its URL slug.
#[derive(Debug, Clone, Serialize)]
pub struct ListingView {
    #[serde(flatten)]
    pub listing: Listing,
    pub slug: String,
}

impl From<Listing> for ListingView {
    fn from(listing: Listing) -> Self {
        let slug = listing.slug();
        Self { listing, slug }
    }
}

/// Flat query string accepted by the search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    #[serde(alias = "searchTerm", alias = "q")]
    pub term: Option<String>,
    pub housing_type: Option<HousingType>,
    pub city_id: Option<u64>,
    pub neighborhood_id: Option<u64>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_area: Option<u32>,
    pub max_area: Option<u32>,
    pub min_rooms: Option<u32>,
    pub max_rooms: Option<u32>,
    pub furnished: Option<bool>,
    pub parking: Option<bool>,
    pub balcony: Option<bool>,
    pub garden: Option<bool>,
    pub air_conditioning: Option<bool>,
    pub heating: Option<bool>,
    pub internet: Option<bool>,
    pub pets_allowed: Option<bool>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_km: Option<f64>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
    pub page: Option<usize>,
    pub size: Option<usize>,
}

impl SearchParams {
    pub fn into_criteria(
        self,
        default_page_size: usize,
    ) -> Result<(SearchCriteria, PageRequest), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let field = match self.sort_by.as_deref().map(SortField::parse) {
            None => SortField::default(),
            Some(Ok(field)) => field,
            Some(Err(err)) => {
                errors.add("sort_by", err.to_string());
                SortField::default()
            }
        };
        let direction = self
            .sort_direction
            .as_deref()
            .map(SortDirection::parse)
            .unwrap_or_default();

        let geo = match (self.latitude, self.longitude, self.radius_km) {
            (Some(latitude), Some(longitude), Some(radius_km)) => Some(GeoRadius {
                center: GeoPoint::new(latitude, longitude),
                radius_km,
            }),
            (None, None, None) => None,
            _ => {
                errors.add(
                    "radius_km",
                    "latitude, longitude and radius_km must be supplied together",
                );
                None
            }
        };
        errors.into_result()?;

        let criteria = SearchCriteria {
            term: self.term,
            housing_type: self.housing_type,
            city_id: self.city_id.map(CityId),
            neighborhood_id: self.neighborhood_id.map(NeighborhoodId),
            min_price: self.min_price,
            max_price: self.max_price,
            min_area: self.min_area,
            max_area: self.max_area,
            min_rooms: self.min_rooms,
            max_rooms: self.max_rooms,
            amenities: AmenityFilter {
                furnished: self.furnished,
                parking: self.parking,
                balcony: self.balcony,
                garden: self.garden,
                air_conditioning: self.air_conditioning,
                heating: self.heating,
                internet: self.internet,
                pets_allowed: self.pets_allowed,
            },
            geo,
            sort: SortSpec::new(field, direction),
        };
        let page = PageRequest::new(
            self.page.unwrap_or(0),
            self.size.unwrap_or(default_page_size),
        );
        Ok((criteria, page))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PageParams {
    pub page: Option<usize>,
    pub size: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimilarParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentBody {
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub status: ListingStatus,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NeighborhoodBody {
    pub name: String,
    #[serde(default)]
    pub coordinates: Option<GeoPoint>,
}

pub(crate) async fn search_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    uri: Uri,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Response
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return bad_request(rejection.body_text(), &uri),
    };
    let (criteria, page) = match params.into_criteria(service.settings().default_page_size) {
        Ok(parsed) => parsed,
        Err(errors) => return validation_response(errors, &uri),
    };

    match service.search_listings(criteria, page) {
        Ok(page) => (StatusCode::OK, Json(page.map(ListingView::from))).into_response(),
        Err(err) => service_error_response(err, &uri),
    }
}

pub(crate) async fn create_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    uri: Uri,
    headers: HeaderMap,
    draft: Result<Json<ListingDraft>, JsonRejection>,
) -> Response
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let actor = match actor_from_headers(&headers, &uri) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let Json(draft) = match draft {
        Ok(draft) => draft,
        Err(rejection) => return bad_request(rejection.body_text(), &uri),
    };

    match service.create_listing(draft, &actor) {
        Ok(listing) => (StatusCode::CREATED, Json(ListingView::from(listing))).into_response(),
        Err(err) => service_error_response(err, &uri),
    }
}

pub(crate) async fn detail_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    uri: Uri,
    Path(id): Path<u64>,
) -> Response
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    match service.get_listing(ListingId(id), true) {
        Ok(listing) => (StatusCode::OK, Json(ListingView::from(listing))).into_response(),
        Err(err) => service_error_response(err, &uri),
    }
}

pub(crate) async fn update_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    uri: Uri,
    headers: HeaderMap,
    Path(id): Path<u64>,
    draft: Result<Json<ListingDraft>, JsonRejection>,
) -> Response
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let actor = match actor_from_headers(&headers, &uri) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let Json(draft) = match draft {
        Ok(draft) => draft,
        Err(rejection) => return bad_request(rejection.body_text(), &uri),
    };

    match service.update_listing(ListingId(id), draft, &actor) {
        Ok(listing) => (StatusCode::OK, Json(ListingView::from(listing))).into_response(),
        Err(err) => service_error_response(err, &uri),
    }
}

pub(crate) async fn delete_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    uri: Uri,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let actor = match actor_from_headers(&headers, &uri) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.delete_listing(ListingId(id), &actor) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => service_error_response(err, &uri),
    }
}

pub(crate) async fn favorite_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    uri: Uri,
    headers: HeaderMap,
    Path((id, on)): Path<(u64, bool)>,
) -> Response
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let actor = match actor_from_headers(&headers, &uri) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.toggle_favorite(ListingId(id), on, &actor) {
        Ok(listing) => (StatusCode::OK, Json(ListingView::from(listing))).into_response(),
        Err(err) => service_error_response(err, &uri),
    }
}

pub(crate) async fn similar_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    uri: Uri,
    Path(id): Path<u64>,
    Query(params): Query<SimilarParams>,
) -> Response
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let limit = params.limit.unwrap_or(SIMILAR_DEFAULT_LIMIT).clamp(1, 20);
    match service.similar_listings(ListingId(id), limit) {
        Ok(listings) => {
            let views: Vec<ListingView> = listings.into_iter().map(ListingView::from).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => service_error_response(err, &uri),
    }
}

pub(crate) async fn mine_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    uri: Uri,
    headers: HeaderMap,
    Query(params): Query<PageParams>,
) -> Response
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    let actor = match actor_from_headers(&headers, &uri) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let page = PageRequest::new(
        params.page.unwrap_or(0),
        params
            .size
            .unwrap_or(service.settings().default_page_size),
    );

    match service.listings_by_owner(actor.id, page) {
        Ok(page) => (StatusCode::OK, Json(page.map(ListingView::from))).into_response(),
        Err(err) => service_error_response(err, &uri),
    }
}

pub(crate) async fn cities_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    uri: Uri,
) -> Response
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    match service.cities() {
        Ok(cities) => (StatusCode::OK, Json(cities)).into_response(),
        Err(err) => service_error_response(err, &uri),
    }
}

pub(crate) async fn neighborhoods_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    uri: Uri,
    Path(city): Path<u64>,
) -> Response
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    match service.neighborhoods(CityId(city)) {
        Ok(neighborhoods) => (StatusCode::OK, Json(neighborhoods)).into_response(),
        Err(err) => service_error_response(err, &uri),
    }
}

pub(crate) async fn register_city_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Json<NewCity>, JsonRejection>,
) -> Response
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    if let Err(response) = require_administrator(&headers, &uri) {
        return response;
    }
    let Json(city) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection.body_text(), &uri),
    };

    match service.register_city(city) {
        Ok(city) => (StatusCode::CREATED, Json(city)).into_response(),
        Err(err) => service_error_response(err, &uri),
    }
}

pub(crate) async fn register_neighborhood_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    uri: Uri,
    headers: HeaderMap,
    Path(city): Path<u64>,
    body: Result<Json<NeighborhoodBody>, JsonRejection>,
) -> Response
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    if let Err(response) = require_administrator(&headers, &uri) {
        return response;
    }
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection.body_text(), &uri),
    };

    let neighborhood = NewNeighborhood {
        city_id: CityId(city),
        name: body.name,
        coordinates: body.coordinates,
    };
    match service.register_neighborhood(neighborhood) {
        Ok(neighborhood) => (StatusCode::CREATED, Json(neighborhood)).into_response(),
        Err(err) => service_error_response(err, &uri),
    }
}

pub(crate) async fn pending_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    if let Err(response) = require_moderator(&headers, &uri) {
        return response;
    }

    match service.pending_moderation() {
        Ok(listings) => {
            let views: Vec<ListingView> = listings.into_iter().map(ListingView::from).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => service_error_response(err, &uri),
    }
}

pub(crate) async fn sweep_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    if let Err(response) = require_administrator(&headers, &uri) {
        return response;
    }

    match service.sweep_expired() {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => service_error_response(err, &uri),
    }
}

pub(crate) async fn approve_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    uri: Uri,
    headers: HeaderMap,
    Path(id): Path<u64>,
    body: Option<Json<CommentBody>>,
) -> Response
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    if let Err(response) = require_moderator(&headers, &uri) {
        return response;
    }
    let comment = body.and_then(|Json(body)| body.comment);

    match service.approve_rejected_listing(ListingId(id), comment) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => service_error_response(err, &uri),
    }
}

pub(crate) async fn status_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    uri: Uri,
    headers: HeaderMap,
    Path(id): Path<u64>,
    body: Result<Json<StatusChange>, JsonRejection>,
) -> Response
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    if let Err(response) = require_administrator(&headers, &uri) {
        return response;
    }
    let Json(change) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection.body_text(), &uri),
    };

    match service.moderate_listing(ListingId(id), change.status, change.comment) {
        Ok(listing) => (StatusCode::OK, Json(ListingView::from(listing))).into_response(),
        Err(err) => service_error_response(err, &uri),
    }
}

pub(crate) async fn rerun_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    uri: Uri,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    if let Err(response) = require_moderator(&headers, &uri) {
        return response;
    }

    match service.rerun_moderation(ListingId(id)) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => service_error_response(err, &uri),
    }
}

pub(crate) async fn report_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    uri: Uri,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    if let Err(response) = require_moderator(&headers, &uri) {
        return response;
    }

    match service.moderation_report(ListingId(id)) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => service_error_response(err, &uri),
    }
}

pub(crate) async fn statistics_handler<R, N>(
    State(service): State<Arc<ListingService<R, N>>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response
where
    R: ListingRepository + 'static,
    N: ListingNotifier + 'static,
{
    if let Err(response) = require_administrator(&headers, &uri) {
        return response;
    }

    match service.statistics() {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(err) => service_error_response(err, &uri),
    }
}
