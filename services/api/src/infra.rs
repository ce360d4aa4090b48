use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use student_housing::config::AppConfig;
use student_housing::error::AppError;
use student_housing::listings::{
    InMemoryListingStore, LifecycleSettings, ListingService, LocationSeed, LogNotifier,
    ModerationConfig, ModerationEngine, SeedSummary,
};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

pub(crate) type ApiService = ListingService<InMemoryListingStore, LogNotifier>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Cities used when no seed file is configured.
pub(crate) const DEFAULT_LOCATIONS: &str = r#"{
    "cities": [
        {
            "name": "Lyon",
            "postal_code": "69000",
            "coordinates": { "latitude": 45.764, "longitude": 4.8357 },
            "neighborhoods": [
                { "name": "Part-Dieu", "coordinates": { "latitude": 45.7606, "longitude": 4.8590 } },
                { "name": "Croix-Rousse", "coordinates": { "latitude": 45.7745, "longitude": 4.8320 } },
                { "name": "Guillotiere", "coordinates": { "latitude": 45.7530, "longitude": 4.8430 } }
            ]
        },
        {
            "name": "Toulouse",
            "postal_code": "31000",
            "coordinates": { "latitude": 43.6047, "longitude": 1.4442 },
            "neighborhoods": [
                { "name": "Capitole" },
                { "name": "Rangueil" }
            ]
        }
    ]
}"#;

pub(crate) fn load_engine(policy_path: Option<&Path>) -> Result<ModerationEngine, AppError> {
    let config = match policy_path {
        Some(path) => {
            info!(path = %path.display(), "loading moderation policy");
            ModerationConfig::from_path(path)?
        }
        None => ModerationConfig::default(),
    };
    Ok(ModerationEngine::new(config)?)
}

pub(crate) fn seed_locations(
    store: &InMemoryListingStore,
    seed_path: Option<&Path>,
) -> Result<SeedSummary, AppError> {
    let seed = match seed_path {
        Some(path) => LocationSeed::from_path(path)?,
        None => LocationSeed::from_json(DEFAULT_LOCATIONS)?,
    };
    Ok(seed.apply(store)?)
}

/// Listing service over a freshly seeded in-memory store.
pub(crate) fn build_service(
    config: &AppConfig,
    settings: LifecycleSettings,
) -> Result<Arc<ApiService>, AppError> {
    let engine = load_engine(config.moderation.policy_path.as_deref())?;
    let store = Arc::new(InMemoryListingStore::new());
    seed_locations(&store, config.moderation.locations_path.as_deref())?;
    Ok(Arc::new(ListingService::with_settings(
        store,
        Arc::new(LogNotifier),
        engine,
        settings,
    )))
}

/// Runs the expiration sweep every `every`, starting one period after launch.
pub(crate) fn spawn_expiration_sweep(service: Arc<ApiService>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut periodic = tokio::time::interval(every);
        periodic.set_missed_tick_behavior(MissedTickBehavior::Delay);
        periodic.tick().await;

        loop {
            periodic.tick().await;
            let service = service.clone();
            match tokio::task::spawn_blocking(move || service.sweep_expired()).await {
                Ok(Ok(report)) => info!(
                    processed = report.processed,
                    failed = report.failed,
                    "scheduled expiration sweep"
                ),
                Ok(Err(err)) => error!(error = %err, "scheduled expiration sweep failed"),
                Err(err) => error!(error = %err, "expiration sweep task aborted"),
            }
        }
    })
}
