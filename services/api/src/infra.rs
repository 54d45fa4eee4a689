use metrics_exporter_prometheus::PrometheusHandle;
use riding_lookup::background::BackgroundTasks;
use riding_lookup::config::AppConfig;
use riding_lookup::error::AppError;
use riding_lookup::lookup::{
    Autocomplete, LookupState, RepresentClient, RepresentativeResolver, ResolverSettings,
    REPRESENT_SOURCE,
};
use riding_lookup::stats::{KeywordClassifier, StatisticsService, StatisticsSettings};
use riding_lookup::store::{import, InMemoryStore, Repositories};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) background: BackgroundTasks,
}

/// Everything the routes and the one-shot commands need, wired from config.
pub(crate) struct Services {
    pub(crate) lookup: LookupState,
    pub(crate) statistics: Arc<StatisticsService>,
    pub(crate) background: BackgroundTasks,
}

pub(crate) fn build_services(config: &AppConfig) -> Result<Services, AppError> {
    let store = Arc::new(InMemoryStore::new());
    import::load_sources(&store, &config.data)?;
    Ok(services_from_store(store, config))
}

pub(crate) fn services_from_store(store: Arc<InMemoryStore>, config: &AppConfig) -> Services {
    let repositories = Repositories::in_memory(store);
    let background = BackgroundTasks::new();

    let upstream = Arc::new(RepresentClient::new(config.upstream.base_url.clone()));
    let resolver = RepresentativeResolver::new(
        &repositories,
        upstream,
        ResolverSettings {
            upstream_timeout: config.upstream.timeout,
            cache_ttl_days: config.cache.postal_code_ttl_days,
            source: REPRESENT_SOURCE.to_string(),
        },
    );
    let autocomplete = Autocomplete::new(
        repositories.roster.clone(),
        repositories.postal_codes.clone(),
    );

    let statistics = StatisticsService::new(
        &repositories,
        Arc::new(KeywordClassifier::new()),
        StatisticsSettings {
            render_limit: config.stats.render_limit,
            session_start: config.stats.session_start,
        },
        background.clone(),
    );

    Services {
        lookup: LookupState {
            resolver: Arc::new(resolver),
            autocomplete,
        },
        statistics: Arc::new(statistics),
        background,
    }
}
