use crate::infra::build_services;
use clap::Args;
use riding_lookup::config::AppConfig;
use riding_lookup::domain::RepresentativeId;
use riding_lookup::error::AppError;
use riding_lookup::lookup::{NameResolution, ResolveError};
use riding_lookup::stats::StatisticsError;
use serde::Serialize;
use serde_json::json;

#[derive(Args, Debug)]
pub(crate) struct PostalLookupArgs {
    /// Postal code in any spacing or case, e.g. "k1a 0a6"
    pub(crate) code: String,
}

#[derive(Args, Debug)]
pub(crate) struct NameLookupArgs {
    /// Full or partial representative name
    pub(crate) query: String,
}

#[derive(Args, Debug)]
pub(crate) struct StatsArgs {
    /// Roster identifier of the representative
    pub(crate) representative_id: String,
    /// Number of newest votes to show and categorize, capped at STATS_RENDER_LIMIT
    #[arg(long)]
    pub(crate) limit: Option<usize>,
}

pub(crate) async fn run_postal_lookup(args: PostalLookupArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let services = build_services(&config)?;

    match services.lookup.resolver.resolve_by_postal_code(&args.code).await {
        Ok(resolution) => print_json(&resolution),
        Err(ResolveError::Validation(error)) => print_json(&json!({
            "status": "invalid",
            "error": error.to_string(),
        })),
        Err(ResolveError::NotFound { postal_code }) => print_json(&json!({
            "status": "not_found",
            "postal_code": postal_code,
        })),
        Err(ResolveError::Repository(error)) => print_json(&json!({
            "status": "error",
            "error": error.to_string(),
        })),
    }
}

pub(crate) async fn run_name_lookup(args: NameLookupArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let services = build_services(&config)?;

    let payload = match services.lookup.resolver.resolve_by_name(&args.query) {
        Ok(NameResolution::NotFound) => json!({ "status": "not_found", "query": args.query }),
        Ok(resolution) => json!({
            "status": "ok",
            "ambiguous": matches!(resolution, NameResolution::Ambiguous(_)),
            "matches": resolution.matches(),
        }),
        Err(error) => json!({ "status": "error", "error": error.to_string() }),
    };
    print_json(&payload)
}

pub(crate) async fn run_stats(args: StatsArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let services = build_services(&config)?;
    let id = RepresentativeId(args.representative_id);

    let result = services.statistics.statistics(&id, args.limit).await;
    // Let deferred categorization finish before the process exits.
    services.background.drain().await;

    match result {
        Ok(statistics) => print_json(&statistics),
        Err(StatisticsError::NotFound(id)) => print_json(&json!({
            "status": "not_found",
            "representative_id": id,
        })),
        Err(error) => print_json(&json!({ "status": "error", "error": error.to_string() })),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}
