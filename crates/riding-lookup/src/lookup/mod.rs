//! Postal code and name resolution to roster representatives.
//!
//! The postal code pipeline runs cache, upstream service, person-id shortcut,
//! district reconciliation and manual overrides, stopping at the first stage
//! that produces a representative.

pub mod autocomplete;
pub mod cache;
pub mod fallback;
pub mod reconcile;
pub mod router;
pub mod service;
pub mod upstream;

#[cfg(test)]
mod tests;

pub use autocomplete::{Autocomplete, Suggestion, SuggestionKind, MAX_SUGGESTIONS};
pub use cache::{PostalCodeCache, MAX_TTL_DAYS, REPRESENT_SOURCE};
pub use fallback::{FallbackMatch, FallbackRoute, ManualMappingFallback};
pub use reconcile::{DistrictReconciler, MatchStrategy, Reconciliation};
pub use router::{lookup_router, LookupState};
pub use service::{
    DistrictSource, NameResolution, RepresentativeResolver, Resolution, ResolveError,
    ResolvedBy, ResolverSettings,
};
pub use upstream::{
    DistrictLookup, FailureReason, RepresentClient, UpstreamDistrict, UpstreamFailure,
};
