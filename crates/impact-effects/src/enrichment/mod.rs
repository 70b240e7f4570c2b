//! Impact-effects enrichment pipeline.
//!
//! Given an impact location and pre-computed effect radii, the pipeline queries
//! independent geodata sources concurrently, classifies discovered settlements
//! into damage zones and assembles a report-ready structure in which every
//! unavailable source is represented explicitly.

pub mod biology;
pub mod diagnostics;
pub mod geo;
pub mod population;
pub mod report;
pub mod router;
pub mod service;
pub mod sources;
mod validation;
pub mod zones;

pub use biology::{BiodiversitySeverity, BiologicalImpactAnalysis};
pub use diagnostics::{DiagnosticSink, InMemoryDiagnosticSink, SourceDiagnostic, TracingDiagnosticSink};
pub use geo::{distance_km, Coordinate, PlaceKind, RawPlace};
pub use population::{
    AffectedPlace, AggregationInconsistency, PopulationAggregate, PopulationAggregator,
    PopulationMessage, ZoneTally,
};
pub use report::{ImpactReport, PhysicalEffects, ReportSection, SeverityLevel};
pub use router::impact_router;
pub use service::{
    EnrichedImpactResult, EnrichmentRequest, EnrichmentSettings, ImpactEnrichmentService,
    ImpactMetrics,
};
pub use sources::{
    AreaQuery, BoundedSource, EnrichmentSource, FloraFaunaQuery, SourceError, SourceId,
    SourceOutcome,
};
pub use validation::ValidationError;
pub use zones::{DamageZone, ZoneRadii};
