use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::diagnostics::{DiagnosticSink, SourceDiagnostic, TracingDiagnosticSink};
use super::geo::Coordinate;
use super::population::{PopulationAggregate, PopulationAggregator};
use super::sources::{
    AreaQuery, BoundedSource, EnrichmentSource, FloraFaunaPayload, FloraFaunaQuery,
    PopulationPayload, SeismicContext, SourceOutcome,
};
use super::validation::{validate_energy, validate_location, ValidationError};
use super::zones::ZoneRadii;

/// Physical metrics forwarded to sources that scale with impact energy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactMetrics {
    pub energy_megatons_tnt: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRequest {
    pub location: Coordinate,
    pub radii: ZoneRadii,
    pub metrics: ImpactMetrics,
}

impl EnrichmentRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_location(&self.location)?;
        self.radii.validate()?;
        validate_energy(self.metrics.energy_megatons_tnt)
    }
}

/// Per-source time budgets and the seismic search footprint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnrichmentSettings {
    pub population_timeout: Duration,
    pub seismic_timeout: Duration,
    pub flora_fauna_timeout: Duration,
    pub seismic_radius_km: f64,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            population_timeout: Duration::from_secs(30),
            seismic_timeout: Duration::from_secs(10),
            flora_fauna_timeout: Duration::from_secs(10),
            seismic_radius_km: 250.0,
        }
    }
}

/// Merged enrichment; a `None` field means the source failed or had no data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedImpactResult {
    pub population: Option<PopulationAggregate>,
    pub seismic_context: Option<SeismicContext>,
    pub flora_fauna: Option<FloraFaunaPayload>,
    pub diagnostics: Vec<SourceDiagnostic>,
}

impl EnrichedImpactResult {
    pub fn diagnostic_for(&self, source: super::sources::SourceId) -> Option<&SourceDiagnostic> {
        self.diagnostics
            .iter()
            .find(|diagnostic| diagnostic.source == source)
    }
}

/// Fans out to the three enrichment sources and merges what comes back.
pub struct ImpactEnrichmentService<P, S, F> {
    population: BoundedSource<P>,
    seismic: BoundedSource<S>,
    flora_fauna: BoundedSource<F>,
    seismic_radius_km: f64,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl<P, S, F> ImpactEnrichmentService<P, S, F>
where
    P: EnrichmentSource<Request = AreaQuery, Payload = PopulationPayload>,
    S: EnrichmentSource<Request = AreaQuery, Payload = SeismicContext>,
    F: EnrichmentSource<Request = FloraFaunaQuery, Payload = FloraFaunaPayload>,
{
    pub fn new(population: P, seismic: S, flora_fauna: F, settings: EnrichmentSettings) -> Self {
        Self::with_diagnostics(
            population,
            seismic,
            flora_fauna,
            settings,
            Arc::new(TracingDiagnosticSink),
        )
    }

    pub fn with_diagnostics(
        population: P,
        seismic: S,
        flora_fauna: F,
        settings: EnrichmentSettings,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            population: BoundedSource::new(population, settings.population_timeout),
            seismic: BoundedSource::new(seismic, settings.seismic_timeout),
            flora_fauna: BoundedSource::new(flora_fauna, settings.flora_fauna_timeout),
            seismic_radius_km: settings.seismic_radius_km,
            diagnostics,
        }
    }

    /// Validates the request, queries every source concurrently and merges the results.
    ///
    /// Only validation errors are returned; a failing source leaves its field empty
    /// and adds a diagnostic. Dropping the returned future abandons any in-flight
    /// source calls.
    pub async fn enrich(
        &self,
        request: &EnrichmentRequest,
    ) -> Result<EnrichedImpactResult, ValidationError> {
        request.validate()?;

        let population_query = AreaQuery {
            location: request.location,
            radius_km: request.radii.outer_km(),
        };
        let seismic_query = AreaQuery {
            location: request.location,
            radius_km: self.seismic_radius_km.max(request.radii.outer_km()),
        };
        // Biological impact is searched over the damage footprint.
        let flora_fauna_query = FloraFaunaQuery {
            location: request.location,
            impact_radius_km: request.radii.damage_km,
            impact_energy_megatons: request.metrics.energy_megatons_tnt,
            destruction_radius_km: request.radii.destruction_km,
        };

        let (population, seismic, flora_fauna) = tokio::join!(
            self.population.query(&population_query),
            self.seismic.query(&seismic_query),
            self.flora_fauna.query(&flora_fauna_query),
        );

        let mut diagnostics = Vec::new();
        let population = self.settle(population, &mut diagnostics).map(|payload| {
            PopulationAggregator::new(request.location, request.radii).aggregate(payload.places)
        });
        let seismic_context = self.settle(seismic, &mut diagnostics);
        let flora_fauna = self.settle(flora_fauna, &mut diagnostics);

        info!(
            latitude = request.location.latitude,
            longitude = request.location.longitude,
            population = population.is_some(),
            seismic_context = seismic_context.is_some(),
            flora_fauna = flora_fauna.is_some(),
            degraded = diagnostics.len(),
            "impact enrichment completed"
        );

        Ok(EnrichedImpactResult {
            population,
            seismic_context,
            flora_fauna,
            diagnostics,
        })
    }

    fn settle<T>(
        &self,
        outcome: SourceOutcome<T>,
        diagnostics: &mut Vec<SourceDiagnostic>,
    ) -> Option<T> {
        match outcome {
            SourceOutcome::Ok { payload } => Some(payload),
            SourceOutcome::Failed { source, reason } => {
                let diagnostic = SourceDiagnostic { source, reason };
                debug!(source = %diagnostic.source, "recording source diagnostic");
                self.diagnostics.record(&diagnostic);
                diagnostics.push(diagnostic);
                None
            }
        }
    }
}
