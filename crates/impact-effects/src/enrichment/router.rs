use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use super::geo::Coordinate;
use super::report::{ImpactReport, PhysicalEffects, SeverityLevel};
use super::service::{
    EnrichedImpactResult, EnrichmentRequest, ImpactEnrichmentService, ImpactMetrics,
};
use super::sources::{
    AreaQuery, EnrichmentSource, FloraFaunaPayload, FloraFaunaQuery, PopulationPayload,
    SeismicContext,
};
use super::zones::ZoneRadii;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EnrichmentBody {
    pub latitude: f64,
    pub longitude: f64,
    pub destruction_radius_km: f64,
    pub damage_radius_km: f64,
    pub air_pressure_radius_km: f64,
    pub energy_megatons_tnt: f64,
}

impl EnrichmentBody {
    pub fn to_request(&self) -> EnrichmentRequest {
        EnrichmentRequest {
            location: Coordinate::new(self.latitude, self.longitude),
            radii: ZoneRadii::new(
                self.destruction_radius_km,
                self.damage_radius_km,
                self.air_pressure_radius_km,
            ),
            metrics: ImpactMetrics {
                energy_megatons_tnt: self.energy_megatons_tnt,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReportBody {
    #[serde(flatten)]
    pub enrichment: EnrichmentBody,
    pub crater_diameter_m: f64,
    pub seismic_magnitude: f64,
}

impl ReportBody {
    pub fn physical_effects(&self) -> PhysicalEffects {
        let request = self.enrichment.to_request();
        PhysicalEffects {
            energy_megatons_tnt: self.enrichment.energy_megatons_tnt,
            crater_diameter_m: self.crater_diameter_m,
            seismic_magnitude: self.seismic_magnitude,
            radii: request.radii,
            severity: SeverityLevel::classify(self.enrichment.energy_megatons_tnt),
        }
    }
}

/// Router exposing enrichment and report assembly over HTTP.
pub fn impact_router<P, S, F>(service: Arc<ImpactEnrichmentService<P, S, F>>) -> Router
where
    P: EnrichmentSource<Request = AreaQuery, Payload = PopulationPayload> + 'static,
    S: EnrichmentSource<Request = AreaQuery, Payload = SeismicContext> + 'static,
    F: EnrichmentSource<Request = FloraFaunaQuery, Payload = FloraFaunaPayload> + 'static,
{
    Router::new()
        .route("/api/v1/impact/enrich", post(enrich_handler::<P, S, F>))
        .route("/api/v1/impact/report", post(report_handler::<P, S, F>))
        .with_state(service)
}

pub(crate) async fn enrich_handler<P, S, F>(
    State(service): State<Arc<ImpactEnrichmentService<P, S, F>>>,
    Json(body): Json<EnrichmentBody>,
) -> Result<Json<EnrichedImpactResult>, AppError>
where
    P: EnrichmentSource<Request = AreaQuery, Payload = PopulationPayload> + 'static,
    S: EnrichmentSource<Request = AreaQuery, Payload = SeismicContext> + 'static,
    F: EnrichmentSource<Request = FloraFaunaQuery, Payload = FloraFaunaPayload> + 'static,
{
    let result = service.enrich(&body.to_request()).await?;
    Ok(Json(result))
}

pub(crate) async fn report_handler<P, S, F>(
    State(service): State<Arc<ImpactEnrichmentService<P, S, F>>>,
    Json(body): Json<ReportBody>,
) -> Result<Json<ImpactReport>, AppError>
where
    P: EnrichmentSource<Request = AreaQuery, Payload = PopulationPayload> + 'static,
    S: EnrichmentSource<Request = AreaQuery, Payload = SeismicContext> + 'static,
    F: EnrichmentSource<Request = FloraFaunaQuery, Payload = FloraFaunaPayload> + 'static,
{
    let request = body.enrichment.to_request();
    let result = service.enrich(&request).await?;
    Ok(Json(ImpactReport::assemble(
        request.location,
        body.physical_effects(),
        result,
    )))
}
