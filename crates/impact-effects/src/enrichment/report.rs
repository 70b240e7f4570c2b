//! Final report structure handed to the rendering and export layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::geo::Coordinate;
use super::population::PopulationAggregate;
use super::service::EnrichedImpactResult;
use super::sources::{FloraFaunaPayload, SeismicContext, SourceId};
use super::zones::ZoneRadii;

/// Severity band derived from impact energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityLevel {
    Minimal,
    Moderate,
    Severe,
    Extinction,
}

impl SeverityLevel {
    pub fn classify(energy_megatons_tnt: f64) -> Self {
        if energy_megatons_tnt < 1.0 {
            Self::Minimal
        } else if energy_megatons_tnt < 100.0 {
            Self::Moderate
        } else if energy_megatons_tnt < 10_000.0 {
            Self::Severe
        } else {
            Self::Extinction
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Minimal => "Minimal",
            Self::Moderate => "Moderate",
            Self::Severe => "Severe",
            Self::Extinction => "Extinction",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Minimal => "Limited local damage",
            Self::Moderate => "Regional destruction",
            Self::Severe => "Continental catastrophe",
            Self::Extinction => "Global extinction event",
        }
    }
}

/// Physical effects computed upstream of the enrichment pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalEffects {
    pub energy_megatons_tnt: f64,
    pub crater_diameter_m: f64,
    pub seismic_magnitude: f64,
    pub radii: ZoneRadii,
    pub severity: SeverityLevel,
}

/// A report section that is either present or explicitly unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportSection<T> {
    Available { data: T },
    Unavailable { reason: String },
}

impl<T> ReportSection<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Available { data } => Some(data),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactReport {
    pub generated_at: DateTime<Utc>,
    pub impact_location: Coordinate,
    pub physical: PhysicalEffects,
    pub population: ReportSection<PopulationAggregate>,
    pub seismic_context: ReportSection<SeismicContext>,
    pub flora_fauna: ReportSection<FloraFaunaPayload>,
}

impl ImpactReport {
    pub fn assemble(
        impact_location: Coordinate,
        physical: PhysicalEffects,
        enrichment: EnrichedImpactResult,
    ) -> Self {
        Self::assemble_at(Utc::now(), impact_location, physical, enrichment)
    }

    pub fn assemble_at(
        generated_at: DateTime<Utc>,
        impact_location: Coordinate,
        physical: PhysicalEffects,
        enrichment: EnrichedImpactResult,
    ) -> Self {
        let population = section(&enrichment, SourceId::Population, enrichment.population.clone());
        let seismic_context = section(
            &enrichment,
            SourceId::SeismicContext,
            enrichment.seismic_context.clone(),
        );
        let flora_fauna = section(&enrichment, SourceId::FloraFauna, enrichment.flora_fauna.clone());

        Self {
            generated_at,
            impact_location,
            physical,
            population,
            seismic_context,
            flora_fauna,
        }
    }
}

fn section<T>(enrichment: &EnrichedImpactResult, source: SourceId, value: Option<T>) -> ReportSection<T> {
    match value {
        Some(data) => ReportSection::Available { data },
        None => ReportSection::Unavailable {
            reason: enrichment
                .diagnostic_for(source)
                .map(|diagnostic| diagnostic.reason.clone())
                .unwrap_or_else(|| "no data".to_string()),
        },
    }
}
