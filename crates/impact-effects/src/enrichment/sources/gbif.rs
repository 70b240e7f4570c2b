use std::collections::HashMap;
use std::f64::consts::PI;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ensure_json, ensure_success, EnrichmentSource, FloraFaunaQuery, SourceError, SourceId};
use crate::enrichment::biology::BiologicalImpactAnalysis;
use crate::enrichment::geo::Coordinate;

pub const DEFAULT_GBIF_URL: &str = "https://api.gbif.org/v1/occurrence/search";

const KM_PER_DEGREE: f64 = 111.0;
const OCCURRENCE_LIMIT: u32 = 100;
const SPECIES_CAP: usize = 50;
const FLORA_DENSITY_PER_KM2: f64 = 1000.0;
const FAUNA_DENSITY_PER_KM2: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kingdom {
    Plantae,
    Animalia,
}

impl Kingdom {
    const fn code(self) -> &'static str {
        match self {
            Self::Plantae => "PLANTAE",
            Self::Animalia => "ANIMALIA",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesSummary {
    pub species_key: i64,
    pub name: String,
    pub scientific_name: String,
    pub kingdom: Option<String>,
    #[serde(default)]
    pub phylum: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub order: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
    #[serde(default)]
    pub vernacular_names: Vec<String>,
    pub occurrences: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrganismEstimate {
    pub area_km2: f64,
    pub estimated_flora_organisms: u64,
    pub estimated_fauna_organisms: u64,
    pub total_organisms: u64,
}

impl OrganismEstimate {
    pub fn from_species(flora_species: usize, fauna_species: usize, radius_km: f64) -> Self {
        let area_km2 = PI * radius_km.powi(2);
        let flora = (flora_species as f64 * FLORA_DENSITY_PER_KM2 * area_km2) as u64;
        let fauna = (fauna_species as f64 * FAUNA_DENSITY_PER_KM2 * area_km2) as u64;
        Self {
            area_km2,
            estimated_flora_organisms: flora,
            estimated_fauna_organisms: fauna,
            total_organisms: flora.saturating_add(fauna),
        }
    }
}

/// Species observed inside the damage footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloraFaunaPayload {
    pub impact_radius_km: f64,
    pub destruction_radius_km: f64,
    pub impact_energy_megatons: f64,
    pub flora_species: Vec<SpeciesSummary>,
    pub fauna_species: Vec<SpeciesSummary>,
    pub organisms: OrganismEstimate,
    pub impact_analysis: BiologicalImpactAnalysis,
    pub data_source: String,
}

/// Biodiversity source backed by the GBIF occurrence search API.
#[derive(Debug, Clone)]
pub struct GbifFloraFaunaSource {
    client: reqwest::Client,
    endpoint: String,
}

impl GbifFloraFaunaSource {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    async fn search(&self, polygon: &str, kingdom: Kingdom) -> Result<Vec<SpeciesSummary>, SourceError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("hasCoordinate", "true".to_string()),
                ("hasGeospatialIssue", "false".to_string()),
                ("kingdom", kingdom.code().to_string()),
                ("geometry", polygon.to_string()),
                ("limit", OCCURRENCE_LIMIT.to_string()),
                ("offset", "0".to_string()),
            ])
            .send()
            .await?;

        ensure_success(&response)?;
        ensure_json(&response)?;
        let page: OccurrencePage = response.json().await?;
        Ok(group_species(page.results))
    }
}

#[async_trait]
impl EnrichmentSource for GbifFloraFaunaSource {
    type Request = FloraFaunaQuery;
    type Payload = FloraFaunaPayload;

    fn id(&self) -> SourceId {
        SourceId::FloraFauna
    }

    async fn fetch(&self, request: &FloraFaunaQuery) -> Result<FloraFaunaPayload, SourceError> {
        let polygon = bounding_polygon(request.location, request.impact_radius_km);
        let (flora, fauna) = tokio::join!(
            self.search(&polygon, Kingdom::Plantae),
            self.search(&polygon, Kingdom::Animalia)
        );

        Ok(build_payload(request, flora?, fauna?))
    }
}

pub(crate) fn build_payload(
    request: &FloraFaunaQuery,
    flora_species: Vec<SpeciesSummary>,
    fauna_species: Vec<SpeciesSummary>,
) -> FloraFaunaPayload {
    let organisms = OrganismEstimate::from_species(
        flora_species.len(),
        fauna_species.len(),
        request.impact_radius_km,
    );
    let impact_analysis = BiologicalImpactAnalysis::analyze(
        &flora_species,
        &fauna_species,
        &organisms,
        request.impact_energy_megatons,
        request.impact_radius_km,
        request.destruction_radius_km,
    );
    FloraFaunaPayload {
        impact_radius_km: request.impact_radius_km,
        destruction_radius_km: request.destruction_radius_km,
        impact_energy_megatons: request.impact_energy_megatons,
        flora_species,
        fauna_species,
        organisms,
        impact_analysis,
        data_source: "GBIF Global Biodiversity Information Facility".to_string(),
    }
}

/// Accepts the `{success, flora_species, fauna_species}` contract and rebuilds
/// the payload around `request`, recomputing estimates from the species lists.
pub fn parse_flora_fauna_payload(
    request: &FloraFaunaQuery,
    body: Value,
) -> Result<FloraFaunaPayload, SourceError> {
    if body.get("success").is_none() {
        return Err(SourceError::Malformed("payload has no 'success' flag".to_string()));
    }

    let response: SpeciesResponse =
        serde_json::from_value(body).map_err(|err| SourceError::Malformed(err.to_string()))?;
    if !response.success {
        return Err(SourceError::Unsuccessful(
            response
                .error
                .unwrap_or_else(|| "flora-fauna lookup unsuccessful".to_string()),
        ));
    }

    let (Some(flora), Some(fauna)) = (response.flora_species, response.fauna_species) else {
        return Err(SourceError::Malformed(
            "successful payload lacks 'flora_species' or 'fauna_species'".to_string(),
        ));
    };

    Ok(build_payload(
        request,
        flora.into_iter().map(ContractSpecies::into_summary).collect(),
        fauna.into_iter().map(ContractSpecies::into_summary).collect(),
    ))
}

#[derive(Debug, Deserialize)]
struct SpeciesResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    flora_species: Option<Vec<ContractSpecies>>,
    #[serde(default)]
    fauna_species: Option<Vec<ContractSpecies>>,
}

#[derive(Debug, Deserialize)]
struct ContractSpecies {
    name: String,
    #[serde(default)]
    species_key: Option<i64>,
    #[serde(default)]
    scientific_name: Option<String>,
    #[serde(default)]
    kingdom: Option<String>,
    #[serde(default)]
    phylum: Option<String>,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    order: Option<String>,
    #[serde(default)]
    family: Option<String>,
    #[serde(default)]
    genus: Option<String>,
    #[serde(default)]
    count: u32,
    #[serde(default)]
    vernacular_names: Vec<String>,
}

impl ContractSpecies {
    fn into_summary(self) -> SpeciesSummary {
        SpeciesSummary {
            species_key: self.species_key.unwrap_or_default(),
            scientific_name: non_empty(self.scientific_name).unwrap_or_else(|| self.name.clone()),
            name: self.name,
            kingdom: non_empty(self.kingdom),
            phylum: non_empty(self.phylum),
            class: non_empty(self.class),
            order: non_empty(self.order),
            family: non_empty(self.family),
            genus: non_empty(self.genus),
            vernacular_names: self.vernacular_names,
            occurrences: self.count,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// WKT square of half-width `radius_km` around `center`, counter-clockwise.
pub(crate) fn bounding_polygon(center: Coordinate, radius_km: f64) -> String {
    let delta = radius_km / KM_PER_DEGREE;
    let min_lat = (center.latitude - delta).max(-90.0);
    let max_lat = (center.latitude + delta).min(90.0);
    let min_lon = (center.longitude - delta).max(-180.0);
    let max_lon = (center.longitude + delta).min(180.0);

    format!(
        "POLYGON(({min_lon} {min_lat}, {max_lon} {min_lat}, {max_lon} {max_lat}, {min_lon} {max_lat}, {min_lon} {min_lat}))"
    )
}

#[derive(Debug, Deserialize)]
struct OccurrencePage {
    #[serde(default)]
    results: Vec<Occurrence>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Occurrence {
    species: Option<String>,
    species_key: Option<i64>,
    scientific_name: Option<String>,
    kingdom: Option<String>,
    phylum: Option<String>,
    class: Option<String>,
    order: Option<String>,
    family: Option<String>,
    genus: Option<String>,
    vernacular_name: Option<String>,
}

/// Groups occurrences by species, most observed first.
pub(crate) fn group_species(occurrences: Vec<Occurrence>) -> Vec<SpeciesSummary> {
    let mut by_key: HashMap<i64, SpeciesSummary> = HashMap::new();

    for occurrence in occurrences {
        let (Some(name), Some(species_key)) = (occurrence.species, occurrence.species_key) else {
            continue;
        };
        by_key
            .entry(species_key)
            .and_modify(|summary| summary.occurrences += 1)
            .or_insert_with(|| SpeciesSummary {
                species_key,
                scientific_name: occurrence.scientific_name.unwrap_or_else(|| name.clone()),
                name,
                kingdom: occurrence.kingdom,
                phylum: occurrence.phylum,
                class: occurrence.class,
                order: occurrence.order,
                family: occurrence.family,
                genus: occurrence.genus,
                vernacular_names: occurrence.vernacular_name.into_iter().collect(),
                occurrences: 1,
            });
    }

    let mut species: Vec<SpeciesSummary> = by_key.into_values().collect();
    species.sort_by(|a, b| {
        b.occurrences
            .cmp(&a.occurrences)
            .then_with(|| a.name.cmp(&b.name))
    });
    species.truncate(SPECIES_CAP);
    species
}
