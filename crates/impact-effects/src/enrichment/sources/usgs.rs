use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ensure_json, ensure_success, AreaQuery, EnrichmentSource, SourceError, SourceId};

pub const DEFAULT_USGS_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1/query";

/// Largest search radius accepted by the FDSN event service.
pub const MAX_SEARCH_RADIUS_KM: f64 = 20001.6;

const EVENT_LIMIT: u32 = 100;
const STRONGEST_EVENTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeismicEvent {
    pub magnitude: f64,
    pub place: Option<String>,
    /// Milliseconds since the Unix epoch, as published by USGS.
    pub time: Option<i64>,
    pub depth_km: Option<f64>,
}

/// Historical seismicity around the impact point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeismicContext {
    pub search_radius_km: f64,
    pub count: usize,
    pub max_magnitude: Option<f64>,
    pub avg_magnitude: Option<f64>,
    pub strongest_events: Vec<SeismicEvent>,
}

/// Seismic-context source backed by the USGS FDSN event web service.
#[derive(Debug, Clone)]
pub struct UsgsSeismicSource {
    client: reqwest::Client,
    endpoint: String,
}

impl UsgsSeismicSource {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl EnrichmentSource for UsgsSeismicSource {
    type Request = AreaQuery;
    type Payload = SeismicContext;

    fn id(&self) -> SourceId {
        SourceId::SeismicContext
    }

    async fn fetch(&self, request: &AreaQuery) -> Result<SeismicContext, SourceError> {
        let radius_km = request.radius_km.min(MAX_SEARCH_RADIUS_KM);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("format", "geojson".to_string()),
                ("latitude", request.location.latitude.to_string()),
                ("longitude", request.location.longitude.to_string()),
                ("maxradiuskm", radius_km.to_string()),
                ("orderby", "magnitude".to_string()),
                ("limit", EVENT_LIMIT.to_string()),
            ])
            .send()
            .await?;

        ensure_success(&response)?;
        ensure_json(&response)?;
        let collection: FeatureCollection = response.json().await?;
        Ok(summarize(collection, radius_km))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: FeatureProperties,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct FeatureProperties {
    mag: Option<f64>,
    place: Option<String>,
    time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(default)]
    coordinates: Vec<f64>,
}

/// Counts every event; magnitude statistics only use events that report one.
pub(crate) fn summarize(collection: FeatureCollection, search_radius_km: f64) -> SeismicContext {
    let count = collection.features.len();
    let mut events: Vec<SeismicEvent> = collection
        .features
        .into_iter()
        .filter_map(|feature| {
            let magnitude = feature.properties.mag.filter(|mag| mag.is_finite())?;
            let depth_km = feature
                .geometry
                .and_then(|geometry| geometry.coordinates.get(2).copied());
            Some(SeismicEvent {
                magnitude,
                place: feature.properties.place,
                time: feature.properties.time,
                depth_km,
            })
        })
        .collect();

    events.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));

    let max_magnitude = events.first().map(|event| event.magnitude);
    let avg_magnitude = if events.is_empty() {
        None
    } else {
        Some(events.iter().map(|event| event.magnitude).sum::<f64>() / events.len() as f64)
    };
    events.truncate(STRONGEST_EVENTS);

    SeismicContext {
        search_radius_km,
        count,
        max_magnitude,
        avg_magnitude,
        strongest_events: events,
    }
}
