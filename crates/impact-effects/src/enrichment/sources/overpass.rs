use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ensure_json, ensure_success, AreaQuery, EnrichmentSource, SourceError, SourceId};
use crate::enrichment::geo::{PlaceKind, RawPlace};

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Settlements returned by a population source, unfiltered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationPayload {
    pub places: Vec<RawPlace>,
}

/// Population source backed by the OpenStreetMap Overpass interpreter.
#[derive(Debug, Clone)]
pub struct OverpassPlaceSource {
    client: reqwest::Client,
    endpoint: String,
}

impl OverpassPlaceSource {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl EnrichmentSource for OverpassPlaceSource {
    type Request = AreaQuery;
    type Payload = PopulationPayload;

    fn id(&self) -> SourceId {
        SourceId::Population
    }

    async fn fetch(&self, request: &AreaQuery) -> Result<PopulationPayload, SourceError> {
        let query = build_query(request);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("data", query.as_str())])
            .send()
            .await?;

        ensure_success(&response)?;
        ensure_json(&response)?;
        let body: Value = response.json().await?;
        parse_population_payload(body)
    }
}

/// Overpass QL for settlements around the request point.
pub(crate) fn build_query(request: &AreaQuery) -> String {
    format!(
        "[out:json];(node[\"place\"~\"city|town|village|hamlet\"](around:{}, {}, {}););out;",
        radius_meters(request.radius_km),
        request.location.latitude,
        request.location.longitude
    )
}

/// Overpass measures `around` in meters.
pub(crate) fn radius_meters(radius_km: f64) -> u64 {
    (radius_km * 1000.0).round().max(0.0) as u64
}

/// Accepts either raw Overpass output or the `{success, cities}` contract.
pub fn parse_population_payload(body: Value) -> Result<PopulationPayload, SourceError> {
    if body.get("elements").is_some() {
        let response: OverpassResponse = serde_json::from_value(body)
            .map_err(|err| SourceError::Malformed(err.to_string()))?;
        return Ok(PopulationPayload {
            places: response.elements.into_iter().map(OverpassElement::into_place).collect(),
        });
    }

    if body.get("success").is_some() {
        let response: CitiesResponse = serde_json::from_value(body)
            .map_err(|err| SourceError::Malformed(err.to_string()))?;
        if !response.success {
            return Err(SourceError::Unsuccessful(
                response
                    .error
                    .unwrap_or_else(|| "cities lookup unsuccessful".to_string()),
            ));
        }
        return Ok(PopulationPayload {
            places: response.cities.into_iter().map(CityEntry::into_place).collect(),
        });
    }

    Err(SourceError::Malformed(
        "payload has neither 'elements' nor 'success'".to_string(),
    ))
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl OverpassElement {
    fn into_place(mut self) -> RawPlace {
        let kind = self
            .tags
            .get("place")
            .map(|value| PlaceKind::from_tag(value))
            .unwrap_or_default();
        let population = self
            .tags
            .get("population")
            .and_then(|value| parse_population_tag(value));

        RawPlace {
            name: self.tags.remove("name"),
            population,
            latitude: self.lat,
            longitude: self.lon,
            kind,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CitiesResponse {
    success: bool,
    #[serde(default)]
    cities: Vec<CityEntry>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CityEntry {
    name: Option<String>,
    #[serde(default)]
    population: Option<Value>,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl CityEntry {
    fn into_place(self) -> RawPlace {
        let population = match self.population {
            Some(Value::Number(number)) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|value| value as i64)),
            Some(Value::String(raw)) => parse_population_tag(&raw),
            _ => None,
        };

        RawPlace {
            name: self.name,
            population,
            latitude: self.lat,
            longitude: self.lon,
            kind: self
                .kind
                .as_deref()
                .map(PlaceKind::from_tag)
                .unwrap_or_default(),
        }
    }
}

/// OSM population tags are free text: "12,345", "12 345", "approx. 800", "1200;1300".
pub(crate) fn parse_population_tag(raw: &str) -> Option<i64> {
    let first = raw.split(';').next()?.trim();
    let start = first.find(|c: char| c.is_ascii_digit())?;
    if first[..start].trim_end().ends_with('-') {
        return Some(0);
    }

    let run: String = first[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | ' '))
        .collect();
    let mut groups = run.trim_end().split(['.', ',', ' ']);
    let mut digits = groups.next()?.to_string();
    // Three-digit groups are thousands separators; anything else ends the number.
    for group in groups {
        if group.len() == 3 && group.chars().all(|c| c.is_ascii_digit()) {
            digits.push_str(group);
        } else {
            break;
        }
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::geo::Coordinate;
    use serde_json::json;

    #[test]
    fn query_converts_radius_to_meters() {
        let request = AreaQuery {
            location: Coordinate::new(41.4769, -1.3742),
            radius_km: 12.5,
        };
        let query = build_query(&request);
        assert!(query.contains("around:12500, 41.4769, -1.3742"));
        assert!(query.starts_with("[out:json];"));
    }

    #[test]
    fn parses_overpass_elements() {
        let body = json!({
            "version": 0.6,
            "elements": [
                {
                    "type": "node",
                    "id": 1,
                    "lat": 41.6,
                    "lon": -1.28,
                    "tags": {"name": "Épila", "place": "town", "population": "4,512"}
                },
                {
                    "type": "node",
                    "id": 2,
                    "lat": 41.5,
                    "lon": -1.3,
                    "tags": {"place": "hamlet"}
                }
            ]
        });

        let payload = parse_population_payload(body).expect("overpass payload parses");
        assert_eq!(payload.places.len(), 2);
        assert_eq!(payload.places[0].name.as_deref(), Some("Épila"));
        assert_eq!(payload.places[0].population, Some(4512));
        assert_eq!(payload.places[0].kind, PlaceKind::Town);
        assert_eq!(payload.places[1].name, None);
        assert_eq!(payload.places[1].kind, PlaceKind::Hamlet);
    }

    #[test]
    fn parses_cities_contract() {
        let body = json!({
            "success": true,
            "cities": [
                {"name": "Zaragoza", "population": 700000, "lat": 41.65, "lon": -0.88, "type": "city"},
                {"name": "Utebo", "population": "18000", "lat": 41.55, "lon": -1.0}
            ]
        });

        let payload = parse_population_payload(body).expect("contract payload parses");
        assert_eq!(payload.places[0].population, Some(700_000));
        assert_eq!(payload.places[0].kind, PlaceKind::City);
        assert_eq!(payload.places[1].population, Some(18_000));
        assert_eq!(payload.places[1].kind, PlaceKind::Unknown);
    }

    #[test]
    fn unsuccessful_contract_is_a_failure() {
        let body = json!({"success": false, "error": "rate limited"});
        let err = parse_population_payload(body).expect_err("unsuccessful rejected");
        assert_eq!(err, SourceError::Unsuccessful("rate limited".to_string()));
    }

    #[test]
    fn unknown_shape_is_malformed() {
        let err = parse_population_payload(json!({"foo": 1})).expect_err("malformed");
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[test]
    fn population_tags_are_parsed_leniently() {
        assert_eq!(parse_population_tag("12345"), Some(12345));
        assert_eq!(parse_population_tag("12,345"), Some(12345));
        assert_eq!(parse_population_tag("1.234.567"), Some(1_234_567));
        assert_eq!(parse_population_tag("1200;1300"), Some(1200));
        assert_eq!(parse_population_tag("approx. 800"), Some(800));
        assert_eq!(parse_population_tag("-5"), Some(0));
        assert_eq!(parse_population_tag("unknown"), None);
    }
}
