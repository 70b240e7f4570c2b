use std::io::Read;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

use super::overpass::{parse_population_tag, PopulationPayload};
use super::{AreaQuery, EnrichmentSource, SourceError, SourceId};
use crate::enrichment::geo::{distance_km, PlaceKind, RawPlace};

#[derive(Debug, thiserror::Error)]
pub enum GazetteerError {
    #[error("failed to read gazetteer: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid gazetteer CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// Offline population source loaded from a `name,population,lat,lon,type` CSV.
#[derive(Debug, Clone, Default)]
pub struct GazetteerPlaceSource {
    places: Vec<RawPlace>,
}

impl GazetteerPlaceSource {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, GazetteerError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, GazetteerError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut places = Vec::new();

        for row in csv_reader.deserialize::<GazetteerRow>() {
            places.push(row?.into_place());
        }

        Ok(Self { places })
    }

    pub fn from_places(places: Vec<RawPlace>) -> Self {
        Self { places }
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

#[async_trait]
impl EnrichmentSource for GazetteerPlaceSource {
    type Request = AreaQuery;
    type Payload = PopulationPayload;

    fn id(&self) -> SourceId {
        SourceId::Population
    }

    async fn fetch(&self, request: &AreaQuery) -> Result<PopulationPayload, SourceError> {
        let places = self
            .places
            .iter()
            .filter(|place| {
                place
                    .coordinate()
                    .map(|coordinate| distance_km(request.location, coordinate) <= request.radius_km)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        Ok(PopulationPayload { places })
    }
}

#[derive(Debug, Deserialize)]
struct GazetteerRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    population: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default, rename = "type", deserialize_with = "empty_string_as_none")]
    kind: Option<String>,
}

impl GazetteerRow {
    fn into_place(self) -> RawPlace {
        RawPlace {
            name: self.name,
            population: self.population.as_deref().and_then(parse_population_tag),
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

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|raw| !raw.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::geo::Coordinate;
    use std::io::Cursor;

    const CSV: &str = "name,population,lat,lon,type\n\
        Épila,4512,41.6002,-1.2804,town\n\
        Rueda de Jalón,300,41.6333,-1.2667,village\n\
        Zaragoza,\"700,000\",41.65,-0.88,city\n\
        ,120,41.48,-1.37,hamlet\n";

    #[test]
    fn loads_rows_from_csv() {
        let source = GazetteerPlaceSource::from_reader(Cursor::new(CSV)).expect("csv parses");
        assert_eq!(source.len(), 4);
    }

    #[tokio::test]
    async fn fetch_returns_rows_within_radius() {
        let source = GazetteerPlaceSource::from_reader(Cursor::new(CSV)).expect("csv parses");
        let payload = source
            .fetch(&AreaQuery {
                location: Coordinate::new(41.4769, -1.3742),
                radius_km: 25.0,
            })
            .await
            .expect("gazetteer fetch");

        let names: Vec<_> = payload.places.iter().map(|p| p.name.clone()).collect();
        assert_eq!(
            names,
            vec![
                Some("Épila".to_string()),
                Some("Rueda de Jalón".to_string()),
                None
            ]
        );
        assert_eq!(payload.places[0].population, Some(4512));
        assert_eq!(payload.places[0].kind, PlaceKind::Town);
    }

    #[test]
    fn malformed_coordinates_are_reported() {
        let csv = "name,population,lat,lon,type\nBroken,10,north,-1.0,town\n";
        let err = GazetteerPlaceSource::from_reader(Cursor::new(csv)).expect_err("bad row");
        assert!(matches!(err, GazetteerError::Csv(_)));
    }
}
