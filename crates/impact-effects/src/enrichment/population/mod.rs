//! Classification of discovered settlements into damage zones.
//!
//! The aggregator is a pure, synchronous stage: it receives the raw records a
//! population source returned, drops duplicates, measures each survivor's
//! distance to the impact and tallies residents per zone. Totals are always
//! derived from the same retained set, so `total_population` equals the sum of
//! the per-zone population and `count_of_places` equals the sum of the
//! per-zone counts.

mod normalizer;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::error;

use super::geo::{distance_km, Coordinate, PlaceKind, RawPlace};
use super::zones::{DamageZone, ZoneRadii};
use normalizer::PlaceKey;

/// Settlement retained inside the affected area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectedPlace {
    pub name: String,
    pub coordinate: Coordinate,
    pub population: u64,
    pub kind: PlaceKind,
    pub distance_km: f64,
    pub zone: DamageZone,
    pub estimated_casualties: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneTally {
    pub count: usize,
    pub population_sum: u64,
    pub estimated_casualties: u64,
}

/// Structured summary; wording is left to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PopulationMessage {
    NoPopulatedPlaces,
    PlacesFound {
        total_population: u64,
        count_of_places: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationAggregate {
    pub total_population: u64,
    pub places_found: Vec<AffectedPlace>,
    pub count_of_places: usize,
    pub by_zone: BTreeMap<DamageZone, ZoneTally>,
    pub estimated_casualties: u64,
    pub message: PopulationMessage,
}

impl PopulationAggregate {
    /// Zeroed aggregate with every affected zone present.
    pub fn empty() -> Self {
        Self {
            total_population: 0,
            places_found: Vec::new(),
            count_of_places: 0,
            by_zone: zeroed_zones(),
            estimated_casualties: 0,
            message: PopulationMessage::NoPopulatedPlaces,
        }
    }

    pub fn nearest_place(&self) -> Option<&AffectedPlace> {
        self.places_found.first()
    }

    pub fn zone(&self, zone: DamageZone) -> ZoneTally {
        self.by_zone.get(&zone).copied().unwrap_or_default()
    }

    pub fn places_in(&self, zone: DamageZone) -> impl Iterator<Item = &AffectedPlace> {
        self.places_found
            .iter()
            .filter(move |place| place.zone == zone)
    }

    fn is_consistent(&self) -> bool {
        let zone_population = checked_total(self.by_zone.values().map(|tally| tally.population_sum));
        let zone_count: usize = self.by_zone.values().map(|tally| tally.count).sum();
        let zone_casualties =
            checked_total(self.by_zone.values().map(|tally| tally.estimated_casualties));
        let ordered = self
            .places_found
            .windows(2)
            .all(|pair| pair[0].distance_km <= pair[1].distance_km);

        zone_population == Some(self.total_population)
            && zone_count == self.count_of_places
            && zone_count == self.places_found.len()
            && zone_casualties == Some(self.estimated_casualties)
            && !self.by_zone.contains_key(&DamageZone::Outside)
            && ordered
    }
}

fn checked_total(values: impl Iterator<Item = u64>) -> Option<u64> {
    values.fold(Some(0u64), |total, value| total?.checked_add(value))
}

fn zeroed_zones() -> BTreeMap<DamageZone, ZoneTally> {
    DamageZone::affected()
        .into_iter()
        .map(|zone| (zone, ZoneTally::default()))
        .collect()
}

/// Internal invariant violation; the aggregator fails closed when it sees one.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregationInconsistency {
    #[error("computed distance {distance} km for '{place}' is not a non-negative number")]
    InvalidDistance { place: String, distance: f64 },
    #[error("zone totals diverge from aggregate totals")]
    TotalsDiverge,
    #[error("reported population overflows the aggregate totals")]
    Overflow,
}

pub struct PopulationAggregator {
    impact: Coordinate,
    radii: ZoneRadii,
}

impl PopulationAggregator {
    pub fn new(impact: Coordinate, radii: ZoneRadii) -> Self {
        Self { impact, radii }
    }

    /// Builds the aggregate, returning a zeroed one if an invariant breaks.
    pub fn aggregate(&self, records: Vec<RawPlace>) -> PopulationAggregate {
        match self.try_aggregate(records) {
            Ok(aggregate) => aggregate,
            Err(err) => {
                error!(error = %err, "population aggregation inconsistent; returning empty aggregate");
                PopulationAggregate::empty()
            }
        }
    }

    pub fn try_aggregate(
        &self,
        records: Vec<RawPlace>,
    ) -> Result<PopulationAggregate, AggregationInconsistency> {
        let mut retained = Vec::new();

        for candidate in deduplicate(records) {
            let distance = distance_km(self.impact, candidate.coordinate);
            if !distance.is_finite() || distance < 0.0 {
                return Err(AggregationInconsistency::InvalidDistance {
                    place: candidate.name,
                    distance,
                });
            }

            let zone = DamageZone::classify(distance, &self.radii);
            if !zone.is_affected() {
                continue;
            }

            retained.push(AffectedPlace {
                estimated_casualties: estimate_casualties(candidate.population, zone),
                name: candidate.name,
                coordinate: candidate.coordinate,
                population: candidate.population,
                kind: candidate.kind,
                distance_km: distance,
                zone,
            });
        }

        retained.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut by_zone = zeroed_zones();
        for place in &retained {
            let tally = by_zone.entry(place.zone).or_default();
            tally.count += 1;
            tally.population_sum = tally
                .population_sum
                .checked_add(place.population)
                .ok_or(AggregationInconsistency::Overflow)?;
            tally.estimated_casualties = tally
                .estimated_casualties
                .checked_add(place.estimated_casualties)
                .ok_or(AggregationInconsistency::Overflow)?;
        }

        let total_population = checked_total(retained.iter().map(|place| place.population))
            .ok_or(AggregationInconsistency::Overflow)?;
        let estimated_casualties =
            checked_total(retained.iter().map(|place| place.estimated_casualties))
                .ok_or(AggregationInconsistency::Overflow)?;
        let count_of_places = retained.len();
        let message = if count_of_places == 0 {
            PopulationMessage::NoPopulatedPlaces
        } else {
            PopulationMessage::PlacesFound {
                total_population,
                count_of_places,
            }
        };

        let aggregate = PopulationAggregate {
            total_population,
            places_found: retained,
            count_of_places,
            by_zone,
            estimated_casualties,
            message,
        };

        if aggregate.is_consistent() {
            Ok(aggregate)
        } else {
            Err(AggregationInconsistency::TotalsDiverge)
        }
    }
}

fn estimate_casualties(population: u64, zone: DamageZone) -> u64 {
    (population as f64 * zone.fatality_rate()).round() as u64
}

#[derive(Debug)]
struct Candidate {
    name: String,
    coordinate: Coordinate,
    population: u64,
    kind: PlaceKind,
}

/// Drops unusable records and collapses duplicates, keeping the larger population.
fn deduplicate(records: Vec<RawPlace>) -> Vec<Candidate> {
    let mut index: HashMap<PlaceKey, usize> = HashMap::new();
    let mut survivors: Vec<Candidate> = Vec::new();

    for record in records {
        let Some(coordinate) = record.coordinate() else {
            continue;
        };
        let population = record.population_or_zero();
        let Some(name) = record.name.map(|name| name.trim().to_string()) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }

        let candidate = Candidate {
            name,
            coordinate,
            population,
            kind: record.kind,
        };
        let key = PlaceKey::new(&candidate.name, coordinate);
        match index.get(&key) {
            Some(&position) => {
                if candidate.population > survivors[position].population {
                    survivors[position] = candidate;
                }
            }
            None => {
                index.insert(key, survivors.len());
                survivors.push(candidate);
            }
        }
    }

    survivors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impact() -> Coordinate {
        Coordinate::new(41.4769, -1.3742)
    }

    fn radii() -> ZoneRadii {
        ZoneRadii::new(5.0, 8.0, 12.0)
    }

    fn place(name: &str, population: i64, latitude: f64, longitude: f64) -> RawPlace {
        RawPlace {
            name: Some(name.to_string()),
            population: Some(population),
            latitude: Some(latitude),
            longitude: Some(longitude),
            kind: PlaceKind::Town,
        }
    }

    /// Point `km` kilometers due north of the impact.
    fn north_of_impact(km: f64) -> (f64, f64) {
        let degrees = (km / crate::enrichment::geo::EARTH_RADIUS_KM).to_degrees();
        (impact().latitude + degrees, impact().longitude)
    }

    #[test]
    fn empty_input_yields_zeroed_aggregate() {
        let aggregate = PopulationAggregator::new(impact(), radii()).aggregate(Vec::new());
        assert_eq!(aggregate.total_population, 0);
        assert_eq!(aggregate.count_of_places, 0);
        assert!(aggregate.places_found.is_empty());
        assert_eq!(aggregate.message, PopulationMessage::NoPopulatedPlaces);
        assert_eq!(aggregate.by_zone.len(), 3);
        assert!(aggregate
            .by_zone
            .values()
            .all(|tally| *tally == ZoneTally::default()));
    }

    #[test]
    fn distant_cities_are_excluded() {
        let records = vec![
            place("Zaragoza", 700_000, 41.65, -0.88),
            place("Utebo", 18_000, 41.55, -1.0),
        ];
        let aggregate = PopulationAggregator::new(impact(), radii()).aggregate(records);
        assert_eq!(aggregate.total_population, 0);
        assert!(aggregate.places_found.is_empty());
    }

    #[test]
    fn places_are_tallied_per_zone() {
        let (lat_near, lon_near) = north_of_impact(3.0);
        let (lat_mid, lon_mid) = north_of_impact(7.0);
        let records = vec![
            place("Mid", 2000, lat_mid, lon_mid),
            place("Near", 500, lat_near, lon_near),
        ];

        let aggregate = PopulationAggregator::new(impact(), radii()).aggregate(records);

        assert_eq!(aggregate.total_population, 2500);
        assert_eq!(aggregate.count_of_places, 2);
        assert_eq!(
            aggregate.zone(DamageZone::Destruction),
            ZoneTally {
                count: 1,
                population_sum: 500,
                estimated_casualties: 475,
            }
        );
        assert_eq!(
            aggregate.zone(DamageZone::Damage),
            ZoneTally {
                count: 1,
                population_sum: 2000,
                estimated_casualties: 1400,
            }
        );
        assert_eq!(aggregate.estimated_casualties, 1875);
        assert_eq!(aggregate.nearest_place().map(|p| p.name.as_str()), Some("Near"));
        assert_eq!(
            aggregate.message,
            PopulationMessage::PlacesFound {
                total_population: 2500,
                count_of_places: 2,
            }
        );
    }

    #[test]
    fn duplicates_keep_larger_population() {
        let (lat, lon) = north_of_impact(2.0);
        let records = vec![
            place("Épila", 4_000, lat, lon),
            place("EPILA", 4_500, lat + 0.0002, lon - 0.0002),
        ];

        let aggregate = PopulationAggregator::new(impact(), radii()).aggregate(records);

        assert_eq!(aggregate.count_of_places, 1);
        assert_eq!(aggregate.total_population, 4_500);
        assert_eq!(aggregate.places_found[0].name, "EPILA");
    }

    #[test]
    fn decomposed_and_precomposed_names_are_one_place() {
        let (lat, lon) = north_of_impact(2.0);
        let records = vec![
            place("\u{C9}pila", 4_000, lat, lon),
            place("E\u{301}pila", 4_500, lat, lon),
            place("H\u{1ED9}i An", 1_200, lat + 0.02, lon),
            place("hoi an", 1_000, lat + 0.02, lon),
        ];

        let aggregate = PopulationAggregator::new(impact(), radii()).aggregate(records);

        assert_eq!(aggregate.count_of_places, 2);
        assert_eq!(aggregate.total_population, 4_500 + 1_200);
    }

    #[test]
    fn overflowing_population_fails_closed() {
        let (lat, lon) = north_of_impact(3.0);
        let records = vec![
            place("Alpha", i64::MAX, lat, lon),
            place("Beta", i64::MAX, lat + 0.01, lon),
            place("Gamma", i64::MAX, lat + 0.02, lon),
        ];
        let aggregator = PopulationAggregator::new(impact(), radii());

        assert_eq!(
            aggregator.try_aggregate(records.clone()),
            Err(AggregationInconsistency::Overflow)
        );
        assert_eq!(aggregator.aggregate(records), PopulationAggregate::empty());
    }

    #[test]
    fn unusable_records_are_skipped_and_bad_population_is_zero() {
        let (lat, lon) = north_of_impact(4.0);
        let records = vec![
            RawPlace {
                name: None,
                population: Some(900),
                latitude: Some(lat),
                longitude: Some(lon),
                kind: PlaceKind::Village,
            },
            RawPlace {
                name: Some("Floating".to_string()),
                population: Some(900),
                latitude: None,
                longitude: Some(lon),
                kind: PlaceKind::Village,
            },
            place("Negative", -40, lat, lon),
            RawPlace {
                population: None,
                ..place("Unknown count", 0, lat + 0.01, lon)
            },
        ];

        let aggregate = PopulationAggregator::new(impact(), radii()).aggregate(records);

        assert_eq!(aggregate.count_of_places, 2);
        assert_eq!(aggregate.total_population, 0);
        assert!(aggregate.places_found.iter().all(|p| p.population == 0));
    }

    #[test]
    fn output_is_sorted_by_distance() {
        let records = [9.0, 1.0, 11.5, 6.0, 3.0]
            .iter()
            .enumerate()
            .map(|(idx, km)| {
                let (lat, lon) = north_of_impact(*km);
                place(&format!("P{idx}"), 100, lat, lon)
            })
            .collect();

        let aggregate = PopulationAggregator::new(impact(), radii()).aggregate(records);

        assert_eq!(aggregate.count_of_places, 5);
        assert!(aggregate
            .places_found
            .windows(2)
            .all(|pair| pair[0].distance_km <= pair[1].distance_km));
        assert_eq!(aggregate.places_in(DamageZone::AirPressure).count(), 2);
    }
}
