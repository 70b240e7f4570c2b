//! Per-zone biological impact estimate derived from the species found in the
//! damage footprint.
//!
//! Mortality figures are percentages. Severe and moderate mortality scale with
//! impact energy and are capped per band; the destruction core is always total.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::sources::{OrganismEstimate, SpeciesSummary};

const SEVERE_RADIUS_FACTOR: f64 = 0.7;
const OUTER_RADIUS_FACTOR: f64 = 1.5;
const MODERATE_ORGANISM_SHARE: f64 = 0.8;
const OUTER_ORGANISM_SHARE: f64 = 0.3;
const HIGHLIGHTED_SPECIES: usize = 5;

const VULNERABLE_FLORA: [&str; 4] = ["quercus", "pinus", "sequoia", "cedrus"];
const RESILIENT_FLORA: [&str; 4] = ["grass", "herb", "moss", "lichen"];
const VULNERABLE_FAUNA: [&str; 3] = ["frog", "toad", "salamander"];
const MOBILE_FAUNA_CLASSES: [&str; 2] = ["aves", "mammalia"];

/// Biodiversity loss band, keyed on impact energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiodiversitySeverity {
    Minor,
    Moderate,
    Severe,
    Catastrophic,
    ExtinctionEvent,
}

impl BiodiversitySeverity {
    pub fn classify(energy_megatons: f64) -> Self {
        if energy_megatons >= 1000.0 {
            Self::ExtinctionEvent
        } else if energy_megatons >= 100.0 {
            Self::Catastrophic
        } else if energy_megatons >= 10.0 {
            Self::Severe
        } else if energy_megatons >= 1.0 {
            Self::Moderate
        } else {
            Self::Minor
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Minor => "Localized effects on biodiversity",
            Self::Moderate => "Local loss of biodiversity",
            Self::Severe => "Significant loss of biodiversity",
            Self::Catastrophic => "Massive loss of biodiversity",
            Self::ExtinctionEvent => "Mass extinction with total biodiversity loss",
        }
    }
}

/// One concentric band of the biological estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiologicalZone {
    pub radius_km: f64,
    pub mortality_percentage: f64,
    pub area_km2: f64,
    pub organisms_affected: u64,
}

impl BiologicalZone {
    fn new(radius_km: f64, mortality_percentage: f64, organisms_affected: f64) -> Self {
        Self {
            radius_km,
            mortality_percentage,
            area_km2: PI * radius_km.powi(2),
            // `as` saturates on huge estimates and maps NaN to zero.
            organisms_affected: organisms_affected as u64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiologicalZones {
    pub total_destruction: BiologicalZone,
    pub severe_impact: BiologicalZone,
    pub moderate_impact: BiologicalZone,
    pub outer_effects: BiologicalZone,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneMortality {
    pub radius_km: f64,
    pub mortality_percentage: f64,
}

/// Mortality in the three inner bands for one kingdom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MortalityByZone {
    pub destruction_zone: ZoneMortality,
    pub severe_zone: ZoneMortality,
    pub moderate_zone: ZoneMortality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloraImpact {
    pub estimated_mortality_percentage: f64,
    pub vulnerable_species_mortality: f64,
    pub resilient_species_mortality: f64,
    pub most_vulnerable: Vec<String>,
    pub resilient_species: Vec<String>,
    pub recovery_time_years: u32,
    pub mortality_by_zone: Option<MortalityByZone>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaunaImpact {
    pub estimated_mortality_percentage: f64,
    pub vulnerable_species_mortality: f64,
    pub mobile_species_mortality: f64,
    pub most_vulnerable: Vec<String>,
    pub mobile_species: Vec<String>,
    pub recovery_time_years: u32,
    pub mortality_by_zone: Option<MortalityByZone>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiologicalImpactAnalysis {
    pub total_species_found: usize,
    pub flora_species_count: usize,
    pub fauna_species_count: usize,
    pub impact_severity: BiodiversitySeverity,
    pub severity_description: String,
    pub impact_zones: BiologicalZones,
    pub flora_impact: FloraImpact,
    pub fauna_impact: FaunaImpact,
}

impl BiologicalImpactAnalysis {
    /// `damage_radius_km` is the species search radius and the reference for
    /// scaling organism counts into each band.
    pub fn analyze(
        flora_species: &[SpeciesSummary],
        fauna_species: &[SpeciesSummary],
        organisms: &OrganismEstimate,
        energy_megatons: f64,
        damage_radius_km: f64,
        destruction_radius_km: f64,
    ) -> Self {
        let severity = BiodiversitySeverity::classify(energy_megatons);
        let total = organisms.total_organisms as f64;
        let core_share = if damage_radius_km > 0.0 {
            (destruction_radius_km / damage_radius_km).powi(2)
        } else {
            0.0
        };

        let impact_zones = BiologicalZones {
            total_destruction: BiologicalZone::new(destruction_radius_km, 100.0, total * core_share),
            severe_impact: BiologicalZone::new(
                damage_radius_km * SEVERE_RADIUS_FACTOR,
                fauna_severe_mortality(energy_megatons),
                total * SEVERE_RADIUS_FACTOR.powi(2),
            ),
            moderate_impact: BiologicalZone::new(
                damage_radius_km,
                scaled(30.0, 0.3, 60.0, energy_megatons),
                total * MODERATE_ORGANISM_SHARE,
            ),
            outer_effects: BiologicalZone::new(
                damage_radius_km * OUTER_RADIUS_FACTOR,
                scaled(0.0, 0.1, 20.0, energy_megatons),
                total * OUTER_ORGANISM_SHARE,
            ),
        };

        Self {
            total_species_found: flora_species.len() + fauna_species.len(),
            flora_species_count: flora_species.len(),
            fauna_species_count: fauna_species.len(),
            impact_severity: severity,
            severity_description: severity.description().to_string(),
            impact_zones,
            flora_impact: FloraImpact::analyze(
                flora_species,
                energy_megatons,
                destruction_radius_km,
                damage_radius_km,
            ),
            fauna_impact: FaunaImpact::analyze(
                fauna_species,
                energy_megatons,
                destruction_radius_km,
                damage_radius_km,
            ),
        }
    }
}

impl FloraImpact {
    fn analyze(
        species: &[SpeciesSummary],
        energy_megatons: f64,
        destruction_radius_km: f64,
        damage_radius_km: f64,
    ) -> Self {
        if species.is_empty() {
            return Self {
                estimated_mortality_percentage: 0.0,
                vulnerable_species_mortality: 0.0,
                resilient_species_mortality: 0.0,
                most_vulnerable: Vec::new(),
                resilient_species: Vec::new(),
                recovery_time_years: 0,
                mortality_by_zone: None,
            };
        }

        let severe = scaled(85.0, 0.1, 95.0, energy_megatons);
        let zones = mortality_by_zone(
            destruction_radius_km,
            damage_radius_km,
            severe,
            scaled(40.0, 0.3, 70.0, energy_megatons),
        );

        Self {
            estimated_mortality_percentage: severe,
            vulnerable_species_mortality: (severe + 10.0).min(98.0),
            resilient_species_mortality: (severe - 30.0).max(20.0),
            most_vulnerable: highlighted(species, |s| name_matches(s, &VULNERABLE_FLORA)),
            resilient_species: highlighted(species, |s| {
                !name_matches(s, &VULNERABLE_FLORA) && name_matches(s, &RESILIENT_FLORA)
            }),
            recovery_time_years: recovery_years(energy_megatons, [1000, 100, 10, 1]),
            mortality_by_zone: Some(zones),
        }
    }
}

impl FaunaImpact {
    fn analyze(
        species: &[SpeciesSummary],
        energy_megatons: f64,
        destruction_radius_km: f64,
        damage_radius_km: f64,
    ) -> Self {
        if species.is_empty() {
            return Self {
                estimated_mortality_percentage: 0.0,
                vulnerable_species_mortality: 0.0,
                mobile_species_mortality: 0.0,
                most_vulnerable: Vec::new(),
                mobile_species: Vec::new(),
                recovery_time_years: 0,
                mortality_by_zone: None,
            };
        }

        let severe = fauna_severe_mortality(energy_megatons);
        let zones = mortality_by_zone(
            destruction_radius_km,
            damage_radius_km,
            severe,
            scaled(30.0, 0.3, 60.0, energy_megatons),
        );

        Self {
            estimated_mortality_percentage: severe,
            vulnerable_species_mortality: (severe + 15.0).min(98.0),
            mobile_species_mortality: (severe - 40.0).max(25.0),
            most_vulnerable: highlighted(species, |s| name_matches(s, &VULNERABLE_FAUNA)),
            mobile_species: highlighted(species, |s| {
                !name_matches(s, &VULNERABLE_FAUNA) && is_mobile_class(s)
            }),
            recovery_time_years: recovery_years(energy_megatons, [500, 50, 5, 1]),
            mortality_by_zone: Some(zones),
        }
    }
}

fn fauna_severe_mortality(energy_megatons: f64) -> f64 {
    scaled(80.0, 0.15, 95.0, energy_megatons)
}

/// `base + energy * rate`, capped at `cap` percent.
fn scaled(base: f64, rate: f64, cap: f64, energy_megatons: f64) -> f64 {
    (base + energy_megatons * rate).min(cap)
}

fn mortality_by_zone(
    destruction_radius_km: f64,
    damage_radius_km: f64,
    severe: f64,
    moderate: f64,
) -> MortalityByZone {
    MortalityByZone {
        destruction_zone: ZoneMortality {
            radius_km: destruction_radius_km,
            mortality_percentage: 100.0,
        },
        severe_zone: ZoneMortality {
            radius_km: damage_radius_km * SEVERE_RADIUS_FACTOR,
            mortality_percentage: severe,
        },
        moderate_zone: ZoneMortality {
            radius_km: damage_radius_km,
            mortality_percentage: moderate,
        },
    }
}

/// Recovery years for the `>= 100`, `>= 10`, `>= 1` and sub-megaton bands.
fn recovery_years(energy_megatons: f64, bands: [u32; 4]) -> u32 {
    if energy_megatons >= 100.0 {
        bands[0]
    } else if energy_megatons >= 10.0 {
        bands[1]
    } else if energy_megatons >= 1.0 {
        bands[2]
    } else {
        bands[3]
    }
}

fn name_matches(species: &SpeciesSummary, needles: &[&str]) -> bool {
    let name = species.name.to_lowercase();
    needles.iter().any(|needle| name.contains(needle))
}

fn is_mobile_class(species: &SpeciesSummary) -> bool {
    species.class.as_deref().is_some_and(|class| {
        let class = class.to_lowercase();
        MOBILE_FAUNA_CLASSES.iter().any(|mobile| class.contains(mobile))
    })
}

fn highlighted(species: &[SpeciesSummary], keep: impl Fn(&SpeciesSummary) -> bool) -> Vec<String> {
    species
        .iter()
        .filter(|s| keep(s))
        .take(HIGHLIGHTED_SPECIES)
        .map(|s| s.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn species(key: i64, name: &str, class: Option<&str>) -> SpeciesSummary {
        SpeciesSummary {
            species_key: key,
            name: name.to_string(),
            scientific_name: name.to_string(),
            class: class.map(str::to_string),
            occurrences: 1,
            ..SpeciesSummary::default()
        }
    }

    fn analysis(energy: f64) -> BiologicalImpactAnalysis {
        let flora = vec![
            species(1, "Quercus ilex", None),
            species(2, "Pinus halepensis", None),
            species(3, "Lichen sp.", None),
            species(4, "Rosmarinus officinalis", None),
        ];
        let fauna = vec![
            species(10, "Common toad", Some("Amphibia")),
            species(11, "Passer domesticus", Some("Aves")),
            species(12, "Vulpes vulpes", Some("Mammalia")),
            species(13, "Helix aspersa", Some("Gastropoda")),
        ];
        let organisms = OrganismEstimate::from_species(flora.len(), fauna.len(), 8.0);
        BiologicalImpactAnalysis::analyze(&flora, &fauna, &organisms, energy, 8.0, 4.0)
    }

    #[test]
    fn severity_follows_energy_bands() {
        assert_eq!(BiodiversitySeverity::classify(0.5), BiodiversitySeverity::Minor);
        assert_eq!(BiodiversitySeverity::classify(1.0), BiodiversitySeverity::Moderate);
        assert_eq!(BiodiversitySeverity::classify(15.0), BiodiversitySeverity::Severe);
        assert_eq!(BiodiversitySeverity::classify(100.0), BiodiversitySeverity::Catastrophic);
        assert_eq!(
            BiodiversitySeverity::classify(1000.0),
            BiodiversitySeverity::ExtinctionEvent
        );
    }

    #[test]
    fn zones_scale_with_damage_radius() {
        let result = analysis(20.0);
        let zones = result.impact_zones;
        let total = OrganismEstimate::from_species(4, 4, 8.0).total_organisms as f64;

        assert_eq!(zones.total_destruction.radius_km, 4.0);
        assert_eq!(zones.total_destruction.mortality_percentage, 100.0);
        assert_eq!(zones.total_destruction.organisms_affected, (total * 0.25) as u64);
        assert!((zones.severe_impact.radius_km - 5.6).abs() < 1e-9);
        assert!((zones.severe_impact.mortality_percentage - 83.0).abs() < 1e-9);
        assert!((zones.moderate_impact.mortality_percentage - 36.0).abs() < 1e-9);
        assert_eq!(zones.moderate_impact.organisms_affected, (total * 0.8) as u64);
        assert_eq!(zones.outer_effects.radius_km, 12.0);
        assert!((zones.outer_effects.mortality_percentage - 2.0).abs() < 1e-9);
        assert!((zones.outer_effects.area_km2 - PI * 144.0).abs() < 1e-9);
        assert_eq!(result.total_species_found, 8);
        assert_eq!(result.impact_severity, BiodiversitySeverity::Severe);
    }

    #[test]
    fn mortality_is_capped_for_large_impacts() {
        let result = analysis(5_000.0);
        assert_eq!(result.impact_zones.severe_impact.mortality_percentage, 95.0);
        assert_eq!(result.impact_zones.moderate_impact.mortality_percentage, 60.0);
        assert_eq!(result.impact_zones.outer_effects.mortality_percentage, 20.0);
        assert_eq!(result.flora_impact.vulnerable_species_mortality, 98.0);
        assert_eq!(result.flora_impact.resilient_species_mortality, 65.0);
        assert_eq!(result.fauna_impact.mobile_species_mortality, 55.0);
        assert_eq!(result.flora_impact.recovery_time_years, 1000);
        assert_eq!(result.fauna_impact.recovery_time_years, 500);
    }

    #[test]
    fn highlights_vulnerable_resilient_and_mobile_species() {
        let result = analysis(2.0);

        assert_eq!(
            result.flora_impact.most_vulnerable,
            vec!["Quercus ilex".to_string(), "Pinus halepensis".to_string()]
        );
        assert_eq!(result.flora_impact.resilient_species, vec!["Lichen sp.".to_string()]);
        assert_eq!(result.fauna_impact.most_vulnerable, vec!["Common toad".to_string()]);
        assert_eq!(
            result.fauna_impact.mobile_species,
            vec!["Passer domesticus".to_string(), "Vulpes vulpes".to_string()]
        );
        assert_eq!(result.flora_impact.recovery_time_years, 10);
        assert_eq!(result.fauna_impact.recovery_time_years, 5);
        let flora_zones = result.flora_impact.mortality_by_zone.expect("flora zones");
        assert!((flora_zones.severe_zone.mortality_percentage - 85.2).abs() < 1e-9);
        assert!((flora_zones.moderate_zone.mortality_percentage - 40.6).abs() < 1e-9);
    }

    #[test]
    fn empty_kingdom_reports_no_mortality() {
        let organisms = OrganismEstimate::from_species(0, 0, 8.0);
        let result = BiologicalImpactAnalysis::analyze(&[], &[], &organisms, 50.0, 8.0, 4.0);

        assert_eq!(result.total_species_found, 0);
        assert_eq!(result.flora_impact.estimated_mortality_percentage, 0.0);
        assert_eq!(result.flora_impact.recovery_time_years, 0);
        assert!(result.flora_impact.mortality_by_zone.is_none());
        assert_eq!(result.fauna_impact.recovery_time_years, 0);
        assert_eq!(result.impact_zones.total_destruction.organisms_affected, 0);
    }
}
