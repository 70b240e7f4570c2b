use serde::{Deserialize, Serialize};

use super::validation::ValidationError;

/// Concentric damage bands around the impact point, innermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageZone {
    Destruction,
    Damage,
    AirPressure,
    Outside,
}

impl DamageZone {
    /// Zones that contribute to population totals.
    pub const fn affected() -> [Self; 3] {
        [Self::Destruction, Self::Damage, Self::AirPressure]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Destruction => "Total destruction",
            Self::Damage => "Severe damage",
            Self::AirPressure => "Air pressure",
            Self::Outside => "Outside affected area",
        }
    }

    /// Share of residents expected to die in this band.
    pub const fn fatality_rate(self) -> f64 {
        match self {
            Self::Destruction => 0.95,
            Self::Damage => 0.70,
            Self::AirPressure => 0.15,
            Self::Outside => 0.0,
        }
    }

    /// Innermost zone whose radius contains `distance_km`; boundaries are inclusive.
    pub fn classify(distance_km: f64, radii: &ZoneRadii) -> Self {
        if distance_km <= radii.destruction_km {
            Self::Destruction
        } else if distance_km <= radii.damage_km {
            Self::Damage
        } else if distance_km <= radii.air_pressure_km {
            Self::AirPressure
        } else {
            Self::Outside
        }
    }

    pub const fn is_affected(self) -> bool {
        !matches!(self, Self::Outside)
    }
}

/// Physical effect radii in kilometers, computed upstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneRadii {
    pub destruction_km: f64,
    pub damage_km: f64,
    pub air_pressure_km: f64,
}

impl ZoneRadii {
    pub const fn new(destruction_km: f64, damage_km: f64, air_pressure_km: f64) -> Self {
        Self {
            destruction_km,
            damage_km,
            air_pressure_km,
        }
    }

    /// Checks each radius is a positive finite number and that the bands nest.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("destruction_radius_km", self.destruction_km),
            ("damage_radius_km", self.damage_km),
            ("air_pressure_radius_km", self.air_pressure_km),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ValidationError::NonPositiveRadius { field, value });
            }
        }

        if !(self.destruction_km < self.damage_km && self.damage_km < self.air_pressure_km) {
            return Err(ValidationError::RadiiNotIncreasing {
                destruction_km: self.destruction_km,
                damage_km: self.damage_km,
                air_pressure_km: self.air_pressure_km,
            });
        }

        Ok(())
    }

    pub fn radius_for(&self, zone: DamageZone) -> Option<f64> {
        match zone {
            DamageZone::Destruction => Some(self.destruction_km),
            DamageZone::Damage => Some(self.damage_km),
            DamageZone::AirPressure => Some(self.air_pressure_km),
            DamageZone::Outside => None,
        }
    }

    /// Outermost radius, used as the population search footprint.
    pub fn outer_km(&self) -> f64 {
        self.air_pressure_km
    }
}
