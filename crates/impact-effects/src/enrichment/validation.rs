use super::geo::Coordinate;

/// Input rejected before any source is queried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be a positive number of kilometers (got {value})")]
    NonPositiveRadius { field: &'static str, value: f64 },
    #[error(
        "radii must strictly increase: destruction {destruction_km} < damage {damage_km} < air pressure {air_pressure_km}"
    )]
    RadiiNotIncreasing {
        destruction_km: f64,
        damage_km: f64,
        air_pressure_km: f64,
    },
    #[error("impact location ({latitude}, {longitude}) is outside latitude [-90, 90] / longitude [-180, 180]")]
    CoordinateOutOfRange { latitude: f64, longitude: f64 },
    #[error("impact energy must be a finite, non-negative megaton value (got {0})")]
    InvalidEnergy(f64),
}

impl ValidationError {
    /// Name of the request field the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::NonPositiveRadius { field, .. } => field,
            Self::RadiiNotIncreasing { .. } => "radii",
            Self::CoordinateOutOfRange { .. } => "location",
            Self::InvalidEnergy(_) => "energy_megatons_tnt",
        }
    }
}

pub(crate) fn validate_location(location: &Coordinate) -> Result<(), ValidationError> {
    if location.is_valid() {
        Ok(())
    } else {
        Err(ValidationError::CoordinateOutOfRange {
            latitude: location.latitude,
            longitude: location.longitude,
        })
    }
}

pub(crate) fn validate_energy(megatons: f64) -> Result<(), ValidationError> {
    if megatons.is_finite() && megatons >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidEnergy(megatons))
    }
}
