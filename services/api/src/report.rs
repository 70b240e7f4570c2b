use crate::infra::build_service;
use clap::Args;
use impact_effects::config::AppConfig;
use impact_effects::enrichment::{
    Coordinate, DamageZone, EnrichmentRequest, ImpactMetrics, ImpactReport, InMemoryDiagnosticSink,
    PhysicalEffects, PopulationMessage, ReportSection, SeverityLevel, SourceDiagnostic, ZoneRadii,
};
use impact_effects::error::AppError;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Impact latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub(crate) latitude: f64,
    /// Impact longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub(crate) longitude: f64,
    /// Radius of total destruction (km)
    #[arg(long)]
    pub(crate) destruction_km: f64,
    /// Radius of severe structural damage (km)
    #[arg(long)]
    pub(crate) damage_km: f64,
    /// Radius of the air-pressure shockwave (km)
    #[arg(long)]
    pub(crate) air_pressure_km: f64,
    /// Impact energy in megatons of TNT
    #[arg(long)]
    pub(crate) energy_mt: f64,
    /// Crater diameter in meters, when already computed
    #[arg(long, default_value_t = 0.0)]
    pub(crate) crater_diameter_m: f64,
    /// Equivalent seismic magnitude, when already computed
    #[arg(long, default_value_t = 0.0)]
    pub(crate) seismic_magnitude: f64,
    /// Offline gazetteer CSV used instead of Overpass
    #[arg(long)]
    pub(crate) gazetteer: Option<PathBuf>,
    /// Print the report as JSON instead of a text summary
    #[arg(long)]
    pub(crate) json: bool,
}

impl ReportArgs {
    fn request(&self) -> EnrichmentRequest {
        EnrichmentRequest {
            location: Coordinate::new(self.latitude, self.longitude),
            radii: ZoneRadii::new(self.destruction_km, self.damage_km, self.air_pressure_km),
            metrics: ImpactMetrics {
                energy_megatons_tnt: self.energy_mt,
            },
        }
    }

    fn physical_effects(&self) -> PhysicalEffects {
        PhysicalEffects {
            energy_megatons_tnt: self.energy_mt,
            crater_diameter_m: self.crater_diameter_m,
            seismic_magnitude: self.seismic_magnitude,
            radii: ZoneRadii::new(self.destruction_km, self.damage_km, self.air_pressure_km),
            severity: SeverityLevel::classify(self.energy_mt),
        }
    }
}

pub(crate) async fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(path) = args.gazetteer.clone() {
        config.sources.gazetteer_csv = Some(path);
    }

    let sink = InMemoryDiagnosticSink::default();
    let service = build_service(&config.sources, Arc::new(sink.clone()))?;

    let request = args.request();
    let enrichment = service.enrich(&request).await?;
    let report = ImpactReport::assemble(request.location, args.physical_effects(), enrichment);

    if args.json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|err| AppError::Io(std::io::Error::from(err)))?;
        println!("{rendered}");
    } else {
        let rendered = render_report(&report, &sink.records())
            .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
        print!("{rendered}");
    }

    Ok(())
}

pub(crate) fn describe_population(message: &PopulationMessage) -> String {
    match message {
        PopulationMessage::NoPopulatedPlaces => {
            "Uninhabited area or no population data available".to_string()
        }
        PopulationMessage::PlacesFound {
            total_population,
            count_of_places,
        } => format!(
            "{} people in {} populated place{}",
            group_thousands(*total_population),
            count_of_places,
            if *count_of_places == 1 { "" } else { "s" }
        ),
    }
}

pub(crate) fn render_report(
    report: &ImpactReport,
    diagnostics: &[SourceDiagnostic],
) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    let physical = &report.physical;

    writeln!(out, "Impact Effects Report")?;
    writeln!(
        out,
        "Generated: {}",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(
        out,
        "Location: {:.4}, {:.4}",
        report.impact_location.latitude, report.impact_location.longitude
    )?;
    writeln!(
        out,
        "Severity: {} ({}) at {:.2} Mt TNT",
        physical.severity.label(),
        physical.severity.description(),
        physical.energy_megatons_tnt
    )?;
    if physical.crater_diameter_m > 0.0 {
        writeln!(out, "Crater diameter: {:.0} m", physical.crater_diameter_m)?;
    }
    if physical.seismic_magnitude > 0.0 {
        writeln!(out, "Seismic magnitude: {:.1}", physical.seismic_magnitude)?;
    }

    writeln!(out, "\nPopulation")?;
    match &report.population {
        ReportSection::Available { data } => {
            writeln!(out, "  {}", describe_population(&data.message))?;
            for zone in DamageZone::affected() {
                let tally = data.zone(zone);
                let radius = physical.radii.radius_for(zone).unwrap_or_default();
                writeln!(
                    out,
                    "  {:<18} <= {:>7.1} km: {:>3} places, {:>11} residents, {:>11} est. casualties",
                    zone.label(),
                    radius,
                    tally.count,
                    group_thousands(tally.population_sum),
                    group_thousands(tally.estimated_casualties)
                )?;
            }
            if let Some(nearest) = data.nearest_place() {
                writeln!(
                    out,
                    "  Nearest: {} ({:.1} km, {})",
                    nearest.name,
                    nearest.distance_km,
                    nearest.kind.label()
                )?;
            }
        }
        ReportSection::Unavailable { reason } => {
            writeln!(out, "  unavailable: {reason}")?;
        }
    }

    writeln!(out, "\nSeismic context")?;
    match &report.seismic_context {
        ReportSection::Available { data } => {
            writeln!(
                out,
                "  {} recorded events within {:.0} km",
                data.count, data.search_radius_km
            )?;
            if let (Some(max), Some(avg)) = (data.max_magnitude, data.avg_magnitude) {
                writeln!(out, "  Max magnitude {max:.1}, average {avg:.1}")?;
            }
        }
        ReportSection::Unavailable { reason } => {
            writeln!(out, "  unavailable: {reason}")?;
        }
    }

    writeln!(out, "\nFlora and fauna")?;
    match &report.flora_fauna {
        ReportSection::Available { data } => {
            writeln!(
                out,
                "  {} plant and {} animal species within {:.1} km",
                data.flora_species.len(),
                data.fauna_species.len(),
                data.impact_radius_km
            )?;
            writeln!(
                out,
                "  ~{} organisms over {:.1} km2",
                group_thousands(data.organisms.total_organisms),
                data.organisms.area_km2
            )?;
            writeln!(
                out,
                "  Biodiversity impact: {}",
                data.impact_analysis.impact_severity.description()
            )?;
        }
        ReportSection::Unavailable { reason } => {
            writeln!(out, "  unavailable: {reason}")?;
        }
    }

    if !diagnostics.is_empty() {
        writeln!(out, "\nDegraded sources")?;
        for diagnostic in diagnostics {
            writeln!(out, "  {}: {}", diagnostic.source, diagnostic.reason)?;
        }
    }

    Ok(out)
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}
