use impact_effects::config::SourcesConfig;
use impact_effects::enrichment::sources::{
    GazetteerPlaceSource, GbifFloraFaunaSource, OverpassPlaceSource, PopulationPayload,
    UsgsSeismicSource,
};
use impact_effects::enrichment::{
    AreaQuery, DiagnosticSink, EnrichmentSource, ImpactEnrichmentService,
};
use impact_effects::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

const USER_AGENT: &str = concat!("impact-effects/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Population provider chosen at startup: offline gazetteer or live Overpass.
pub(crate) type PopulationSource =
    Arc<dyn EnrichmentSource<Request = AreaQuery, Payload = PopulationPayload>>;

pub(crate) type ImpactService =
    ImpactEnrichmentService<PopulationSource, UsgsSeismicSource, GbifFloraFaunaSource>;

pub(crate) fn http_client() -> Result<reqwest::Client, AppError> {
    Ok(reqwest::Client::builder().user_agent(USER_AGENT).build()?)
}

pub(crate) fn population_source(
    config: &SourcesConfig,
    client: reqwest::Client,
) -> Result<PopulationSource, AppError> {
    match &config.gazetteer_csv {
        Some(path) => {
            let gazetteer = GazetteerPlaceSource::from_path(path)?;
            info!(path = %path.display(), places = gazetteer.len(), "using offline gazetteer");
            Ok(Arc::new(gazetteer))
        }
        None => Ok(Arc::new(OverpassPlaceSource::new(
            client,
            config.overpass_url.clone(),
        ))),
    }
}

pub(crate) fn build_service(
    config: &SourcesConfig,
    diagnostics: Arc<dyn DiagnosticSink>,
) -> Result<ImpactService, AppError> {
    let client = http_client()?;
    let population = population_source(config, client.clone())?;
    let seismic = UsgsSeismicSource::new(client.clone(), config.usgs_url.clone());
    let flora_fauna = GbifFloraFaunaSource::new(client, config.gbif_url.clone());

    Ok(ImpactEnrichmentService::with_diagnostics(
        population,
        seismic,
        flora_fauna,
        config.enrichment_settings(),
        diagnostics,
    ))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::time::Duration;

    pub(crate) const GAZETTEER_CSV: &str = "name,population,lat,lon,type\n\
        Épila,4512,41.5230,-1.3742,town\n\
        Rueda de Jalón,300,41.5669,-1.3742,village\n\
        Zaragoza,700000,41.65,-0.88,city\n";

    /// Offline configuration: gazetteer population, unreachable remote sources.
    pub(crate) fn offline_sources(gazetteer: PathBuf) -> SourcesConfig {
        SourcesConfig {
            overpass_url: "http://127.0.0.1:9/interpreter".to_string(),
            usgs_url: "http://127.0.0.1:9/query".to_string(),
            gbif_url: "http://127.0.0.1:9/search".to_string(),
            population_timeout: Duration::from_millis(500),
            seismic_timeout: Duration::from_millis(300),
            flora_fauna_timeout: Duration::from_millis(300),
            seismic_radius_km: 100.0,
            gazetteer_csv: Some(gazetteer),
        }
    }

    pub(crate) fn write_gazetteer(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "impact-effects-{name}-{}.csv",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).expect("temp gazetteer created");
        file.write_all(GAZETTEER_CSV.as_bytes())
            .expect("temp gazetteer written");
        path
    }
}
