#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use impact_effects::enrichment::sources::{
    FloraFaunaPayload, OrganismEstimate, PopulationPayload, SeismicContext,
};
use impact_effects::enrichment::{
    AreaQuery, BiologicalImpactAnalysis, Coordinate, EnrichmentRequest, EnrichmentSettings,
    EnrichmentSource, FloraFaunaQuery, ImpactMetrics, PlaceKind, RawPlace, SourceError, SourceId,
    ZoneRadii,
};

/// Scripted behavior for a fake source.
#[derive(Debug, Clone)]
pub enum Script<T> {
    Respond(T),
    Fail(SourceError),
    Hang,
}

/// Fake source that records every request it receives.
pub struct FakeSource<Req, T> {
    id: SourceId,
    script: Script<T>,
    calls: AtomicUsize,
    requests: Mutex<Vec<Req>>,
}

impl<Req, T> FakeSource<Req, T> {
    pub fn new(id: SourceId, script: Script<T>) -> Arc<Self> {
        Arc::new(Self {
            id,
            script,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Req>
    where
        Req: Clone,
    {
        self.requests.lock().expect("requests mutex").clone()
    }
}

#[async_trait]
impl<Req, T> EnrichmentSource for FakeSource<Req, T>
where
    Req: Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    type Request = Req;
    type Payload = T;

    fn id(&self) -> SourceId {
        self.id
    }

    async fn fetch(&self, request: &Req) -> Result<T, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .expect("requests mutex")
            .push(request.clone());
        match &self.script {
            Script::Respond(payload) => Ok(payload.clone()),
            Script::Fail(error) => Err(error.clone()),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(SourceError::Transport("woke up".to_string()))
            }
        }
    }
}

pub type FakePopulation = FakeSource<AreaQuery, PopulationPayload>;
pub type FakeSeismic = FakeSource<AreaQuery, SeismicContext>;
pub type FakeFloraFauna = FakeSource<FloraFaunaQuery, FloraFaunaPayload>;

pub fn impact() -> Coordinate {
    Coordinate::new(41.4769, -1.3742)
}

pub fn radii() -> ZoneRadii {
    ZoneRadii::new(5.0, 8.0, 12.0)
}

pub fn request() -> EnrichmentRequest {
    EnrichmentRequest {
        location: impact(),
        radii: radii(),
        metrics: ImpactMetrics {
            energy_megatons_tnt: 15.0,
        },
    }
}

pub fn fast_settings() -> EnrichmentSettings {
    EnrichmentSettings {
        population_timeout: Duration::from_millis(500),
        seismic_timeout: Duration::from_millis(500),
        flora_fauna_timeout: Duration::from_millis(500),
        seismic_radius_km: 100.0,
    }
}

/// Place `km` kilometers due north of the impact point.
pub fn place_north(name: &str, population: i64, km: f64) -> RawPlace {
    let degrees = (km / impact_effects::enrichment::geo::EARTH_RADIUS_KM).to_degrees();
    RawPlace {
        name: Some(name.to_string()),
        population: Some(population),
        latitude: Some(impact().latitude + degrees),
        longitude: Some(impact().longitude),
        kind: PlaceKind::Village,
    }
}

pub fn population_payload(places: Vec<RawPlace>) -> PopulationPayload {
    PopulationPayload { places }
}

pub fn seismic_payload() -> SeismicContext {
    SeismicContext {
        search_radius_km: 100.0,
        count: 4,
        max_magnitude: Some(4.2),
        avg_magnitude: Some(3.1),
        strongest_events: Vec::new(),
    }
}

pub fn flora_fauna_payload() -> FloraFaunaPayload {
    let organisms = OrganismEstimate::from_species(0, 0, 8.0);
    FloraFaunaPayload {
        impact_radius_km: 8.0,
        destruction_radius_km: 5.0,
        impact_energy_megatons: 15.0,
        flora_species: Vec::new(),
        fauna_species: Vec::new(),
        organisms,
        impact_analysis: BiologicalImpactAnalysis::analyze(&[], &[], &organisms, 15.0, 8.0, 5.0),
        data_source: "fake".to_string(),
    }
}
