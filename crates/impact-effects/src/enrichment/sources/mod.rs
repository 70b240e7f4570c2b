//! External geodata sources and the bounded adapter that isolates their failures.

pub mod gazetteer;
pub mod gbif;
pub mod overpass;
pub mod usgs;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::geo::Coordinate;

pub use gazetteer::{GazetteerError, GazetteerPlaceSource};
pub use gbif::{
    parse_flora_fauna_payload, FloraFaunaPayload, GbifFloraFaunaSource, OrganismEstimate,
    SpeciesSummary,
};
pub use overpass::{OverpassPlaceSource, PopulationPayload};
pub use usgs::{SeismicContext, SeismicEvent, UsgsSeismicSource};

/// Stable identifier for each enrichment source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Population,
    SeismicContext,
    FloraFauna,
}

impl SourceId {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Population => "population",
            Self::SeismicContext => "seismic_context",
            Self::FloraFauna => "flora_fauna",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reasons a source can fail; every variant is recovered by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("timeout")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("source reported failure: {0}")]
    Unsuccessful(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Request fields shared by the population and seismic sources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaQuery {
    pub location: Coordinate,
    pub radius_km: f64,
}

/// Request sent to the biodiversity source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloraFaunaQuery {
    pub location: Coordinate,
    pub impact_radius_km: f64,
    pub impact_energy_megatons: f64,
    pub destruction_radius_km: f64,
}

/// Uniform contract for an external data provider.
#[async_trait]
pub trait EnrichmentSource: Send + Sync {
    type Request: Send + Sync;
    type Payload: Send;

    fn id(&self) -> SourceId;

    async fn fetch(&self, request: &Self::Request) -> Result<Self::Payload, SourceError>;
}

#[async_trait]
impl<S> EnrichmentSource for std::sync::Arc<S>
where
    S: EnrichmentSource + ?Sized,
{
    type Request = S::Request;
    type Payload = S::Payload;

    fn id(&self) -> SourceId {
        (**self).id()
    }

    async fn fetch(&self, request: &Self::Request) -> Result<Self::Payload, SourceError> {
        (**self).fetch(request).await
    }
}

/// Settled result of one source call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome<T> {
    Ok { payload: T },
    Failed { source: SourceId, reason: String },
}

impl<T> SourceOutcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok { payload } => Some(payload),
            Self::Failed { .. } => None,
        }
    }
}

/// Source wrapped with its time budget.
#[derive(Debug, Clone)]
pub struct BoundedSource<S> {
    source: S,
    timeout: Duration,
}

impl<S> BoundedSource<S>
where
    S: EnrichmentSource,
{
    pub fn new(source: S, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    pub fn id(&self) -> SourceId {
        self.source.id()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs the source, resolving to `Failed` on error or when the budget elapses.
    pub async fn query(&self, request: &S::Request) -> SourceOutcome<S::Payload> {
        settle(self.id(), self.timeout, self.source.fetch(request)).await
    }
}

pub(crate) async fn settle<T, F>(source: SourceId, budget: Duration, call: F) -> SourceOutcome<T>
where
    F: Future<Output = Result<T, SourceError>>,
{
    let result = match tokio::time::timeout(budget, call).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout),
    };

    match result {
        Ok(payload) => SourceOutcome::Ok { payload },
        Err(err) => SourceOutcome::Failed {
            source,
            reason: err.to_string(),
        },
    }
}

/// Rejects responses that are not JSON before attempting to decode them.
pub(crate) fn ensure_json(response: &reqwest::Response) -> Result<(), SourceError> {
    let Some(value) = response.headers().get(reqwest::header::CONTENT_TYPE) else {
        return Ok(());
    };
    let raw = value
        .to_str()
        .map_err(|_| SourceError::Malformed("unreadable content type".to_string()))?;
    let parsed: mime::Mime = raw
        .parse()
        .map_err(|_| SourceError::Malformed(format!("invalid content type '{raw}'")))?;

    let is_json = parsed.subtype() == mime::JSON || parsed.suffix() == Some(mime::JSON);
    if is_json {
        Ok(())
    } else {
        Err(SourceError::Malformed(format!(
            "expected JSON but received '{}'",
            parsed.essence_str()
        )))
    }
}

/// Fails non-success statuses before the body is read.
pub(crate) fn ensure_success(response: &reqwest::Response) -> Result<(), SourceError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(SourceError::Status(status.as_u16()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    struct SlowSource {
        delay: Duration,
    }

    #[async_trait]
    impl EnrichmentSource for SlowSource {
        type Request = AreaQuery;
        type Payload = u32;

        fn id(&self) -> SourceId {
            SourceId::Population
        }

        async fn fetch(&self, _request: &AreaQuery) -> Result<u32, SourceError> {
            tokio::time::sleep(self.delay).await;
            Ok(7)
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl EnrichmentSource for BrokenSource {
        type Request = AreaQuery;
        type Payload = u32;

        fn id(&self) -> SourceId {
            SourceId::SeismicContext
        }

        async fn fetch(&self, _request: &AreaQuery) -> Result<u32, SourceError> {
            Err(SourceError::Status(503))
        }
    }

    fn query() -> AreaQuery {
        AreaQuery {
            location: Coordinate::new(41.4769, -1.3742),
            radius_km: 12.0,
        }
    }

    #[tokio::test]
    async fn slow_source_resolves_to_timeout() {
        let bounded = BoundedSource::new(
            SlowSource {
                delay: Duration::from_secs(30),
            },
            Duration::from_millis(1),
        );

        let started = Instant::now();
        let outcome = bounded.query(&query()).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(
            outcome,
            SourceOutcome::Failed {
                source: SourceId::Population,
                reason: "timeout".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn fast_source_resolves_to_payload() {
        let bounded = BoundedSource::new(
            SlowSource {
                delay: Duration::from_millis(1),
            },
            Duration::from_secs(5),
        );
        assert_eq!(bounded.query(&query()).await.ok(), Some(7));
    }

    #[tokio::test]
    async fn errors_carry_source_and_reason() {
        let bounded = BoundedSource::new(BrokenSource, Duration::from_secs(1));
        match bounded.query(&query()).await {
            SourceOutcome::Failed { source, reason } => {
                assert_eq!(source, SourceId::SeismicContext);
                assert_eq!(reason, "unexpected status 503");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn source_labels_are_stable() {
        assert_eq!(SourceId::Population.to_string(), "population");
        assert_eq!(SourceId::SeismicContext.label(), "seismic_context");
        assert_eq!(SourceId::FloraFauna.label(), "flora_fauna");
    }
}
