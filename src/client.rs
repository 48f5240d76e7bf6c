use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    metrics,
    models::{ResolvedRequest, SamplePoint},
    DataSourceError, Result,
};

/// Retrieves samples for a resolved request.
///
/// `Ok(None)` means the remote service answered without a point list
/// (empty body or JSON `null`).
#[async_trait]
pub trait SampleFetcher: Send + Sync {
    async fn fetch(&self, request: &ResolvedRequest) -> Result<Option<Vec<SamplePoint>>>;

    /// Checks that the remote service is reachable.
    async fn probe(&self) -> Result<()>;
}

pub struct HttpSampleClient {
    client: Client,
    base_url: Url,
}

impl HttpSampleClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataSourceError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl SampleFetcher for HttpSampleClient {
    async fn fetch(&self, request: &ResolvedRequest) -> Result<Option<Vec<SamplePoint>>> {
        let timer = metrics::FETCH_DURATION.start_timer();
        let result = get_samples(&self.client, request).await;
        timer.observe_duration();

        metrics::record_fetch(result.is_ok());
        if let Err(e) = &result {
            warn!(ref_id = %request.ref_id, error = %e, "Sample fetch failed");
        }
        result
    }

    async fn probe(&self) -> Result<()> {
        let response = self.client.get(self.base_url.clone()).send().await?;
        let status = response.status();
        debug!(url = %self.base_url, %status, "Probed sample service");

        if status.is_server_error() {
            return Err(DataSourceError::Status {
                status: status.as_u16(),
                url: self.base_url.to_string(),
            });
        }
        Ok(())
    }
}

async fn get_samples(client: &Client, request: &ResolvedRequest) -> Result<Option<Vec<SamplePoint>>> {
    let response = client
        .get(request.url.clone())
        .query(&query_params(request))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(DataSourceError::Status {
            status: status.as_u16(),
            url: request.url.to_string(),
        });
    }

    let body = response.bytes().await?;
    parse_samples(&body)
}

/// `stream` repeated once per stream in order, then `from`, `to` and the optional filters.
pub fn query_params(request: &ResolvedRequest) -> Vec<(&'static str, String)> {
    let mut params: Vec<(&'static str, String)> = request
        .streams
        .iter()
        .map(|stream| ("stream", stream.clone()))
        .collect();

    params.push(("from", request.from.clone()));
    params.push(("to", request.to.clone()));

    if let Some(frequency) = &request.frequency {
        params.push(("frequency", frequency.clone()));
    }
    if let Some(limit) = request.limit {
        params.push(("limit", limit.to_string()));
    }

    params
}

/// Empty bodies and JSON `null` carry no points. Anything other than a point array is malformed.
pub fn parse_samples(body: &[u8]) -> Result<Option<Vec<SamplePoint>>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    Ok(serde_json::from_slice::<Option<Vec<SamplePoint>>>(body)?)
}
