use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    assembler::assemble_all,
    client::{HttpSampleClient, SampleFetcher},
    config::Config,
    metrics,
    models::{HealthState, HealthStatus, QueryRequest, ResolvedRequest, ResponseBatch},
    resolver::Resolver,
    template::{ScopedVarTemplateSrv, TemplateSrv},
    Result,
};

/// Runs query batches against the remote sample service.
#[derive(Clone)]
pub struct DataSource {
    resolver: Resolver,
    fetcher: Arc<dyn SampleFetcher>,
    max_concurrent_fetches: Option<usize>,
}

impl DataSource {
    pub fn new(
        resolver: Resolver,
        fetcher: Arc<dyn SampleFetcher>,
        max_concurrent_fetches: Option<usize>,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            max_concurrent_fetches,
        }
    }

    /// Builds a data source backed by the reqwest client and the scoped variable templates.
    pub fn from_config(config: &Config) -> Result<Self> {
        let templates: Arc<dyn TemplateSrv> = Arc::new(ScopedVarTemplateSrv);
        let resolver = Resolver::new(&config.base_url, templates)?;
        let client = HttpSampleClient::new(resolver.base_url().clone(), config.request_timeout)?;

        Ok(Self::new(resolver, Arc::new(client), config.max_concurrent_fetches))
    }

    pub async fn query(&self, request: &QueryRequest) -> Result<ResponseBatch> {
        request.range.validate()?;
        let ctx = request.context();

        let resolved = request
            .targets
            .iter()
            .map(|query| self.resolver.resolve(query, &ctx))
            .collect::<Result<Vec<ResolvedRequest>>>()?;

        let fetcher = &self.fetcher;
        let result = assemble_all(
            &resolved,
            |request| fetcher.fetch(request),
            self.max_concurrent_fetches,
        )
        .await;

        metrics::record_batch(result.is_ok());
        match &result {
            Ok(batch) => {
                let rows: usize = batch.data.iter().map(|frame| frame.rows.len()).sum();
                metrics::record_rows(rows);
                info!(queries = batch.data.len(), rows, "Query batch completed");
            }
            Err(e) => error!(queries = resolved.len(), error = %e, "Query batch failed"),
        }

        result
    }

    /// Probes the remote sample service.
    pub async fn test_datasource(&self) -> HealthStatus {
        match self.fetcher.probe().await {
            Ok(()) => HealthStatus {
                status: HealthState::Success,
                message: format!("Sample service at {} is reachable", self.resolver.base_url()),
            },
            Err(e) => {
                warn!(error = %e, "Health check failed");
                HealthStatus {
                    status: HealthState::Error,
                    message: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{QuerySpec, SamplePoint, ScopedVars, TimeRange},
        DataSourceError,
    };
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers with one point per request and remembers what it was asked for.
    #[derive(Default)]
    struct RecordingFetcher {
        seen: Mutex<Vec<ResolvedRequest>>,
        reachable: bool,
    }

    #[async_trait]
    impl SampleFetcher for RecordingFetcher {
        async fn fetch(&self, request: &ResolvedRequest) -> Result<Option<Vec<SamplePoint>>> {
            self.seen.lock().unwrap().push(request.clone());
            if request.system_id == "broken" {
                return Err(DataSourceError::Transport("connection refused".into()));
            }
            let delay = if request.ref_id == "A" { 40 } else { 0 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(Some(vec![
                SamplePoint::raw(Utc.timestamp_millis_opt(1).unwrap(), 10.0),
                SamplePoint::raw(Utc.timestamp_millis_opt(2).unwrap(), 20.0),
            ]))
        }

        async fn probe(&self) -> Result<()> {
            if self.reachable {
                Ok(())
            } else {
                Err(DataSourceError::Transport("connection refused".into()))
            }
        }
    }

    fn datasource(fetcher: Arc<RecordingFetcher>) -> DataSource {
        let resolver = Resolver::new("http://samples.local", Arc::new(ScopedVarTemplateSrv)).unwrap();
        DataSource::new(resolver, fetcher, None)
    }

    fn batch(targets: Vec<QuerySpec>, vars: &[(&str, &str)]) -> QueryRequest {
        QueryRequest {
            range: TimeRange::new(
                Utc.timestamp_millis_opt(0).unwrap(),
                Utc.timestamp_millis_opt(60_000).unwrap(),
            )
            .unwrap(),
            scoped_vars: vars
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<ScopedVars>(),
            targets,
        }
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn test_query_future_is_send() {
        let ds = datasource(Arc::new(RecordingFetcher::default()));
        let request = batch(
            vec![QuerySpec::new("A", "sys1", "temp"), QuerySpec::new("B", "sys2", "hum")],
            &[],
        );

        // The HTTP handler runs this future on a multi-threaded runtime.
        assert_send(ds.query(&request));
        assert_send(ds.test_datasource());
    }

    #[tokio::test]
    async fn test_query_resolves_and_keeps_order() {
        let fetcher = Arc::new(RecordingFetcher::default());
        let ds = datasource(fetcher.clone());

        let response = ds
            .query(&batch(
                vec![QuerySpec::new("A", "$sys", "temp"), QuerySpec::new("B", "sys2", "$s")],
                &[("sys", "sys1"), ("s", "hum")],
            ))
            .await
            .unwrap();

        let ids: Vec<&str> = response.data.iter().map(|f| f.ref_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(response.data[1].fields[1].name, "hum");
        assert_eq!(response.data[0].rows[0].1, Some(20.0));

        let seen = fetcher.seen.lock().unwrap();
        let systems: Vec<&str> = seen.iter().map(|r| r.system_id.as_str()).collect();
        assert!(systems.contains(&"sys1"));
        assert!(systems.contains(&"sys2"));
        assert!(seen.iter().all(|r| r.from == "1970-01-01T00:00:00.000Z"));
    }

    #[tokio::test]
    async fn test_query_fails_when_any_fetch_fails() {
        let ds = datasource(Arc::new(RecordingFetcher::default()));

        let result = ds
            .query(&batch(
                vec![QuerySpec::new("A", "sys1", "temp"), QuerySpec::new("B", "broken", "temp")],
                &[],
            ))
            .await;

        assert!(matches!(result, Err(DataSourceError::Transport(_))));
    }

    #[tokio::test]
    async fn test_query_rejects_inverted_range() {
        let ds = datasource(Arc::new(RecordingFetcher::default()));
        let mut request = batch(vec![QuerySpec::new("A", "sys1", "temp")], &[]);
        std::mem::swap(&mut request.range.from, &mut request.range.to);

        assert!(matches!(
            ds.query(&request).await,
            Err(DataSourceError::InvalidTimeRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_health_check_reports_probe_result() {
        let up = datasource(Arc::new(RecordingFetcher {
            reachable: true,
            ..Default::default()
        }));
        assert_eq!(up.test_datasource().await.status, HealthState::Success);

        let down = datasource(Arc::new(RecordingFetcher::default()));
        let status = down.test_datasource().await;
        assert_eq!(status.status, HealthState::Error);
        assert!(status.message.contains("connection refused"));
    }
}
