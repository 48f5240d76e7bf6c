use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Url;
use std::sync::Arc;
use tracing::debug;

use crate::{
    models::{QuerySpec, RequestContext, ResolvedRequest},
    template::TemplateSrv,
    DataSourceError, Result,
};

/// Turns query templates into concrete sample requests against one base endpoint.
#[derive(Clone)]
pub struct Resolver {
    base_url: Url,
    templates: Arc<dyn TemplateSrv>,
}

impl Resolver {
    pub fn new(base_url: &str, templates: Arc<dyn TemplateSrv>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DataSourceError::Config(format!("Invalid base URL {}: {}", base_url, e)))?;

        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(DataSourceError::Config(format!(
                "Base URL must be an absolute http(s) URL, got {}",
                base_url
            )));
        }

        Ok(Self { base_url, templates })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Substitutes the query's templates and builds the sample request.
    ///
    /// Unresolved tokens are left as they are. The stream list is split on `,`
    /// without trimming or filtering.
    pub fn resolve(&self, query: &QuerySpec, ctx: &RequestContext) -> Result<ResolvedRequest> {
        let system_id = self.templates.replace(&query.system_id, &ctx.scoped_vars);
        let label = self.templates.replace(&query.stream, &ctx.scoped_vars);
        let streams = label.split(',').map(str::to_string).collect();
        let url = sample_url(&self.base_url, &system_id)?;

        debug!(ref_id = %query.ref_id, %url, "Resolved sample request");

        Ok(ResolvedRequest {
            ref_id: query.ref_id.clone(),
            system_id,
            streams,
            label,
            from: format_timestamp(&ctx.range.from),
            to: format_timestamp(&ctx.range.to),
            frequency: query.frequency.clone(),
            limit: query.limit,
            url,
        })
    }
}

/// ISO-8601 UTC with millisecond precision, e.g. `2024-01-01T00:00:00.000Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `{base}/system/{system_id}/sample`, with `system_id` percent-encoded as one path segment.
pub fn sample_url(base: &Url, system_id: &str) -> Result<Url> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);

    url.path_segments_mut()
        .map_err(|_| DataSourceError::Config(format!("URL {} cannot be a base", base)))?
        .pop_if_empty()
        .push("system")
        .push(system_id)
        .push("sample");

    Ok(url)
}
