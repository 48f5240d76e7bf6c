use futures::{
    future::{join_all, BoxFuture, FutureExt},
    stream::{self, StreamExt},
};
use std::future::Future;

use crate::{
    models::{Field, FieldKind, Frame, ResolvedRequest, ResponseBatch, Row, SamplePoint},
    Result,
};

pub const TIME_FIELD: &str = "Time";

/// Builds the frame for one query.
///
/// Rows are appended in the order the source returned them and then reversed,
/// always. The sample service returns points oldest first, so frames come out
/// newest first. `None` produces a frame with both fields and no rows.
pub fn assemble(request: &ResolvedRequest, samples: Option<Vec<SamplePoint>>) -> Frame {
    let mut rows: Vec<Row> = samples
        .unwrap_or_default()
        .into_iter()
        .map(|point| Row(point.timestamp, point.plotted_value()))
        .collect();
    rows.reverse();

    Frame {
        ref_id: request.ref_id.clone(),
        fields: vec![
            Field {
                name: TIME_FIELD.to_string(),
                kind: FieldKind::Time,
            },
            Field {
                name: request.label.clone(),
                kind: FieldKind::Number,
            },
        ],
        rows,
    }
}

/// Fetches and assembles every request, returning frames in request order.
///
/// Without `max_concurrency` all fetches are started at once. Every fetch is
/// driven to completion; if any of them failed the batch fails with the first
/// error in request order.
pub async fn assemble_all<'a, F, Fut>(
    requests: &'a [ResolvedRequest],
    fetch: F,
    max_concurrency: Option<usize>,
) -> Result<ResponseBatch>
where
    F: Fn(&'a ResolvedRequest) -> Fut,
    Fut: Future<Output = Result<Option<Vec<SamplePoint>>>> + Send + 'a,
{
    let pending: Vec<BoxFuture<'a, Result<Frame>>> = requests
        .iter()
        .map(|request| {
            let fetched = fetch(request);
            async move { fetched.await.map(|samples| assemble(request, samples)) }.boxed()
        })
        .collect();

    let results: Vec<Result<Frame>> = match max_concurrency {
        Some(limit) => stream::iter(pending).buffered(limit.max(1)).collect().await,
        None => join_all(pending).await,
    };

    let data = results.into_iter().collect::<Result<Vec<Frame>>>()?;
    Ok(ResponseBatch { data })
}
