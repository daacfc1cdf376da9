//! Bounded-concurrency ordered map

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::future::Future;

/// Run `worker` over `items` with at most `limit` workers in flight.
///
/// A new worker starts as soon as any running one finishes, and results
/// come back in input order whatever the completion order. Workers run
/// interleaved on the calling task; a limit of 0 is treated as 1.
pub async fn map_bounded<I, F, Fut>(items: I, limit: usize, mut worker: F) -> Vec<Fut::Output>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future,
{
    let mut results: Vec<(usize, Fut::Output)> = stream::iter(items.into_iter().enumerate())
        .map(|(index, item)| worker(item).map(move |output| (index, output)))
        .buffer_unordered(limit.max(1))
        .collect()
        .await;

    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, output)| output).collect()
}
