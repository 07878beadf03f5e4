//! Ordered, bounded fan-out.
//!
//! Runs one future per input with at most `limit` in flight and joins all of
//! them. Results come back in input order regardless of completion order, so
//! precedence rules applied afterwards are deterministic.

use futures::stream::{self, StreamExt};
use std::future::Future;

pub async fn ordered_fanout<I, F, Fut, T>(items: I, limit: usize, task: F) -> Vec<T>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = T>,
{
    stream::iter(items)
        .map(task)
        .buffered(limit.max(1))
        .collect()
        .await
}
