//! Bounded-concurrency fan-out.

use std::future::Future;

use futures::stream::{self, StreamExt};

/// Default limit for repository lookups and queue publishes.
pub const DEFAULT_FAN_OUT: usize = 5;

/// Run `f` over `items` with at most `limit` futures in flight.
///
/// Every item runs to completion; results come back in completion order.
/// A `limit` of zero is treated as one.
pub async fn for_each_bounded<T, R, F, Fut>(
    items: impl IntoIterator<Item = T>,
    limit: usize,
    f: F,
) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    stream::iter(items.into_iter().map(f))
        .buffer_unordered(limit.max(1))
        .collect()
        .await
}
