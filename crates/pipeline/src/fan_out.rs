//! Fan-out / fan-in over independent fallible futures.

use std::future::Future;

use futures::future::try_join_all;

/// Run every future concurrently and succeed only if all succeed.
///
/// Outputs keep input order. The first failure to resolve wins and the
/// remaining futures are dropped.
pub async fn all_or_first_error<I, F, T, E>(futures: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    try_join_all(futures).await
}
