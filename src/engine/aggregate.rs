use std::sync::Arc;

use futures::FutureExt;
use futures::future::try_join_all;

use crate::core::Outputs;
use crate::engine::runner::Handle;
use crate::error::TaskFailure;

/// Waits for every handle and combines the outputs into one keyed map.
///
/// Resolves to the first failure observed. Handles that are still pending at
/// that point are dropped here; their tasks keep running on the runtime.
pub(crate) async fn collect<T>(handles: Vec<(Arc<str>, Handle<T>)>) -> Result<Outputs<T>, TaskFailure>
where
    T: Clone + Send + Sync + 'static,
{
    let values = try_join_all(
        handles
            .into_iter()
            .map(|(name, handle)| handle.map(move |value| value.map(|value| (name.to_string(), value)))),
    )
    .await?;

    Ok(values.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use futures::future::{BoxFuture, ready};

    use super::*;

    fn settled(value: Result<i32, TaskFailure>) -> Handle<i32> {
        let future: BoxFuture<'static, Result<i32, TaskFailure>> = ready(value).boxed();
        future.shared()
    }

    #[tokio::test]
    async fn test_collect_keys_every_output() {
        let outputs = collect(vec![
            (Arc::from("w1"), settled(Ok(1))),
            (Arc::from("w2"), settled(Ok(2))),
        ])
        .await
        .unwrap();

        assert_eq!(outputs, Outputs::from([("w1".to_string(), 1), ("w2".to_string(), 2)]));
    }

    #[tokio::test]
    async fn test_collect_empty() {
        let outputs = collect::<i32>(vec![]).await.unwrap();
        assert!(outputs.is_empty());
    }

    #[tokio::test]
    async fn test_collect_returns_failure() {
        let failure = TaskFailure::new("w2", anyhow::anyhow!("nope"));
        let err = collect(vec![
            (Arc::from("w1"), settled(Ok(1))),
            (Arc::from("w2"), settled(Err(failure))),
        ])
        .await
        .unwrap_err();

        assert_eq!(err.task(), "w2");
        assert_eq!(err.error().to_string(), "nope");
    }
}
