//! Pending values.
//!
//! An [`Output`] is a value that becomes known once the resource producing it
//! has been provisioned. It is a cloneable shared future plus the set of
//! resources it was derived from, so passing an output into another
//! resource's inputs records a real dependency edge in the graph.
//!
//! Consumers never read an unresolved value. They either attach a projection
//! with [`Output::apply`] or wait for it with [`Output::resolve`].

use std::collections::BTreeSet;
use std::fmt;

use futures::channel::oneshot;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use serde::Serialize;
use serde_json::Value;

use crate::error::OutputError;
use crate::urn::Urn;

type OutputFuture<T> = Shared<BoxFuture<'static, Result<T, OutputError>>>;

/// A value that may not be known yet.
pub struct Output<T>
where
    T: Clone + Send + Sync + 'static,
{
    future: OutputFuture<T>,
    dependencies: BTreeSet<Urn>,
}

impl<T> Clone for Output<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            future: self.future.clone(),
            dependencies: self.dependencies.clone(),
        }
    }
}

impl<T> fmt::Debug for Output<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output")
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

impl<T> Output<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// An output whose value is already known.
    pub fn known(value: T) -> Self {
        Self {
            future: future::ready(Ok(value)).boxed().shared(),
            dependencies: BTreeSet::new(),
        }
    }

    /// An output that has already failed.
    pub fn failed(error: OutputError) -> Self {
        Self {
            future: future::ready(Err(error)).boxed().shared(),
            dependencies: BTreeSet::new(),
        }
    }

    /// Create an unresolved output produced by `urn`.
    ///
    /// The returned resolver settles the value. Dropping the resolver without
    /// settling it resolves the output with [`OutputError::Abandoned`].
    pub fn pending(urn: Urn) -> (OutputResolver<T>, Self) {
        let (tx, rx) = oneshot::channel();
        let abandoned = urn.clone();
        let future = async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => Err(OutputError::Abandoned(abandoned)),
            }
        }
        .boxed()
        .shared();

        let mut dependencies = BTreeSet::new();
        dependencies.insert(urn);

        (OutputResolver { sender: tx }, Self { future, dependencies })
    }

    /// Resources this value is derived from.
    pub fn dependencies(&self) -> &BTreeSet<Urn> {
        &self.dependencies
    }

    /// Transform the value once it resolves.
    ///
    /// `f` runs at most once, when the value is first awaited after it
    /// becomes known. The new output keeps the dependencies of this one.
    pub fn apply<U, F>(&self, f: F) -> Output<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let source = self.future.clone();
        Output {
            future: async move { source.await.map(f) }.boxed().shared(),
            dependencies: self.dependencies.clone(),
        }
    }

    /// Like [`Output::apply`], for projections that can fail.
    pub fn try_apply<U, F>(&self, f: F) -> Output<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Result<U, OutputError> + Send + 'static,
    {
        let source = self.future.clone();
        Output {
            future: async move { source.await.and_then(f) }.boxed().shared(),
            dependencies: self.dependencies.clone(),
        }
    }

    /// Combine two outputs into one that resolves when both have.
    pub fn zip<U>(&self, other: &Output<U>) -> Output<(T, U)>
    where
        U: Clone + Send + Sync + 'static,
    {
        let left = self.future.clone();
        let right = other.future.clone();
        Output {
            future: async move { future::try_join(left, right).await }
                .boxed()
                .shared(),
            dependencies: self
                .dependencies
                .union(&other.dependencies)
                .cloned()
                .collect(),
        }
    }

    /// Combine many outputs into one that resolves when all have.
    pub fn all(outputs: Vec<Output<T>>) -> Output<Vec<T>> {
        let dependencies = outputs
            .iter()
            .flat_map(|o| o.dependencies.iter().cloned())
            .collect();
        let futures: Vec<_> = outputs.into_iter().map(|o| o.future).collect();
        Output {
            future: async move { future::try_join_all(futures).await }
                .boxed()
                .shared(),
            dependencies,
        }
    }

    /// Wait for the value.
    pub async fn resolve(&self) -> Result<T, OutputError> {
        self.future.clone().await
    }
}

impl<T> Output<T>
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    /// Erase the type into a JSON value, keeping the dependencies.
    pub fn to_value(&self) -> Output<Value> {
        self.try_apply(|value| {
            serde_json::to_value(value).map_err(|e| OutputError::Serialization(e.to_string()))
        })
    }
}

impl<T> From<T> for Output<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn from(value: T) -> Self {
        Self::known(value)
    }
}

impl From<&str> for Output<String> {
    fn from(value: &str) -> Self {
        Self::known(value.to_string())
    }
}

/// Settles a pending [`Output`].
pub struct OutputResolver<T> {
    sender: oneshot::Sender<Result<T, OutputError>>,
}

impl<T> OutputResolver<T> {
    /// Resolve the output with a value.
    pub fn resolve(self, value: T) {
        self.settle(Ok(value));
    }

    /// Resolve the output with an error.
    pub fn fail(self, error: OutputError) {
        self.settle(Err(error));
    }

    pub fn settle(self, result: Result<T, OutputError>) {
        // Nobody listening is fine: the output was dropped by every consumer.
        let _ = self.sender.send(result);
    }
}

impl<T> fmt::Debug for OutputResolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urn(name: &str) -> Urn {
        Urn::new("test", "proj", None, "pkg:index:Thing", name)
    }

    #[tokio::test]
    async fn test_known_output_resolves() {
        let output = Output::known(42);
        assert_eq!(output.resolve().await.unwrap(), 42);
        assert!(output.dependencies().is_empty());
    }

    #[tokio::test]
    async fn test_pending_output_resolves_after_resolver() {
        let (resolver, output) = Output::<String>::pending(urn("a"));
        let projected = output.apply(|v| v.len());

        assert!(output.dependencies().contains(&urn("a")));
        assert!(projected.dependencies().contains(&urn("a")));

        resolver.resolve("hello".to_string());
        assert_eq!(projected.resolve().await.unwrap(), 5);
        assert_eq!(output.resolve().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_apply_runs_once_for_shared_consumers() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let output = Output::known(1).apply(move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            v + 1
        });
        let copy = output.clone();

        assert_eq!(output.resolve().await.unwrap(), 2);
        assert_eq!(copy.resolve().await.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dropped_resolver_abandons_output() {
        let (resolver, output) = Output::<u32>::pending(urn("gone"));
        drop(resolver);

        let err = output.resolve().await.unwrap_err();
        assert_eq!(err, OutputError::Abandoned(urn("gone")));
    }

    #[tokio::test]
    async fn test_failure_propagates_through_apply() {
        let (resolver, output) = Output::<u32>::pending(urn("bad"));
        let projected = output.apply(|v| v * 2);
        resolver.fail(OutputError::Failed {
            urn: urn("bad"),
            message: "quota exceeded".to_string(),
        });

        let err = projected.resolve().await.unwrap_err();
        assert_eq!(err.origin(), Some(&urn("bad")));
    }

    #[tokio::test]
    async fn test_zip_unions_dependencies() {
        let (ra, a) = Output::<u32>::pending(urn("a"));
        let (rb, b) = Output::<String>::pending(urn("b"));
        let both = a.zip(&b);

        assert_eq!(both.dependencies().len(), 2);

        rb.resolve("x".to_string());
        ra.resolve(7);
        assert_eq!(both.resolve().await.unwrap(), (7, "x".to_string()));
    }

    #[tokio::test]
    async fn test_all_collects_in_order() {
        let outputs = vec![Output::known(1), Output::known(2), Output::known(3)];
        assert_eq!(Output::all(outputs).resolve().await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_to_value() {
        let output: Output<String> = "mycontainer".into();
        assert_eq!(
            output.to_value().resolve().await.unwrap(),
            Value::String("mycontainer".to_string())
        );
    }
}
