//! Lazy access to the archive runtime.
//!
//! The runtime is only built when a request needs a capability that was not
//! supplied up front. Concurrent first callers all await one shared
//! construction future, so the factory runs at most once per attempt. A
//! failed attempt is forgotten and the next caller starts a fresh one.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::archive::{ArchiveConstructor, ArchiveRuntime, NameResolver, RuntimeFactory};
use crate::error::{FetchError, Result};

type Construction =
    Shared<BoxFuture<'static, std::result::Result<Arc<dyn ArchiveRuntime>, String>>>;

enum State {
    Uninitialized,
    Pending(Construction),
    Ready(Arc<dyn ArchiveRuntime>),
}

pub struct RuntimeAccessor {
    resolver: Option<Arc<dyn NameResolver>>,
    constructor: Option<Arc<dyn ArchiveConstructor>>,
    factory: Arc<dyn RuntimeFactory>,
    /// Only held for state transitions, never across an await
    state: Mutex<State>,
}

impl RuntimeAccessor {
    pub fn new(
        resolver: Option<Arc<dyn NameResolver>>,
        constructor: Option<Arc<dyn ArchiveConstructor>>,
        factory: Arc<dyn RuntimeFactory>,
    ) -> Self {
        Self {
            resolver,
            constructor,
            factory,
            state: Mutex::new(State::Uninitialized),
        }
    }

    pub async fn resolver(&self) -> Result<Arc<dyn NameResolver>> {
        if let Some(resolver) = &self.resolver {
            return Ok(resolver.clone());
        }
        let runtime: Arc<dyn NameResolver> = self.runtime().await?;
        Ok(runtime)
    }

    pub async fn archive_constructor(&self) -> Result<Arc<dyn ArchiveConstructor>> {
        if let Some(constructor) = &self.constructor {
            return Ok(constructor.clone());
        }
        let runtime: Arc<dyn ArchiveConstructor> = self.runtime().await?;
        Ok(runtime)
    }

    /// Shut the runtime down if this accessor built one.
    pub async fn close(&self) -> Result<()> {
        let runtime = {
            let mut state = self.lock();
            match std::mem::replace(&mut *state, State::Uninitialized) {
                State::Ready(runtime) => runtime,
                other => {
                    *state = other;
                    return Ok(());
                }
            }
        };

        debug!("closing archive runtime");
        runtime.close().await.map_err(FetchError::Unexpected)
    }

    async fn runtime(&self) -> Result<Arc<dyn ArchiveRuntime>> {
        let construction = {
            let mut state = self.lock();
            match &*state {
                State::Ready(runtime) => return Ok(runtime.clone()),
                State::Pending(construction) => construction.clone(),
                State::Uninitialized => {
                    debug!("constructing archive runtime");
                    let factory = self.factory.clone();
                    let construction = async move {
                        factory.construct().await.map_err(|e| format!("{e:#}"))
                    }
                    .boxed()
                    .shared();
                    *state = State::Pending(construction.clone());
                    construction
                }
            }
        };

        let outcome = construction.clone().await;

        let mut state = self.lock();
        if let State::Pending(current) = &*state
            && current.ptr_eq(&construction)
        {
            *state = match &outcome {
                Ok(runtime) => State::Ready(runtime.clone()),
                Err(_) => State::Uninitialized,
            };
        }
        drop(state);

        outcome.map_err(FetchError::RuntimeConstruction)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::Archive;
    use anyhow::bail;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct StubRuntime {
        closed: AtomicBool,
    }

    #[async_trait]
    impl NameResolver for StubRuntime {
        async fn resolve_name(&self, name: &str) -> anyhow::Result<String> {
            Ok(format!("resolved-{name}"))
        }
    }

    impl ArchiveConstructor for StubRuntime {
        fn open_archive(&self, key: &str) -> anyhow::Result<Arc<dyn Archive>> {
            bail!("stub cannot open {key}")
        }
    }

    #[async_trait]
    impl ArchiveRuntime for StubRuntime {
        async fn close(&self) -> anyhow::Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Counts constructions; fails the first `failures` attempts.
    struct CountingFactory {
        constructed: AtomicUsize,
        failures: usize,
        runtime: Arc<StubRuntime>,
    }

    impl CountingFactory {
        fn new(failures: usize) -> Arc<Self> {
            Arc::new(Self {
                constructed: AtomicUsize::new(0),
                failures,
                runtime: Arc::new(StubRuntime::default()),
            })
        }

        fn count(&self) -> usize {
            self.constructed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RuntimeFactory for CountingFactory {
        async fn construct(&self) -> anyhow::Result<Arc<dyn ArchiveRuntime>> {
            let attempt = self.constructed.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if attempt < self.failures {
                bail!("runtime unavailable");
            }
            Ok(self.runtime.clone())
        }
    }

    #[tokio::test]
    async fn concurrent_first_calls_construct_once() {
        let factory = CountingFactory::new(0);
        let accessor = RuntimeAccessor::new(None, None, factory.clone());

        let calls = (0..8).map(|_| accessor.resolver());
        let resolvers = futures::future::join_all(calls).await;
        assert!(resolvers.iter().all(|r| r.is_ok()));

        accessor.archive_constructor().await.unwrap();
        assert_eq!(factory.count(), 1);
    }

    #[tokio::test]
    async fn failed_construction_reaches_all_waiters_and_is_retried() {
        let factory = CountingFactory::new(1);
        let accessor = RuntimeAccessor::new(None, None, factory.clone());

        let (first, second) = tokio::join!(accessor.resolver(), accessor.archive_constructor());
        assert!(matches!(first, Err(FetchError::RuntimeConstruction(_))));
        assert!(matches!(second, Err(FetchError::RuntimeConstruction(_))));
        assert_eq!(factory.count(), 1);

        let resolver = accessor.resolver().await.unwrap();
        assert_eq!(resolver.resolve_name("abc").await.unwrap(), "resolved-abc");
        assert_eq!(factory.count(), 2);
    }

    #[tokio::test]
    async fn supplied_capabilities_skip_construction() {
        let factory = CountingFactory::new(0);
        let supplied = Arc::new(StubRuntime::default());
        let resolver: Arc<dyn NameResolver> = supplied.clone();
        let constructor: Arc<dyn ArchiveConstructor> = supplied.clone();
        let accessor = RuntimeAccessor::new(Some(resolver), Some(constructor), factory.clone());

        accessor.resolver().await.unwrap();
        accessor.archive_constructor().await.unwrap();
        accessor.close().await.unwrap();

        assert_eq!(factory.count(), 0);
        assert!(!supplied.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn close_shuts_down_a_constructed_runtime() {
        let factory = CountingFactory::new(0);
        let accessor = RuntimeAccessor::new(None, None, factory.clone());

        accessor.close().await.unwrap();
        assert!(!factory.runtime.closed.load(Ordering::SeqCst));

        accessor.resolver().await.unwrap();
        accessor.close().await.unwrap();
        assert!(factory.runtime.closed.load(Ordering::SeqCst));
    }
}
