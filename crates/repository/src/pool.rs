//! Pooling of expensive repository sessions.
//!
//! Released sessions are parked in an unbounded idle set. `rent` takes the
//! most recently released one, discards it if it has been idle too long or
//! fails its health check, and keeps going until it finds a usable session
//! or the set is empty, at which point a fresh session is created. The idle
//! set mutex only guards the take and the push; health checks, creation and
//! disposal all run outside it.

use crate::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Default time a session may sit idle before it is discarded.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Creates and disposes pooled sessions.
#[async_trait]
pub trait SessionFactory<S: Send + 'static>: Send + Sync {
    /// Open a new session. Errors are reported to the renter as `SessionUnavailable`.
    async fn create(&self) -> RepositoryResult<S>;

    /// Tear down a session the pool no longer wants.
    async fn dispose(&self, session: S) {
        drop(session);
    }
}

/// Decides whether an idle session may be handed out again.
#[async_trait]
pub trait HealthCheck<S>: Send + Sync {
    async fn is_healthy(&self, session: &S) -> bool;
}

/// Cumulative pool counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub created: u64,
    pub rented: u64,
    pub evicted: u64,
}

struct IdleSession<S> {
    session: S,
    released_at: Instant,
}

struct PoolInner<S: Send + 'static> {
    idle: Mutex<Vec<IdleSession<S>>>,
    factory: Arc<dyn SessionFactory<S>>,
    health: Arc<dyn HealthCheck<S>>,
    idle_timeout: Duration,
    created: AtomicU64,
    rented: AtomicU64,
    evicted: AtomicU64,
}

impl<S: Send + 'static> PoolInner<S> {
    fn idle(&self) -> MutexGuard<'_, Vec<IdleSession<S>>> {
        // Only pushes and pops happen under the lock, so a poisoned set is still consistent.
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push_idle(&self, session: S) {
        self.idle().push(IdleSession {
            session,
            released_at: Instant::now(),
        });
    }
}

/// A pool of repository sessions that hands out healthy sessions and
/// discards stale or broken ones.
///
/// Clones share the same idle set.
pub struct SessionPool<S: Send + 'static> {
    inner: Arc<PoolInner<S>>,
}

impl<S: Send + 'static> Clone for SessionPool<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Send + 'static> SessionPool<S> {
    /// Create an empty pool with the default one hour idle timeout.
    pub fn new(factory: Arc<dyn SessionFactory<S>>, health: Arc<dyn HealthCheck<S>>) -> Self {
        Self::with_idle_timeout(factory, health, DEFAULT_IDLE_TIMEOUT)
    }

    /// Create an empty pool whose idle sessions expire after `idle_timeout`.
    pub fn with_idle_timeout(
        factory: Arc<dyn SessionFactory<S>>,
        health: Arc<dyn HealthCheck<S>>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(Vec::new()),
                factory,
                health,
                idle_timeout,
                created: AtomicU64::new(0),
                rented: AtomicU64::new(0),
                evicted: AtomicU64::new(0),
            }),
        }
    }

    /// Rent a healthy session, creating one if no idle session qualifies.
    ///
    /// The session returns to the pool when the guard is dropped.
    pub async fn rent(&self) -> RepositoryResult<RentedSession<S>> {
        let session = self.take_or_create().await?;
        self.inner.rented.fetch_add(1, Ordering::Relaxed);
        tracing::info!("repository session rented");
        Ok(RentedSession {
            session: Some(session),
            pool: self.inner.clone(),
        })
    }

    /// Park a session in the idle set.
    ///
    /// Health is not checked here; the next renter does that.
    pub fn release(&self, session: S) {
        self.inner.push_idle(session);
        tracing::info!("repository session released");
    }

    /// Number of idle sessions.
    pub fn available(&self) -> usize {
        self.inner.idle().len()
    }

    /// Idle timeout after which parked sessions are discarded.
    pub fn idle_timeout(&self) -> Duration {
        self.inner.idle_timeout
    }

    /// Counters since the pool was created.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.inner.created.load(Ordering::Relaxed),
            rented: self.inner.rented.load(Ordering::Relaxed),
            evicted: self.inner.evicted.load(Ordering::Relaxed),
        }
    }

    async fn take_or_create(&self) -> RepositoryResult<S> {
        loop {
            // The guard is a temporary of this statement, so it is released before any await.
            let candidate = self.inner.idle().pop();
            let Some(IdleSession {
                session,
                released_at,
            }) = candidate
            else {
                break;
            };

            if released_at.elapsed() > self.inner.idle_timeout {
                self.evict(session, "stale").await;
                continue;
            }
            if self.inner.health.is_healthy(&session).await {
                return Ok(session);
            }
            self.evict(session, "unhealthy").await;
        }

        let session = self.inner.factory.create().await.map_err(|e| match e {
            RepositoryError::SessionUnavailable(_) => e,
            other => RepositoryError::SessionUnavailable(other.to_string()),
        })?;
        self.inner.created.fetch_add(1, Ordering::Relaxed);
        tracing::info!("repository session created");
        Ok(session)
    }

    async fn evict(&self, session: S, reason: &'static str) {
        self.inner.evicted.fetch_add(1, Ordering::Relaxed);
        tracing::info!(reason, "repository session evicted");
        self.inner.factory.dispose(session).await;
    }
}

/// A session on loan from a [`SessionPool`]. Returned to the pool on drop.
pub struct RentedSession<S: Send + 'static> {
    session: Option<S>,
    pool: Arc<PoolInner<S>>,
}

impl<S: Send + 'static> Deref for RentedSession<S> {
    type Target = S;

    fn deref(&self) -> &S {
        match &self.session {
            Some(session) => session,
            None => unreachable!("rented session accessed after release"),
        }
    }
}

impl<S: Send + 'static> DerefMut for RentedSession<S> {
    fn deref_mut(&mut self) -> &mut S {
        match &mut self.session {
            Some(session) => session,
            None => unreachable!("rented session accessed after release"),
        }
    }
}

impl<S: Send + 'static> Drop for RentedSession<S> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.pool.push_idle(session);
            tracing::info!("repository session released");
        }
    }
}
