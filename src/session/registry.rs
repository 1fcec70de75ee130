use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::env::EnvError;
use crate::error::{Error, Result};
use crate::session::SessionId;

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Sessions untouched for longer than this are eligible for eviction.
    /// `None` keeps every session for the life of the registry.
    pub idle_timeout: Option<Duration>,
    /// How often the background sweeper checks for idle sessions.
    pub sweep_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            idle_timeout: None,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

struct Slot<E> {
    env: tokio::sync::Mutex<E>,
    last_used: Mutex<Instant>,
}

impl<E> Slot<E> {
    fn new(env: E) -> Self {
        Self {
            env: tokio::sync::Mutex::new(env),
            last_used: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_used.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_for(&self, now: Instant) -> Duration {
        let last_used = *self.last_used.lock().unwrap_or_else(PoisonError::into_inner);
        now.saturating_duration_since(last_used)
    }
}

/// A resolved session. Holding one keeps the session from being evicted.
pub struct SessionHandle<E> {
    id: SessionId,
    slot: Arc<Slot<E>>,
}

impl<E> SessionHandle<E> {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Exclusive access to the session's environment.
    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, E> {
        let guard = self.slot.env.lock().await;
        self.slot.touch();
        guard
    }

    /// True when both handles point at the same live instance.
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl<E> Clone for SessionHandle<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<E> fmt::Debug for SessionHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("env_type", &std::any::type_name::<E>())
            .finish()
    }
}

/// Maps session ids to live environment instances.
///
/// The registry is an explicit context object: the exporter receives it as
/// an `Arc`, and several registries (one per exported environment type, or
/// per configuration) can coexist in one process.
///
/// Each session's instance sits behind its own async mutex, so work on one
/// session never waits on another. Calls on the same session are serialized.
pub struct SessionRegistry<E> {
    sessions: RwLock<HashMap<SessionId, Arc<Slot<E>>>>,
    config: RegistryConfig,
}

impl<E> SessionRegistry<E>
where
    E: Send + 'static,
{
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Builds an instance with `factory` and registers it under a fresh id.
    ///
    /// Nothing is registered if `factory` fails.
    pub fn create<F>(&self, factory: F) -> Result<SessionId>
    where
        F: FnOnce() -> Result<E, EnvError>,
    {
        let env = factory().map_err(Error::Construction)?;
        let slot = Arc::new(Slot::new(env));

        let mut sessions = self.write();
        let id = loop {
            let id = SessionId::new();
            if let Entry::Vacant(entry) = sessions.entry(id) {
                entry.insert(slot);
                break id;
            }
        };
        let live = sessions.len();
        drop(sessions);

        info!(session_id = %id, live, "created session");
        Ok(id)
    }

    pub fn resolve(&self, id: &SessionId) -> Result<SessionHandle<E>> {
        let slot = self.read().get(id).cloned();
        match slot {
            Some(slot) => {
                slot.touch();
                Ok(SessionHandle { id: *id, slot })
            }
            None => {
                warn!(session_id = %id, "unknown session");
                Err(Error::InvalidSession(id.to_string()))
            }
        }
    }

    /// Parses and resolves an id received from a caller.
    pub fn resolve_str(&self, raw: &str) -> Result<SessionHandle<E>> {
        let id = raw.parse::<SessionId>().inspect_err(|_| {
            warn!(session_id = raw, "malformed session id");
        })?;
        self.resolve(&id)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.read().keys().copied().collect()
    }

    /// Drops sessions idle for longer than the configured timeout.
    ///
    /// Sessions with an outstanding [`SessionHandle`] are in use and kept.
    /// Returns the number of sessions removed; always 0 without a timeout.
    pub fn evict_idle(&self) -> usize {
        let Some(timeout) = self.config.idle_timeout else {
            return 0;
        };
        let now = Instant::now();

        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|id, slot| {
            let keep = Arc::strong_count(slot) > 1 || slot.idle_for(now) < timeout;
            if !keep {
                debug!(session_id = %id, "evicting idle session");
            }
            keep
        });
        let evicted = before - sessions.len();
        drop(sessions);

        if evicted > 0 {
            info!(evicted, "evicted idle sessions");
        }
        evicted
    }

    /// Runs [`evict_idle`](Self::evict_idle) every `sweep_interval` until the
    /// registry is dropped. Returns `None` when no idle timeout is set.
    pub fn spawn_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        self.config.idle_timeout?;
        let period = self.config.sweep_interval;
        let registry: Weak<Self> = Arc::downgrade(self);

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    debug!("session registry dropped; sweeper exiting");
                    break;
                };
                registry.evict_idle();
            }
        }))
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SessionId, Arc<Slot<E>>>> {
        // Map updates are single inserts/removes, so a poisoned map is still consistent.
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, Arc<Slot<E>>>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E> Default for SessionRegistry<E>
where
    E: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for SessionRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let live = self
            .sessions
            .read()
            .map(|s| s.len())
            .unwrap_or_else(|p| p.into_inner().len());
        f.debug_struct("SessionRegistry")
            .field("env_type", &std::any::type_name::<E>())
            .field("live", &live)
            .field("config", &self.config)
            .finish()
    }
}
