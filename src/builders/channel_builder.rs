//! Builder for [`Channel`].

use std::fmt;
use std::sync::Arc;

use crate::config::ChannelConfig;
use crate::core::{Channel, ChannelError, ChannelEvent, ChannelObserver};
use crate::runtime::{Deferral, Spawn, TokioSpawner};

/// Configures and builds a [`Channel`].
///
/// ```rust,ignore
/// let log = Arc::new(EventLog::new(256));
/// let channel = Channel::builder()
///     .name("inference")
///     .concurrency_limit(2)
///     .observer(log.clone())
///     .build()?;
/// ```
pub struct ChannelBuilder {
    name: String,
    concurrency_limit: usize,
    deferral: Deferral,
    observer: Option<Arc<dyn ChannelObserver>>,
    spawner: Option<Arc<dyn Spawn>>,
}

impl ChannelBuilder {
    /// Builder with the defaults: name `default`, limit 1, next-tick deferral,
    /// ambient Tokio spawner, no observer.
    pub fn new() -> Self {
        Self {
            name: "default".into(),
            concurrency_limit: 1,
            deferral: Deferral::NextTick,
            observer: None,
            spawner: None,
        }
    }

    /// Builder seeded from validated configuration.
    ///
    /// # Errors
    ///
    /// Validation errors from [`ChannelConfig::validate`].
    pub fn from_config(cfg: &ChannelConfig) -> Result<Self, ChannelError> {
        cfg.validate()?;
        Ok(Self::new()
            .name(cfg.name.clone())
            .concurrency_limit(cfg.concurrency_limit)
            .deferral(Deferral::from(&cfg.deferral)))
    }

    /// Channel name used in logs and event records.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Maximum simultaneously in-flight tasks.
    #[must_use]
    pub const fn concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    /// Strategy for scheduling the next dispatch round after a settle.
    #[must_use]
    pub fn deferral(mut self, deferral: Deferral) -> Self {
        self.deferral = deferral;
        self
    }

    /// Channel-wide observer.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn ChannelObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Closure as the channel-wide observer.
    #[must_use]
    pub fn on_event<F>(self, f: F) -> Self
    where
        F: Fn(&Channel, &ChannelEvent<'_>) + Send + Sync + 'static,
    {
        self.observer(Arc::new(f))
    }

    /// Spawner used for the work driver and deferred dispatch rounds.
    #[must_use]
    pub fn spawner(mut self, spawner: Arc<dyn Spawn>) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Configured name.
    pub fn configured_name(&self) -> &str {
        &self.name
    }

    /// Configured concurrency limit.
    pub const fn configured_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// [`ChannelError::InvalidConfig`] for a zero limit or an empty name.
    pub fn build(self) -> Result<Channel, ChannelError> {
        if self.concurrency_limit == 0 {
            return Err(ChannelError::InvalidConfig(
                "concurrency_limit must be greater than 0".into(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(ChannelError::InvalidConfig("name must not be empty".into()));
        }
        Ok(self.build_unchecked())
    }

    pub(crate) fn build_unchecked(self) -> Channel {
        let spawner = self
            .spawner
            .unwrap_or_else(|| Arc::new(TokioSpawner::ambient()));
        Channel::from_parts(
            self.name,
            self.concurrency_limit,
            self.observer,
            spawner,
            self.deferral,
        )
    }
}

impl Default for ChannelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChannelBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelBuilder")
            .field("name", &self.name)
            .field("concurrency_limit", &self.concurrency_limit)
            .field("deferral", &self.deferral)
            .field("observer", &self.observer.is_some())
            .field("spawner", &self.spawner.is_some())
            .finish()
    }
}
