//! Typed runtime configuration loaded from JSON.
//!
//! Every field has a default, so an empty object (`{}`) is a complete
//! configuration. A representative file is:
//!
//! ```json
//! {
//!   "iterator": { "pause_ms": 250, "batch_size": 20 },
//!   "retry": { "max_attempts": 5, "attempt_delay_secs": 30 },
//!   "queue": { "receive_timeout_ms": 2000 },
//!   "backend": { "postpone_on_cli": true },
//!   "store": { "database_url": "postgres://localhost/postmaster" },
//!   "types": { "include": ["mailer"], "exclude": [] }
//! }
//! ```

use crate::backend::{
    ImmediateBackend, InvocationContext, PostponedBackend, QueueBackend, StoreBackend,
};
use crate::dispatch::HandlerRegistry;
use crate::iterator::StoreIteratorSettings;
use crate::message::domain::{RetryPolicy, TypeFilter};
use crate::message::ports::MessageStore;
use crate::queue::QueueHandle;
use camino::Utf8Path;
use mockable::Clock;
use serde::Deserialize;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Path that was read.
        path: String,
        /// The I/O failure.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The file is not valid configuration JSON.
    #[error("failed to parse config: {0}")]
    Parse(#[source] Arc<serde_json::Error>),

    /// A value is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Store iterator polling settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IteratorConfig {
    /// Pause between empty polls, in milliseconds.
    pub pause_ms: u64,
    /// Messages fetched per poll.
    pub batch_size: usize,
}

impl Default for IteratorConfig {
    fn default() -> Self {
        Self {
            pause_ms: 500,
            batch_size: 10,
        }
    }
}

/// Retry settings for failed messages.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Attempt cap. Retries are disabled when absent.
    pub max_attempts: Option<u32>,
    /// Cooldown between attempts, in seconds.
    pub attempt_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: None,
            attempt_delay_secs: RetryPolicy::DEFAULT_ATTEMPT_DELAY.as_secs(),
        }
    }
}

/// Broker settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    /// How long one receive waits for a delivery, in milliseconds.
    pub receive_timeout_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            receive_timeout_ms: 1000,
        }
    }
}

/// Backend selection flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Buffer published messages even in command-line processes.
    pub postpone_on_cli: bool,
}

/// Persistence settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// `PostgreSQL` connection URL. The in-memory store is used when unset.
    pub database_url: Option<String>,
}

/// Type filter applied by the store iterator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TypesConfig {
    /// Only these types are fetched, when non-empty.
    pub include: Vec<String>,
    /// These types are never fetched.
    pub exclude: Vec<String>,
}

/// Retention of finished messages.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CleanupConfig {
    /// Age after which `Done` messages are purged, in seconds.
    pub max_age_secs: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            max_age_secs: 7 * 24 * 60 * 60,
        }
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostmasterConfig {
    /// Store iterator polling.
    pub iterator: IteratorConfig,
    /// Failed message retries.
    pub retry: RetryConfig,
    /// Broker receive behaviour.
    pub queue: QueueConfig,
    /// Backend flags.
    pub backend: BackendConfig,
    /// Persistence.
    pub store: StoreConfig,
    /// Type filter.
    pub types: TypesConfig,
    /// Retention.
    pub cleanup: CleanupConfig,
}

impl PostmasterConfig {
    /// Reads and validates configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_string(),
            source: Arc::new(err),
        })?;
        Self::from_json(&raw)
    }

    /// Parses and validates configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the document cannot be parsed or
    /// validated.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(Arc::new(err)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero batch size or a zero
    /// attempt cap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterator.batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "iterator.batch_size",
                reason: "must be greater than zero".to_owned(),
            });
        }
        if self.retry.max_attempts == Some(0) {
            return Err(ConfigError::Invalid {
                field: "retry.max_attempts",
                reason: "must be greater than zero when set".to_owned(),
            });
        }
        Ok(())
    }

    /// Overrides the database URL.
    #[must_use]
    pub fn with_database_url(mut self, database_url: impl Into<String>) -> Self {
        self.store.database_url = Some(database_url.into());
        self
    }

    /// Overrides the retry attempt cap.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry.max_attempts = Some(max_attempts);
        self
    }

    /// Overrides the store iterator batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.iterator.batch_size = batch_size;
        self
    }

    /// Overrides the pause between empty polls.
    #[must_use]
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.iterator.pause_ms = u64::try_from(pause.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Overrides the postpone-on-CLI flag.
    #[must_use]
    pub const fn with_postpone_on_cli(mut self, postpone_on_cli: bool) -> Self {
        self.backend.postpone_on_cli = postpone_on_cli;
        self
    }

    /// Returns the configured type filter.
    #[must_use]
    pub fn type_filter(&self) -> TypeFilter {
        TypeFilter::all()
            .with_include(self.types.include.iter().cloned())
            .with_exclude(self.types.exclude.iter().cloned())
    }

    /// Returns the retry policy, or `None` when retries are disabled.
    #[must_use]
    pub fn retry_policy(&self) -> Option<RetryPolicy> {
        self.retry.max_attempts.map(|max_attempts| {
            RetryPolicy::new(
                Some(max_attempts),
                Duration::from_secs(self.retry.attempt_delay_secs),
            )
        })
    }

    /// Builds store iterator settings from this configuration.
    #[must_use]
    pub fn iterator_settings(&self) -> StoreIteratorSettings {
        let settings = StoreIteratorSettings::new()
            .with_filter(self.type_filter())
            .with_pause(Duration::from_millis(self.iterator.pause_ms))
            .with_batch_size(self.iterator.batch_size);
        match self.retry_policy() {
            Some(retry) => settings.with_retry(retry),
            None => settings,
        }
    }

    /// Returns the broker receive timeout.
    #[must_use]
    pub const fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.queue.receive_timeout_ms)
    }

    /// Returns the retention age for finished messages.
    #[must_use]
    pub const fn cleanup_max_age(&self) -> Duration {
        Duration::from_secs(self.cleanup.max_age_secs)
    }

    /// Builds a store backend polling every admitted type.
    #[must_use]
    pub fn store_backend<S, C>(&self, store: Arc<S>, clock: Arc<C>) -> StoreBackend<S, C>
    where
        S: MessageStore,
        C: Clock + Send + Sync,
    {
        StoreBackend::new(store, clock, self.iterator_settings())
            .with_max_age(self.cleanup_max_age())
    }

    /// Builds a store backend polling only `message_type`.
    #[must_use]
    pub fn store_backend_for_type<S, C>(
        &self,
        store: Arc<S>,
        clock: Arc<C>,
        message_type: &str,
    ) -> StoreBackend<S, C>
    where
        S: MessageStore,
        C: Clock + Send + Sync,
    {
        let settings = self
            .iterator_settings()
            .with_filter(TypeFilter::all().with_include([message_type]));
        StoreBackend::new(store, clock, settings).with_max_age(self.cleanup_max_age())
    }

    /// Builds a broker backend with the configured receive timeout and
    /// attempt cap.
    #[must_use]
    pub fn queue_backend<C>(
        &self,
        name: impl Into<String>,
        queue: Arc<dyn QueueHandle>,
        clock: Arc<C>,
    ) -> QueueBackend<C>
    where
        C: Clock + Send + Sync + 'static,
    {
        let backend =
            QueueBackend::new(name, queue, clock).with_receive_timeout(self.receive_timeout());
        match self.retry.max_attempts {
            Some(max_attempts) => backend.with_max_attempts(max_attempts),
            None => backend,
        }
    }

    /// Builds a postponed backend honouring `backend.postpone_on_cli`.
    #[must_use]
    pub fn postponed_backend<C>(
        &self,
        registry: Arc<HandlerRegistry>,
        clock: Arc<C>,
        context: InvocationContext,
    ) -> PostponedBackend<C>
    where
        C: Clock + Send + Sync + 'static,
    {
        PostponedBackend::new(
            ImmediateBackend::new(registry, clock),
            self.backend.postpone_on_cli,
            context,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, PostmasterConfig};
    use crate::backend::{Backend, InvocationContext};
    use crate::dispatch::HandlerRegistry;
    use crate::dispatch::testing::FailingConsumer;
    use crate::message::adapters::memory::InMemoryMessageStore;
    use crate::message::domain::{
        Message, MessageBody, MessageId, MessageState, PersistedMessageData,
    };
    use crate::message::ports::MessageStore;
    use crate::queue::{InMemoryQueue, QueueHandle};
    use camino::Utf8Path;
    use chrono::{TimeDelta, Utc};
    use mockable::DefaultClock;
    use rstest::rstest;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    #[rstest]
    fn empty_document_yields_defaults() {
        let config = PostmasterConfig::from_json("{}").expect("defaults parse");

        assert_eq!(config, PostmasterConfig::default());
        let settings = config.iterator_settings();
        assert_eq!(settings.pause(), Duration::from_millis(500));
        assert_eq!(settings.batch_size(), 10);
        assert!(settings.retry().is_none());
        assert_eq!(config.receive_timeout(), Duration::from_secs(1));
        assert_eq!(config.cleanup_max_age(), Duration::from_secs(604_800));
        assert!(config.store.database_url.is_none());
    }

    #[rstest]
    fn nested_values_override_defaults() {
        let config = PostmasterConfig::from_json(
            r#"{
                "iterator": { "pause_ms": 50, "batch_size": 3 },
                "retry": { "max_attempts": 4, "attempt_delay_secs": 2 },
                "types": { "include": ["mailer"], "exclude": ["sms"] }
            }"#,
        )
        .expect("config parses");

        let settings = config.iterator_settings();
        assert_eq!(settings.pause(), Duration::from_millis(50));
        assert_eq!(settings.batch_size(), 3);
        let retry = settings.retry().expect("retry configured");
        assert_eq!(retry.max_attempts(), Some(4));
        assert_eq!(retry.attempt_delay(), Duration::from_secs(2));
        assert!(settings.filter().matches("mailer"));
        assert!(!settings.filter().matches("sms"));
    }

    #[rstest]
    #[case(r#"{ "iterator": { "batch_size": 0 } }"#, "iterator.batch_size")]
    #[case(r#"{ "retry": { "max_attempts": 0 } }"#, "retry.max_attempts")]
    fn out_of_range_values_are_rejected(#[case] raw: &str, #[case] expected_field: &str) {
        let result = PostmasterConfig::from_json(raw);

        assert!(matches!(
            result,
            Err(ConfigError::Invalid { field, .. }) if field == expected_field
        ));
    }

    #[rstest]
    #[case("not json")]
    #[case(r#"{ "iterator": { "batch": 3 } }"#)]
    fn malformed_documents_fail_to_parse(#[case] raw: &str) {
        assert!(matches!(
            PostmasterConfig::from_json(raw),
            Err(ConfigError::Parse(_))
        ));
    }

    #[rstest]
    fn missing_file_reports_path() {
        let result = PostmasterConfig::load(Utf8Path::new("/nonexistent/postmaster.json"));

        let Err(err) = result else {
            panic!("expected a read error");
        };
        assert!(err.to_string().contains("/nonexistent/postmaster.json"));
    }

    #[rstest]
    fn builders_override_loaded_values() {
        let config = PostmasterConfig::default()
            .with_database_url("postgres://localhost/postmaster")
            .with_max_attempts(2)
            .with_batch_size(7)
            .with_pause(Duration::from_millis(20))
            .with_postpone_on_cli(true);

        assert_eq!(
            config.store.database_url.as_deref(),
            Some("postgres://localhost/postmaster")
        );
        assert_eq!(config.retry_policy().and_then(|retry| retry.max_attempts()), Some(2));
        assert_eq!(config.iterator.batch_size, 7);
        assert_eq!(config.iterator.pause_ms, 20);
        assert!(config.backend.postpone_on_cli);
    }

    #[rstest]
    #[case(false, InvocationContext::CommandLine, false)]
    #[case(true, InvocationContext::CommandLine, true)]
    #[case(false, InvocationContext::Request, true)]
    fn postponed_backend_follows_postpone_on_cli(
        #[case] postpone_on_cli: bool,
        #[case] context: InvocationContext,
        #[case] expected: bool,
    ) {
        let config = PostmasterConfig::from_json(&format!(
            r#"{{ "backend": {{ "postpone_on_cli": {postpone_on_cli} }} }}"#
        ))
        .expect("config parses");

        let backend = config.postponed_backend(
            Arc::new(HandlerRegistry::default()),
            Arc::new(DefaultClock),
            context,
        );

        assert_eq!(backend.postpones(), expected);
    }

    #[rstest]
    #[tokio::test]
    async fn queue_backend_uses_receive_timeout_and_attempt_cap() {
        let config = PostmasterConfig::from_json(
            r#"{ "queue": { "receive_timeout_ms": 30 }, "retry": { "max_attempts": 2 } }"#,
        )
        .expect("config parses");
        let queue = InMemoryQueue::new();
        let handle: Arc<dyn QueueHandle> = Arc::new(queue.clone());
        let backend = config.queue_backend("mail", handle, Arc::new(DefaultClock));
        let mut iterator = backend.iterator().expect("iterator");

        let started = Instant::now();
        assert!(iterator.next_message().await.expect("receive").is_none());
        assert!(started.elapsed() >= Duration::from_millis(30));

        let registry = HandlerRegistry::builder()
            .register("broken", FailingConsumer::new("smtp down"), 0)
            .build()
            .expect("valid registry");
        backend
            .create_and_publish("broken", MessageBody::new())
            .await
            .expect("publish");
        let mut message = iterator
            .next_message()
            .await
            .expect("receive")
            .expect("delivery");
        assert!(backend.handle(&mut message, &registry).await.is_err());
        assert_eq!(queue.ready_len().expect("ready"), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn store_backend_cleanup_uses_configured_max_age() {
        let config = PostmasterConfig::from_json(r#"{ "cleanup": { "max_age_secs": 60 } }"#)
            .expect("config parses");
        let store = Arc::new(InMemoryMessageStore::new());
        let backend = config.store_backend(Arc::clone(&store), Arc::new(DefaultClock));
        let finished_at = Utc::now() - TimeDelta::minutes(5);
        let finished = Message::from_persisted(PersistedMessageData {
            id: MessageId::new(),
            message_type: "mailer".to_owned(),
            body: MessageBody::new(),
            state: MessageState::Done,
            restart_count: 0,
            created_at: finished_at,
            updated_at: finished_at,
            started_at: Some(finished_at),
            completed_at: Some(finished_at),
        });
        store.save(&finished).await.expect("save");

        backend.cleanup().await.expect("cleanup");

        assert!(store.find_by_id(finished.id()).await.expect("lookup").is_none());
    }
}
