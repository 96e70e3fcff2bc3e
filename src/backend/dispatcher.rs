//! Backend routing messages to named sub-backends by type.

use super::{Backend, BackendError, BackendHealth, BackendResult, HealthStatus};
use crate::dispatch::{ConsumerReturnInfo, HandlerRegistry};
use crate::iterator::MessageIterator;
use crate::message::domain::{Message, MessageBody};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Routes each operation to the backend registered for the message type.
///
/// Types without a dedicated backend go to the default backend when one is
/// configured. Explicit lookups through [`Self::backend_for`] never fall
/// back.
#[derive(Clone, Default)]
pub struct QueueDispatcherBackend {
    routes: BTreeMap<String, Arc<dyn Backend>>,
    default: Option<Arc<dyn Backend>>,
}

impl QueueDispatcherBackend {
    /// Creates a dispatcher without routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes `message_type` to `backend`.
    #[must_use]
    pub fn with_route(mut self, message_type: impl Into<String>, backend: Arc<dyn Backend>) -> Self {
        self.routes.insert(message_type.into(), backend);
        self
    }

    /// Sets the backend used for unrouted types and for iteration.
    #[must_use]
    pub fn with_default(mut self, backend: Arc<dyn Backend>) -> Self {
        self.default = Some(backend);
        self
    }

    /// Returns the types that have a dedicated backend.
    #[must_use]
    pub fn types(&self) -> Vec<String> {
        self.routes.keys().cloned().collect()
    }

    /// Resolves a backend for an explicit request.
    ///
    /// `None` selects the default backend.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::UnknownBackend`] when `message_type` has no
    /// dedicated backend and [`BackendError::NoDefaultBackend`] when `None`
    /// is requested without a default.
    pub fn backend_for(&self, message_type: Option<&str>) -> BackendResult<Arc<dyn Backend>> {
        match message_type {
            Some(requested) => self.routes.get(requested).cloned().ok_or_else(|| {
                BackendError::UnknownBackend {
                    message_type: requested.to_owned(),
                    available: self.types(),
                }
            }),
            None => self.default_backend().cloned(),
        }
    }

    fn route(&self, message_type: &str) -> BackendResult<&Arc<dyn Backend>> {
        if let Some(backend) = self.routes.get(message_type) {
            return Ok(backend);
        }
        self.default
            .as_ref()
            .ok_or_else(|| BackendError::UnknownBackend {
                message_type: message_type.to_owned(),
                available: self.types(),
            })
    }

    fn default_backend(&self) -> BackendResult<&Arc<dyn Backend>> {
        self.default
            .as_ref()
            .ok_or_else(|| BackendError::NoDefaultBackend {
                available: self.types(),
            })
    }

    fn distinct_backends(&self) -> Vec<&Arc<dyn Backend>> {
        let mut distinct: Vec<&Arc<dyn Backend>> = Vec::new();
        for backend in self.routes.values().chain(self.default.as_ref()) {
            if !distinct.iter().any(|seen| Arc::ptr_eq(seen, backend)) {
                distinct.push(backend);
            }
        }
        distinct
    }
}

#[async_trait]
impl Backend for QueueDispatcherBackend {
    fn name(&self) -> &str {
        "queue-dispatcher"
    }

    async fn initialize(&self) -> BackendResult<()> {
        for backend in self.distinct_backends() {
            debug!(backend = backend.name(), "initializing sub-backend");
            backend.initialize().await?;
        }
        Ok(())
    }

    async fn publish(&self, message: &mut Message) -> BackendResult<()> {
        self.route(message.message_type())?.publish(message).await
    }

    async fn create_and_publish(
        &self,
        message_type: &str,
        body: MessageBody,
    ) -> BackendResult<Message> {
        self.route(message_type)?
            .create_and_publish(message_type, body)
            .await
    }

    async fn handle(
        &self,
        message: &mut Message,
        registry: &HandlerRegistry,
    ) -> BackendResult<ConsumerReturnInfo> {
        self.route(message.message_type())?
            .handle(message, registry)
            .await
    }

    fn iterator(&self) -> BackendResult<Box<dyn MessageIterator>> {
        self.default_backend()?.iterator()
    }

    fn status(&self) -> BackendHealth {
        let reports: Vec<BackendHealth> = self
            .distinct_backends()
            .into_iter()
            .map(|backend| backend.status())
            .collect();
        let status = reports
            .iter()
            .map(BackendHealth::status)
            .max()
            .unwrap_or(HealthStatus::Warning);
        let summary = if reports.is_empty() {
            "no backend configured".to_owned()
        } else {
            reports
                .iter()
                .map(BackendHealth::message)
                .collect::<Vec<_>>()
                .join(", ")
        };
        BackendHealth::new(status, "Queue dispatcher", summary)
    }

    async fn cleanup(&self) -> BackendResult<()> {
        for backend in self.distinct_backends() {
            backend.cleanup().await?;
        }
        Ok(())
    }

    fn as_dispatcher(&self) -> Option<&Self> {
        Some(self)
    }
}
