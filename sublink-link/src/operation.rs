//! Operation descriptors
//!
//! An [`Operation`] is what a caller hands to a link: the payload sent to the
//! transport plus a context the link reads but never sends. The only context
//! entry today is the reconnect recovery routine.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use sublink_core::{OperationPayload, OperationType, Result};

/// Caller-supplied routine awaited after a reconnect, before the
/// subscription is issued again
pub type RecoveryRoutine = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Link-side context of an operation
#[derive(Clone, Default)]
pub struct OperationContext {
    /// Awaited once per reconnect signal
    pub on_reconnect: Option<RecoveryRoutine>,
}

impl fmt::Debug for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationContext")
            .field("on_reconnect", &self.on_reconnect.is_some())
            .finish()
    }
}

/// One logical request
#[derive(Debug, Clone)]
pub struct Operation {
    payload: OperationPayload,
    context: OperationContext,
}

impl Operation {
    pub fn new(payload: OperationPayload) -> Self {
        Self {
            payload,
            context: OperationContext::default(),
        }
    }

    pub fn query(query: impl Into<String>) -> Self {
        Self::new(OperationPayload::new(OperationType::Query, query))
    }

    pub fn mutation(query: impl Into<String>) -> Self {
        Self::new(OperationPayload::new(OperationType::Mutation, query))
    }

    pub fn subscription(query: impl Into<String>) -> Self {
        Self::new(OperationPayload::new(OperationType::Subscription, query))
    }

    pub fn with_variables(mut self, variables: serde_json::Value) -> Self {
        self.payload.variables = Some(variables);
        self
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.payload.operation_name = Some(name.into());
        self
    }

    /// Attach a recovery routine
    ///
    /// After every reconnect the session tears down the stale subscription,
    /// awaits `routine`, and only then subscribes again. A routine that
    /// returns an error ends the session with that error.
    pub fn with_on_reconnect<F, Fut>(mut self, routine: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.context.on_reconnect = Some(Arc::new(move || routine().boxed()));
        self
    }

    pub fn payload(&self) -> &OperationPayload {
        &self.payload
    }

    pub fn context(&self) -> &OperationContext {
        &self.context
    }

    pub fn operation_type(&self) -> OperationType {
        self.payload.operation_type
    }

    pub fn is_subscription(&self) -> bool {
        self.payload.operation_type == OperationType::Subscription
    }
}
