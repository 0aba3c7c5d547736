//! Links
//!
//! A link turns an [`Operation`] into an [`OperationStream`]. Links may
//! decline an operation by returning `None`; [`execute`] turns that into an
//! empty stream.

use crate::operation::Operation;
use crate::stream::OperationStream;
use crate::transport::Transport;
use std::sync::Arc;
use sublink_client::{ClientBuilder, SubscriptionClient};
use sublink_core::Result;

/// Capability to run operations
pub trait Link: Send + Sync {
    fn request(&self, operation: Operation) -> Option<OperationStream>;
}

/// Run `operation` through `link`
pub fn execute(link: &dyn Link, operation: Operation) -> OperationStream {
    link.request(operation).unwrap_or_else(OperationStream::empty)
}

/// Link over a WebSocket subscription transport
///
/// Subscriptions run in reconnecting sessions; queries and mutations are
/// one-shot requests on the same connection.
#[derive(Clone)]
pub struct WebSocketLink {
    transport: Arc<dyn Transport>,
}

impl WebSocketLink {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Connect a new client and wrap it
    pub async fn connect(builder: ClientBuilder) -> Result<Self> {
        let client = builder.connect().await?;
        Ok(Self::from(client))
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

impl From<SubscriptionClient> for WebSocketLink {
    fn from(client: SubscriptionClient) -> Self {
        Self::new(Arc::new(client))
    }
}

impl Link for WebSocketLink {
    fn request(&self, operation: Operation) -> Option<OperationStream> {
        Some(OperationStream::new(operation, Arc::clone(&self.transport)))
    }
}
