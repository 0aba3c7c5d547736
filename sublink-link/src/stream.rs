//! Lazy, cancellable result streams

use crate::operation::Operation;
use crate::session::{Observer, ReconnectingSession, SessionHandle};
use crate::transport::Transport;
use futures::future::{self, BoxFuture};
use futures::stream::{FusedStream, Stream};
use futures::FutureExt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use sublink_core::{Error, FetchResult, Result};
use tokio::sync::mpsc;

/// Results of one operation
///
/// Nothing is sent before the first poll. Queries and mutations yield one
/// item; subscriptions yield results until the server completes them, an
/// error arrives, or the stream is cancelled. The stream ends after its
/// first error. Dropping it cancels it.
pub struct OperationStream {
    state: State,
}

enum State {
    Pending {
        operation: Operation,
        transport: Arc<dyn Transport>,
    },
    Single(BoxFuture<'static, Result<FetchResult>>),
    Subscription {
        results: mpsc::UnboundedReceiver<Result<FetchResult>>,
        session: SessionHandle,
    },
    Done,
}

struct ChannelObserver {
    results: mpsc::UnboundedSender<Result<FetchResult>>,
}

impl Observer for ChannelObserver {
    fn next(&mut self, result: FetchResult) {
        let _ = self.results.send(Ok(result));
    }

    fn error(&mut self, error: Error) {
        let _ = self.results.send(Err(error));
    }

    // The session drops the observer right after, which closes the channel.
    fn complete(&mut self) {}
}

impl OperationStream {
    pub fn new(operation: Operation, transport: Arc<dyn Transport>) -> Self {
        Self {
            state: State::Pending {
                operation,
                transport,
            },
        }
    }

    /// A stream that ends immediately
    pub fn empty() -> Self {
        Self { state: State::Done }
    }

    /// The backing session, once a subscription has started
    pub fn session(&self) -> Option<&SessionHandle> {
        match &self.state {
            State::Subscription { session, .. } => Some(session),
            _ => None,
        }
    }

    /// Stop the stream and release everything behind it (idempotent)
    pub fn cancel(&mut self) {
        if let State::Subscription { session, .. } = &self.state {
            session.cancel();
        }
        self.state = State::Done;
    }

    fn start(&mut self) {
        if !matches!(self.state, State::Pending { .. }) {
            return;
        }
        if let State::Pending {
            operation,
            transport,
        } = std::mem::replace(&mut self.state, State::Done)
        {
            self.state = if operation.is_subscription() {
                let (tx, results) = mpsc::unbounded_channel();
                match ReconnectingSession::open(operation, transport, ChannelObserver { results: tx }) {
                    Ok(session) => State::Subscription { results, session },
                    Err(e) => State::Single(future::ready(Err(e)).boxed()),
                }
            } else {
                State::Single(transport.execute(&operation))
            };
        }
    }
}

impl Stream for OperationStream {
    type Item = Result<FetchResult>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        this.start();

        let polled = match &mut this.state {
            State::Pending { .. } | State::Done => return Poll::Ready(None),
            State::Single(pending) => match pending.as_mut().poll(cx) {
                Poll::Ready(result) => Some(result),
                Poll::Pending => return Poll::Pending,
            },
            State::Subscription { results, .. } => match results.poll_recv(cx) {
                Poll::Ready(Some(Ok(result))) => return Poll::Ready(Some(Ok(result))),
                Poll::Ready(item) => item,
                Poll::Pending => return Poll::Pending,
            },
        };

        // Terminal: a single result, an error, or the end of the session.
        this.cancel();
        Poll::Ready(polled)
    }
}

impl FusedStream for OperationStream {
    fn is_terminated(&self) -> bool {
        matches!(self.state, State::Done)
    }
}

impl Drop for OperationStream {
    fn drop(&mut self) {
        self.cancel();
    }
}
