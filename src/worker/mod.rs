//! Ledger worker
//!
//! Thin queue adapter around a [`LedgerOperation`]: pop one request, run it,
//! push one response, repeat. Messages are handled strictly one at a time;
//! throughput comes from running more worker processes on the same queue.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::ServiceConfig;
use crate::domain::LedgerError;
use crate::ledger::{
    BalanceHandler, DepositHandler, HistoryHandler, LedgerOperation, LedgerStore,
    TransferHandler, WithdrawHandler,
};
use crate::messages::{Action, HeaderOnly, ResponseEnvelope};
use crate::queue::{MessageQueue, QueueError};

/// Pause after a broker failure before polling again
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Queue consumer for one ledger operation
pub struct Worker<H: LedgerOperation> {
    handler: H,
    queue: Arc<dyn MessageQueue>,
    service: ServiceConfig,
}

impl<H: LedgerOperation> Worker<H> {
    pub fn new(handler: H, queue: Arc<dyn MessageQueue>, service: ServiceConfig) -> Self {
        Self {
            handler,
            queue,
            service,
        }
    }

    /// Handle one raw request and build the serialised response.
    ///
    /// Returns `None` when the message is dropped because it cannot be
    /// deserialised.
    pub async fn process(&self, payload: &[u8]) -> Option<Vec<u8>> {
        let header = match serde_json::from_slice::<HeaderOnly>(payload) {
            Ok(view) => view.header,
            Err(e) => {
                tracing::warn!(
                    queue = %self.service.requests_queue,
                    error = %e,
                    "Dropping undeserialisable message"
                );
                return None;
            }
        };

        let envelope = if header.action != H::ACTION {
            tracing::warn!(
                id = header.id,
                action = %header.action,
                expected = %H::ACTION,
                "Message received by wrong service"
            );
            ResponseEnvelope::<H::Output>::failed(header, &LedgerError::WrongService)
        } else {
            let request = match serde_json::from_slice::<H::Request>(payload) {
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!(id = header.id, error = %e, "Dropping undeserialisable request");
                    return None;
                }
            };

            let outcome = self.handler.handle(&request).await;
            match &outcome {
                Ok(_) => tracing::info!(id = header.id, action = %header.action, "Request succeeded"),
                Err(reason) if reason.is_client_error() => tracing::info!(
                    id = header.id,
                    action = %header.action,
                    reason = %reason,
                    "Request failed"
                ),
                Err(reason) => tracing::error!(
                    id = header.id,
                    action = %header.action,
                    reason = %reason,
                    "Request failed in the store"
                ),
            }
            ResponseEnvelope::from_outcome(header, outcome)
        };

        match serde_json::to_vec(&envelope) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::error!(id = header.id, error = %e, "Failed to serialise response");
                None
            }
        }
    }

    /// Wait up to the queue timeout for one request and answer it.
    ///
    /// Returns `Ok(false)` when no request arrived in time.
    pub async fn poll_once(&self) -> Result<bool, QueueError> {
        let Some(payload) = self
            .queue
            .pop(&self.service.requests_queue, self.service.queue_timeout)
            .await?
        else {
            return Ok(false);
        };

        if let Some(response) = self.process(&payload).await {
            self.queue
                .push(&self.service.responses_queue, response, self.service.queue_timeout)
                .await?;
        }
        Ok(true)
    }

    /// Serve requests until `shutdown` is cancelled
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!(
            action = %H::ACTION,
            requests_queue = %self.service.requests_queue,
            responses_queue = %self.service.responses_queue,
            "Worker started"
        );

        while !shutdown.is_cancelled() {
            if let Err(e) = self.poll_once().await {
                tracing::error!(error = %e, transient = e.is_transient(), "Worker poll failed");
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                }
            }
        }

        tracing::info!(action = %H::ACTION, "Worker stopped");
    }
}

/// Run the worker of `service.action` over `store` until `shutdown`
pub async fn serve(
    store: Arc<dyn LedgerStore>,
    queue: Arc<dyn MessageQueue>,
    service: ServiceConfig,
    shutdown: CancellationToken,
) {
    match service.action {
        Action::Deposit => {
            Worker::new(DepositHandler::new(store), queue, service)
                .run(shutdown)
                .await
        }
        Action::Withdraw => {
            Worker::new(WithdrawHandler::new(store), queue, service)
                .run(shutdown)
                .await
        }
        Action::Transfer => {
            Worker::new(TransferHandler::new(store), queue, service)
                .run(shutdown)
                .await
        }
        Action::GetBalance => {
            Worker::new(BalanceHandler::new(store), queue, service)
                .run(shutdown)
                .await
        }
        Action::GetTransactionHistory => {
            Worker::new(HistoryHandler::new(store), queue, service)
                .run(shutdown)
                .await
        }
    }
}
