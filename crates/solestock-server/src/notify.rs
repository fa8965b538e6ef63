//! Post-commit order notifications.
//!
//! Delivery happens after the order transaction has committed and never
//! affects the order response: failures are logged with the order id.

use std::{sync::Arc, time::Duration};

use futures::future::{join_all, BoxFuture};
use solestock_core::OrderNotification;
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to build webhook client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("{failed} of {total} webhook deliveries failed; first error: {first}")]
    Delivery {
        failed: usize,
        total: usize,
        first: String,
    },
}

pub trait OrderNotifier: Send + Sync {
    fn notify<'a>(
        &'a self,
        notification: &'a OrderNotification,
    ) -> BoxFuture<'a, Result<(), NotifyError>>;
}

/// Sends the notification JSON to each configured webhook URL.
///
/// With no URLs configured the notification is only logged.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    urls: Vec<String>,
}

impl WebhookNotifier {
    /// # Errors
    ///
    /// Returns [`NotifyError::Client`] if the HTTP client cannot be built.
    pub fn new(urls: Vec<String>, timeout_secs: u64) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(NotifyError::Client)?;
        Ok(Self { client, urls })
    }

    async fn post(&self, url: &str, notification: &OrderNotification) -> Result<(), String> {
        let response = self
            .client
            .post(url)
            .json(notification)
            .send()
            .await
            .map_err(|e| format!("{url}: {e}"))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("{url}: HTTP {status}"))
        }
    }
}

impl OrderNotifier for WebhookNotifier {
    fn notify<'a>(
        &'a self,
        notification: &'a OrderNotification,
    ) -> BoxFuture<'a, Result<(), NotifyError>> {
        Box::pin(async move {
            if self.urls.is_empty() {
                tracing::info!(
                    order_id = notification.order_id,
                    customer = %notification.customer_email,
                    total = %notification.total_price,
                    "order notification (no webhooks configured)"
                );
                return Ok(());
            }

            let results = join_all(self.urls.iter().map(|url| self.post(url, notification))).await;
            let errors: Vec<String> = results.into_iter().filter_map(Result::err).collect();

            match errors.first() {
                None => Ok(()),
                Some(first) => Err(NotifyError::Delivery {
                    failed: errors.len(),
                    total: self.urls.len(),
                    first: first.clone(),
                }),
            }
        })
    }
}

/// Fans the notification out on a spawned task.
pub fn dispatch_in_background(
    notifier: Arc<dyn OrderNotifier>,
    notification: OrderNotification,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match notifier.notify(&notification).await {
            Ok(()) => {
                tracing::debug!(order_id = notification.order_id, "order notification sent");
            }
            Err(e) => {
                tracing::warn!(
                    order_id = notification.order_id,
                    error = %e,
                    "order notification failed"
                );
            }
        }
    })
}
