//! Outbound queue seam for re-dispatching retried requests.

use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, RequestId};
use domain::{FulfillmentRequest, Provider};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::Result;

/// Destination for messages handed off to the submission workers.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, message: serde_json::Value) -> Result<()>;
}

#[async_trait]
impl<T: MessageSink + ?Sized> MessageSink for Arc<T> {
    async fn send(&self, message: serde_json::Value) -> Result<()> {
        (**self).send(message).await
    }
}

/// The message enqueued per retried fulfillment request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub fulfillment_request_id: RequestId,
    pub order_id: OrderId,
    pub provider: Provider,
}

impl RetryMessage {
    pub fn for_request(request: &FulfillmentRequest) -> Self {
        Self {
            message_type: "retry_fulfillment".to_string(),
            fulfillment_request_id: request.id,
            order_id: request.order_id,
            provider: request.provider,
        }
    }
}

/// Records sent messages in memory, for tests and local runs.
#[derive(Clone, Default)]
pub struct InMemoryMessageSink {
    messages: Arc<RwLock<Vec<serde_json::Value>>>,
}

impl InMemoryMessageSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<serde_json::Value> {
        self.messages.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }
}

#[async_trait]
impl MessageSink for InMemoryMessageSink {
    async fn send(&self, message: serde_json::Value) -> Result<()> {
        self.messages.write().await.push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sink_records_messages_in_order() {
        let sink = InMemoryMessageSink::new();
        sink.send(serde_json::json!({"n": 1})).await.unwrap();
        sink.send(serde_json::json!({"n": 2})).await.unwrap();

        let messages = sink.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["n"], 1);
        assert_eq!(messages[1]["n"], 2);
    }

    #[test]
    fn retry_message_serializes_with_type_tag() {
        let message = RetryMessage {
            message_type: "retry_fulfillment".to_string(),
            fulfillment_request_id: RequestId::new(),
            order_id: OrderId::new(),
            provider: Provider::Gooten,
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "retry_fulfillment");
        assert_eq!(value["provider"], "gooten");
    }
}
