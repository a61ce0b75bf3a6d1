//! Kafka-backed broker handle.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::ClientConfig;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::broker::Broker;
use crate::error::BrokerError;

/// How long a single delivery may stay queued before it fails.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for the connect-time metadata probe.
const METADATA_TIMEOUT: Duration = Duration::from_secs(5);
/// Timeout for topic creation.
const ADMIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Broker handle publishing to a single Kafka bootstrap address.
///
/// `connect` builds the producer and probes cluster metadata so that an
/// unreachable address fails at startup rather than on first publish. Queue
/// names map to topics, declared once per queue on first use.
pub struct KafkaBroker {
    address: String,
    producer: Option<FutureProducer>,
    declared: Mutex<HashSet<String>>,
}

impl KafkaBroker {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            producer: None,
            declared: Mutex::new(HashSet::new()),
        }
    }

    /// Create the queue's backing topic if it doesn't exist.
    async fn ensure_topic(&self, queue: &str) -> Result<(), BrokerError> {
        {
            let declared = self.declared.lock().await;
            if declared.contains(queue) {
                return Ok(());
            }
        }

        let admin_client: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", &self.address)
            .create()
            .map_err(|e| BrokerError::Connect {
                addr: self.address.clone(),
                source: e,
            })?;

        let new_topic = NewTopic::new(queue, 1, TopicReplication::Fixed(1));
        let opts = AdminOptions::new().operation_timeout(Some(ADMIN_TIMEOUT));

        match admin_client.create_topics(&[new_topic], &opts).await {
            Ok(results) => {
                for result in results {
                    match result {
                        Ok(topic) => {
                            info!("declared topic '{topic}' on broker {}", self.address);
                        }
                        Err((topic, err)) => {
                            if err.to_string().contains("already exists") {
                                debug!("topic '{topic}' already exists on {}", self.address);
                            } else {
                                return Err(BrokerError::TopicCreation {
                                    addr: self.address.clone(),
                                    reason: format!("{topic}: {err}"),
                                });
                            }
                        }
                    }
                }
            }
            Err(e) => {
                return Err(BrokerError::TopicCreation {
                    addr: self.address.clone(),
                    reason: e.to_string(),
                });
            }
        }

        self.declared.lock().await.insert(queue.to_string());
        Ok(())
    }
}

#[async_trait]
impl Broker for KafkaBroker {
    async fn connect(&mut self) -> Result<(), BrokerError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &self.address)
            .set("message.timeout.ms", "30000")
            .create()
            .map_err(|e| BrokerError::Connect {
                addr: self.address.clone(),
                source: e,
            })?;

        // Metadata probe: surfaces an unreachable broker now instead of on
        // the first publish.
        producer
            .client()
            .fetch_metadata(None, METADATA_TIMEOUT)
            .map_err(|e| BrokerError::Connect {
                addr: self.address.clone(),
                source: e,
            })?;

        self.producer = Some(producer);
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError> {
        let producer = self
            .producer
            .as_ref()
            .ok_or_else(|| BrokerError::NotConnected(self.address.clone()))?;

        self.ensure_topic(queue).await?;

        let record = FutureRecord::<(), _>::to(queue).payload(payload);
        producer
            .send(record, DELIVERY_TIMEOUT)
            .await
            .map_err(|(err, _)| BrokerError::Publish {
                addr: self.address.clone(),
                source: err,
            })?;
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        if let Some(producer) = &self.producer {
            producer
                .flush(METADATA_TIMEOUT)
                .map_err(|e| BrokerError::Close {
                    addr: self.address.clone(),
                    source: e,
                })?;
        }
        Ok(())
    }

    fn identity(&self) -> &str {
        &self.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_the_configured_address() {
        let broker = KafkaBroker::new("kafka-1:9092");
        assert_eq!(broker.identity(), "kafka-1:9092");
    }

    #[tokio::test]
    async fn publish_before_connect_is_rejected() {
        let broker = KafkaBroker::new("kafka-1:9092");
        let err = broker.publish("uuids", b"payload").await.unwrap_err();
        assert!(matches!(err, BrokerError::NotConnected(_)));
    }

    #[tokio::test]
    async fn close_before_connect_is_a_no_op() {
        let broker = KafkaBroker::new("kafka-1:9092");
        assert!(broker.close().await.is_ok());
    }
}
