//! AMQP (RabbitMQ) transport adapter: consumes from a single queue and
//! dispatches each delivery as one message. `ack` acknowledges the
//! matching delivery tag; `nack` is unsupported by this transport and
//! always fails with [`SwitchyardError::Transport`] — mirroring the
//! broker-redelivery semantics described on [`Adapter::nack`], a handler
//! that wants redelivery should simply return an error instead of
//! calling `nack`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicQosOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties};

use switchyard_core::adapter::Adapter;
use switchyard_core::message::{FromRawData, Message, MessageId};
use switchyard_core::processor::Processor;
use switchyard_core::shutdown::ShutdownCoordinator;
use switchyard_core::SwitchyardError;

/// Adapter bound to one [`Channel`], tracking the delivery tag for every
/// message currently in flight.
pub struct RabbitMqAdapter {
    channel: Channel,
    delivery_tags: Mutex<HashMap<MessageId, u64>>,
}

/// Connection-time configuration for [`run`].
#[derive(Debug, Clone)]
pub struct AmqpConfig {
    pub amqp_uri: String,
    pub queue: String,
    /// Maximum unacknowledged deliveries outstanding at once. The
    /// dispatch engine processes one message at a time per adapter, so
    /// this mainly bounds how far the broker gets ahead of acks during a
    /// slow handler.
    pub prefetch: u16,
}

impl AmqpConfig {
    pub fn new(amqp_uri: impl Into<String>, queue: impl Into<String>) -> Self {
        Self {
            amqp_uri: amqp_uri.into(),
            queue: queue.into(),
            prefetch: 5,
        }
    }
}

impl RabbitMqAdapter {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            delivery_tags: Mutex::new(HashMap::new()),
        }
    }

    fn record(&self, id: MessageId, delivery_tag: u64) {
        self.delivery_tags
            .lock()
            .expect("poisoned")
            .insert(id, delivery_tag);
    }

    fn take(&self, id: MessageId) -> Option<u64> {
        self.delivery_tags.lock().expect("poisoned").remove(&id)
    }
}

impl<M: Message> Adapter<M> for RabbitMqAdapter {
    fn ack(&self, message: &M) -> Result<(), SwitchyardError> {
        let id = message.message_id();
        let delivery_tag = self.take(id).ok_or_else(|| SwitchyardError::Transport {
            reason: format!("no delivery tag recorded for message {id}"),
        })?;
        futures::executor::block_on(
            self.channel
                .basic_ack(delivery_tag, BasicAckOptions::default()),
        )
        .map_err(|e| SwitchyardError::Transport {
            reason: format!("basic_ack failed: {e}"),
        })
    }

    fn nack(&self, _message: &M) -> Result<(), SwitchyardError> {
        Err(SwitchyardError::Transport {
            reason: "rabbitmq adapter does not support nack".into(),
        })
    }
}

/// Connects per `config`, declares its queue, and consumes from it until
/// `shutdown` is signalled. Each delivery's body is decoded with
/// `M::from_raw_data` and dispatched through `processor`; the delivery tag
/// is recorded before dispatch so a handler's `ack()` call can resolve it.
pub async fn run<M, PS, HS>(
    config: &AmqpConfig,
    processor: Arc<Processor<M, PS, HS>>,
    shutdown: ShutdownCoordinator,
) -> Result<(), SwitchyardError>
where
    M: FromRawData,
    PS: Default,
    HS: Default,
{
    let connection = Connection::connect(&config.amqp_uri, ConnectionProperties::default())
        .await
        .map_err(|e| SwitchyardError::Transport {
            reason: format!("amqp connect failed: {e}"),
        })?;
    let channel = connection
        .create_channel()
        .await
        .map_err(|e| SwitchyardError::Transport {
            reason: format!("amqp channel open failed: {e}"),
        })?;
    channel
        .basic_qos(config.prefetch, BasicQosOptions::default())
        .await
        .map_err(|e| SwitchyardError::Transport {
            reason: format!("basic_qos failed: {e}"),
        })?;
    channel
        .queue_declare(
            &config.queue,
            QueueDeclareOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(|e| SwitchyardError::Transport {
            reason: format!("queue_declare failed: {e}"),
        })?;

    let concrete = Arc::new(RabbitMqAdapter::new(channel.clone()));
    let adapter: Arc<dyn Adapter<M>> = Arc::clone(&concrete) as Arc<dyn Adapter<M>>;

    let mut consumer = channel
        .basic_consume(
            &config.queue,
            "switchyard",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(|e| SwitchyardError::Transport {
            reason: format!("basic_consume failed: {e}"),
        })?;

    tracing::info!(queue = %config.queue, prefetch = config.prefetch, "amqp adapter consuming");

    loop {
        if shutdown.should_exit() {
            return Ok(());
        }
        let next = tokio::select! {
            next = consumer.next() => next,
            _ = tokio::time::sleep(std::time::Duration::from_millis(200)) => continue,
        };
        let Some(delivery) = next else {
            return Ok(());
        };
        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(e) => {
                tracing::error!(reason = %e, "amqp delivery error");
                continue;
            }
        };
        let message = M::from_raw_data(delivery.data.clone());
        concrete.record(message.message_id(), delivery.delivery_tag);
        if let Err(e) = processor.process(Arc::clone(&adapter), message) {
            tracing::error!(reason = %e, "amqp dispatch failed");
        }
    }
}
