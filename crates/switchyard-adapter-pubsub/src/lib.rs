//! Redis pub/sub transport adapter: a background thread subscribes to a
//! fixed set of channels and dispatches every published message. Pub/sub
//! is fire-and-forget at the protocol level — there is no delivery tag to
//! acknowledge or reject — so both `ack` and `nack` are no-ops.

use std::sync::Arc;
use std::time::Duration;

use redis::Client;

use switchyard_core::adapter::Adapter;
use switchyard_core::message::{FromRawData, Message};
use switchyard_core::processor::Processor;
use switchyard_core::shutdown::ShutdownCoordinator;
use switchyard_core::SwitchyardError;

pub struct PubSubAdapter;

impl PubSubAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PubSubAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message> Adapter<M> for PubSubAdapter {
    fn ack(&self, _message: &M) -> Result<(), SwitchyardError> {
        Ok(())
    }

    fn nack(&self, _message: &M) -> Result<(), SwitchyardError> {
        Ok(())
    }
}

/// Subscribes to `channels` on the Redis server at `redis_url` from a
/// dedicated background thread, dispatching each published message
/// through `processor`. Blocks the calling thread on
/// [`ShutdownCoordinator::wait_for_flag`] and joins the background
/// thread once it returns.
pub fn run<M, PS, HS>(
    redis_url: &str,
    channels: &[&str],
    processor: Arc<Processor<M, PS, HS>>,
    shutdown: ShutdownCoordinator,
) -> Result<(), SwitchyardError>
where
    M: FromRawData,
    PS: Default + Send + Sync + 'static,
    HS: Default + Send + Sync + 'static,
{
    let client = Client::open(redis_url).map_err(|e| SwitchyardError::Transport {
        reason: format!("redis client open failed: {e}"),
    })?;
    let mut connection = client
        .get_connection()
        .map_err(|e| SwitchyardError::Transport {
            reason: format!("redis connect failed: {e}"),
        })?;

    let channels: Vec<String> = channels.iter().map(|c| c.to_string()).collect();
    let worker_shutdown = shutdown.clone();

    let handle = std::thread::spawn(move || -> Result<(), SwitchyardError> {
        let mut pubsub = connection
            .as_pubsub();
        for channel in &channels {
            pubsub
                .subscribe(channel)
                .map_err(|e| SwitchyardError::Transport {
                    reason: format!("subscribe to {channel} failed: {e}"),
                })?;
        }
        pubsub
            .set_read_timeout(Some(Duration::from_millis(200)))
            .map_err(|e| SwitchyardError::Transport {
                reason: format!("set_read_timeout failed: {e}"),
            })?;
        tracing::info!(?channels, "pubsub adapter subscribed");

        let adapter: Arc<dyn Adapter<M>> = Arc::new(PubSubAdapter::new());
        while !worker_shutdown.should_exit() {
            let message = match pubsub.get_message() {
                Ok(msg) => msg,
                Err(_) => continue,
            };
            let payload: Vec<u8> = match message.get_payload() {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(reason = %e, "pubsub payload decode failed");
                    continue;
                }
            };
            let decoded = M::from_raw_data(payload);
            if let Err(e) = processor.process(Arc::clone(&adapter), decoded) {
                tracing::error!(reason = %e, "pubsub dispatch failed");
            }
        }
        Ok(())
    });

    shutdown.wait_for_flag(Duration::from_millis(200));
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(SwitchyardError::Transport {
            reason: "pubsub worker thread panicked".into(),
        }),
    }
}
