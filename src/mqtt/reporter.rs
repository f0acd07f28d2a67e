use super::config::MqttConfig;
use crate::input::ButtonEvent;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How long `join` waits for the event loop to flush the DISCONNECT packet
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum ReporterError {
    #[error("Invalid reporter configuration: {0}")]
    ConfigError(String),

    #[error("Reporter task failed: {0}")]
    TaskError(String),
}

/// Wire format of a button report, e.g. `event=PRESSED;timestamp=120`
pub fn format_payload(event: &ButtonEvent) -> String {
    format!(
        "event={};timestamp={}",
        event.kind().as_str(),
        event.timestamp()
    )
}

/// Consumer side handle for queueing reports
///
/// Never waits: a full queue drops the report so LED feedback is not held
/// up by a slow broker.
#[derive(Clone, Debug)]
pub struct ReportSender {
    sender: mpsc::Sender<ButtonEvent>,
}

impl ReportSender {
    pub fn new(sender: mpsc::Sender<ButtonEvent>) -> Self {
        Self { sender }
    }

    /// Queues a report, returns false if it was dropped
    pub fn report(&self, event: ButtonEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => {
                debug!("Queued report for {}", event);
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Report queue full, dropping report for {}", event);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Reporter stopped, report for {} not sent", event);
                false
            }
        }
    }
}

/// Running publisher and connection tasks
///
/// The connection loop outlives the publisher so the DISCONNECT queued on
/// the way out still reaches the broker.
pub struct ReporterHandle {
    publish_task: JoinHandle<u64>,
    connection_task: JoinHandle<()>,
    connection_cancel: CancellationToken,
}

impl ReporterHandle {
    /// Waits for both tasks and returns the number of published reports
    ///
    /// The connection loop gets [`DISCONNECT_GRACE`] to send the disconnect
    /// after the publisher stops, then it is cancelled.
    pub async fn join(self) -> Result<u64, ReporterError> {
        let published = self
            .publish_task
            .await
            .map_err(|e| ReporterError::TaskError(e.to_string()))?;

        let mut connection_task = self.connection_task;
        match tokio::time::timeout(DISCONNECT_GRACE, &mut connection_task).await {
            Ok(result) => result.map_err(|e| ReporterError::TaskError(e.to_string()))?,
            Err(_) => {
                debug!(
                    "Disconnect not flushed within {:?}, stopping MQTT connection loop",
                    DISCONNECT_GRACE
                );
                self.connection_cancel.cancel();
                connection_task
                    .await
                    .map_err(|e| ReporterError::TaskError(e.to_string()))?;
            }
        }
        Ok(published)
    }
}

/// Publishes button events to an MQTT broker
pub struct MqttReporter {
    client: AsyncClient,
    topic: String,
    receiver: mpsc::Receiver<ButtonEvent>,
}

impl MqttReporter {
    /// Connects lazily and spawns the publisher and event loop tasks
    ///
    /// The publisher stops when `cancel` fires and queues a disconnect on the
    /// way out. The connection loop keeps running until that disconnect has
    /// been sent or [`ReporterHandle::join`] gives up on it.
    pub fn spawn(
        config: &MqttConfig,
        cancel: CancellationToken,
    ) -> Result<(ReportSender, ReporterHandle), ReporterError> {
        if config.topic.is_empty() {
            return Err(ReporterError::ConfigError("topic must not be empty".to_string()));
        }
        if config.queue_capacity == 0 {
            return Err(ReporterError::ConfigError(
                "queue_capacity must be at least 1".to_string(),
            ));
        }

        info!(
            "Starting MQTT reporter for {}:{} on topic {}",
            config.host, config.port, config.topic
        );

        let mut mqtt_options = MqttOptions::new(&config.client_id, &config.host, config.port);
        mqtt_options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(1)));
        if let (Some(user), Some(pw)) = (&config.username, &config.password) {
            mqtt_options.set_credentials(user.clone(), pw.clone());
        }

        let (client, eventloop) = AsyncClient::new(mqtt_options, config.queue_capacity);
        let (sender, receiver) = mpsc::channel(config.queue_capacity);

        let reporter = Self {
            client,
            topic: config.topic.clone(),
            receiver,
        };

        let reconnect_delay = Duration::from_millis(config.reconnect_delay_ms);
        let connection_cancel = CancellationToken::new();
        let connection_task = tokio::spawn(drive_connection(
            eventloop,
            reconnect_delay,
            connection_cancel.clone(),
        ));
        let publish_task = tokio::spawn(reporter.run_publish_loop(cancel));

        Ok((
            ReportSender::new(sender),
            ReporterHandle {
                publish_task,
                connection_task,
                connection_cancel,
            },
        ))
    }

    async fn run_publish_loop(mut self, cancel: CancellationToken) -> u64 {
        info!("MQTT publish loop started");
        let mut published = 0;

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = self.receiver.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            let payload = format_payload(&event);
            debug!("Publishing {} to {}", payload, self.topic);
            match self
                .client
                .publish(&self.topic, QoS::AtLeastOnce, false, payload)
                .await
            {
                Ok(()) => published += 1,
                Err(e) => error!("Failed to publish report for {}: {}", event, e),
            }
        }

        if let Err(e) = self.client.disconnect().await {
            debug!("MQTT disconnect request failed: {}", e);
        }
        info!("MQTT publish loop stopped after {} reports", published);
        published
    }
}

async fn drive_connection(
    mut eventloop: EventLoop,
    reconnect_delay: Duration,
    cancel: CancellationToken,
) {
    loop {
        let notification = tokio::select! {
            _ = cancel.cancelled() => break,
            notification = eventloop.poll() => notification,
        };

        match notification {
            Ok(Event::Incoming(Packet::ConnAck(_))) => info!("MQTT connected"),
            Ok(Event::Incoming(Packet::Disconnect)) => warn!("MQTT disconnected by broker"),
            Ok(Event::Incoming(Packet::PubAck(ack))) => debug!("Report {} acknowledged", ack.pkid),
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                info!("MQTT disconnect sent");
                break;
            }
            Ok(other) => debug!("MQTT event: {:?}", other),
            Err(e) => {
                error!("MQTT connection error: {}", e);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(reconnect_delay) => {}
                }
            }
        }
    }
    info!("MQTT connection loop stopped");
}
