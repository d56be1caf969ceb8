use crate::{
    classic::Payload,
    config::{Config, ControllerConfig, MqttConfig},
};
use anyhow::Context;
use log::{info, warn};

#[cfg(feature = "mqtt")]
use {
    crate::mqtt,
    paho_mqtt::{AsyncClient, ConnectOptionsBuilder, CreateOptionsBuilder, PersistenceType},
    std::time::Duration,
};

/// Where decoded payloads end up.
pub enum Output {
    Stdout,
    #[cfg(feature = "mqtt")]
    Mqtt { client_id: String, client: AsyncClient },
}

impl Output {
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let Some(broker) = &config.mqtt else {
            return Ok(Output::Stdout);
        };

        Self::connect_broker(config, broker).await
    }

    #[cfg(feature = "mqtt")]
    async fn connect_broker(config: &Config, broker: &MqttConfig) -> anyhow::Result<Self> {
        let client = AsyncClient::new(
            CreateOptionsBuilder::new()
                .server_uri(format!("tcp://{host}:{port}", host = broker.host, port = broker.port))
                .client_id(&config.client_id)
                .persistence(PersistenceType::None)
                .finalize(),
        )
        .context("Failed to create MQTT client")?;

        client
            .connect(
                ConnectOptionsBuilder::new()
                    .automatic_reconnect(Duration::from_secs(2u64.pow(3)), Duration::from_secs(2u64.pow(12)))
                    .max_inflight(128)
                    .will_message(mqtt::offline_message(&config.client_id))
                    .finalize(),
            )
            .await
            .context("Failed to connect to MQTT broker")?;

        info!("Connected to MQTT broker {}:{}", broker.host, broker.port);

        mqtt::announce_online(&config.client_id, &client)
            .await
            .context("Failed to announce online status")?;

        let payloads: Vec<_> = config
            .controllers
            .iter()
            .flat_map(|controller| mqtt::ConfigPayload::from_classic(&config.client_id, controller))
            .collect();

        mqtt::register_devices(&client, &payloads)
            .await
            .context("Failed to register devices")?;

        Ok(Output::Mqtt { client_id: config.client_id.clone(), client })
    }

    #[cfg(not(feature = "mqtt"))]
    async fn connect_broker(_config: &Config, broker: &MqttConfig) -> anyhow::Result<Self> {
        warn!(
            "MQTT broker {}:{} configured but built without the mqtt feature, printing to stdout",
            broker.host, broker.port
        );

        Ok(Output::Stdout)
    }

    pub async fn publish(&self, controller: &ControllerConfig, payload: &Payload) -> anyhow::Result<()> {
        match self {
            Output::Stdout => {
                let json = serde_json::to_string(payload).context("Unable to serialize payload")?;
                println!("{} {json}", controller.name);
            },
            #[cfg(feature = "mqtt")]
            Output::Mqtt { client_id, client } => {
                let topic = mqtt::state_topic_for_dev_id(client_id, &controller.device.identifier);
                mqtt::publish_state(client, &topic, payload).await.context("Unable to publish state")?;
            },
        }

        Ok(())
    }

    pub async fn shutdown(&self) {
        #[cfg(feature = "mqtt")]
        if let Output::Mqtt { client_id, client } = self {
            if let Err(e) = mqtt::announce_offline(client_id, client).await {
                warn!("Unable to announce offline status: {e}");
            }
        }

        info!("Shutting down");
    }
}
