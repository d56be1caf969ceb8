use log::debug;
use paho_mqtt::{AsyncClient, Message, QOS_1 as QOS_AT_LEAST_ONCE};
use serde::Serialize;

use crate::{
    classic::Payload,
    config::{ControllerConfig, Identifier},
};

const MQTT_DISCOVERY_TOPIC: &str = "homeassistant";

fn mqtt_avail_topic(client_id: &str) -> String {
    format!("{client_id}/bridge/state")
}

pub async fn register_devices(client: &AsyncClient, payloads: &[ConfigPayload]) -> anyhow::Result<()> {
    for payload in payloads {
        let json = serde_json::to_string(payload)?;
        debug!("MQTT publish: topic '{}' payload '{json}'", payload.config_topic);

        client
            .publish(Message::new_retained(&payload.config_topic, json, QOS_AT_LEAST_ONCE))
            .await?;
    }

    Ok(())
}

pub async fn announce_online(client_id: &str, client: &AsyncClient) -> anyhow::Result<()> {
    client
        .publish(Message::new_retained(
            mqtt_avail_topic(client_id),
            b"online".to_owned(),
            QOS_AT_LEAST_ONCE,
        ))
        .await?;
    Ok(())
}

pub fn offline_message(client_id: &str) -> Message {
    Message::new_retained(mqtt_avail_topic(client_id), "offline".to_owned(), QOS_AT_LEAST_ONCE)
}

pub async fn announce_offline(client_id: &str, client: &AsyncClient) -> anyhow::Result<()> {
    client.publish(offline_message(client_id)).await?;
    Ok(())
}

pub async fn publish_state(client: &AsyncClient, topic: &str, payload: &Payload) -> anyhow::Result<()> {
    let json = serde_json::to_string(payload)?;
    debug!("MQTT publish topic: '{topic}' payload: '{json}'");

    client.publish(Message::new(topic, json, QOS_AT_LEAST_ONCE)).await?;

    Ok(())
}

pub fn state_topic_for_dev_id(client_id: &str, dev_id: &Identifier) -> String {
    format!("{client_id}/{dev_id}/state", dev_id = dev_id.0)
}

#[derive(Serialize, Debug, Clone)]
pub struct AvailabilityPayload {
    topic: String,
}

#[derive(Serialize, Debug, Default, Clone)]
pub struct DevicePayload {
    name: String,
    identifiers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sw_version: Option<String>,
}

#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Measurement,
    TotalIncreasing,
}

#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Battery,
    Current,
    Energy,
    Power,
    Temperature,
    Voltage,
}

struct Sensor {
    field: &'static str,
    device_class: Option<DeviceClass>,
    state_class: Option<StateClass>,
    unit: Option<&'static str>,
}

const fn measured(field: &'static str, device_class: DeviceClass, unit: &'static str) -> Sensor {
    Sensor {
        field,
        device_class: Some(device_class),
        state_class: Some(StateClass::Measurement),
        unit: Some(unit),
    }
}

const fn text(field: &'static str) -> Sensor {
    Sensor { field, device_class: None, state_class: None, unit: None }
}

const CLASSIC_SENSORS: &[Sensor] = &[
    measured("BatVoltage", DeviceClass::Voltage, "V"),
    measured("BatCurrent", DeviceClass::Current, "A"),
    measured("PVVoltage", DeviceClass::Voltage, "V"),
    measured("PVCurrent", DeviceClass::Current, "A"),
    measured("Power", DeviceClass::Power, "W"),
    measured("SOC", DeviceClass::Battery, "%"),
    measured("BatTemperature", DeviceClass::Temperature, "°C"),
    measured("FETTemperature", DeviceClass::Temperature, "°C"),
    measured("PCBTemperature", DeviceClass::Temperature, "°C"),
    measured("WhizbangBatCurrent", DeviceClass::Current, "A"),
    Sensor {
        field: "EnergyToday",
        device_class: Some(DeviceClass::Energy),
        state_class: Some(StateClass::TotalIncreasing),
        unit: Some("kWh"),
    },
    Sensor {
        field: "TotalEnergy",
        device_class: Some(DeviceClass::Energy),
        state_class: Some(StateClass::TotalIncreasing),
        unit: Some("kWh"),
    },
    text("ChargeStateText"),
    text("ReasonForRestingText"),
];

#[derive(Serialize, Debug, Clone)]
pub struct ConfigPayload {
    pub name: String,
    pub unique_id: String,
    pub availability: Vec<AvailabilityPayload>,
    pub device: DevicePayload,
    pub state_topic: String,
    pub value_template: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<StateClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<DeviceClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,

    #[serde(skip)]
    pub config_topic: String,
}

impl ConfigPayload {
    pub fn from_classic(client_id: &str, conf: &ControllerConfig) -> Vec<Self> {
        let dev_id = &conf.device.identifier;
        let unique_id = format!("{client_id}_{dev_id}", dev_id = dev_id.0);
        let state_topic = state_topic_for_dev_id(client_id, dev_id);

        let device = DevicePayload {
            name: conf.name.clone(),
            identifiers: vec![dev_id.0.clone()],
            manufacturer: conf.device.manufacturer.clone(),
            model: conf.device.model.clone(),
            sw_version: conf.device.sw_version.clone(),
        };

        CLASSIC_SENSORS
            .iter()
            .map(|sensor| ConfigPayload {
                config_topic: format!("{MQTT_DISCOVERY_TOPIC}/sensor/{unique_id}/{}/config", sensor.field),
                unique_id: format!("{unique_id}_{}", sensor.field),
                name: format!("{} {}", conf.name, sensor.field),
                availability: vec![AvailabilityPayload { topic: mqtt_avail_topic(client_id) }],
                device: device.clone(),
                state_topic: state_topic.clone(),
                value_template: format!("{{{{ value_json.{} }}}}", sensor.field),
                state_class: sensor.state_class,
                device_class: sensor.device_class,
                unit_of_measurement: sensor.unit.map(str::to_owned),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classic::{tests::MemoryReader, ClassicClient};

    fn garage() -> ControllerConfig {
        serde_yaml::from_str(
            r#"
name: Garage
host: 192.168.20.10
device:
  identifier: garage_classic
  manufacturer: MidNite Solar
"#,
        )
        .unwrap()
    }

    #[test]
    fn discovery_topics_and_templates() {
        let payloads = ConfigPayload::from_classic("bridge", &garage());
        let voltage = &payloads[0];

        assert_eq!(voltage.config_topic, "homeassistant/sensor/bridge_garage_classic/BatVoltage/config");
        assert_eq!(voltage.unique_id, "bridge_garage_classic_BatVoltage");
        assert_eq!(voltage.state_topic, "bridge/garage_classic/state");
        assert_eq!(voltage.value_template, "{{ value_json.BatVoltage }}");

        let json = serde_json::to_value(voltage).unwrap();
        assert_eq!(json["device_class"], "voltage");
        assert_eq!(json["state_class"], "measurement");
        assert_eq!(json["availability"][0]["topic"], "bridge/bridge/state");
        assert_eq!(json["device"]["manufacturer"], "MidNite Solar");
        assert!(json.get("config_topic").is_none());
        assert!(json["device"].get("model").is_none());
    }

    #[tokio::test]
    async fn sensors_exist_in_a_decoded_payload() {
        let payload = ClassicClient::new("192.168.20.10", MemoryReader::classic()).poll().await.unwrap();

        for sensor in CLASSIC_SENSORS {
            assert!(payload.get(sensor.field).is_some(), "{} missing", sensor.field);
        }
    }
}
