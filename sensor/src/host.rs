use std::time::Duration;

use anyhow::Context;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use tracing::{info, warn};

use heatpump_common::{is_reportable_temperature, sensor_topic};

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let source_id = std::env::var("SENSOR_ID").unwrap_or_else(|_| "kitchen".to_string());
    let interval_secs = std::env::var("SENSOR_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(30);

    let mqtt_host = std::env::var("MQTT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let mqtt_port = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(1883);

    let mut mqtt_options =
        MqttOptions::new(format!("heatpump-sensor-{source_id}"), mqtt_host, mqtt_port);

    if let Ok(user) = std::env::var("MQTT_USER") {
        let pass = std::env::var("MQTT_PASS").unwrap_or_default();
        mqtt_options.set_credentials(user, pass);
    }

    let (mqtt, mut eventloop) = AsyncClient::new(mqtt_options, 32);

    tokio::spawn(async move {
        loop {
            if let Err(err) = eventloop.poll().await {
                warn!("sensor mqtt poll error: {err}");
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    });

    let topic = sensor_topic(&source_id);
    info!(source = %source_id, %topic, interval_secs, "sensor publisher started");

    let mut tick: u64 = 0;
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;
        tick = tick.saturating_add(1);

        let temperature_c = simulated_reading(tick);
        if !is_reportable_temperature(temperature_c) {
            continue;
        }

        mqtt.publish(
            topic.as_str(),
            QoS::AtLeastOnce,
            false,
            format!("{temperature_c:.1}"),
        )
        .await
        .context("failed to publish sensor temperature")?;
    }
}

/// Slow sawtooth around 21 °C.
fn simulated_reading(tick: u64) -> f32 {
    20.5 + (tick % 8) as f32 * 0.125
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_readings_stay_reportable() {
        for tick in 0..32 {
            let value = simulated_reading(tick);
            assert!(is_reportable_temperature(value));
            assert!((20.5..21.5).contains(&value));
        }
    }
}
