use anyhow::Context;
use rumqttc::{AsyncClient, QoS};
use tracing::{debug, info, warn};

use heatpump_common::{
    remote_temperature_byte, ArbiterAction, ArbiterStatus, HorizontalVanePosition, VanePosition,
    TOPIC_CONTROLLER_STATE, TOPIC_HORIZONTAL_VANE_STATE, TOPIC_REMOTE_TEMP, TOPIC_USING_INTERNAL,
    TOPIC_VANE_STATE,
};

/// Link to the heat pump. Calls must not block the control loop.
pub trait ProtocolSink {
    fn forward(&mut self, value: f32) -> anyhow::Result<()>;
    fn use_internal(&mut self, using_internal: bool) -> anyhow::Result<()>;
    fn vane(&mut self, position: VanePosition) -> anyhow::Result<()>;
    fn horizontal_vane(&mut self, position: HorizontalVanePosition) -> anyhow::Result<()>;
}

/// Publishes protocol requests over MQTT for a bridge process to relay.
pub struct MqttSink {
    mqtt: AsyncClient,
}

impl MqttSink {
    pub fn new(mqtt: AsyncClient) -> Self {
        Self { mqtt }
    }

    pub fn publish_state(&mut self, status: &ArbiterStatus) -> anyhow::Result<()> {
        let body = serde_json::to_vec(status).context("arbiter state serialization failed")?;
        self.mqtt
            .try_publish(TOPIC_CONTROLLER_STATE, QoS::AtLeastOnce, true, body)
            .context("arbiter state publish failed")
    }
}

impl ProtocolSink for MqttSink {
    fn forward(&mut self, value: f32) -> anyhow::Result<()> {
        debug!(value, byte = remote_temperature_byte(value), "remote temperature");
        self.mqtt
            .try_publish(TOPIC_REMOTE_TEMP, QoS::AtLeastOnce, false, format!("{value:.1}"))
            .context("remote temperature publish failed")
    }

    fn use_internal(&mut self, using_internal: bool) -> anyhow::Result<()> {
        let payload = if using_internal { "ON" } else { "OFF" };
        self.mqtt
            .try_publish(TOPIC_USING_INTERNAL, QoS::AtLeastOnce, true, payload)
            .context("internal sensing publish failed")
    }

    fn vane(&mut self, position: VanePosition) -> anyhow::Result<()> {
        self.mqtt
            .try_publish(
                TOPIC_VANE_STATE,
                QoS::AtLeastOnce,
                false,
                format!("{:#04x}", position.code()),
            )
            .context("vane publish failed")
    }

    fn horizontal_vane(&mut self, position: HorizontalVanePosition) -> anyhow::Result<()> {
        self.mqtt
            .try_publish(
                TOPIC_HORIZONTAL_VANE_STATE,
                QoS::AtLeastOnce,
                false,
                format!("{:#04x}", position.code()),
            )
            .context("horizontal vane publish failed")
    }
}

pub fn execute_actions<S: ProtocolSink>(sink: &mut S, actions: Vec<ArbiterAction>) {
    for action in actions {
        let result = match &action {
            ArbiterAction::Forward {
                source,
                value,
                cause,
            } => {
                info!(source = %source, value, ?cause, "forwarding temperature");
                sink.forward(*value)
            }
            ArbiterAction::Fallback { previous, reason } => {
                warn!(previous = %previous, reason = reason.as_str(), "temperature source fallback");
                Ok(())
            }
            ArbiterAction::InternalSensing(using_internal) => {
                info!(using_internal, "internal temperature sensing changed");
                sink.use_internal(*using_internal)
            }
        };

        if let Err(err) = result {
            warn!("protocol sink error for {action:?}: {err:#}");
        }
    }
}

#[cfg(test)]
pub mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use heatpump_common::{FallbackReason, ForwardCause};

    #[derive(Debug, Default)]
    pub struct RecordingSink {
        pub calls: Vec<String>,
        pub fail_forward: bool,
    }

    impl ProtocolSink for RecordingSink {
        fn forward(&mut self, value: f32) -> anyhow::Result<()> {
            self.calls.push(format!("forward {value}"));
            if self.fail_forward {
                anyhow::bail!("link down");
            }
            Ok(())
        }

        fn use_internal(&mut self, using_internal: bool) -> anyhow::Result<()> {
            self.calls.push(format!("use_internal {using_internal}"));
            Ok(())
        }

        fn vane(&mut self, position: VanePosition) -> anyhow::Result<()> {
            self.calls.push(format!("vane {:#04x}", position.code()));
            Ok(())
        }

        fn horizontal_vane(&mut self, position: HorizontalVanePosition) -> anyhow::Result<()> {
            self.calls
                .push(format!("horizontal_vane {:#04x}", position.code()));
            Ok(())
        }
    }

    #[test]
    fn executes_actions_in_order() {
        let mut sink = RecordingSink::default();
        execute_actions(
            &mut sink,
            vec![
                ArbiterAction::Fallback {
                    previous: "kitchen".to_string(),
                    reason: FallbackReason::Timeout,
                },
                ArbiterAction::InternalSensing(true),
                ArbiterAction::Forward {
                    source: "Internal Temperature".to_string(),
                    value: 19.5,
                    cause: ForwardCause::Fallback,
                },
            ],
        );

        assert_eq!(sink.calls, vec!["use_internal true", "forward 19.5"]);
    }

    #[test]
    fn sink_errors_do_not_stop_remaining_actions() {
        let mut sink = RecordingSink {
            fail_forward: true,
            ..RecordingSink::default()
        };
        execute_actions(
            &mut sink,
            vec![
                ArbiterAction::Forward {
                    source: "kitchen".to_string(),
                    value: 21.0,
                    cause: ForwardCause::Update,
                },
                ArbiterAction::InternalSensing(false),
            ],
        );

        assert_eq!(sink.calls, vec!["forward 21", "use_internal false"]);
    }
}
