pub const TOPIC_SENSOR_PREFIX: &str = "heatpump/sensor/";
pub const TOPIC_SENSOR_SUFFIX: &str = "/temperature";
pub const TOPIC_SENSOR_WILDCARD: &str = "heatpump/sensor/+/temperature";
pub const TOPIC_INTERNAL_TEMP: &str = "heatpump/unit/internal_temperature";

pub const TOPIC_CONTROLLER_STATE: &str = "heatpump/controller/state";
pub const TOPIC_REMOTE_TEMP: &str = "heatpump/controller/remote_temperature";
pub const TOPIC_USING_INTERNAL: &str = "heatpump/controller/using_internal";
pub const TOPIC_VANE_STATE: &str = "heatpump/controller/vane";
pub const TOPIC_HORIZONTAL_VANE_STATE: &str = "heatpump/controller/horizontal_vane";

pub const TOPIC_CMD_SOURCE: &str = "heatpump/cmnd/temperature_source";
pub const TOPIC_CMD_VANE: &str = "heatpump/cmnd/vane";
pub const TOPIC_CMD_HORIZONTAL_VANE: &str = "heatpump/cmnd/horizontal_vane";

pub fn sensor_topic(source_id: &str) -> String {
    format!("{TOPIC_SENSOR_PREFIX}{source_id}{TOPIC_SENSOR_SUFFIX}")
}

/// Extracts the source id from a `heatpump/sensor/<id>/temperature` topic.
pub fn source_from_sensor_topic(topic: &str) -> Option<&str> {
    let id = topic
        .strip_prefix(TOPIC_SENSOR_PREFIX)?
        .strip_suffix(TOPIC_SENSOR_SUFFIX)?;
    if id.is_empty() || id.contains('/') {
        None
    } else {
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_topic_round_trips() {
        let topic = sensor_topic("kitchen");
        assert_eq!(topic, "heatpump/sensor/kitchen/temperature");
        assert_eq!(source_from_sensor_topic(&topic), Some("kitchen"));
    }

    #[test]
    fn rejects_foreign_topics() {
        assert_eq!(source_from_sensor_topic(TOPIC_INTERNAL_TEMP), None);
        assert_eq!(source_from_sensor_topic("heatpump/sensor//temperature"), None);
        assert_eq!(source_from_sensor_topic("heatpump/sensor/a/b/temperature"), None);
    }
}
