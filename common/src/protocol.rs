//! Encodings shared with the heat pump link.

/// Readings at or above this are not representable on the wire.
pub const MAX_REMOTE_TEMP_C: f32 = 63.5;
/// Readings at or below this are not representable on the wire.
pub const MIN_REMOTE_TEMP_C: f32 = -64.0;

pub fn is_reportable_temperature(celsius: f32) -> bool {
    !celsius.is_nan() && celsius < MAX_REMOTE_TEMP_C && celsius > MIN_REMOTE_TEMP_C
}

/// Half-degree offset encoding used for remote temperature reports.
pub fn remote_temperature_byte(celsius: f32) -> u8 {
    if celsius < MIN_REMOTE_TEMP_C {
        return 0x00;
    }
    if celsius > MAX_REMOTE_TEMP_C {
        return 0xFF;
    }
    ((celsius * 2.0).round() as i32 + 128).clamp(0, 0xFF) as u8
}
