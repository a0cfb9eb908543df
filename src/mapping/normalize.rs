//! Scaling of raw tracking numbers into the 0..127 MIDI range.

pub const MIDI_MAX: i32 = 127;

/// Linear map of `value` from `[min, max]` onto `0..=127`.
///
/// The product is truncated toward zero and then clamped, so anything below
/// `min` lands on 0 and anything above `max` on 127. A degenerate range or a
/// NaN input yields 0.
pub fn normalize_axis(value: f32, min: f32, max: f32) -> u8 {
    let scaled = (value - min) / (max - min) * MIDI_MAX as f32;
    if scaled.is_nan() {
        return 0;
    }
    // `as` saturates on overflow and truncates toward zero
    (scaled as i32).clamp(0, MIDI_MAX) as u8
}

/// Heading of the basis vector `(basis_x, basis_y)` in whole degrees.
///
/// The raw `atan2` angle is rotated by a fixed 90 degrees, the per-hand
/// calibration offset is subtracted, and the result is brought into `[0, 360)`
/// by repeated adjustment rather than `%`, which keeps the wrap sign-correct
/// for any offset. Only then is it truncated to whole degrees.
pub fn heading_degrees(basis_x: f32, basis_y: f32, offset_deg: i32) -> i32 {
    let raw = f64::from(basis_y).atan2(f64::from(basis_x)).to_degrees();
    let mut degrees = raw + 90.0 - f64::from(offset_deg);
    while degrees < 0.0 {
        degrees += 360.0;
    }
    // also catches a tiny negative that became exactly 360.0 above
    while degrees >= 360.0 {
        degrees -= 360.0;
    }
    degrees as i32
}

/// `deg * 127 / 360` in integer arithmetic.
///
/// Truncation biases the result low: 359 degrees maps to 126, never 127.
pub fn degrees_to_controller_value(degrees: i32) -> u8 {
    (degrees * MIDI_MAX / 360).clamp(0, MIDI_MAX) as u8
}
