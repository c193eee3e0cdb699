use crate::error::FixedPointError;

pub const Q88_FRACTION_BITS: u32 = 8;
pub const Q88_SCALE: f32 = 256.0;

/// Largest value the transfer format can carry (32767/256).
pub const Q88_MAX: f32 = i16::MAX as f32 / Q88_SCALE;
pub const Q88_MIN: f32 = i16::MIN as f32 / Q88_SCALE;

/// Scales by 256 and truncates toward zero. A sample whose scaled value
/// leaves the signed 16-bit range is a fatal configuration error for the
/// whole run, not a per-sample event.
pub fn encode(value: f32) -> Result<u16, FixedPointError> {
    let scaled = (value * Q88_SCALE) as i64;
    if scaled < i16::MIN as i64 || scaled > i16::MAX as i64 {
        return Err(FixedPointError::OutOfRange { value });
    }
    Ok(scaled as i16 as u16)
}

pub fn decode(fx: u16) -> f32 {
    fx as i16 as f32 / Q88_SCALE
}
