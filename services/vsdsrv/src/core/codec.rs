//! Value codec
//!
//! Pure conversions between raw 16-bit words (or coil bits) and engineering
//! values, plus the two-characters-per-word ASCII packing used by the site
//! name field.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::catalog::PrimitiveType;

/// Distance, in units of the product's last place, under which
/// `value * scale` is treated as an exact integer
const SNAP_ULPS: f64 = 4.0;

/// Decoded engineering value
///
/// Integral when the register scale is 1 (coils included), fractional otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum PointValue {
    Int(i64),
    Float(f64),
}

impl PointValue {
    pub fn as_f64(self) -> f64 {
        match self {
            PointValue::Int(v) => v as f64,
            PointValue::Float(v) => v,
        }
    }
}

impl std::fmt::Display for PointValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointValue::Int(v) => write!(f, "{}", v),
            PointValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Raw value as it travels on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum RawValue {
    Word(u16),
    Coil(bool),
}

impl RawValue {
    fn as_word(self) -> u16 {
        match self {
            RawValue::Word(w) => w,
            RawValue::Coil(b) => u16::from(b),
        }
    }
}

/// Convert a raw reading into its engineering value
pub fn decode(raw: RawValue, primitive_type: PrimitiveType, scale: u32) -> PointValue {
    let integral = match primitive_type {
        PrimitiveType::Coil => {
            let on = match raw {
                RawValue::Coil(b) => b,
                RawValue::Word(w) => w != 0,
            };
            return PointValue::Int(i64::from(on));
        },
        PrimitiveType::Uint16 => i64::from(raw.as_word()),
        PrimitiveType::Int16 => i64::from(raw.as_word() as i16),
    };

    if scale <= 1 {
        PointValue::Int(integral)
    } else {
        PointValue::Float(integral as f64 / f64::from(scale))
    }
}

/// Convert an engineering value into the raw value to transmit
///
/// Numeric values are scaled, truncated toward zero and wrapped to 16 bits.
/// Products within floating-point noise of an integer snap to that integer
/// first, so `0.29 * 100` encodes as 29.
pub fn encode(value: f64, primitive_type: PrimitiveType, scale: u32) -> RawValue {
    if primitive_type.is_coil() {
        return RawValue::Coil(value > 0.0);
    }

    let product = value * f64::from(scale.max(1));
    let nearest = product.round();
    let integral = if (product - nearest).abs() <= SNAP_ULPS * f64::EPSILON * product.abs() {
        nearest
    } else {
        product.trunc()
    };

    // rem_euclid is exact for finite doubles, so huge products still wrap
    RawValue::Word(integral.rem_euclid(65536.0) as u16)
}

/// Unpack ASCII text, high byte first, dropping trailing NUL padding
pub fn decode_ascii(words: &[u16]) -> String {
    let mut bytes: Vec<u8> = words
        .iter()
        .flat_map(|w| [(w >> 8) as u8, (w & 0xFF) as u8])
        .collect();
    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    bytes.into_iter().map(char::from).collect()
}

/// Pack text into `word_count` registers, truncating or NUL-padding as needed
///
/// Characters outside the 8-bit range are sent as `?`.
pub fn encode_ascii(text: &str, word_count: usize) -> Vec<u16> {
    let width = word_count * 2;
    let mut bytes: Vec<u8> = text
        .chars()
        .take(width)
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect();
    bytes.resize(width, 0);

    bytes
        .chunks_exact(2)
        .map(|pair| (u16::from(pair[0]) << 8) | u16::from(pair[1]))
        .collect()
}
