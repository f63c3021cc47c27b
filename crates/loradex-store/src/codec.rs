//! Lossless direction-vector codec.
//!
//! Vectors are canonical at single precision. The storage form is a flat
//! sequence of `f64`, each element being the exact widening of an `f32`:
//!
//! ```text
//! input (f32 or f64) ──narrow──▶ f32 ──widen──▶ f64   (encode)
//! f64 ──narrow──▶ f32                                  (decode)
//! ```
//!
//! Widening `f32 → f64` is exact, so `decode(encode(v))` reproduces the
//! narrowed input bit-for-bit whatever precision it arrived in.

use loradex_core::{Error, Result, Value};

/// Float types that can be canonicalised to single precision.
pub trait CanonicalFloat: Copy {
    /// Narrow to `f32` (identity for `f32`).
    fn to_single(self) -> f32;
}

impl CanonicalFloat for f32 {
    fn to_single(self) -> f32 {
        self
    }
}

impl CanonicalFloat for f64 {
    fn to_single(self) -> f32 {
        self as f32
    }
}

/// Encode a vector into its storage form.
///
/// Fails on empty input and on elements that are not finite once narrowed
/// (including `f64` values outside the `f32` range).
pub fn encode<F: CanonicalFloat>(vector: &[F]) -> Result<Vec<f64>> {
    if vector.is_empty() {
        return Err(Error::validation("direction must be non-empty"));
    }
    vector
        .iter()
        .enumerate()
        .map(|(i, x)| {
            let single = x.to_single();
            if single.is_finite() {
                Ok(f64::from(single))
            } else {
                Err(Error::validation(format!(
                    "direction[{i}] is not finite at single precision"
                )))
            }
        })
        .collect()
}

/// Decode a storage-form vector back to single precision.
pub fn decode(storage: &[f64]) -> Vec<f32> {
    storage.iter().map(|&x| x as f32).collect()
}

/// Canonicalise a vector cell into storage form.
///
/// Cells already in storage form come back bit-identical.
pub fn encode_value(value: Value) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::F32List(v) => Ok(Value::F64List(encode(&v)?)),
        Value::F64List(v) => Ok(Value::F64List(encode(&v)?)),
        other => Err(Error::type_coercion(format!(
            "direction must be a flat numeric sequence, got {}",
            other.type_name()
        ))),
    }
}

/// Decode a vector cell.
pub fn decode_value(value: &Value) -> Result<Vec<f32>> {
    match value {
        Value::F64List(v) => Ok(decode(v)),
        Value::F32List(v) => Ok(v.clone()),
        other => Err(Error::type_coercion(format!(
            "unsupported direction storage type: {} is neither a flat numeric sequence \
             nor a single-precision array",
            other.type_name()
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
