//! L0 per-vector symmetric int8 quantization.
//!
//! Each vector is quantized independently with scale `s = max(|v|) / 127`; the
//! dequantized vector is used for distance computation during navigation, and the
//! final top-k is re-ranked against full-precision vectors
//! (`constants::QUANT_RERANK_MULTIPLIER`).

use serde::{Deserialize, Serialize};

/// A quantized vector: int8 components plus the scale used to produce them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantizedVector {
    pub codes: Vec<i8>,
    pub scale: f32,
}

impl QuantizedVector {
    /// Quantize `v` with a per-vector symmetric scale.
    #[must_use]
    pub fn quantize(v: &[f32]) -> Self {
        let max_abs = v.iter().fold(0.0_f32, |acc, x| acc.max(x.abs()));
        let scale = if max_abs > 0.0 { max_abs / 127.0 } else { 1.0 };
        let codes = v
            .iter()
            .map(|x| {
                let q = (x / scale).round();
                q.clamp(-127.0, 127.0) as i8
            })
            .collect();
        Self { codes, scale }
    }

    /// Reconstruct an approximate full-precision vector.
    #[must_use]
    pub fn dequantize(&self) -> Vec<f32> {
        self.codes
            .iter()
            .map(|&c| f32::from(c) * self.scale)
            .collect()
    }
}

/// Quality metrics for a quantization pass.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantizationQuality {
    pub mse: f32,
    pub mae: f32,
    pub max_abs_error: f32,
    /// Signal-to-quantization-noise ratio, in dB.
    pub sqnr_db: f32,
}

/// Compute quality metrics comparing an original vector to its quantized
/// round-trip.
#[must_use]
pub fn quality_metrics(original: &[f32], quantized: &QuantizedVector) -> QuantizationQuality {
    let reconstructed = quantized.dequantize();
    let n = original.len().max(1) as f32;

    let mut sum_sq_err = 0.0_f32;
    let mut sum_abs_err = 0.0_f32;
    let mut max_abs_err = 0.0_f32;
    let mut signal_power = 0.0_f32;

    for (o, r) in original.iter().zip(reconstructed.iter()) {
        let err = o - r;
        sum_sq_err += err * err;
        sum_abs_err += err.abs();
        max_abs_err = max_abs_err.max(err.abs());
        signal_power += o * o;
    }

    let mse = sum_sq_err / n;
    let mae = sum_abs_err / n;
    let noise_power = sum_sq_err / n;
    let sqnr_db = if noise_power > 0.0 {
        10.0 * (signal_power / n / noise_power).log10()
    } else {
        f32::INFINITY
    };

    QuantizationQuality {
        mse,
        mae,
        max_abs_error: max_abs_err,
        sqnr_db,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_close_for_unit_vector() {
        let v = vec![0.5_f32, -0.25, 0.125, 0.0];
        let q = QuantizedVector::quantize(&v);
        let r = q.dequantize();
        for (a, b) in v.iter().zip(r.iter()) {
            assert!((a - b).abs() < 0.01, "expected {a} ~= {b}");
        }
    }

    #[test]
    fn quality_metrics_are_finite_for_nonzero_vector() {
        let v = vec![1.0_f32, 2.0, -3.0, 4.0];
        let q = QuantizedVector::quantize(&v);
        let m = quality_metrics(&v, &q);
        assert!(m.mse >= 0.0);
        assert!(m.sqnr_db.is_finite() || m.sqnr_db == f32::INFINITY);
    }

    #[test]
    fn zero_vector_quantizes_without_panicking() {
        let v = vec![0.0_f32; 4];
        let q = QuantizedVector::quantize(&v);
        assert_eq!(q.codes, vec![0, 0, 0, 0]);
    }
}
