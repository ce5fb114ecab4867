//! PCM16 codec for the agent link.
//!
//! Audio crosses the WebSocket as base64-encoded little-endian signed
//! 16-bit PCM. Internally everything is mono f32 in [-1.0, 1.0], so both
//! directions pass through here.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{Result, TamuError};

/// Encode f32 samples as base64 PCM16LE.
///
/// Samples are scaled by 32768 and clamped, never wrapped: +1.0 maps to
/// 32767 and -1.0 maps to -32768, and anything beyond saturates.
pub fn encode_base64(samples: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let scaled = (sample * 32768.0).clamp(-32768.0, 32767.0) as i16;
        bytes.extend_from_slice(&scaled.to_le_bytes());
    }
    BASE64.encode(bytes)
}

/// Decode base64 PCM16LE into f32 samples.
///
/// A trailing odd byte is ignored. Invalid base64 is an error; the session
/// treats it as a malformed frame and skips it.
pub fn decode_base64(encoded: &str) -> Result<Vec<f32>> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| TamuError::Transport(format!("audio payload decode: {e}")))?;

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_scale_clamps_instead_of_wrapping() {
        let encoded = encode_base64(&[1.0, -1.0, 2.0, -2.0]);
        let bytes = BASE64.decode(encoded).unwrap();

        let v0 = i16::from_le_bytes([bytes[0], bytes[1]]);
        let v1 = i16::from_le_bytes([bytes[2], bytes[3]]);
        let v2 = i16::from_le_bytes([bytes[4], bytes[5]]);
        let v3 = i16::from_le_bytes([bytes[6], bytes[7]]);
        assert_eq!(v0, 32767);
        assert_eq!(v1, -32768);
        assert_eq!(v2, 32767);
        assert_eq!(v3, -32768);
    }

    #[test]
    fn round_trip_preserves_samples_within_quantization() {
        let original = [0.0f32, 0.25, -0.5, 0.9, -0.9];
        let decoded = decode_base64(&encode_base64(&original)).unwrap();

        assert_eq!(decoded.len(), original.len());
        for (a, b) in original.iter().zip(&decoded) {
            assert!((a - b).abs() < 1.0 / 32768.0 * 2.0, "{a} vs {b}");
        }
    }

    #[test]
    fn decode_ignores_trailing_odd_byte() {
        let encoded = BASE64.encode([0x00u8, 0x40, 0x7f]);
        let samples = decode_base64(&encoded).unwrap();
        assert_eq!(samples.len(), 1);
        assert!((samples[0] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        assert!(decode_base64("not base64 !!!").is_err());
    }

    #[test]
    fn empty_input_round_trips_empty() {
        let encoded = encode_base64(&[]);
        assert!(decode_base64(&encoded).unwrap().is_empty());
    }
}
