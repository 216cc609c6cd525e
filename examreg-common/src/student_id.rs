//! Obfuscated external student identifiers
//!
//! Public-facing lookups address a student by a reversible Hashids encoding
//! of the raw student id rather than the id itself. Links issued by older
//! frontend builds used a numeric encoding, so decoding falls back through
//! the legacy form before treating the path segment as a raw id.

use crate::{Error, Result};
use harsh::Harsh;

/// Salt shared with the frontend encoders. Override via config `id_salt`.
pub const DEFAULT_SALT: &str = "your-salt";

/// Minimum encoded length, matching the frontend configuration.
const MIN_LENGTH: usize = 10;

/// Hashids codec for student identifiers.
pub struct StudentIdCodec {
    harsh: Harsh,
}

impl StudentIdCodec {
    /// Build a codec for the given salt.
    pub fn new(salt: &str) -> Result<Self> {
        let harsh = Harsh::builder()
            .salt(salt)
            .length(MIN_LENGTH)
            .build()
            .map_err(|e| Error::Config(format!("Invalid hashids configuration: {}", e)))?;
        Ok(Self { harsh })
    }

    /// Encode a raw student id (hex-compatible digit string).
    ///
    /// Fails for ids containing non-hex characters; such ids are only ever
    /// addressed in raw form.
    pub fn encode(&self, student_id: &str) -> Result<String> {
        self.harsh
            .encode_hex(student_id)
            .map_err(|e| Error::InvalidInput(format!("Cannot encode student id: {}", e)))
    }

    /// Encode a numeric student id in the legacy form.
    pub fn encode_legacy(&self, student_id: u64) -> String {
        self.harsh.encode(&[student_id])
    }

    /// Resolve a public path segment to a raw student id.
    ///
    /// Fallback order: structured hex decode, then legacy numeric decode
    /// (first value, stringified), then the segment itself verbatim. The
    /// order is load-bearing for previously issued identifiers.
    pub fn resolve(&self, encoded: &str) -> String {
        if let Ok(hex) = self.harsh.decode_hex(encoded) {
            return hex;
        }
        if let Ok(numbers) = self.harsh.decode(encoded) {
            if let Some(first) = numbers.first() {
                return first.to_string();
            }
        }
        encoded.to_string()
    }
}
