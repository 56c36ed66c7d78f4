//! Text decoding with an ordered list of encodings

use encoding_rs::{GBK, UTF_8, WINDOWS_1252};
use std::path::Path;

use crate::error::ScanError;

/// One decoding attempt
pub trait TextDecoder: Send + Sync {
    /// Encoding name used in diagnostics
    fn label(&self) -> &str;

    /// Decode the bytes, or explain why this encoding does not fit
    fn decode(&self, bytes: &[u8]) -> Result<String, String>;
}

/// UTF-8 with BOM removal; malformed sequences become U+FFFD
pub struct Utf8Decoder;

impl TextDecoder for Utf8Decoder {
    fn label(&self) -> &str {
        "utf-8"
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, String> {
        let (text, had_errors) = UTF_8.decode_with_bom_removal(bytes);
        if had_errors {
            log::debug!("Replaced malformed utf-8 sequences");
        }
        Ok(text.into_owned())
    }
}

/// GBK, for legacy Chinese text files; malformed sequences become U+FFFD
pub struct GbkDecoder;

impl TextDecoder for GbkDecoder {
    fn label(&self) -> &str {
        "gbk"
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, String> {
        let (text, _encoding, had_errors) = GBK.decode(bytes);
        if had_errors {
            log::debug!("Replaced malformed gbk sequences");
        }
        Ok(text.into_owned())
    }
}

/// Single-byte Latin fallback; every byte maps to a character, so it never fails
pub struct Latin1Decoder;

impl TextDecoder for Latin1Decoder {
    fn label(&self) -> &str {
        "latin1"
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, String> {
        let (text, _had_errors) = WINDOWS_1252.decode_without_bom_handling(bytes);
        Ok(text.into_owned())
    }
}

/// Ordered decoding attempts; the first success wins
pub struct DecodeChain {
    decoders: Vec<Box<dyn TextDecoder>>,
}

impl DecodeChain {
    /// Build a chain from explicit attempts
    pub fn new(decoders: Vec<Box<dyn TextDecoder>>) -> Self {
        Self { decoders }
    }

    /// UTF-8, then GBK, then Latin-1
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(Utf8Decoder),
            Box::new(GbkDecoder),
            Box::new(Latin1Decoder),
        ])
    }

    /// Labels of the attempts, in order
    pub fn labels(&self) -> Vec<&str> {
        self.decoders.iter().map(|d| d.label()).collect()
    }

    /// Decode file bytes, returning a `DecodeFailure` when every attempt fails
    pub fn decode(&self, path: &Path, bytes: &[u8]) -> Result<String, ScanError> {
        let mut failures = Vec::with_capacity(self.decoders.len());
        for decoder in &self.decoders {
            match decoder.decode(bytes) {
                Ok(text) => {
                    if !failures.is_empty() {
                        log::debug!("Decoded {:?} as {}", path, decoder.label());
                    }
                    return Ok(text);
                }
                Err(reason) => {
                    log::warn!(
                        "Failed to decode {:?} as {}: {}",
                        path,
                        decoder.label(),
                        reason
                    );
                    failures.push(format!("{}: {}", decoder.label(), reason));
                }
            }
        }
        Err(ScanError::decode_failure(
            path.to_path_buf(),
            format!("no encoding fits ({})", failures.join("; ")),
        ))
    }
}

impl Default for DecodeChain {
    fn default() -> Self {
        Self::standard()
    }
}
