//! Full-text attachments stored as `<recid>.txt` files.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::types::{FullTextSource, RecordId, StoreError};
use crate::text::sanitize_utf16;

/// Reads extracted text from a directory of per-record text files.
#[derive(Debug, Clone)]
pub struct DirectoryFullText {
    root: PathBuf,
}

impl DirectoryFullText {
    /// Serve attachments found under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn attachment_path(&self, recid: RecordId) -> PathBuf {
        self.root.join(format!("{recid}.txt"))
    }
}

#[async_trait]
impl FullTextSource for DirectoryFullText {
    async fn full_text(&self, recid: RecordId) -> Result<String, StoreError> {
        let path = self.attachment_path(recid);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::MissingAttachment(recid));
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        decode_attachment(recid, &bytes)
    }
}

/// Full-text source for deployments without attachments.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFullText;

#[async_trait]
impl FullTextSource for NoFullText {
    async fn full_text(&self, recid: RecordId) -> Result<String, StoreError> {
        Err(StoreError::MissingAttachment(recid))
    }
}

/// Decode attachment bytes.
///
/// A UTF-16 byte-order mark selects UTF-16 decoding, which drops unpaired surrogates. Anything
/// else must be strict UTF-8; a leading UTF-8 byte-order mark is stripped.
pub fn decode_attachment(recid: RecordId, bytes: &[u8]) -> Result<String, StoreError> {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => utf16_units(recid, rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => utf16_units(recid, rest, u16::from_be_bytes),
        [0xEF, 0xBB, 0xBF, rest @ ..] => utf8(recid, rest),
        _ => utf8(recid, bytes),
    }
}

fn utf8(recid: RecordId, bytes: &[u8]) -> Result<String, StoreError> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|err| StoreError::Decode {
            recid,
            reason: err.to_string(),
        })
}

fn utf16_units(
    recid: RecordId,
    bytes: &[u8],
    assemble: fn([u8; 2]) -> u16,
) -> Result<String, StoreError> {
    if bytes.len() % 2 != 0 {
        return Err(StoreError::Decode {
            recid,
            reason: format!("odd UTF-16 payload length {}", bytes.len()),
        });
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| assemble([pair[0], pair[1]]))
        .collect();
    Ok(sanitize_utf16(&units))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_and_bom_prefixed_utf8() {
        assert_eq!(decode_attachment(1, b"plain").expect("utf8"), "plain");
        assert_eq!(
            decode_attachment(1, b"\xEF\xBB\xBFwith bom").expect("utf8 bom"),
            "with bom"
        );
    }

    #[test]
    fn decodes_utf16_and_drops_lone_surrogates() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in [u16::from(b'a'), 0xD800, u16::from(b'b')] {
            bytes.extend(unit.to_le_bytes());
        }
        assert_eq!(decode_attachment(4, &bytes).expect("utf16le"), "ab");

        let mut bytes = vec![0xFE, 0xFF];
        bytes.extend(u16::from(b'z').to_be_bytes());
        assert_eq!(decode_attachment(4, &bytes).expect("utf16be"), "z");
    }

    #[test]
    fn rejects_invalid_utf8() {
        let error = decode_attachment(9, b"\xC3\x28").unwrap_err();
        assert!(matches!(error, StoreError::Decode { recid: 9, .. }));
    }

    #[tokio::test]
    async fn missing_file_is_a_missing_attachment() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("5.txt"), "body of five").expect("write");
        let source = DirectoryFullText::new(dir.path());

        assert_eq!(source.full_text(5).await.expect("text"), "body of five");
        assert!(matches!(
            source.full_text(6).await,
            Err(StoreError::MissingAttachment(6))
        ));
        assert!(matches!(
            NoFullText.full_text(6).await,
            Err(StoreError::MissingAttachment(6))
        ));
    }
}
