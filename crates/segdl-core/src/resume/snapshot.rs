//! Versioned snapshot record.

use serde::{Deserialize, Serialize};

use super::error::ResumeError;
use crate::segmenter::{Part, PartStatus, PartTable};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persisted part table: resource identity plus parts in schedule order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub url: String,
    pub size: Option<u64>,
    pub parts: Vec<Part>,
}

impl Snapshot {
    pub fn capture(table: &PartTable) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            url: table.url().to_string(),
            size: table.size(),
            parts: table.snapshot(),
        }
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>, ResumeError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode as plain data; the version is checked before the parts are trusted.
    pub(crate) fn decode(raw: &[u8]) -> Result<Self, ResumeError> {
        #[derive(Deserialize)]
        struct Header {
            version: u32,
        }
        let header: Header = serde_json::from_slice(raw)?;
        if header.version != SNAPSHOT_VERSION {
            return Err(ResumeError::UnsupportedVersion(header.version));
        }
        Ok(serde_json::from_slice(raw)?)
    }

    /// Bytes already downloaded according to the snapshot.
    pub fn downloaded(&self) -> u64 {
        self.parts.iter().map(Part::downloaded).sum()
    }

    /// Parts that were in flight or failed when the job stopped go back to pending.
    pub(crate) fn reset_unfinished(&mut self) {
        for part in &mut self.parts {
            if part.status != PartStatus::Completed {
                part.status = PartStatus::Pending;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::plan_parts;

    #[test]
    fn encode_decode_keeps_order_and_progress() {
        let mut parts = plan_parts(Some(30), 10);
        parts.rotate_right(1);
        let table = PartTable::new("http://h/f", Some(30), &parts);
        table.slot(0).advance(7);
        let snapshot = Snapshot::capture(&table);
        let decoded = Snapshot::decode(&snapshot.encode().unwrap()).unwrap();
        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.parts[0].start, 20);
        assert_eq!(decoded.downloaded(), 7);
    }

    #[test]
    fn decode_rejects_other_versions() {
        let raw = br#"{"version":2,"url":"u","size":null,"parts":[]}"#;
        assert!(matches!(
            Snapshot::decode(raw),
            Err(ResumeError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn statuses_are_plain_strings() {
        let table = PartTable::new("u", None, &plan_parts(None, 0));
        let json = String::from_utf8(Snapshot::capture(&table).encode().unwrap()).unwrap();
        assert!(json.contains(r#""status":"pending""#));
        assert!(json.contains(r#""end":null"#));
    }
}
