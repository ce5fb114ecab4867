//! Guest record types shared across the form, store and recap layers.
//!
//! A [`VisitRecord`] is one completed guest book entry. A [`FieldPatch`] is a
//! partial update to the form in progress, produced either by the voice agent
//! (tool call arguments) or by manual edits in the kiosk UI. Field names on
//! the wire follow the agent tool schema, so a patch deserializes directly
//! from tool call arguments.

use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};

/// One completed guest book entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    pub id: String,
    /// Calendar date of the visit, `YYYY-MM-DD`.
    pub visit_date: String,
    pub visitor_name: String,
    /// School or organization the visitor belongs to (or a guardian's
    /// relation to a student).
    pub affiliation: String,
    pub address: String,
    pub purpose: String,
    /// Signature as a `data:image/png;base64,...` URI.
    pub signature_image: String,
    /// Unix epoch milliseconds at submission time.
    pub created_at: i64,
}

/// Partial form update. Absent fields are left untouched; present fields
/// overwrite, last write wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
}

impl FieldPatch {
    /// True when the patch carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.affiliation.is_none()
            && self.address.is_none()
            && self.purpose.is_none()
    }
}

/// Generates a collision-resistant id: `<prefix>-<epoch micros>-<random hex>`.
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}-{:08x}", Utc::now().timestamp_micros(), rand::random::<u32>())
}

/// Today's date in the local timezone, `YYYY-MM-DD`.
pub fn today_stamp() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Current time as Unix epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn visit_record_serializes_camel_case() {
        let record = VisitRecord {
            id: "visit-1".into(),
            visit_date: "2026-08-25".into(),
            visitor_name: "Budi Santoso".into(),
            affiliation: "SMP Negeri 2".into(),
            address: "Jl. Merdeka 5".into(),
            purpose: "konsultasi".into(),
            signature_image: "data:image/png;base64,AAAA".into(),
            created_at: 1_756_000_000_000,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["visitDate"], "2026-08-25");
        assert_eq!(value["visitorName"], "Budi Santoso");
        assert_eq!(value["signatureImage"], "data:image/png;base64,AAAA");
        assert_eq!(value["createdAt"], 1_756_000_000_000i64);
    }

    #[test]
    fn field_patch_tolerates_partial_args() {
        let patch: FieldPatch =
            serde_json::from_value(json!({ "name": "Siti", "purpose": "pengambilan rapor" }))
                .unwrap();
        assert_eq!(patch.name.as_deref(), Some("Siti"));
        assert_eq!(patch.purpose.as_deref(), Some("pengambilan rapor"));
        assert!(patch.affiliation.is_none());
        assert!(patch.address.is_none());
    }

    #[test]
    fn field_patch_skips_absent_fields_when_serialized() {
        let patch = FieldPatch { name: Some("Budi".into()), ..FieldPatch::default() };
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, json!({ "name": "Budi" }));
    }

    #[test]
    fn empty_patch_reports_empty() {
        assert!(FieldPatch::default().is_empty());
        let patch = FieldPatch { address: Some(String::new()), ..FieldPatch::default() };
        assert!(!patch.is_empty());
    }

    #[test]
    fn new_id_is_unique_and_prefixed() {
        let a = new_id("visit");
        let b = new_id("visit");
        assert!(a.starts_with("visit-"));
        assert_ne!(a, b);
    }

    #[test]
    fn today_stamp_is_iso_date() {
        let stamp = today_stamp();
        assert_eq!(stamp.len(), 10);
        assert_eq!(stamp.as_bytes()[4], b'-');
        assert_eq!(stamp.as_bytes()[7], b'-');
    }
}
