//! Guest form state: the five visit fields plus the captured signature.
//!
//! The form has two writers racing on it: the visitor typing at the kiosk
//! and the voice agent pushing [`FieldPatch`] updates through tool calls.
//! There is no merge policy beyond last-write-wins per field, and patch
//! values land verbatim, so an agent can blank a field it set earlier.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, TamuError};
use crate::record::{new_id, now_millis, today_stamp, FieldPatch, VisitRecord};
use crate::store::GuestStore;

/// One editable field of the guest form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    VisitDate,
    VisitorName,
    Affiliation,
    Address,
    Purpose,
}

/// Read-only view of the current form, shaped for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSnapshot {
    pub visit_date: String,
    pub visitor_name: String,
    pub affiliation: String,
    pub address: String,
    pub purpose: String,
    pub signature_image: Option<String>,
}

/// The in-progress guest book entry.
#[derive(Debug, Clone)]
pub struct GuestForm {
    visit_date: String,
    visitor_name: String,
    affiliation: String,
    address: String,
    purpose: String,
    signature_image: Option<String>,
}

impl GuestForm {
    /// Fresh form with the visit date seeded to today and everything else
    /// blank.
    pub fn new() -> Self {
        Self {
            visit_date: today_stamp(),
            visitor_name: String::new(),
            affiliation: String::new(),
            address: String::new(),
            purpose: String::new(),
            signature_image: None,
        }
    }

    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot {
            visit_date: self.visit_date.clone(),
            visitor_name: self.visitor_name.clone(),
            affiliation: self.affiliation.clone(),
            address: self.address.clone(),
            purpose: self.purpose.clone(),
            signature_image: self.signature_image.clone(),
        }
    }

    /// Overwrite one field with typed input.
    pub fn set_field(&mut self, field: FormField, value: String) {
        match field {
            FormField::VisitDate => self.visit_date = value,
            FormField::VisitorName => self.visitor_name = value,
            FormField::Affiliation => self.affiliation = value,
            FormField::Address => self.address = value,
            FormField::Purpose => self.purpose = value,
        }
    }

    /// Apply an agent patch. Absent fields are left alone; present fields
    /// replace the current value even when the replacement is empty.
    pub fn apply_patch(&mut self, patch: &FieldPatch) {
        if let Some(name) = &patch.name {
            self.visitor_name = name.clone();
        }
        if let Some(affiliation) = &patch.affiliation {
            self.affiliation = affiliation.clone();
        }
        if let Some(address) = &patch.address {
            self.address = address.clone();
        }
        if let Some(purpose) = &patch.purpose {
            self.purpose = purpose.clone();
        }
    }

    pub fn set_signature(&mut self, data_uri: String) {
        self.signature_image = Some(data_uri);
    }

    pub fn clear_signature(&mut self) {
        self.signature_image = None;
    }

    pub fn has_signature(&self) -> bool {
        matches!(&self.signature_image, Some(uri) if !uri.is_empty())
    }

    /// Validate, persist and reset. Every text field must be non-blank after
    /// trimming and a signature must be present; the first failure aborts
    /// before anything is written, leaving the form exactly as it was.
    pub fn submit(&mut self, store: &GuestStore) -> Result<VisitRecord> {
        let visit_date = required(&self.visit_date, "visitDate")?;
        let visitor_name = required(&self.visitor_name, "visitorName")?;
        let affiliation = required(&self.affiliation, "affiliation")?;
        let address = required(&self.address, "address")?;
        let purpose = required(&self.purpose, "purpose")?;
        let signature_image = match &self.signature_image {
            Some(uri) if !uri.is_empty() => uri.clone(),
            _ => return Err(TamuError::SignatureRequired),
        };

        let record = VisitRecord {
            id: new_id("visit"),
            visit_date,
            visitor_name,
            affiliation,
            address,
            purpose,
            signature_image,
            created_at: now_millis(),
        };
        store.append_front(&record)?;
        info!(id = %record.id, "visit recorded");

        *self = GuestForm::new();
        Ok(record)
    }
}

impl Default for GuestForm {
    fn default() -> Self {
        Self::new()
    }
}

fn required(value: &str, field: &'static str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TamuError::MissingField(field));
    }
    Ok(trimmed.to_string())
}
