//! Label payload generation.
//!
//! The registry treats the payload as opaque: it is produced on create,
//! regenerated when the part number or location changes, and otherwise
//! stored and returned unchanged.

use serde_json::json;

/// The label inputs. Only these fields feed the payload, which is why a
/// patch touching anything else never regenerates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelRequest<'a> {
    pub part_number: &'a str,
    pub name: &'a str,
    pub location: &'a str,
}

pub trait LabelEncoder: Send + Sync {
    fn encode(&self, request: LabelRequest<'_>) -> String;
}

/// Default encoder: a small JSON document suitable for feeding a QR or
/// barcode renderer downstream.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainLabelEncoder;

impl LabelEncoder for PlainLabelEncoder {
    fn encode(&self, request: LabelRequest<'_>) -> String {
        json!({
            "part_number": request.part_number,
            "name": request.name,
            "location": request.location,
        })
        .to_string()
    }
}
