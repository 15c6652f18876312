//! Hoarding document structure shared by the store and the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geographic point (lat/lon)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// GeoJSON point geometry, stored verbatim in the index.
///
/// Elasticsearch's `geo_point` mapping accepts this object form directly,
/// so the document keeps the `{"type":"Point","coordinates":[lng,lat]}`
/// shape the API exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "type")]
    pub geo_type: String,
    pub coordinates: [f64; 2], // [longitude, latitude]
}

impl Location {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self {
            geo_type: "Point".to_string(),
            coordinates: [lon, lat],
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            lat: self.coordinates[1],
            lon: self.coordinates[0],
        }
    }
}

impl From<GeoPoint> for Location {
    fn from(point: GeoPoint) -> Self {
        Location::new(point.lon, point.lat)
    }
}

/// Owner-outreach negotiation state, independent of availability status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsultationStatus {
    #[default]
    Pending,
    InProgress,
    Consulted,
    NotInterested,
    Unreachable,
}

impl ConsultationStatus {
    /// Parse the wire label (e.g. "IN_PROGRESS")
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "PENDING" => Some(ConsultationStatus::Pending),
            "IN_PROGRESS" => Some(ConsultationStatus::InProgress),
            "CONSULTED" => Some(ConsultationStatus::Consulted),
            "NOT_INTERESTED" => Some(ConsultationStatus::NotInterested),
            "UNREACHABLE" => Some(ConsultationStatus::Unreachable),
            _ => None,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            ConsultationStatus::Pending => "PENDING",
            ConsultationStatus::InProgress => "IN_PROGRESS",
            ConsultationStatus::Consulted => "CONSULTED",
            ConsultationStatus::NotInterested => "NOT_INTERESTED",
            ConsultationStatus::Unreachable => "UNREACHABLE",
        }
    }

    /// All wire labels, for validation messages
    pub fn labels() -> &'static [&'static str] {
        &[
            "PENDING",
            "IN_PROGRESS",
            "CONSULTED",
            "NOT_INTERESTED",
            "UNREACHABLE",
        ]
    }
}

/// Main hoarding document held in the index.
///
/// One representation serves both the stored `_source` and API responses;
/// field names are camelCase on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hoarding {
    /// Store-assigned identity, also the document `_id`
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Point geometry, indexed for proximity and containment queries
    pub location: Location,

    /// Width in feet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,

    /// Height in feet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    /// Free-text availability label
    pub status: String,

    pub consultation_status: ConsultationStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_contact_number: Option<String>,

    /// Secure URL of the externally hosted photo
    pub image_url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create-time input: descriptive fields plus the validated location.
///
/// The image travels separately (it is uploaded before the record exists).
#[derive(Debug, Clone, Default)]
pub struct HoardingDraft {
    pub name: Option<String>,
    pub address: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub price: Option<f64>,
    pub status: Option<String>,
    pub consultation_status: Option<ConsultationStatus>,
    pub owner_name: Option<String>,
    pub owner_contact_number: Option<String>,
    pub notes: Option<String>,
}

/// Partial update: only present fields are serialized into the merge doc.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoardingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consultation_status: Option<ConsultationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_contact_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl HoardingPatch {
    /// True when no field would be written
    pub fn is_empty(&self) -> bool {
        serde_json::to_value(self)
            .map(|v| v.as_object().map(|o| o.is_empty()).unwrap_or(true))
            .unwrap_or(true)
    }
}

/// List-view projection (name, imageUrl, address, status, location).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoardingSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub location: Location,
}

impl Hoarding {
    /// Materialize a draft into a full document, applying the schema
    /// defaults (status "Unavailable", consultation PENDING).
    pub fn from_draft(
        id: String,
        draft: HoardingDraft,
        location: Location,
        image_url: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: draft.name,
            address: draft.address,
            location,
            width: draft.width,
            height: draft.height,
            price: draft.price,
            status: draft.status.unwrap_or_else(|| "Unavailable".to_string()),
            consultation_status: draft.consultation_status.unwrap_or_default(),
            owner_name: draft.owner_name,
            owner_contact_number: draft.owner_contact_number,
            image_url,
            notes: draft.notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn summary(&self) -> HoardingSummary {
        HoardingSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            image_url: Some(self.image_url.clone()),
            address: self.address.clone(),
            status: Some(self.status.clone()),
            location: self.location.clone(),
        }
    }

    /// Apply a partial update. Absent patch fields keep their stored
    /// value; fields cannot be cleared back to unset.
    pub fn apply(mut self, patch: HoardingPatch, now: DateTime<Utc>) -> Self {
        if patch.name.is_some() {
            self.name = patch.name;
        }
        if patch.address.is_some() {
            self.address = patch.address;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if patch.width.is_some() {
            self.width = patch.width;
        }
        if patch.height.is_some() {
            self.height = patch.height;
        }
        if patch.price.is_some() {
            self.price = patch.price;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(consultation_status) = patch.consultation_status {
            self.consultation_status = consultation_status;
        }
        if patch.owner_name.is_some() {
            self.owner_name = patch.owner_name;
        }
        if patch.owner_contact_number.is_some() {
            self.owner_contact_number = patch.owner_contact_number;
        }
        if let Some(image_url) = patch.image_url {
            self.image_url = image_url;
        }
        if patch.notes.is_some() {
            self.notes = patch.notes;
        }
        self.updated_at = now;
        self
    }
}
