//! Hoarding CRUD orchestration.
//!
//! Every operation is request-scoped: parse and validate first, then the
//! external image round trips, then a single-document write. Failures
//! after an upload leave the uploaded image behind for manual cleanup;
//! the id is logged so it can be found.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::elasticsearch::{HoardingStore, ListParams};
use crate::geo::{
    bounding_box_query, midpoint_query, parse_point, run_route_query, CoordinateInput,
};
use crate::imagery::ImageHost;
use crate::models::{GeoPoint, Hoarding, HoardingDraft, HoardingPatch, HoardingSummary, Location};
use crate::vision::{HoardingDetails, VisionAnalyzer};

const CREATE_FAILED: &str = "Could not create hoarding.";
const UPDATE_FAILED: &str = "Could not update hoarding.";
const REMOVE_FAILED: &str = "Could not remove hoarding.";
const FETCH_FAILED: &str = "Could not fetch hoardings.";
const SEARCH_FAILED: &str = "Could not search hoardings.";

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input, with the offending field named.
    #[error("{field}: {problem}")]
    Validation {
        field: &'static str,
        problem: String,
    },
    #[error("Hoarding with ID \"{0}\" not found")]
    NotFound(String),
    /// Anything that failed past validation. The public message stays
    /// generic, the cause goes to the log only.
    #[error("{public}")]
    Internal {
        public: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ServiceError {
    fn internal(public: &'static str, source: anyhow::Error) -> Self {
        error!("{} {:?}", public, source);
        Self::Internal { public, source }
    }

    fn validation(field: &'static str, problem: impl ToString) -> Self {
        Self::Validation {
            field,
            problem: problem.to_string(),
        }
    }
}

/// An image as it arrived in the request.
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

pub struct HoardingService {
    store: HoardingStore,
    imagery: ImageHost,
    vision: Option<Box<dyn VisionAnalyzer>>,
}

impl HoardingService {
    pub fn new(
        store: HoardingStore,
        imagery: ImageHost,
        vision: Option<Box<dyn VisionAnalyzer>>,
    ) -> Self {
        Self {
            store,
            imagery,
            vision,
        }
    }

    /// Register a new hoarding: validate, optionally autofill details
    /// from the photo, upload the photo, then write the document.
    pub async fn create(
        &self,
        mut draft: HoardingDraft,
        coordinates: CoordinateInput,
        image: ImageUpload,
    ) -> Result<Hoarding, ServiceError> {
        let point = parse_point(&coordinates)
            .map_err(|e| ServiceError::validation("coordinates", e))?;

        if let Some(vision) = &self.vision {
            let wants_autofill = draft.name.is_none()
                || draft.address.is_none()
                || draft.width.is_none()
                || draft.height.is_none();
            if wants_autofill {
                if let Some(details) = vision
                    .extract_details(&image.bytes, &image.content_type)
                    .await
                {
                    debug!("Vision autofill: {:?}", details);
                    merge_details(&mut draft, details);
                }
            }
        }

        let stored = self
            .imagery
            .upload(image.bytes, &image.filename, &image.content_type)
            .await
            .map_err(|e| ServiceError::internal(CREATE_FAILED, e))?;

        let hoarding = Hoarding::from_draft(
            Uuid::new_v4().to_string(),
            draft,
            Location::from(point),
            stored.secure_url,
            Utc::now(),
        );

        if let Err(e) = self.store.save(&hoarding).await {
            warn!(
                "Orphaned image {} after failed create of {}",
                stored.public_id, hoarding.id
            );
            return Err(ServiceError::internal(CREATE_FAILED, e));
        }

        info!("Created hoarding {}", hoarding.id);
        Ok(hoarding)
    }

    /// Paged summary listing.
    pub async fn list(
        &self,
        params: ListParams,
    ) -> Result<(Vec<HoardingSummary>, u64), ServiceError> {
        self.store
            .list(&params)
            .await
            .map_err(|e| ServiceError::internal(FETCH_FAILED, e))
    }

    pub async fn get(&self, id: &str) -> Result<Hoarding, ServiceError> {
        self.store
            .get(id)
            .await
            .map_err(|e| ServiceError::internal(FETCH_FAILED, e))?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    /// Partial update. A new image replaces the old one on the host; new
    /// coordinates rebuild the location field as a whole.
    pub async fn update(
        &self,
        id: &str,
        mut patch: HoardingPatch,
        coordinates: Option<CoordinateInput>,
        image: Option<ImageUpload>,
    ) -> Result<Hoarding, ServiceError> {
        let existing = self.get(id).await?;

        if let Some(input) = coordinates {
            let point =
                parse_point(&input).map_err(|e| ServiceError::validation("coordinates", e))?;
            patch.location = Some(Location::from(point));
        }

        let mut replacement_public_id = None;
        if let Some(upload) = image {
            if let Some(public_id) = self.imagery.public_id_from_url(&existing.image_url) {
                self.imagery
                    .destroy(&public_id)
                    .await
                    .map_err(|e| ServiceError::internal(UPDATE_FAILED, e))?;
            }

            let stored = self
                .imagery
                .upload(upload.bytes, &upload.filename, &upload.content_type)
                .await
                .map_err(|e| ServiceError::internal(UPDATE_FAILED, e))?;
            patch.image_url = Some(stored.secure_url);
            replacement_public_id = Some(stored.public_id);
        }

        let updated = existing.apply(patch, Utc::now());
        if let Err(e) = self.store.save(&updated).await {
            if let Some(public_id) = replacement_public_id {
                warn!(
                    "Orphaned image {} after failed update of {}",
                    public_id, updated.id
                );
            }
            return Err(ServiceError::internal(UPDATE_FAILED, e));
        }

        info!("Updated hoarding {}", updated.id);
        Ok(updated)
    }

    /// Delete a hoarding and its hosted image. Returns the deleted
    /// document.
    pub async fn remove(&self, id: &str) -> Result<Hoarding, ServiceError> {
        let existing = self.get(id).await?;

        if let Some(public_id) = self.imagery.public_id_from_url(&existing.image_url) {
            self.imagery
                .destroy(&public_id)
                .await
                .map_err(|e| ServiceError::internal(REMOVE_FAILED, e))?;
        }

        let deleted = self
            .store
            .delete(id)
            .await
            .map_err(|e| ServiceError::internal(REMOVE_FAILED, e))?;
        if !deleted {
            return Err(ServiceError::NotFound(id.to_string()));
        }

        info!("Removed hoarding {}", id);
        Ok(existing)
    }

    /// Hoardings within 15 km of the route's midpoint, nearest first.
    pub async fn find_in_between(
        &self,
        source: CoordinateInput,
        destination: CoordinateInput,
    ) -> Result<Vec<Hoarding>, ServiceError> {
        let (s, d) = self.route_endpoints(source, destination)?;
        run_route_query(&self.store, &midpoint_query(s, d))
            .await
            .map_err(|e| ServiceError::internal(SEARCH_FAILED, e))
    }

    /// Hoardings inside the rectangle spanned by the route's endpoints.
    pub async fn find_on_route(
        &self,
        source: CoordinateInput,
        destination: CoordinateInput,
    ) -> Result<Vec<Hoarding>, ServiceError> {
        let (s, d) = self.route_endpoints(source, destination)?;
        run_route_query(&self.store, &bounding_box_query(s, d))
            .await
            .map_err(|e| ServiceError::internal(SEARCH_FAILED, e))
    }

    fn route_endpoints(
        &self,
        source: CoordinateInput,
        destination: CoordinateInput,
    ) -> Result<(GeoPoint, GeoPoint), ServiceError> {
        let s = parse_point(&source).map_err(|e| ServiceError::validation("source", e))?;
        let d = parse_point(&destination)
            .map_err(|e| ServiceError::validation("destination", e))?;
        Ok((s, d))
    }
}

/// Fill only the fields the operator left blank.
fn merge_details(draft: &mut HoardingDraft, details: HoardingDetails) {
    if draft.name.is_none() {
        draft.name = details.name;
    }
    if draft.address.is_none() {
        draft.address = details.address;
    }
    if draft.width.is_none() {
        draft.width = details.width_in_feet;
    }
    if draft.height.is_none() {
        draft.height = details.height_in_feet;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autofill_never_overwrites_operator_input() {
        let mut draft = HoardingDraft {
            name: Some("Main Road Billboard".to_string()),
            width: None,
            ..Default::default()
        };
        merge_details(
            &mut draft,
            HoardingDetails {
                name: Some("Some Other Name".to_string()),
                address: Some("Ring Road".to_string()),
                width_in_feet: Some(40.0),
                height_in_feet: None,
            },
        );
        assert_eq!(draft.name.as_deref(), Some("Main Road Billboard"));
        assert_eq!(draft.address.as_deref(), Some("Ring Road"));
        assert_eq!(draft.width, Some(40.0));
        assert_eq!(draft.height, None);
    }

    #[test]
    fn not_found_message_names_the_id() {
        let err = ServiceError::NotFound("64f1".to_string());
        assert_eq!(err.to_string(), "Hoarding with ID \"64f1\" not found");
    }

    #[test]
    fn validation_message_names_the_field() {
        let err = ServiceError::validation("source", "expected exactly two coordinates");
        assert!(err.to_string().starts_with("source:"));
    }
}
