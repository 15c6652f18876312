//! HTTP handlers and wire types.
//!
//! Success bodies use the `{statusCode, message, data}` envelope and
//! errors the `{statusCode, message, error}` shape the frontend already
//! speaks. Create and update arrive as multipart forms because the image
//! travels with the record fields.

use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use hoardmap::elasticsearch::ListParams;
use hoardmap::geo::CoordinateInput;
use hoardmap::hoardings::{ImageUpload, ServiceError};
use hoardmap::mail::ContactMessage;
use hoardmap::models::{ConsultationStatus, Hoarding, HoardingDraft, HoardingPatch, HoardingSummary};

use crate::AppState;

/// Upload cap for hoarding photos (4 MiB).
pub const MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;

const ALLOWED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/jpg"];

const MAX_PER_PAGE: usize = 100;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation { .. } => ApiError::BadRequest(err.to_string()),
            ServiceError::NotFound(_) => ApiError::NotFound(err.to_string()),
            ServiceError::Internal { .. } => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, "Bad Request", m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "Not Found", m),
            ApiError::Internal(m) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", m)
            }
        };
        let body = Json(json!({
            "statusCode": status.as_u16(),
            "message": message,
            "error": error
        }));
        (status, body).into_response()
    }
}

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(rename = "statusCode")]
    status_code: u16,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total: Option<u64>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(message: &'static str, data: T) -> Json<Self> {
        Json(Self {
            status_code: 200,
            message,
            data: Some(data),
            total: None,
        })
    }
}

/// Shared multipart decoding for create and update. Empty text fields
/// count as absent, unknown fields are dropped.
#[derive(Default)]
struct HoardingForm {
    draft: HoardingDraft,
    coordinates: Option<CoordinateInput>,
    image: Option<ImageUpload>,
}

impl HoardingForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
        {
            let Some(name) = field.name().map(String::from) else {
                continue;
            };

            if name == "image" {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
                    return Err(ApiError::BadRequest(
                        "image must be a png or jpeg file".to_string(),
                    ));
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("could not read image: {e}")))?;
                if bytes.len() > MAX_IMAGE_BYTES {
                    return Err(ApiError::BadRequest(
                        "image must be at most 4 MiB".to_string(),
                    ));
                }
                form.image = Some(ImageUpload {
                    bytes: bytes.to_vec(),
                    filename,
                    content_type,
                });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("could not read {name}: {e}")))?;
                form.set_text_field(&name, value)?;
            }
        }

        Ok(form)
    }

    fn set_text_field(&mut self, name: &str, value: String) -> Result<(), ApiError> {
        let value = value.trim().to_string();
        if value.is_empty() {
            return Ok(());
        }
        match name {
            "name" => self.draft.name = Some(value),
            "address" => self.draft.address = Some(value),
            "coordinates" => self.coordinates = Some(CoordinateInput::Text(value)),
            "width" => self.draft.width = Some(parse_number("width", &value)?),
            "height" => self.draft.height = Some(parse_number("height", &value)?),
            "price" => self.draft.price = Some(parse_number("price", &value)?),
            "status" => self.draft.status = Some(value),
            "consultationStatus" => {
                let status = ConsultationStatus::from_label(&value).ok_or_else(|| {
                    ApiError::BadRequest(format!(
                        "consultationStatus must be one of {}",
                        ConsultationStatus::labels().join(", ")
                    ))
                })?;
                self.draft.consultation_status = Some(status);
            }
            "ownerName" => self.draft.owner_name = Some(value),
            "ownerContactNumber" => self.draft.owner_contact_number = Some(value),
            "notes" => self.draft.notes = Some(value),
            // unknown fields are ignored rather than rejected
            _ => {}
        }
        Ok(())
    }

    fn into_patch(self) -> (HoardingPatch, Option<CoordinateInput>, Option<ImageUpload>) {
        let patch = HoardingPatch {
            name: self.draft.name,
            address: self.draft.address,
            location: None,
            width: self.draft.width,
            height: self.draft.height,
            price: self.draft.price,
            status: self.draft.status,
            consultation_status: self.draft.consultation_status,
            owner_name: self.draft.owner_name,
            owner_contact_number: self.draft.owner_contact_number,
            image_url: None,
            notes: self.draft.notes,
        };
        (patch, self.coordinates, self.image)
    }
}

fn parse_number(field: &str, value: &str) -> Result<f64, ApiError> {
    value
        .parse::<f64>()
        .map_err(|_| ApiError::BadRequest(format!("{field} must be a number")))
}

pub async fn create_hoarding(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Hoarding>>), ApiError> {
    let HoardingForm {
        draft,
        coordinates,
        image,
    } = HoardingForm::from_multipart(multipart).await?;
    let coordinates =
        coordinates.ok_or_else(|| ApiError::BadRequest("coordinates: required".to_string()))?;
    let image = image.ok_or_else(|| ApiError::BadRequest("image file is required".to_string()))?;

    let hoarding = state.service.create(draft, coordinates, image).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            status_code: 201,
            message: "Hoarding created successfully",
            data: Some(hoarding),
            total: None,
        }),
    ))
}

#[derive(Deserialize)]
pub struct ListQueryParams {
    page: Option<usize>,
    #[serde(rename = "perPage")]
    per_page: Option<usize>,
    /// Free-text search over name, address and notes
    q: Option<String>,
}

fn to_list_params(params: ListQueryParams) -> ListParams {
    ListParams {
        page: params.page.unwrap_or(1).max(1),
        per_page: params.per_page.unwrap_or(50).clamp(1, MAX_PER_PAGE),
        text: params.q.filter(|q| !q.trim().is_empty()),
    }
}

pub async fn list_hoardings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQueryParams>,
) -> Result<Json<ApiResponse<Vec<HoardingSummary>>>, ApiError> {
    let (summaries, total) = state.service.list(to_list_params(params)).await?;
    Ok(Json(ApiResponse {
        status_code: 200,
        message: "Hoardings retrieved successfully",
        data: Some(summaries),
        total: Some(total),
    }))
}

pub async fn get_hoarding(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Hoarding>>, ApiError> {
    let hoarding = state.service.get(&id).await?;
    Ok(ApiResponse::ok("Hoarding retrieved successfully", hoarding))
}

pub async fn update_hoarding(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<Hoarding>>, ApiError> {
    let form = HoardingForm::from_multipart(multipart).await?;
    let (patch, coordinates, image) = form.into_patch();
    let hoarding = state.service.update(&id, patch, coordinates, image).await?;
    Ok(ApiResponse::ok("Hoarding updated successfully", hoarding))
}

pub async fn delete_hoarding(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Hoarding>>, ApiError> {
    let hoarding = state.service.remove(&id).await?;
    Ok(ApiResponse::ok("Hoarding deleted successfully", hoarding))
}

/// `{source, destination}` where each endpoint is `[lng, lat]` or
/// `"lng,lat"`.
fn route_endpoints(
    body: &serde_json::Value,
) -> Result<(CoordinateInput, CoordinateInput), ApiError> {
    Ok((
        coordinate_field(body, "source")?,
        coordinate_field(body, "destination")?,
    ))
}

fn coordinate_field(body: &serde_json::Value, field: &str) -> Result<CoordinateInput, ApiError> {
    let value = body
        .get(field)
        .ok_or_else(|| ApiError::BadRequest(format!("{field} is required")))?;
    serde_json::from_value(value.clone()).map_err(|_| {
        ApiError::BadRequest(format!(
            "{field} must be [longitude, latitude] or a \"lng,lat\" string"
        ))
    })
}

pub async fn find_in_between(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ApiResponse<Vec<Hoarding>>>, ApiError> {
    let (source, destination) = route_endpoints(&body)?;
    let hoardings = state.service.find_in_between(source, destination).await?;
    Ok(ApiResponse::ok("Hoardings retrieved successfully", hoardings))
}

pub async fn route_hoardings(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ApiResponse<Vec<Hoarding>>>, ApiError> {
    let (source, destination) = route_endpoints(&body)?;
    let hoardings = state.service.find_on_route(source, destination).await?;
    Ok(ApiResponse::ok("Hoardings retrieved successfully", hoardings))
}

pub async fn send_mail(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let message: ContactMessage = serde_json::from_value(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid contact message: {e}")))?;
    message
        .validate()
        .map_err(|(field, problem)| ApiError::BadRequest(format!("{field}: {problem}")))?;

    state.mailer.send_contact(&message).await.map_err(|e| {
        tracing::error!("Contact mail failed: {}", e);
        ApiError::Internal("Could not send email.".to_string())
    })?;

    Ok(Json(ApiResponse {
        status_code: 200,
        message: "Email sent successfully",
        data: None,
        total: None,
    }))
}
