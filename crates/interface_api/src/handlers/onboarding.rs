//! Onboarding handlers

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use tracing::{debug, info, instrument};

use core_kernel::{ApplicationId, CoreError};
use domain_onboarding::{
    Application, ApplicationPayload, BankVerification, DocumentCategory, DocumentUpload,
    DocumentsPayload, FileUploadPayload, OnboardingError, StatusView, ValidationErrors,
};

use crate::auth::{permissions, Claims};
use crate::dto::onboarding::*;
use crate::{error::ApiError, AppState};

/// Parses a path identifier; an unparseable id names no application
fn parse_application_id(raw: &str) -> Result<ApplicationId, ApiError> {
    raw.parse().map_err(|e: CoreError| {
        debug!(error = %e, "Unparseable application id");
        ApiError::NotFound(format!("Application not found: {}", raw))
    })
}

fn require_reviewer(claims: &Claims) -> Result<(), ApiError> {
    if claims.has_role(permissions::ONBOARDING_REVIEW) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "missing permission {}",
            permissions::ONBOARDING_REVIEW
        )))
    }
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("invalid multipart body: {}", err))
}

/// Submits a new onboarding application
#[instrument(skip(state, payload))]
pub async fn submit_application(
    State(state): State<AppState>,
    Json(payload): Json<ApplicationPayload>,
) -> Result<(StatusCode, Json<ApiResponse<SubmissionResponse>>), ApiError> {
    let application = state.service.submit(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Application submitted successfully",
            SubmissionResponse::from(&application),
        )),
    ))
}

/// Stores one document ahead of submission
///
/// Multipart fields: `file` (the content, with file name and content type)
/// and `documentType` (category wire name or slug).
#[instrument(skip(state, multipart))]
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<FileUploadPayload>>, ApiError> {
    let mut document_type: Option<String> = None;
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let content = field.bytes().await.map_err(multipart_error)?.to_vec();
                file = Some((file_name, content_type, content));
            }
            Some("documentType") => {
                document_type = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let mut errors = ValidationErrors::new();
    let category = match document_type.as_deref().map(str::trim) {
        None | Some("") => {
            errors.add("documentType", "required", "Document type is required");
            None
        }
        Some(raw) => match raw.parse::<DocumentCategory>() {
            Ok(category) => Some(category),
            Err(message) => {
                errors.add("documentType", "document_type.one_of", message);
                None
            }
        },
    };
    if file.is_none() {
        errors.add("file", "required", "File is required");
    }

    let (category, (file_name, content_type, content)) = match (category, file) {
        (Some(category), Some(file)) if errors.is_empty() => (category, file),
        _ => return Err(OnboardingError::Validation(errors).into()),
    };

    let upload = DocumentUpload::new(category, file_name, content_type, content);
    let file_size = upload.size() as i64;
    let file_name = upload.file_name.clone();
    let file_type = upload.content_type.clone();

    let url = state.service.upload_document(upload).await?;

    Ok(Json(ApiResponse::ok(
        "File uploaded successfully",
        FileUploadPayload {
            file_name: Some(file_name),
            file_size: Some(file_size),
            file_type: Some(file_type),
            file_url: Some(url),
            base64_data: None,
            uploaded_at: Some(Utc::now().to_rfc3339()),
        },
    )))
}

/// Status summary for applicants
pub async fn get_status(
    State(state): State<AppState>,
    Path(application_id): Path<String>,
) -> Result<Json<ApiResponse<StatusView>>, ApiError> {
    let application_id = parse_application_id(&application_id)?;
    let status = state.service.get_status(application_id).await?;
    Ok(Json(ApiResponse::ok("Application status retrieved", status)))
}

/// Full application record
pub async fn get_application(
    State(state): State<AppState>,
    Path(application_id): Path<String>,
) -> Result<Json<ApiResponse<Application>>, ApiError> {
    let application_id = parse_application_id(&application_id)?;
    let application = state.service.get_application(application_id).await?;
    Ok(Json(ApiResponse::ok("Application retrieved", application)))
}

pub async fn check_gst_number(
    State(state): State<AppState>,
    Query(query): Query<GstQuery>,
) -> Result<Json<ApiResponse<AvailabilityResponse>>, ApiError> {
    let available = state
        .service
        .check_tax_registration_number_available(&query.gst_number)
        .await?;
    let message = if available {
        "GST number is available"
    } else {
        "GST number is already registered"
    };
    Ok(Json(ApiResponse::ok(message, AvailabilityResponse { available })))
}

pub async fn check_pan_number(
    State(state): State<AppState>,
    Query(query): Query<PanQuery>,
) -> Result<Json<ApiResponse<AvailabilityResponse>>, ApiError> {
    let available = state
        .service
        .check_tax_id_available(&query.pan_number)
        .await?;
    let message = if available {
        "PAN is available"
    } else {
        "PAN is already registered"
    };
    Ok(Json(ApiResponse::ok(message, AvailabilityResponse { available })))
}

pub async fn verify_bank_account(
    State(state): State<AppState>,
    Query(query): Query<BankQuery>,
) -> Result<Json<ApiResponse<BankVerification>>, ApiError> {
    let verification = state
        .service
        .verify_bank_account(&query.account_number, &query.ifsc_code)
        .await?;
    Ok(Json(ApiResponse::ok("Bank account checked", verification)))
}

/// Replaces documents of an application waiting on the applicant
#[instrument(skip(state, documents))]
pub async fn supply_documents(
    State(state): State<AppState>,
    Path(application_id): Path<String>,
    Json(documents): Json<DocumentsPayload>,
) -> Result<Json<ApiResponse<StatusView>>, ApiError> {
    let application_id = parse_application_id(&application_id)?;
    let application = state
        .service
        .supply_documents(application_id, documents)
        .await?;
    Ok(Json(ApiResponse::ok(
        "Documents updated",
        application.status_view(),
    )))
}

/// Moves an application through review; the reviewer is the token subject
#[instrument(skip(state, claims, body), fields(reviewer = %claims.sub))]
pub async fn update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(application_id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<StatusView>>, ApiError> {
    require_reviewer(&claims)?;
    let application_id = parse_application_id(&application_id)?;

    let request = body.into_transition(claims.sub.clone());
    let application = state.service.transition(application_id, request).await?;

    info!(
        application_id = %application_id,
        status = %application.status(),
        "Review decision recorded"
    );
    Ok(Json(ApiResponse::ok(
        "Application status updated",
        application.status_view(),
    )))
}

/// Applications waiting in one status, oldest first
pub async fn review_queue(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<QueueQuery>,
) -> Result<Json<ApiResponse<Vec<StatusView>>>, ApiError> {
    require_reviewer(&claims)?;
    let applications = state.service.list_by_status(query.status).await?;
    let views = applications.iter().map(Application::status_view).collect();
    Ok(Json(ApiResponse::ok("Review queue retrieved", views)))
}
