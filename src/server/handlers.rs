//! JSON API handlers: palette metadata, preview, dataset inspection and
//! batch generation.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::binding::{DataRow, Dataset, Variable};
use crate::document::{element_kinds, DesignElement, Document, ElementKind};
use crate::generate::{BatchOutput, CreditCheck, OutputOptions};
use crate::render::render_document;
use crate::LaureaError;

use super::state::AppState;

type ApiError = (StatusCode, Json<serde_json::Value>);

/// Map library errors to HTTP: precondition and input problems are the
/// client's fault, everything else is ours.
fn api_error(err: LaureaError) -> ApiError {
    let status = match &err {
        LaureaError::Validation(_)
        | LaureaError::EmptyDesign
        | LaureaError::NoData
        | LaureaError::Dataset(_)
        | LaureaError::InsufficientPoints { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}

#[derive(Serialize)]
pub struct PaletteEntry {
    #[serde(rename = "type")]
    type_name: String,
    label: String,
    default: DesignElement,
}

/// Handle GET /api/elements - element palette for the frontend.
pub async fn elements() -> Json<Vec<PaletteEntry>> {
    let entries = element_kinds()
        .into_iter()
        .zip(ElementKind::all_editor_defaults())
        .map(|(meta, kind)| PaletteEntry {
            type_name: meta.type_name,
            label: meta.label,
            default: DesignElement::new_at(kind, 0.0, 0.0),
        })
        .collect();
    Json(entries)
}

#[derive(Deserialize)]
pub struct PreviewRequest {
    pub design: Document,
    /// Optional sample row to resolve variables against.
    #[serde(default)]
    pub row: Option<DataRow>,
}

/// Handle POST /api/design/preview - render a design as PNG.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PreviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let assets = state
        .assets
        .resolve_document(&req.design)
        .await
        .map_err(api_error)?;
    let row = req.row.unwrap_or_default();
    let page =
        render_document(&req.design, &row, &assets, &state.fonts).map_err(api_error)?;

    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(page)
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .map_err(|e| api_error(LaureaError::Render(format!("PNG encode failed: {}", e))))?;

    Ok(([(header::CONTENT_TYPE, "image/png")], bytes))
}

#[derive(Serialize)]
pub struct InspectResponse {
    pub variables: Vec<Variable>,
    pub row_count: usize,
}

/// Handle POST /api/dataset/inspect - CSV bytes in, inferred schema out.
pub async fn inspect_dataset(body: Bytes) -> Result<Json<InspectResponse>, ApiError> {
    let dataset = Dataset::from_csv(&body).map_err(api_error)?;
    Ok(Json(InspectResponse {
        row_count: dataset.rows.len(),
        variables: dataset.variables,
    }))
}

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub design: Document,
    pub dataset: Dataset,
    pub options: OutputOptions,
    #[serde(default)]
    pub credit: Option<CreditCheck>,
}

/// Handle POST /api/generate - run a batch and stream back the result.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let generator = state.generator();
    let output = generator
        .generate(
            &req.design,
            &req.dataset,
            &req.options,
            req.credit,
            None,
            |percent| tracing::debug!(percent, "batch progress"),
        )
        .await
        .map_err(api_error)?;

    let (file, kind) = match &output {
        BatchOutput::Single(f) => (f, "file"),
        BatchOutput::Archive(f) => (f, "archive"),
    };
    tracing::info!(name = %file.name, kind, bytes = file.bytes.len(), "batch complete");

    let headers = [
        (header::CONTENT_TYPE, file.content_type.clone()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file.name),
        ),
    ];
    Ok((headers, file.bytes.clone()))
}
