//! Receipt extraction endpoint.
//!
//! The extraction backend lives behind the [`BillExtractor`] trait so the
//! server does not care whether it is an OCR service, a vision model or a
//! test stub. The result is advisory: the client reviews it and then calls
//! `POST /bills`, where the real validation happens.

use api_types::extract::{ExtractRequest, ExtractedBill};
use axum::{Extension, Json, extract::State};
use base64::Engine as _;

use crate::{ServerError, server::ServerState, user};

/// Failure talking to the extraction backend.
#[derive(Debug)]
pub struct ExtractionError(pub String);

impl std::fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "extraction failed: {}", self.0)
    }
}

impl std::error::Error for ExtractionError {}

/// Turns a receipt image into a structured bill draft.
#[async_trait::async_trait]
pub trait BillExtractor: Send + Sync {
    async fn extract(&self, image: &[u8]) -> Result<ExtractedBill, ExtractionError>;
}

/// Runs a receipt image through the configured extraction backend.
pub async fn extract_bill(
    _: Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ExtractRequest>,
) -> Result<Json<ExtractedBill>, ServerError> {
    let image = base64::engine::general_purpose::STANDARD
        .decode(payload.image_base64.as_bytes())
        .map_err(|_| ServerError::Generic("image is not valid base64".to_string()))?;

    let extracted = state
        .extractor
        .extract(&image)
        .await
        .map_err(|err| ServerError::Extraction(err.to_string()))?;

    Ok(Json(extracted))
}
