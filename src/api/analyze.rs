//! Audio analysis endpoint
//!
//! `POST /api/solfa/analyze` accepts a multipart upload (field `audio`),
//! decodes it, and returns the transcribed solfa note events. The content
//! type is validated before any bytes are decoded; the whole upload is read
//! into memory and discarded when the response is built.

use anyhow::Context;
use axum::{
    extract::multipart::MultipartError,
    extract::Multipart,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::analysis::{self, NoteEvent};
use crate::audio;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const INVALID_FILE_TYPE: &str = "Invalid file type, please upload audio.";

/// Analysis response body
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    /// Note events in onset order
    pub notes: Vec<NoteEvent>,
}

/// POST /api/solfa/analyze
pub async fn analyze(mut multipart: Multipart) -> ApiResult<Json<AnalyzeResponse>> {
    let mut upload: Option<(Vec<u8>, Option<String>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("audio") {
            continue;
        }

        // Reject non-audio uploads before reading or decoding anything
        let is_audio = field
            .content_type()
            .map(|ct| ct.starts_with("audio"))
            .unwrap_or(false);
        if !is_audio {
            return Err(ApiError::InvalidInput(INVALID_FILE_TYPE.to_string()));
        }

        let extension = field
            .file_name()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_string());

        let bytes = field.bytes().await.map_err(multipart_error)?;

        upload = Some((bytes.to_vec(), extension));
        break;
    }

    let Some((bytes, extension)) = upload else {
        return Err(ApiError::InvalidInput(
            "Missing multipart field 'audio'".to_string(),
        ));
    };

    debug!("Received {} bytes of audio", bytes.len());

    // Decode + analysis are CPU-bound; keep them off the async executor.
    let notes = tokio::task::spawn_blocking(move || -> ApiResult<Vec<NoteEvent>> {
        let decoded = audio::decode_bytes(bytes, extension.as_deref())?;
        Ok(analysis::transcribe(&decoded.samples, decoded.sample_rate))
    })
    .await
    .context("Analysis task panicked")??;

    info!("Transcribed {} notes", notes.len());

    Ok(Json(AnalyzeResponse { notes }))
}

/// Map multipart failures: body-limit overruns keep their 413 status, every
/// other malformed body is the client's 400.
fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::InvalidInput(format!("Malformed multipart body: {}", e))
    }
}

/// Build analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/api/solfa/analyze", post(analyze))
}
