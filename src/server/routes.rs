use super::{AppState, ChatReply, ChatRequest, TranscribeReply};
use crate::concierge::APOLOGY_REPLY;
use crate::transcription::AudioUpload;
use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::BytesRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, warn};

const NO_FILE_UPLOADED: &str = "No file uploaded";
const INVALID_UPLOAD: &str = "Invalid upload";
const FILE_TOO_LARGE: &str = "File too large";
const TRANSCRIPTION_FAILED: &str = "Transcription failed";

fn apology() -> Json<ChatReply> {
    Json(ChatReply {
        reply: APOLOGY_REPLY.to_string(),
    })
}

/// `POST /api/chat`
///
/// The body is decoded by hand so that an oversized or malformed request
/// still gets a 200 with the apology instead of an extractor rejection.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Json<ChatReply> {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection, "Could not read chat request body");
            return apology();
        }
    };

    let request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Rejecting malformed chat request");
            return apology();
        }
    };

    let language = request.language.unwrap_or_default();
    debug!(history = request.history.len(), %language, "Chat request");

    let reply = state
        .responder
        .respond(&request.history, &request.message, language)
        .await;

    Json(ChatReply { reply })
}

/// `POST /api/transcribe`
pub async fn transcribe(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let upload = match multipart {
        Ok(multipart) => find_audio(multipart).await,
        Err(rejection) => {
            warn!(error = %rejection, "Transcription request is not multipart");
            Ok(None)
        }
    };

    let audio = match upload {
        Ok(Some(audio)) => audio,
        Ok(None) => return upload_error(StatusCode::BAD_REQUEST, NO_FILE_UPLOADED),
        Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!(error = %e, limit = super::MAX_AUDIO_BYTES, "Uploaded file exceeds the size limit");
            return upload_error(StatusCode::PAYLOAD_TOO_LARGE, FILE_TOO_LARGE);
        }
        Err(e) => {
            warn!(error = %e, "Malformed multipart body");
            return upload_error(StatusCode::BAD_REQUEST, INVALID_UPLOAD);
        }
    };

    match state.transcriber.transcribe(audio).await {
        Ok(text) => (StatusCode::OK, Json(TranscribeReply::Text { text })),
        Err(e) => {
            error!(error = %e, "Transcription failed");
            upload_error(StatusCode::INTERNAL_SERVER_ERROR, TRANSCRIPTION_FAILED)
        }
    }
}

fn upload_error(status: StatusCode, message: &str) -> (StatusCode, Json<TranscribeReply>) {
    (
        status,
        Json(TranscribeReply::Error {
            error: message.to_string(),
        }),
    )
}

/// First multipart field named `file`, read into memory.
async fn find_audio(mut multipart: Multipart) -> Result<Option<AudioUpload>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("audio.webm").to_string();
        let content_type = field.content_type().map(String::from);
        let bytes = field.bytes().await?;

        return Ok(Some(AudioUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }

    Ok(None)
}

/// `GET /api/health`
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
