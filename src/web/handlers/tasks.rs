use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::pipeline::{Lifecycle, TaskDescriptor};
use crate::AppContext;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    task_id: String,
}

/// Admission: blob stored durably first, then the queued registry entry,
/// then the queue push. The queue never references a task whose audio is
/// not on disk yet.
pub async fn upload(
    State(ctx): State<Arc<AppContext>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut upload: Option<(String, Vec<u8>)> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("audio") {
                    continue;
                }
                let filename = field.file_name().unwrap_or("audio.wav").to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        upload = Some((filename, bytes.to_vec()));
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read upload body: {}", e);
                        return error_response(StatusCode::BAD_REQUEST, "Malformed upload");
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!("Malformed multipart request: {}", e);
                return error_response(StatusCode::BAD_REQUEST, "Malformed upload");
            }
        }
    }

    let Some((filename, bytes)) = upload else {
        return error_response(StatusCode::BAD_REQUEST, "No file");
    };

    let task_id = Uuid::new_v4().to_string();

    let audio_path = match ctx.store.save_upload(&task_id, &filename, &bytes) {
        Ok(path) => path,
        Err(e) => {
            error!("Failed to store upload for task {}: {}", task_id, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store upload");
        }
    };

    ctx.registry.set(&task_id, Lifecycle::Queued).await;

    let descriptor = TaskDescriptor {
        id: task_id.clone(),
        original_filename: filename.clone(),
        audio_path,
        created_at: Utc::now(),
    };
    if let Err(e) = ctx.queue.enqueue(descriptor) {
        error!("Failed to enqueue task {}: {}", task_id, e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to enqueue task");
    }

    info!("Admitted task {} ({})", task_id, filename);
    (StatusCode::OK, Json(UploadResponse { task_id })).into_response()
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    processing_file: Option<String>,
    processing_id: Option<String>,
    queue_length: usize,
}

pub async fn status(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    let queue_length = ctx.queue.len();
    let response = match ctx.registry.current().await {
        Some(current) => StatusResponse {
            status: "processing",
            processing_file: Some(current.file),
            processing_id: Some(current.id),
            queue_length,
        },
        None => StatusResponse {
            status: "idle",
            processing_file: None,
            processing_id: None,
            queue_length,
        },
    };
    Json(response)
}

#[derive(Debug, Serialize)]
struct ResultResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
}

pub async fn result(
    State(ctx): State<Arc<AppContext>>,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    match ctx.reconciler.result(&task_id).await {
        Ok(Some(outcome)) => Json(ResultResponse {
            status: "done",
            transcript: Some(outcome.transcript),
            summary: Some(outcome.summary),
        })
        .into_response(),
        Ok(None) => Json(ResultResponse {
            status: "pending",
            transcript: None,
            summary: None,
        })
        .into_response(),
        Err(e) => {
            error!("Failed to read result for task {}: {}", task_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read result")
        }
    }
}

pub async fn history(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    match ctx.reconciler.history().await {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => {
            error!("Failed to build history listing: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list history")
        }
    }
}

pub async fn audio(
    State(ctx): State<Arc<AppContext>>,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    let path = match ctx.store.find_audio(&task_id) {
        Ok(Some(path)) => path,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Audio not found"),
        Err(e) => {
            error!("Failed to locate audio for task {}: {}", task_id, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to locate audio");
        }
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            bytes,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to read audio blob {:?}: {}", path, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read audio")
        }
    }
}
