//! Category chat handlers.

use axum::{
    Extension, Json,
    extract::{FromRequest, Path, Request, State},
    http::StatusCode,
};
use campus_share::{
    de,
    messages::{FeedQuery, MessageError, PostMessage},
};
use serde_json::{Value, json};

use super::{
    AppState,
    error::ApiResult,
    extract::{ApiJson, ApiMultipart, ApiQuery, IdPath, is_multipart},
    middleware::AuthUser,
    multipart::read_form,
    request_id::RequestId,
};
use crate::{logging::log_security_event, metrics};

/// Post into a feed. Fields: `category`, `text`, `consent_for_contact` and
/// `reply_to`. A `multipart/form-data` body may also carry a `file` part; a
/// JSON body posts text only and may send `consent_for_contact` as a boolean.
///
/// # Response
///
/// `201 Created` with `{success, message, post}`.
///
/// # Errors
///
/// - `400`: missing or unknown category, malformed `reply_to`
/// - `404`: `reply_to` names no message
/// - `413`: file over the upload cap
pub async fn post(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    request_id: RequestId,
    request: Request,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let (fields, attachment) = if is_multipart(&request) {
        let ApiMultipart(multipart) = ApiMultipart::from_request(request, &state).await?;
        let form = read_form(multipart, &state.uploads, "file").await?;

        let fields = PostMessage {
            category: form.text("category"),
            text: form.text("text"),
            reply_to: form.text("reply_to"),
            consent_for_contact: form
                .text("consent_for_contact")
                .is_some_and(|v| de::parse_flag(&v)),
        };
        (fields, form.file)
    } else {
        let ApiJson(fields) = ApiJson::<PostMessage>::from_request(request, &state).await?;
        (fields, None)
    };

    let post = state
        .message_manager
        .post(caller.user_id, fields, attachment)
        .await?;

    tracing::debug!(
        request_id = request_id.as_str(),
        message_id = %post.id,
        category = %post.category,
        "Message posted"
    );
    metrics::messages_posted_total(post.category.as_str());

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Posted", "post": post })),
    ))
}

/// Newest-first page of one feed. `limit` defaults to 20 and is capped at 100.
pub async fn list_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    ApiQuery(query): ApiQuery<FeedQuery>,
) -> ApiResult<Json<Value>> {
    let page = state
        .message_manager
        .list_by_category(&category, query)
        .await?;

    Ok(Json(json!({
        "success": true,
        "messages": page.messages,
        "pagination": page.pagination,
    })))
}

/// Sender-only delete; attached media is unlinked first.
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    IdPath(id): IdPath,
) -> ApiResult<Json<Value>> {
    state
        .message_manager
        .delete(caller.user_id, id)
        .await
        .inspect_err(|e| {
            if matches!(e, MessageError::Forbidden(_)) {
                log_security_event(
                    "forbidden_message_delete",
                    Some(caller.user_id),
                    "Non-sender attempted to delete a message",
                );
            }
        })?;

    Ok(Json(json!({ "success": true, "message": "Deleted" })))
}
