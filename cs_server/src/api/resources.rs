//! Resource and comment API handlers.
//!
//! Browsing, searching, downloading and reading comments are public. Upload,
//! commenting, owner edits and "my uploads" require a bearer token.

use axum::{
    Extension, Json,
    extract::{FromRequest, Request, State},
    http::StatusCode,
};
use campus_share::{
    comments::NewComment,
    de,
    resources::{NewResourceRequest, ResourceError, ResourceUpdate, SearchQuery},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{
    AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiMultipart, ApiQuery, IdPath, is_multipart},
    middleware::AuthUser,
    multipart::{UploadForm, read_form},
    request_id::RequestId,
};
use crate::{logging::log_security_event, metrics};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
}

fn request_from_form(form: &UploadForm) -> ApiResult<NewResourceRequest> {
    let year = match form.text("year") {
        Some(raw) => de::parse_int(&raw)
            .map_err(|_| ApiError::Validation("year must be a number".to_string()))?,
        None => None,
    };

    Ok(NewResourceRequest {
        title: form.text("title"),
        subject: form.text("subject"),
        year,
        description: form.text("description"),
        file_url: form.text("file_url"),
        tags: form.text("tags").map(|t| de::split_tags(&t)),
    })
}

/// Publish a resource.
///
/// Accepts either a JSON body carrying a `file_url` pointer or a
/// `multipart/form-data` body whose `file` part is stored on the server.
///
/// # Response
///
/// `201 Created` with `{success, message, resource}`.
pub async fn upload(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    request_id: RequestId,
    request: Request,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let (fields, attachment) = if is_multipart(&request) {
        let ApiMultipart(multipart) = ApiMultipart::from_request(request, &state).await?;
        let form = read_form(multipart, &state.uploads, "file").await?;

        match request_from_form(&form) {
            Ok(fields) => (fields, form.file),
            Err(e) => {
                if let Some(file) = &form.file {
                    state.uploads.remove(&file.public_url).await;
                }
                return Err(e);
            }
        }
    } else {
        let ApiJson(fields) = ApiJson::<NewResourceRequest>::from_request(request, &state).await?;
        (fields, None)
    };

    let resource = state
        .resource_manager
        .create(caller.user_id, fields, attachment)
        .await?;

    tracing::info!(
        request_id = request_id.as_str(),
        resource_id = %resource.id,
        "Resource uploaded"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Resource uploaded successfully",
            "resource": resource,
        })),
    ))
}

/// Newest-first listing, ten per page.
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Value>> {
    let page = state.resource_manager.list(query.page).await?;

    Ok(Json(json!({
        "success": true,
        "resources": page.resources,
        "pagination": page.pagination,
    })))
}

pub async fn get(State(state): State<AppState>, IdPath(id): IdPath) -> ApiResult<Json<Value>> {
    let resource = state.resource_manager.get(id).await?;

    Ok(Json(json!({ "success": true, "resource": resource })))
}

/// `q` matches title, description or subject; `subject` and `year` filter exactly.
pub async fn search(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Json<Value>> {
    let resources = state.resource_manager.search(query).await?;

    Ok(Json(json!({
        "success": true,
        "count": resources.len(),
        "resources": resources,
    })))
}

/// Count a download and return the file pointer. The file itself is not streamed.
pub async fn download(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> ApiResult<Json<Value>> {
    let ticket = state.resource_manager.download(id).await?;
    metrics::resource_downloads_total();

    Ok(Json(json!({
        "success": true,
        "message": "Download started",
        "file_url": ticket.file_url,
        "downloads": ticket.downloads,
    })))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    IdPath(id): IdPath,
    ApiJson(request): ApiJson<NewComment>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let comment = state
        .comment_manager
        .add(caller.user_id, id, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Comment added successfully",
            "comment": comment,
        })),
    ))
}

pub async fn list_comments(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> ApiResult<Json<Value>> {
    let comments = state.comment_manager.list(id).await?;

    Ok(Json(json!({
        "success": true,
        "count": comments.len(),
        "comments": comments,
    })))
}

/// Owner-only partial update.
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    IdPath(id): IdPath,
    ApiJson(update): ApiJson<ResourceUpdate>,
) -> ApiResult<Json<Value>> {
    let resource = state
        .resource_manager
        .update(caller.user_id, id, update)
        .await
        .inspect_err(|e| forbidden_attempt(e, &caller, "update"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Resource updated successfully",
        "resource": resource,
    })))
}

/// Owner-only delete; comments and any server-stored file go with it.
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    IdPath(id): IdPath,
) -> ApiResult<Json<Value>> {
    state
        .resource_manager
        .delete(caller.user_id, id)
        .await
        .inspect_err(|e| forbidden_attempt(e, &caller, "delete"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Resource deleted successfully",
    })))
}

pub async fn my_uploads(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<Value>> {
    let resources = state.resource_manager.list_mine(caller.user_id).await?;

    Ok(Json(json!({
        "success": true,
        "count": resources.len(),
        "resources": resources,
    })))
}

fn forbidden_attempt(err: &ResourceError, caller: &AuthUser, action: &str) {
    if matches!(err, ResourceError::Forbidden(_)) {
        log_security_event(
            "forbidden_resource_mutation",
            Some(caller.user_id),
            &format!("Non-owner attempted to {action} a resource"),
        );
    }
}
