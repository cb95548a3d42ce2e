//! Asset storage API handlers.
//!
//! ```text
//! POST /api/v1/storage       Raw body upload, Content-Type recorded
//! GET  /api/v1/storage/{id}  Fetch bytes with the stored content type
//! ```

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};

use crate::domain::Error;
use crate::domain::ports::{AssetStoreError, AssetId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Upload size cap.
pub const MAX_ASSET_BYTES: usize = 8 * 1024 * 1024;

/// Upload response body.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetResponse {
    /// Stable asset identifier.
    pub id: String,
}

fn map_asset_error(error: AssetStoreError) -> Error {
    match error {
        AssetStoreError::NotFound => Error::not_found("asset not found"),
        AssetStoreError::Io { message } => Error::internal(message),
    }
}

/// Upload an asset. Requires an authoring role.
#[utoipa::path(
    post,
    path = "/api/v1/storage",
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "Asset stored", body = AssetResponse),
        (status = 400, description = "Empty or oversized body", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Journalist role required", body = Error)
    ),
    tags = ["storage"],
    operation_id = "uploadAsset"
)]
#[post("/storage")]
pub async fn upload_asset(
    state: web::Data<HttpState>,
    session: SessionContext,
    request: HttpRequest,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let user = state.current_user(&session).await?;
    if !user.role().can_author() {
        return Err(Error::forbidden("journalist role required"));
    }
    if body.is_empty() {
        return Err(Error::invalid_request("asset body must not be empty"));
    }
    if body.len() > MAX_ASSET_BYTES {
        return Err(Error::invalid_request("asset body too large"));
    }
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_owned();
    let id = state
        .assets
        .store(body.to_vec(), &content_type)
        .await
        .map_err(map_asset_error)?;
    Ok(HttpResponse::Created().json(AssetResponse { id: id.to_string() }))
}

/// Fetch an asset.
#[utoipa::path(
    get,
    path = "/api/v1/storage/{id}",
    params(("id" = String, Path, description = "Asset id")),
    responses(
        (status = 200, description = "Asset bytes"),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["storage"],
    operation_id = "getAsset",
    security([])
)]
#[get("/storage/{id}")]
pub async fn get_asset(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = AssetId::parse(&path).ok_or_else(|| Error::not_found("asset not found"))?;
    let asset = state.assets.load(&id).await.map_err(map_asset_error)?;
    Ok(HttpResponse::Ok()
        .content_type(asset.content_type)
        .body(asset.bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::Role;
    use crate::inbound::http::test_utils::{TestContext, register_and_login, test_app};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use serde_json::Value;

    #[actix_web::test]
    async fn upload_then_fetch_round_trips_bytes_and_content_type() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(test_app(ctx.state.clone())).await;
        let cookie = register_and_login(&app, "author").await;
        ctx.set_role("author", Role::Journalist).await;

        let upload = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/storage")
                .cookie(cookie)
                .insert_header((header::CONTENT_TYPE, "image/png"))
                .set_payload(&b"fake png bytes"[..])
                .to_request(),
        )
        .await;
        assert_eq!(upload.status(), StatusCode::CREATED);
        let body: Value = actix_test::read_body_json(upload).await;
        let id = body.get("id").and_then(Value::as_str).expect("id");

        let fetch = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/v1/storage/{id}"))
                .to_request(),
        )
        .await;
        assert_eq!(fetch.status(), StatusCode::OK);
        assert_eq!(
            fetch
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("image/png")
        );
        let bytes = actix_test::read_body(fetch).await;
        assert_eq!(bytes.as_ref(), b"fake png bytes");
    }

    #[actix_web::test]
    async fn public_users_cannot_upload() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(test_app(ctx.state.clone())).await;
        let cookie = register_and_login(&app, "reader").await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/storage")
                .cookie(cookie)
                .set_payload(&b"bytes"[..])
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn unknown_assets_are_not_found() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(test_app(ctx.state.clone())).await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/storage/not-a-uuid")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
