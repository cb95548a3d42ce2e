//! Article API handlers.
//!
//! ```text
//! POST   /api/v1/articles               Create a draft (journalist/admin)
//! GET    /api/v1/articles               Public feed of published articles
//! GET    /api/v1/articles/mine          Author's own articles
//! GET    /api/v1/articles/{id}          Fetch one article
//! PUT    /api/v1/articles/{id}          Edit a draft/rejected article
//! POST   /api/v1/articles/{id}/submit   Draft -> pending
//! POST   /api/v1/articles/{id}/revise   Rejected -> draft
//! POST   /api/v1/articles/{id}/like     Like a published article once
//! DELETE /api/v1/articles/{id}          Delete
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use pagination::Page;
use serde::{Deserialize, Serialize};

use crate::domain::Error;
use crate::domain::article::{ArticleContent, ArticleId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ArticleDto, PageQuery};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Article create/update request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRequest {
    /// Headline.
    pub title: String,
    /// Optional standfirst.
    #[serde(default)]
    pub summary: Option<String>,
    /// Full body text.
    pub body: String,
    /// Topic tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ArticleRequest {
    fn into_content(self) -> Result<ArticleContent, Error> {
        ArticleContent::new(self.title, self.summary, self.body, self.tags)
            .map_err(|err| Error::invalid_request(err.to_string()))
    }
}

fn parse_article_id(raw: &str) -> Result<ArticleId, Error> {
    ArticleId::new(raw).map_err(|err| Error::invalid_request(err.to_string()))
}

/// Create a draft.
#[utoipa::path(
    post,
    path = "/api/v1/articles",
    request_body = ArticleRequest,
    responses(
        (status = 201, description = "Draft created", body = ArticleDto),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Journalist role required", body = Error)
    ),
    tags = ["articles"],
    operation_id = "createArticle"
)]
#[post("/articles")]
pub async fn create_article(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<ArticleRequest>,
) -> ApiResult<HttpResponse> {
    let user = state.current_user(&session).await?;
    let content = payload.into_inner().into_content()?;
    let article = state.articles.create_draft(&user, content).await?;
    Ok(HttpResponse::Created().json(ArticleDto::from(&article)))
}

/// Public feed of published articles, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/articles",
    params(PageQuery),
    responses(
        (status = 200, description = "Published articles", body = Page<ArticleDto>),
        (status = 400, description = "Invalid pagination", body = Error)
    ),
    tags = ["articles"],
    operation_id = "listArticles",
    security([])
)]
#[get("/articles")]
pub async fn list_articles(
    state: web::Data<HttpState>,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<Page<ArticleDto>>> {
    let page = query.into_inner().into_request()?;
    let articles = state.articles.list_published(page).await?;
    Ok(web::Json(articles.map(|article| ArticleDto::from(&article))))
}

/// The author's own articles in any status.
#[utoipa::path(
    get,
    path = "/api/v1/articles/mine",
    params(PageQuery),
    responses(
        (status = 200, description = "Own articles", body = Page<ArticleDto>),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["articles"],
    operation_id = "listMyArticles"
)]
#[get("/articles/mine")]
pub async fn list_my_articles(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<Page<ArticleDto>>> {
    let user = state.current_user(&session).await?;
    let page = query.into_inner().into_request()?;
    let articles = state.articles.list_mine(&user, page).await?;
    Ok(web::Json(articles.map(|article| ArticleDto::from(&article))))
}

/// Fetch one article, respecting status visibility.
#[utoipa::path(
    get,
    path = "/api/v1/articles/{id}",
    params(("id" = String, Path, description = "Article id")),
    responses(
        (status = 200, description = "Article", body = ArticleDto),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["articles"],
    operation_id = "getArticle",
    security([])
)]
#[get("/articles/{id}")]
pub async fn get_article(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ArticleDto>> {
    let id = parse_article_id(&path)?;
    let viewer = state.optional_user(&session).await?;
    let article = state.articles.get(viewer.as_ref(), &id).await?;
    Ok(web::Json(ArticleDto::from(&article)))
}

/// Edit a draft or rejected article.
#[utoipa::path(
    put,
    path = "/api/v1/articles/{id}",
    params(("id" = String, Path, description = "Article id")),
    request_body = ArticleRequest,
    responses(
        (status = 200, description = "Updated article", body = ArticleDto),
        (status = 400, description = "Invalid request or status", body = Error),
        (status = 403, description = "Not the author", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["articles"],
    operation_id = "updateArticle"
)]
#[put("/articles/{id}")]
pub async fn update_article(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<ArticleRequest>,
) -> ApiResult<web::Json<ArticleDto>> {
    let user = state.current_user(&session).await?;
    let id = parse_article_id(&path)?;
    let content = payload.into_inner().into_content()?;
    let article = state.articles.update_content(&user, &id, content).await?;
    Ok(web::Json(ArticleDto::from(&article)))
}

/// Submit a draft for review.
#[utoipa::path(
    post,
    path = "/api/v1/articles/{id}/submit",
    params(("id" = String, Path, description = "Article id")),
    responses(
        (status = 200, description = "Pending article", body = ArticleDto),
        (status = 400, description = "Invalid status", body = Error),
        (status = 403, description = "Not the author", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["articles"],
    operation_id = "submitArticle"
)]
#[post("/articles/{id}/submit")]
pub async fn submit_article(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ArticleDto>> {
    let user = state.current_user(&session).await?;
    let id = parse_article_id(&path)?;
    let article = state.articles.submit(&user, &id).await?;
    Ok(web::Json(ArticleDto::from(&article)))
}

/// Move a rejected article back to draft.
#[utoipa::path(
    post,
    path = "/api/v1/articles/{id}/revise",
    params(("id" = String, Path, description = "Article id")),
    responses(
        (status = 200, description = "Draft article", body = ArticleDto),
        (status = 400, description = "Invalid status", body = Error),
        (status = 403, description = "Not the author", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["articles"],
    operation_id = "reviseArticle"
)]
#[post("/articles/{id}/revise")]
pub async fn revise_article(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ArticleDto>> {
    let user = state.current_user(&session).await?;
    let id = parse_article_id(&path)?;
    let article = state.articles.revise(&user, &id).await?;
    Ok(web::Json(ArticleDto::from(&article)))
}

/// Like a published article. The second like from the same user is a `400`.
#[utoipa::path(
    post,
    path = "/api/v1/articles/{id}/like",
    params(("id" = String, Path, description = "Article id")),
    responses(
        (status = 200, description = "Liked article", body = ArticleDto),
        (status = 400, description = "Already liked", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["articles"],
    operation_id = "likeArticle"
)]
#[post("/articles/{id}/like")]
pub async fn like_article(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ArticleDto>> {
    let user = state.current_user(&session).await?;
    let id = parse_article_id(&path)?;
    let article = state.articles.like(&user, &id).await?;
    Ok(web::Json(ArticleDto::from(&article)))
}

/// Delete an article.
#[utoipa::path(
    delete,
    path = "/api/v1/articles/{id}",
    params(("id" = String, Path, description = "Article id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Published without admin", body = Error),
        (status = 403, description = "Not the author", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["articles"],
    operation_id = "deleteArticle"
)]
#[delete("/articles/{id}")]
pub async fn delete_article(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user = state.current_user(&session).await?;
    let id = parse_article_id(&path)?;
    state.articles.delete(&user, &id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::Role;
    use crate::inbound::http::test_utils::{TestContext, register_and_login, test_app};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use serde_json::Value;

    fn article_json(title: &str) -> ArticleRequest {
        ArticleRequest {
            title: title.into(),
            summary: Some("Summary.".into()),
            body: "Body text.".into(),
            tags: vec!["Pi".into(), "Markets".into()],
        }
    }

    #[actix_web::test]
    async fn create_then_fetch_returns_the_same_fields() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(test_app(ctx.state.clone())).await;
        let cookie = register_and_login(&app, "author").await;
        ctx.set_role("author", Role::Journalist).await;

        let create = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/articles")
                .cookie(cookie.clone())
                .set_json(&article_json("Launch day"))
                .to_request(),
        )
        .await;
        assert_eq!(create.status(), StatusCode::CREATED);
        let created: Value = actix_test::read_body_json(create).await;
        let id = created.get("id").and_then(Value::as_str).expect("id");

        let fetch = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/v1/articles/{id}"))
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(fetch.status(), StatusCode::OK);
        let fetched: Value = actix_test::read_body_json(fetch).await;
        assert_eq!(fetched.get("title"), created.get("title"));
        assert_eq!(fetched.get("body"), created.get("body"));
        assert_eq!(fetched.get("tags"), created.get("tags"));
        assert_eq!(
            fetched.get("tags").and_then(Value::as_array).map(Vec::len),
            Some(2)
        );
        assert_eq!(fetched.get("status").and_then(Value::as_str), Some("draft"));
    }

    #[actix_web::test]
    async fn public_users_cannot_create_articles() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(test_app(ctx.state.clone())).await;
        let cookie = register_and_login(&app, "reader").await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/articles")
                .cookie(cookie)
                .set_json(&article_json("Nope"))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn feed_paginates_published_articles() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(test_app(ctx.state.clone())).await;
        let cookie = register_and_login(&app, "author").await;
        ctx.set_role("author", Role::Journalist).await;

        for n in 0..3 {
            let id = ctx
                .publish_article(&app, &cookie, &format!("Story {n}"))
                .await;
            assert!(!id.is_empty());
        }

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/articles?page=1&limit=2")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(
            body.get("items").and_then(Value::as_array).map(Vec::len),
            Some(2)
        );
        assert_eq!(body.get("total").and_then(Value::as_u64), Some(3));
        assert!(body.get("nextCursor").is_some());
    }

    #[actix_web::test]
    async fn oversized_limit_is_rejected() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(test_app(ctx.state.clone())).await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/articles?limit=500")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn liking_twice_returns_400_with_detail() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(test_app(ctx.state.clone())).await;
        let author_cookie = register_and_login(&app, "author").await;
        ctx.set_role("author", Role::Journalist).await;
        let id = ctx.publish_article(&app, &author_cookie, "Likeable").await;

        let reader_cookie = register_and_login(&app, "reader").await;
        let like = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/articles/{id}/like"))
                .cookie(reader_cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(like.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(like).await;
        assert_eq!(body.get("likes").and_then(Value::as_u64), Some(1));

        let again = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/articles/{id}/like"))
                .cookie(reader_cookie)
                .to_request(),
        )
        .await;
        assert_eq!(again.status(), StatusCode::BAD_REQUEST);
        let error: Value = actix_test::read_body_json(again).await;
        assert_eq!(
            error
                .get("details")
                .and_then(|d| d.get("code"))
                .and_then(Value::as_str),
            Some("already_liked")
        );
    }

    #[actix_web::test]
    async fn anonymous_fetch_of_draft_is_not_found() {
        let ctx = TestContext::new();
        let app = actix_test::init_service(test_app(ctx.state.clone())).await;
        let cookie = register_and_login(&app, "author").await;
        ctx.set_role("author", Role::Journalist).await;

        let create = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/articles")
                .cookie(cookie)
                .set_json(&article_json("Hidden draft"))
                .to_request(),
        )
        .await;
        let created: Value = actix_test::read_body_json(create).await;
        let id = created.get("id").and_then(Value::as_str).expect("id");

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/v1/articles/{id}"))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
