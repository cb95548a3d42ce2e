//! Article use-cases: authoring, review, the public feed, and likes.

use std::sync::Arc;

use chrono::Utc;
use pagination::{Page, PageRequest};
use serde_json::json;

use crate::domain::account_service::require_admin;
use crate::domain::article::{
    Article, ArticleContent, ArticleId, ArticleStatus, RejectionReason,
};
use crate::domain::error::Error;
use crate::domain::ports::{ArticlePersistenceError, ArticleRepository, LikeOutcome};
use crate::domain::user::{Role, User};

/// Map article persistence errors to domain errors.
fn map_article_error(error: ArticlePersistenceError) -> Error {
    match error {
        ArticlePersistenceError::Connection { message } => Error::service_unavailable(message),
        ArticlePersistenceError::Query { message } => Error::internal(message),
    }
}

fn map_transition_error(error: crate::domain::article::ArticleTransitionError) -> Error {
    Error::invalid_request(error.to_string())
        .with_details(json!({ "from": error.from, "to": error.to }))
}

/// Article use-cases over the article repository.
#[derive(Clone)]
pub struct ArticleService {
    articles: Arc<dyn ArticleRepository>,
}

impl ArticleService {
    /// Create a service over the given repository.
    pub fn new(articles: Arc<dyn ArticleRepository>) -> Self {
        Self { articles }
    }

    async fn load(&self, id: &ArticleId) -> Result<Article, Error> {
        self.articles
            .find_by_id(id)
            .await
            .map_err(map_article_error)?
            .ok_or_else(|| Error::not_found("article not found"))
    }

    /// Create a draft. Requires an authoring role.
    pub async fn create_draft(
        &self,
        author: &User,
        content: ArticleContent,
    ) -> Result<Article, Error> {
        if !author.role().can_author() {
            return Err(Error::forbidden("journalist role required"));
        }
        let article = Article::draft(ArticleId::random(), *author.id(), content, Utc::now());
        self.articles
            .insert(&article)
            .await
            .map_err(map_article_error)?;
        Ok(article)
    }

    /// Replace the content of the author's own draft or rejected article.
    pub async fn update_content(
        &self,
        author: &User,
        id: &ArticleId,
        content: ArticleContent,
    ) -> Result<Article, Error> {
        let mut article = self.load(id).await?;
        if article.author() != author.id() {
            return Err(Error::forbidden("only the author may edit an article"));
        }
        article
            .edit(content, Utc::now())
            .map_err(map_transition_error)?;
        self.articles
            .update(&article)
            .await
            .map_err(map_article_error)?;
        Ok(article)
    }

    /// Submit the author's own draft for review.
    pub async fn submit(&self, author: &User, id: &ArticleId) -> Result<Article, Error> {
        let mut article = self.load(id).await?;
        if article.author() != author.id() {
            return Err(Error::forbidden("only the author may submit an article"));
        }
        article.submit(Utc::now()).map_err(map_transition_error)?;
        self.articles
            .update(&article)
            .await
            .map_err(map_article_error)?;
        Ok(article)
    }

    /// Move the author's own rejected article back to draft.
    pub async fn revise(&self, author: &User, id: &ArticleId) -> Result<Article, Error> {
        let mut article = self.load(id).await?;
        if article.author() != author.id() {
            return Err(Error::forbidden("only the author may revise an article"));
        }
        article.revise(Utc::now()).map_err(map_transition_error)?;
        self.articles
            .update(&article)
            .await
            .map_err(map_article_error)?;
        Ok(article)
    }

    /// Fetch an article, enforcing visibility and counting public views.
    ///
    /// Non-published articles are visible only to their author or an admin.
    /// A published article fetched by anyone but its author gains one view.
    pub async fn get(&self, viewer: Option<&User>, id: &ArticleId) -> Result<Article, Error> {
        let mut article = self.load(id).await?;
        let is_author = viewer.is_some_and(|user| user.id() == article.author());
        let is_admin = viewer.is_some_and(|user| user.role() == Role::Admin);

        if article.status() != ArticleStatus::Published {
            if is_author || is_admin {
                return Ok(article);
            }
            return Err(Error::not_found("article not found"));
        }

        if !is_author {
            self.articles
                .increment_views(id)
                .await
                .map_err(map_article_error)?;
            article.record_view();
        }
        Ok(article)
    }

    /// The public feed: published articles, newest first.
    pub async fn list_published(&self, page: PageRequest) -> Result<Page<Article>, Error> {
        let (items, total) = self
            .articles
            .list_published(page)
            .await
            .map_err(map_article_error)?;
        Ok(Page::new(items, page, total))
    }

    /// The author's own articles in any status.
    pub async fn list_mine(&self, author: &User, page: PageRequest) -> Result<Page<Article>, Error> {
        let (items, total) = self
            .articles
            .list_by_author(author.id(), page)
            .await
            .map_err(map_article_error)?;
        Ok(Page::new(items, page, total))
    }

    /// Like a published article once per user.
    ///
    /// The second like from the same user is an invalid request carrying an
    /// `already_liked` detail code.
    pub async fn like(&self, user: &User, id: &ArticleId) -> Result<Article, Error> {
        let article = self.load(id).await?;
        if article.status() != ArticleStatus::Published {
            return Err(Error::not_found("article not found"));
        }
        match self
            .articles
            .like(id, user.id())
            .await
            .map_err(map_article_error)?
        {
            LikeOutcome::Liked => self.load(id).await,
            LikeOutcome::AlreadyLiked => Err(Error::invalid_request("article already liked")
                .with_details(json!({ "code": "already_liked" }))),
        }
    }

    /// Delete an article: the author for non-published ones, an admin for any.
    pub async fn delete(&self, user: &User, id: &ArticleId) -> Result<(), Error> {
        let article = self.load(id).await?;
        let is_admin = user.role() == Role::Admin;
        if !is_admin {
            if article.author() != user.id() {
                return Err(Error::forbidden("only the author may delete an article"));
            }
            if article.status() == ArticleStatus::Published {
                return Err(Error::invalid_request(
                    "published articles can only be deleted by an admin",
                ));
            }
        }
        self.articles.delete(id).await.map_err(map_article_error)
    }

    /// Admin: the pending-review queue in arrival order.
    pub async fn review_queue(
        &self,
        admin: &User,
        page: PageRequest,
    ) -> Result<Page<Article>, Error> {
        require_admin(admin)?;
        let (items, total) = self
            .articles
            .list_by_status(ArticleStatus::Pending, page)
            .await
            .map_err(map_article_error)?;
        Ok(Page::new(items, page, total))
    }

    /// Admin: approve a pending article, publishing it.
    pub async fn approve(&self, admin: &User, id: &ArticleId) -> Result<Article, Error> {
        require_admin(admin)?;
        let mut article = self.load(id).await?;
        article.approve(Utc::now()).map_err(map_transition_error)?;
        self.articles
            .update(&article)
            .await
            .map_err(map_article_error)?;
        Ok(article)
    }

    /// Admin: reject a pending article with a reason.
    pub async fn reject(
        &self,
        admin: &User,
        id: &ArticleId,
        reason: RejectionReason,
    ) -> Result<Article, Error> {
        require_admin(admin)?;
        let mut article = self.load(id).await?;
        article
            .reject(reason, Utc::now())
            .map_err(map_transition_error)?;
        self.articles
            .update(&article)
            .await
            .map_err(map_article_error)?;
        Ok(article)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorCode;
    use crate::domain::ports::InMemoryArticleRepository;
    use crate::domain::user::{DisplayName, NewUser, UserId, Username};

    fn user(role: Role) -> User {
        User::new(
            NewUser {
                id: UserId::random(),
                username: Username::new("someone").expect("valid username"),
                display_name: DisplayName::new("Some One").expect("valid display name"),
                role,
                password_hash: "$argon2id$stub".to_owned(),
            },
            Utc::now(),
        )
    }

    fn content(title: &str) -> ArticleContent {
        ArticleContent::new(title, None, "Body text.", vec!["pi".to_owned()])
            .expect("valid content")
    }

    fn service() -> ArticleService {
        ArticleService::new(Arc::new(InMemoryArticleRepository::new()))
    }

    async fn published(service: &ArticleService, author: &User, admin: &User) -> Article {
        let article = service
            .create_draft(author, content("Launch day"))
            .await
            .expect("draft created");
        service
            .submit(author, article.id())
            .await
            .expect("submitted");
        service
            .approve(admin, article.id())
            .await
            .expect("approved")
    }

    #[tokio::test]
    async fn create_then_fetch_returns_the_same_fields() {
        let service = service();
        let author = user(Role::Journalist);
        let created = service
            .create_draft(&author, content("Launch day"))
            .await
            .expect("draft created");

        let fetched = service
            .get(Some(&author), created.id())
            .await
            .expect("author can fetch a draft");
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn public_role_cannot_author() {
        let service = service();
        let error = service
            .create_draft(&user(Role::Public), content("Nope"))
            .await
            .expect_err("public role must fail");
        assert_eq!(error.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn drafts_are_invisible_to_other_users() {
        let service = service();
        let author = user(Role::Journalist);
        let article = service
            .create_draft(&author, content("Secret draft"))
            .await
            .expect("draft created");

        let error = service
            .get(Some(&user(Role::Public)), article.id())
            .await
            .expect_err("other users must not see drafts");
        assert_eq!(error.code(), ErrorCode::NotFound);
        assert!(service.get(None, article.id()).await.is_err());
    }

    #[tokio::test]
    async fn public_fetches_count_views_but_author_fetches_do_not() {
        let service = service();
        let author = user(Role::Journalist);
        let admin = user(Role::Admin);
        let article = published(&service, &author, &admin).await;

        let seen = service
            .get(Some(&user(Role::Public)), article.id())
            .await
            .expect("published is public");
        assert_eq!(seen.views(), 1);

        let by_author = service
            .get(Some(&author), article.id())
            .await
            .expect("author fetch");
        assert_eq!(by_author.views(), 1);
    }

    #[tokio::test]
    async fn second_like_is_an_invalid_request() {
        let service = service();
        let author = user(Role::Journalist);
        let admin = user(Role::Admin);
        let article = published(&service, &author, &admin).await;
        let reader = user(Role::Public);

        let liked = service
            .like(&reader, article.id())
            .await
            .expect("first like succeeds");
        assert_eq!(liked.likes(), 1);

        let error = service
            .like(&reader, article.id())
            .await
            .expect_err("second like fails");
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
        assert_eq!(
            error.details().and_then(|d| d.get("code")).and_then(|c| c.as_str()),
            Some("already_liked")
        );
    }

    #[tokio::test]
    async fn rejection_requires_admin_and_a_reason() {
        let service = service();
        let author = user(Role::Journalist);
        let admin = user(Role::Admin);
        let article = service
            .create_draft(&author, content("Needs work"))
            .await
            .expect("draft created");
        service
            .submit(&author, article.id())
            .await
            .expect("submitted");

        let error = service
            .reject(
                &author,
                article.id(),
                RejectionReason::new("not enough sources").expect("valid reason"),
            )
            .await
            .expect_err("journalists cannot review");
        assert_eq!(error.code(), ErrorCode::Forbidden);

        let rejected = service
            .reject(
                &admin,
                article.id(),
                RejectionReason::new("not enough sources").expect("valid reason"),
            )
            .await
            .expect("admin rejects");
        assert_eq!(rejected.status(), ArticleStatus::Rejected);
    }

    #[tokio::test]
    async fn approving_a_draft_is_an_invalid_transition() {
        let service = service();
        let author = user(Role::Journalist);
        let admin = user(Role::Admin);
        let article = service
            .create_draft(&author, content("Not submitted"))
            .await
            .expect("draft created");

        let error = service
            .approve(&admin, article.id())
            .await
            .expect_err("draft cannot be approved");
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn authors_cannot_delete_published_articles() {
        let service = service();
        let author = user(Role::Journalist);
        let admin = user(Role::Admin);
        let article = published(&service, &author, &admin).await;

        let error = service
            .delete(&author, article.id())
            .await
            .expect_err("author cannot delete published");
        assert_eq!(error.code(), ErrorCode::InvalidRequest);

        service
            .delete(&admin, article.id())
            .await
            .expect("admin deletes published");
        assert!(service.get(Some(&admin), article.id()).await.is_err());
    }
}
