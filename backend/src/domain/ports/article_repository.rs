//! Persistence port for articles and likes.

use async_trait::async_trait;
use pagination::PageRequest;

use crate::domain::article::{Article, ArticleId, ArticleStatus};
use crate::domain::user::UserId;

/// Failures surfaced by article persistence adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArticlePersistenceError {
    /// The backing store could not be reached.
    #[error("article store unavailable: {message}")]
    Connection {
        /// Adapter-provided context.
        message: String,
    },
    /// A query failed.
    #[error("article store error: {message}")]
    Query {
        /// Adapter-provided context.
        message: String,
    },
}

impl ArticlePersistenceError {
    /// Create a connection error with the given message.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a query error with the given message.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Outcome of recording a like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    /// The like was recorded.
    Liked,
    /// This user had already liked the article.
    AlreadyLiked,
}

/// Persistence port for articles.
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Insert a new article.
    async fn insert(&self, article: &Article) -> Result<(), ArticlePersistenceError>;

    /// Persist changes to an existing article.
    async fn update(&self, article: &Article) -> Result<(), ArticlePersistenceError>;

    /// Fetch an article by id.
    async fn find_by_id(&self, id: &ArticleId)
    -> Result<Option<Article>, ArticlePersistenceError>;

    /// Delete an article and its likes.
    async fn delete(&self, id: &ArticleId) -> Result<(), ArticlePersistenceError>;

    /// Published articles, newest publication first, with the total count.
    async fn list_published(
        &self,
        page: PageRequest,
    ) -> Result<(Vec<Article>, u64), ArticlePersistenceError>;

    /// One author's articles in any status, newest update first.
    async fn list_by_author(
        &self,
        author: &UserId,
        page: PageRequest,
    ) -> Result<(Vec<Article>, u64), ArticlePersistenceError>;

    /// Articles in a given status, oldest update first (review queues drain
    /// in arrival order).
    async fn list_by_status(
        &self,
        status: ArticleStatus,
        page: PageRequest,
    ) -> Result<(Vec<Article>, u64), ArticlePersistenceError>;

    /// Atomically bump the view counter.
    async fn increment_views(&self, id: &ArticleId) -> Result<(), ArticlePersistenceError>;

    /// Record a like, reporting whether this user already liked the article.
    /// Adapters back this with a uniqueness constraint so concurrent
    /// duplicates cannot slip through.
    async fn like(
        &self,
        id: &ArticleId,
        user: &UserId,
    ) -> Result<LikeOutcome, ArticlePersistenceError>;
}

/// In-memory [`ArticleRepository`] used by tests and database-less runs.
#[derive(Debug, Default)]
pub struct InMemoryArticleRepository {
    state: std::sync::RwLock<InMemoryArticles>,
}

#[derive(Debug, Default)]
struct InMemoryArticles {
    articles: Vec<Article>,
    likes: std::collections::HashSet<(ArticleId, UserId)>,
}

impl InMemoryArticleRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, InMemoryArticles>, ArticlePersistenceError> {
        self.state
            .read()
            .map_err(|_| ArticlePersistenceError::query("article store lock poisoned"))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, InMemoryArticles>, ArticlePersistenceError> {
        self.state
            .write()
            .map_err(|_| ArticlePersistenceError::query("article store lock poisoned"))
    }
}

fn paginate(mut articles: Vec<Article>, page: PageRequest) -> (Vec<Article>, u64) {
    let total = articles.len() as u64;
    let items = articles
        .drain(..)
        .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
        .take(page.limit() as usize)
        .collect();
    (items, total)
}

#[async_trait]
impl ArticleRepository for InMemoryArticleRepository {
    async fn insert(&self, article: &Article) -> Result<(), ArticlePersistenceError> {
        self.write()?.articles.push(article.clone());
        Ok(())
    }

    async fn update(&self, article: &Article) -> Result<(), ArticlePersistenceError> {
        let mut state = self.write()?;
        match state.articles.iter_mut().find(|a| a.id() == article.id()) {
            Some(existing) => {
                *existing = article.clone();
                Ok(())
            }
            None => Err(ArticlePersistenceError::query("article not found")),
        }
    }

    async fn find_by_id(
        &self,
        id: &ArticleId,
    ) -> Result<Option<Article>, ArticlePersistenceError> {
        Ok(self.read()?.articles.iter().find(|a| a.id() == id).cloned())
    }

    async fn delete(&self, id: &ArticleId) -> Result<(), ArticlePersistenceError> {
        let mut state = self.write()?;
        state.articles.retain(|a| a.id() != id);
        state.likes.retain(|(article_id, _)| article_id != id);
        Ok(())
    }

    async fn list_published(
        &self,
        page: PageRequest,
    ) -> Result<(Vec<Article>, u64), ArticlePersistenceError> {
        let state = self.read()?;
        let mut published: Vec<Article> = state
            .articles
            .iter()
            .filter(|a| a.status() == ArticleStatus::Published)
            .cloned()
            .collect();
        published.sort_by_key(|a| std::cmp::Reverse(a.published_at()));
        Ok(paginate(published, page))
    }

    async fn list_by_author(
        &self,
        author: &UserId,
        page: PageRequest,
    ) -> Result<(Vec<Article>, u64), ArticlePersistenceError> {
        let state = self.read()?;
        let mut articles: Vec<Article> = state
            .articles
            .iter()
            .filter(|a| a.author() == author)
            .cloned()
            .collect();
        articles.sort_by_key(|a| std::cmp::Reverse(a.updated_at()));
        Ok(paginate(articles, page))
    }

    async fn list_by_status(
        &self,
        status: ArticleStatus,
        page: PageRequest,
    ) -> Result<(Vec<Article>, u64), ArticlePersistenceError> {
        let state = self.read()?;
        let mut articles: Vec<Article> = state
            .articles
            .iter()
            .filter(|a| a.status() == status)
            .cloned()
            .collect();
        articles.sort_by_key(Article::updated_at);
        Ok(paginate(articles, page))
    }

    async fn increment_views(&self, id: &ArticleId) -> Result<(), ArticlePersistenceError> {
        let mut state = self.write()?;
        match state.articles.iter_mut().find(|a| a.id() == id) {
            Some(article) => {
                article.record_view();
                Ok(())
            }
            None => Err(ArticlePersistenceError::query("article not found")),
        }
    }

    async fn like(
        &self,
        id: &ArticleId,
        user: &UserId,
    ) -> Result<LikeOutcome, ArticlePersistenceError> {
        let mut state = self.write()?;
        if !state.likes.insert((*id, *user)) {
            return Ok(LikeOutcome::AlreadyLiked);
        }
        match state.articles.iter_mut().find(|a| a.id() == id) {
            Some(article) => {
                article.record_like();
                Ok(LikeOutcome::Liked)
            }
            None => Err(ArticlePersistenceError::query("article not found")),
        }
    }
}
