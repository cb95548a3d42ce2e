//! Shared harness pieces for HTTP handler tests.

use std::sync::Arc;

use actix_session::SessionMiddleware;
use actix_session::storage::CookieSessionStore;
use actix_web::cookie::{Cookie, Key};
use actix_web::{App, web};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::domain::ports::{
    AssetStore, GatewayPayment, GatewayStatus, GatewayTransaction, InMemoryApplicationRepository,
    InMemoryArticleRepository, InMemoryAssetStore, InMemoryPaymentRepository,
    InMemoryTaskRepository, InMemoryUserRepository, MarketDataSource, MarketSourceError,
    NewsHeadline, PiGatewayError, PiPaymentGateway, SpotPrice, Symbol, TaskRepository,
    UserRepository,
};
use crate::domain::payment::{PiPaymentId, Txid};
use crate::domain::user::{Role, User};
use crate::domain::{AccountService, ArticleService, JournalistService, PaymentService};
use crate::inbound::http::state::HttpState;

/// Cookie-session middleware with a throwaway key for tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".into())
        .cookie_secure(false)
        .build()
}

/// A platform payment that satisfies the verification predicate.
pub fn verified_payment(amount: f64) -> GatewayPayment {
    GatewayPayment {
        identifier: "payment-abc".to_owned(),
        amount,
        memo: Some("via app".to_owned()),
        metadata: None,
        transaction: Some(GatewayTransaction {
            txid: "tx-1".to_owned(),
            verified: true,
        }),
        status: GatewayStatus {
            developer_approved: true,
            transaction_verified: true,
            developer_completed: true,
            cancelled: false,
            user_cancelled: false,
        },
        raw: json!({ "identifier": "payment-abc", "amount": amount }),
    }
}

/// Gateway stub returning fixed responses.
pub struct FixedGateway {
    fetch: Result<GatewayPayment, PiGatewayError>,
    complete: Result<(), PiGatewayError>,
}

impl FixedGateway {
    /// A gateway whose payments always verify with the given amount.
    pub fn verified(amount: f64) -> Self {
        Self::fetch_ok(verified_payment(amount))
    }

    /// A gateway returning this exact payment.
    pub fn fetch_ok(payment: GatewayPayment) -> Self {
        Self {
            fetch: Ok(payment),
            complete: Ok(()),
        }
    }

    /// A gateway whose fetch fails.
    pub fn fetch_err(error: PiGatewayError) -> Self {
        Self {
            fetch: Err(error),
            complete: Ok(()),
        }
    }
}

#[async_trait]
impl PiPaymentGateway for FixedGateway {
    async fn fetch_payment(
        &self,
        payment_id: &PiPaymentId,
    ) -> Result<GatewayPayment, PiGatewayError> {
        self.fetch.clone().map(|mut payment| {
            payment.identifier = payment_id.to_string();
            payment
        })
    }

    async fn complete_payment(
        &self,
        _payment_id: &PiPaymentId,
        _txid: &Txid,
    ) -> Result<(), PiGatewayError> {
        self.complete.clone()
    }
}

/// Market source stub with deterministic headlines and prices.
pub struct FixedMarketSource;

#[async_trait]
impl MarketDataSource for FixedMarketSource {
    async fn latest_news(&self, limit: u32) -> Result<Vec<NewsHeadline>, MarketSourceError> {
        let now = Utc::now();
        Ok((0..limit.min(3))
            .map(|n| NewsHeadline {
                title: format!("Headline {n}"),
                source: "Wire".to_owned(),
                url: format!("https://news.example/{n}"),
                published_at: now,
            })
            .collect())
    }

    async fn spot_prices(&self, symbols: &[Symbol]) -> Result<Vec<SpotPrice>, MarketSourceError> {
        Ok(symbols
            .iter()
            .map(|symbol| SpotPrice {
                symbol: symbol.clone(),
                usd: 100.0,
            })
            .collect())
    }
}

/// In-memory wiring for handler tests, with direct repository access for
/// fixtures the API cannot create (roles, disabled flags).
pub struct TestContext {
    /// Fully wired handler state.
    pub state: HttpState,
    /// Backing user repository.
    pub users: Arc<InMemoryUserRepository>,
    /// Backing article repository.
    pub articles: Arc<InMemoryArticleRepository>,
    /// Backing payment repository.
    pub payments: Arc<InMemoryPaymentRepository>,
}

impl TestContext {
    /// Wiring with a gateway whose payments always verify at 1.5 Pi.
    pub fn new() -> Self {
        Self::with_gateway(Arc::new(FixedGateway::verified(1.5)))
    }

    /// Wiring with an explicit gateway stub.
    pub fn with_gateway(gateway: Arc<dyn PiPaymentGateway>) -> Self {
        let users = Arc::new(InMemoryUserRepository::new());
        let articles = Arc::new(InMemoryArticleRepository::new());
        let payments = Arc::new(InMemoryPaymentRepository::new());
        let applications = Arc::new(InMemoryApplicationRepository::new());
        let tasks: Arc<dyn TaskRepository> = Arc::new(InMemoryTaskRepository::new());
        let assets: Arc<dyn AssetStore> = Arc::new(InMemoryAssetStore::new());

        let state = HttpState {
            accounts: AccountService::new(users.clone()),
            articles: ArticleService::new(articles.clone()),
            journalists: JournalistService::new(applications, users.clone()),
            payments: PaymentService::new(
                payments.clone(),
                users.clone(),
                articles.clone(),
                gateway,
            ),
            market: Arc::new(FixedMarketSource),
            tasks,
            assets,
        };
        Self {
            state,
            users,
            articles,
            payments,
        }
    }

    async fn user_by_username(&self, username: &str) -> User {
        let username =
            crate::domain::user::Username::new(username).expect("valid test username");
        self.users
            .find_by_username(&username)
            .await
            .expect("user query")
            .expect("user registered")
    }

    /// The registered user's id, as a string.
    pub async fn user_id(&self, username: &str) -> String {
        self.user_by_username(username).await.id().to_string()
    }

    /// Grant a role directly in the repository.
    pub async fn set_role(&self, username: &str, role: Role) {
        let mut user = self.user_by_username(username).await;
        user.set_role(role);
        self.users.update(&user).await.expect("role update");
    }

    /// Disable an account directly in the repository.
    pub async fn disable_user(&self, username: &str) {
        let mut user = self.user_by_username(username).await;
        user.disable();
        self.users.update(&user).await.expect("disable update");
    }

    fn synthetic_admin() -> User {
        User::new(
            crate::domain::user::NewUser {
                id: crate::domain::user::UserId::random(),
                username: crate::domain::user::Username::new("synthetic_admin")
                    .expect("valid username"),
                display_name: crate::domain::user::DisplayName::new("Synthetic Admin")
                    .expect("valid display name"),
                role: Role::Admin,
                password_hash: "$argon2id$stub".to_owned(),
            },
            Utc::now(),
        )
    }

    /// Create and submit an article over the API; returns its id.
    pub async fn submit_article(
        &self,
        app: &impl actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
        author_cookie: &Cookie<'static>,
        title: &str,
    ) -> String {
        use actix_web::test as actix_test;
        let create = actix_test::call_service(
            app,
            actix_test::TestRequest::post()
                .uri("/api/v1/articles")
                .cookie(author_cookie.clone())
                .set_json(json!({ "title": title, "body": "Body text." }))
                .to_request(),
        )
        .await;
        assert!(create.status().is_success(), "article create failed");
        let created: serde_json::Value = actix_test::read_body_json(create).await;
        let id = created
            .get("id")
            .and_then(serde_json::Value::as_str)
            .expect("article id")
            .to_owned();

        let submit = actix_test::call_service(
            app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/articles/{id}/submit"))
                .cookie(author_cookie.clone())
                .to_request(),
        )
        .await;
        assert!(submit.status().is_success(), "article submit failed");
        id
    }

    /// Create, submit, and approve an article; returns its id.
    pub async fn publish_article(
        &self,
        app: &impl actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
        author_cookie: &Cookie<'static>,
        title: &str,
    ) -> String {
        let id = self.submit_article(app, author_cookie, title).await;
        let article_id =
            crate::domain::article::ArticleId::new(&id).expect("valid article id");
        self.state
            .articles
            .approve(&Self::synthetic_admin(), &article_id)
            .await
            .expect("approve article");
        id
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the app under test: state, session middleware, and all routes.
pub fn test_app(
    state: HttpState,
) -> App<
    impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .wrap(test_session_middleware())
        .service(crate::inbound::http::api_scope())
}

/// Register an account (password `secret password`) and return its session
/// cookie.
pub async fn register_and_login(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
    >,
    username: &str,
) -> Cookie<'static> {
    use actix_web::test as actix_test;
    let res = actix_test::call_service(
        app,
        actix_test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(json!({
                "username": username,
                "displayName": "Test User",
                "password": "secret password"
            }))
            .to_request(),
    )
    .await;
    assert!(res.status().is_success(), "registration failed");
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie")
        .into_owned()
}
