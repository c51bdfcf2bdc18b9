use crate::auth::{credential, require_auth};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    middleware,
    routing::{get, post},
    Extension, Form, Router,
};
use karma_app::domain::{ProfileChanges, Registration, VoteDirection};
use karma_app::infrastructure::auth::TokenClaims;
use karma_app::AppContext;
use karma_errors::AppError;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default, rename = "firstname")]
    first_name: String,
    #[serde(default, rename = "lastname")]
    last_name: String,
    #[serde(default)]
    nickname: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    information: String,
}

impl From<RegisterForm> for Registration {
    fn from(form: RegisterForm) -> Self {
        Self {
            first_name: form.first_name,
            last_name: form.last_name,
            nickname: form.nickname,
            email: form.email,
            password: form.password,
            information: form.information,
        }
    }
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    nickname: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
pub struct EditForm {
    #[serde(rename = "firstname")]
    first_name: Option<String>,
    #[serde(rename = "lastname")]
    last_name: Option<String>,
    password: Option<String>,
    information: Option<String>,
}

pub fn router(ctx: AppContext) -> Router {
    let profile = Router::new()
        .route("/edit/", post(edit_profile))
        .route("/{nickname}/", get(profile))
        .route("/delete/{nickname}/", post(delete_user))
        .route("/add-rating/{nickname}/", post(add_rating))
        .route("/sub-rating/{nickname}/", post(sub_rating))
        .route_layer(middleware::from_fn_with_state(ctx.clone(), require_auth));

    Router::new()
        .route("/", get(|| async { "Hello, World!" }))
        .route("/users", get(first_users_page))
        .route("/users/", get(first_users_page))
        .route("/users/{page}", get(users_page))
        .route("/register/", post(register))
        .route("/log-in/", post(login))
        .route("/rating/{nickname}/", get(rating))
        .nest("/profile", profile)
        .with_state(ctx)
}

async fn first_users_page(State(ctx): State<AppContext>) -> Result<String, AppError> {
    ctx.lookups.users_page(0).await
}

async fn users_page(
    State(ctx): State<AppContext>,
    Path(page): Path<String>,
) -> Result<String, AppError> {
    let page = parse_page(&page)?;
    ctx.lookups.users_page(page).await
}

fn parse_page(raw: &str) -> Result<u64, AppError> {
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse()
        .map_err(|e| AppError::Validation(format!("incorrect page {raw:?}: {e}")))
}

async fn register(
    State(ctx): State<AppContext>,
    Form(form): Form<RegisterForm>,
) -> Result<&'static str, AppError> {
    ctx.accounts.register(form.into()).await?;
    Ok("user added")
}

async fn login(
    State(ctx): State<AppContext>,
    Form(form): Form<LoginForm>,
) -> Result<String, AppError> {
    ctx.accounts.login(&form.nickname, &form.password).await
}

async fn rating(
    State(ctx): State<AppContext>,
    Path(nickname): Path<String>,
) -> Result<String, AppError> {
    ctx.lookups.rating(&nickname).await
}

async fn profile(
    State(ctx): State<AppContext>,
    Path(nickname): Path<String>,
) -> Result<String, AppError> {
    ctx.lookups.profile(&nickname).await
}

async fn edit_profile(
    State(ctx): State<AppContext>,
    Extension(claims): Extension<TokenClaims>,
    Form(form): Form<EditForm>,
) -> Result<&'static str, AppError> {
    let changes = ProfileChanges {
        first_name: form.first_name,
        last_name: form.last_name,
        password: form.password,
        information: form.information,
    };
    ctx.accounts
        .edit_profile(&claims.user_nickname, changes)
        .await?;
    Ok("user edited")
}

async fn delete_user(
    State(ctx): State<AppContext>,
    Extension(claims): Extension<TokenClaims>,
    Path(nickname): Path<String>,
) -> Result<&'static str, AppError> {
    if !claims.is_admin() {
        tracing::warn!(caller = %claims.user_nickname, target = %nickname, "Non-admin delete attempt");
        return Err(AppError::Forbidden("admin role required".to_string()));
    }

    if ctx.accounts.delete(&nickname).await? {
        Ok("user deleted")
    } else {
        Ok("user not found")
    }
}

async fn add_rating(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Path(nickname): Path<String>,
) -> Result<String, AppError> {
    vote(&ctx, &headers, &nickname, VoteDirection::Up).await
}

async fn sub_rating(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Path(nickname): Path<String>,
) -> Result<String, AppError> {
    vote(&ctx, &headers, &nickname, VoteDirection::Down).await
}

async fn vote(
    ctx: &AppContext,
    headers: &HeaderMap,
    nickname: &str,
    direction: VoteDirection,
) -> Result<String, AppError> {
    let rating = ctx
        .cast_vote
        .execute(credential(headers), nickname, direction)
        .await
        .inspect_err(|err| {
            if !err.is_vote_rejection() {
                tracing::warn!(target_user = %nickname, "Vote failed: {}", err);
            }
        })?;
    Ok(format!("user has {rating}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use chrono::Utc;
    use karma_app::domain::{User, UserRepository, ROLE_ADMIN};
    use karma_app::infrastructure::memory::{MemoryCache, MemoryUserRepository};
    use karma_app::test_support::{member, MutableClock};
    use karma_app::AppConfig;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        ctx: AppContext,
        repo: MemoryUserRepository,
    }

    fn test_config() -> AppConfig {
        AppConfig {
            port: 0,
            database_url: None,
            redis_url: None,
            jwt_secret: "test-secret".to_string(),
            cache_ttl_secs: 60,
            vote_cooldown_secs: 3600,
            token_ttl_hours: 24,
            users_page_size: 3,
        }
    }

    async fn test_app(users: &[User]) -> TestApp {
        let repo = MemoryUserRepository::new();
        for user in users {
            repo.insert(user).await.unwrap();
        }
        let ctx = AppContext::new(
            &test_config(),
            Arc::new(repo.clone()),
            Arc::new(MemoryCache::new()),
            Arc::new(MutableClock::new(Utc::now())),
        )
        .unwrap();
        TestApp {
            router: router(ctx.clone()),
            ctx,
            repo,
        }
    }

    impl TestApp {
        fn token_for(&self, user: &User) -> String {
            self.ctx.tokens.issue(user, Utc::now()).unwrap()
        }

        async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, String::from_utf8(body.to_vec()).unwrap())
        }
    }

    fn post(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::post(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn form(uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder =
            Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, token);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::get(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, token);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_hello() {
        let app = test_app(&[]).await;
        assert_eq!(
            app.send(get("/", None)).await,
            (StatusCode::OK, "Hello, World!".to_string())
        );
    }

    #[tokio::test]
    async fn test_vote_returns_new_rating() {
        let (alice, bob) = (member("alice"), member("bob"));
        let app = test_app(&[alice.clone(), bob]).await;
        let token = app.token_for(&alice);

        assert_eq!(
            app.send(post("/profile/add-rating/bob/", Some(&token))).await,
            (StatusCode::OK, "user has 1".to_string())
        );
        assert_eq!(app.repo.snapshot("bob").unwrap().rating, 1);
    }

    #[tokio::test]
    async fn test_profile_routes_require_credential() {
        let app = test_app(&[member("bob")]).await;

        let (status, _) = app.send(post("/profile/add-rating/bob/", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .send(post("/profile/sub-rating/bob/", Some("not-a-token")))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(app.repo.snapshot("bob").unwrap().rating, 0);
    }

    #[tokio::test]
    async fn test_vote_rejections_are_bad_requests() {
        let (alice, bob) = (member("alice"), member("bob"));
        let app = test_app(&[alice.clone(), bob]).await;
        let token = app.token_for(&alice);

        assert_eq!(
            app.send(post("/profile/add-rating/alice/", Some(&token))).await,
            (
                StatusCode::BAD_REQUEST,
                AppError::SelfVote.to_string()
            )
        );

        let (status, body) = app
            .send(post("/profile/add-rating/nobody/", Some(&token)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "incorrect user nickname: nobody");
    }

    #[tokio::test]
    async fn test_unknown_sender_is_server_error() {
        let app = test_app(&[member("bob")]).await;
        let token = app.token_for(&member("ghost"));

        assert_eq!(
            app.send(post("/profile/add-rating/bob/", Some(&token))).await,
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_rating_is_cached_across_votes() {
        let (alice, bob) = (member("alice"), member("bob"));
        let app = test_app(&[alice.clone(), bob]).await;

        assert_eq!(
            app.send(get("/rating/bob/", None)).await,
            (StatusCode::OK, "user has 0".to_string())
        );

        let token = app.token_for(&alice);
        let (status, _) = app
            .send(post("/profile/add-rating/bob/", Some(&token)))
            .await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(
            app.send(get("/rating/bob/", None)).await,
            (StatusCode::OK, "user has 0".to_string())
        );

        let (status, _) = app.send(get("/rating/nobody/", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_users_listing() {
        let mut carol = member("carol");
        carol.rating = 4;
        let app = test_app(&[member("alice"), member("bob"), carol, member("dave")]).await;

        let (status, body) = app.send(get("/users/", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.lines().count(), 3);
        assert_eq!(body.lines().next(), Some("carol - carol@example.com"));

        let (status, body) = app.send(get("/users/1", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.lines().count(), 1);

        let (status, _) = app.send(get("/users/two", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_then_log_in() {
        let app = test_app(&[]).await;
        let body = "firstname=Oleksii&lastname=Petrenko&nickname=oleksii\
                    &email=Oleksii%40Example.com&password=Qwerty1123%40%23&information=hi";

        assert_eq!(
            app.send(form("/register/", None, body)).await,
            (StatusCode::OK, "user added".to_string())
        );
        assert_eq!(
            app.repo.snapshot("oleksii").unwrap().email,
            "oleksii@example.com"
        );

        let (status, _) = app.send(form("/register/", None, body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, token) = app
            .send(form(
                "/log-in/",
                None,
                "nickname=oleksii&password=Qwerty1123%40%23",
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            app.ctx.tokens.verify(&token).unwrap().user_nickname,
            "oleksii"
        );
    }

    #[tokio::test]
    async fn test_register_reports_first_invalid_field() {
        let app = test_app(&[]).await;
        let body = "firstname=Oleksii&lastname=P3trenko&nickname=x!&email=bad&password=weak";

        assert_eq!(
            app.send(form("/register/", None, body)).await,
            (
                StatusCode::BAD_REQUEST,
                "validation error: incorrect last name".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_edit_applies_to_caller() {
        let alice = member("alice");
        let app = test_app(&[alice.clone()]).await;
        let token = app.token_for(&alice);

        assert_eq!(
            app.send(form("/profile/edit/", Some(&token), "firstname=Alicia"))
                .await,
            (StatusCode::OK, "user edited".to_string())
        );
        assert_eq!(app.repo.snapshot("alice").unwrap().first_name, "Alicia");
    }

    #[tokio::test]
    async fn test_profile_lookup() {
        let alice = member("alice");
        let app = test_app(&[alice.clone()]).await;
        let token = app.token_for(&alice);

        let (status, body) = app.send(get("/profile/alice/", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("User name: Test\nUser lastname: Member\nUser id: "));

        let (status, _) = app.send(get("/profile/alice/", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_delete_requires_admin() {
        let alice = member("alice");
        let root = member("root").with_role(ROLE_ADMIN);
        let app = test_app(&[alice.clone(), root.clone(), member("bob")]).await;

        let (status, _) = app
            .send(post("/profile/delete/bob/", Some(&app.token_for(&alice))))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(app.repo.snapshot("bob").unwrap().deleted_at.is_none());

        let admin_token = app.token_for(&root);
        assert_eq!(
            app.send(post("/profile/delete/bob/", Some(&admin_token))).await,
            (StatusCode::OK, "user deleted".to_string())
        );
        assert_eq!(
            app.send(post("/profile/delete/bob/", Some(&admin_token))).await,
            (StatusCode::OK, "user not found".to_string())
        );
        assert_eq!(
            app.send(post("/profile/delete/nobody/", Some(&admin_token))).await,
            (StatusCode::OK, "user not found".to_string())
        );

        let (status, _) = app.send(get("/rating/bob/", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
