//! Gateway server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use validator::Validate;

use yakap_core::registry::{RegistryError, RegistryStore};
use yakap_core::types::{BrgyId, UserId, YakapId};
use yakap_core::validation::{limits, sanitize_text};
use yakap_core::Config;

use crate::GatewayError;
use crate::auth::{
    AuthError, CurrentUser, RequireAdmin, Role, SessionCodec, User, UserStore, access_gateway,
    cookie,
};

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Port to listen on.
    pub port: u16,
    /// Bind address.
    pub bind_address: String,
    /// Enable CORS.
    pub cors: bool,
    /// Data directory for persistent storage.
    pub data_dir: PathBuf,
    /// Decoded session signing secret. Required; there is no fallback.
    pub session_secret: Vec<u8>,
    /// Session lifetime.
    pub session_ttl: Duration,
    /// Mark the session cookie `Secure`.
    pub cookie_secure: bool,
}

impl GatewayConfig {
    /// Build a gateway configuration from the loaded application config.
    ///
    /// # Errors
    ///
    /// Returns error if the session secret is absent or unusable. This is
    /// the all-or-nothing trust anchor: startup stops here.
    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        let session_secret = config
            .session
            .require_secret()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        Ok(Self {
            port: config.gateway.port,
            bind_address: config.gateway.bind_address.clone(),
            cors: config.gateway.cors,
            data_dir: Config::data_dir(),
            session_secret,
            session_ttl: config.session.ttl(),
            cookie_secure: config.session.cookie_secure,
        })
    }
}

/// Gateway server state shared across handlers.
///
/// Everything here is immutable or internally synchronized after startup;
/// request handling takes no locks.
pub struct AppState {
    /// Session token codec.
    pub codec: SessionCodec,
    /// User store.
    pub users: UserStore,
    /// Assistance-record registry.
    pub registry: RegistryStore,
    /// Whether to mark the session cookie `Secure`.
    pub cookie_secure: bool,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("codec", &self.codec)
            .field("users", &self.users)
            .finish_non_exhaustive()
    }
}

/// Gateway server.
pub struct Gateway {
    config: GatewayConfig,
    state: Arc<AppState>,
}

impl Gateway {
    /// Create a new gateway: open the stores and build the codec.
    ///
    /// # Errors
    ///
    /// Returns error if the data directory, stores, or codec cannot be
    /// initialized.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        std::fs::create_dir_all(&config.data_dir)
            .map_err(|e| GatewayError::Config(format!("Failed to create data dir: {e}")))?;

        let codec = SessionCodec::new(&config.session_secret, config.session_ttl)
            .map_err(|e| GatewayError::Config(format!("Session codec init failed: {e}")))?;

        let users = UserStore::open(&config.data_dir)
            .map_err(|e| GatewayError::Server(format!("Failed to open user store: {e}")))?;

        let registry = RegistryStore::open(&config.data_dir)
            .map_err(|e| GatewayError::Server(format!("Failed to open registry: {e}")))?;

        let state = Arc::new(AppState {
            codec,
            users,
            registry,
            cookie_secure: config.cookie_secure,
        });

        Ok(Self { config, state })
    }

    /// Shared state handle (used by tests and the CLI).
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Build the router for this gateway.
    #[must_use]
    pub fn router(&self) -> Router {
        build_router(self.state.clone(), self.config.cors)
    }

    /// Run the gateway server until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns error if binding or serving fails.
    pub async fn run(&self) -> Result<(), GatewayError> {
        let app = self.router();

        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid address: {e}")))?;

        tracing::info!("Gateway listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .await
            .map_err(|e| GatewayError::Server(e.to_string()))?;

        Ok(())
    }
}

/// Assemble the full router: app pages, API, infra, and the access gateway
/// wrapped around all of it.
#[must_use]
pub fn build_router(state: Arc<AppState>, cors: bool) -> Router {
    let mut router = Router::new()
        // App pages
        .route("/", get(index_page))
        .route("/login", get(login_page))
        .route("/yakap", get(yakap_page))
        // Auth API
        .route("/api/login", post(api_login))
        .route("/api/logout", post(api_logout))
        .route("/api/auth/me", get(api_me))
        .route("/api/auth/register", post(api_register))
        // Registry API
        .route("/api/yakap", get(api_yakap_list).post(api_yakap_create))
        .route("/api/yakap/{yakap_id}", put(api_yakap_update))
        .route("/api/brgy", get(api_brgy_list))
        .route("/api/dashboard", get(api_dashboard))
        // Infra (excluded from the gateway)
        .route("/health", get(health_handler))
        // Unknown paths still pass the gateway (fail-closed default)
        .fallback(fallback_page)
        .layer(middleware::from_fn_with_state(state.clone(), access_gateway))
        .layer(TraceLayer::new_for_http());

    if cors {
        router = router.layer(CorsLayer::permissive());
    }

    router.with_state(state)
}

// ============================================================================
// Response helpers
// ============================================================================

fn envelope_error(status: StatusCode, code: &str) -> Response {
    (status, Json(json!({ "ok": false, "error": code }))).into_response()
}

fn invalid_body(details: Vec<serde_json::Value>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "ok": false, "error": "invalid_body", "details": details })),
    )
        .into_response()
}

fn validation_details(errors: &validator::ValidationErrors) -> Vec<serde_json::Value> {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .clone()
                    .unwrap_or_else(|| std::borrow::Cow::Borrowed("invalid value"));
                json!({ "field": field, "message": message })
            })
        })
        .collect()
}

fn registry_error(err: RegistryError) -> Response {
    match err {
        RegistryError::NotFound(_) => envelope_error(StatusCode::NOT_FOUND, "record_not_found"),
        RegistryError::UnknownBrgy(id) => invalid_body(vec![json!({
            "field": "brgy_id",
            "message": format!("unknown barangay: {id}"),
        })]),
        RegistryError::Storage(detail) => {
            tracing::error!(%detail, "registry failure");
            envelope_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
        }
    }
}

// ============================================================================
// App pages
// ============================================================================

async fn index_page() -> Html<&'static str> {
    Html(
        "<!doctype html><title>Yakap Registry</title>\
         <h1>Yakap Registry</h1><p><a href=\"/login\">Sign in</a></p>",
    )
}

async fn login_page() -> Html<&'static str> {
    Html(
        "<!doctype html><title>Sign in - Yakap</title>\
         <h1>Sign in</h1>\
         <form method=\"post\" action=\"/api/login\">\
         <input name=\"username\" placeholder=\"Username\">\
         <input name=\"password\" type=\"password\" placeholder=\"Password\">\
         <button type=\"submit\">Sign in</button></form>",
    )
}

async fn yakap_page(CurrentUser(claims): CurrentUser) -> Html<String> {
    Html(format!(
        "<!doctype html><title>Yakap</title><h1>Assistance records</h1>\
         <p>Signed in as {} ({})</p>",
        claims.username, claims.role
    ))
}

async fn fallback_page() -> Response {
    (StatusCode::NOT_FOUND, Html("<h1>Not found</h1>")).into_response()
}

async fn health_handler() -> &'static str {
    "OK"
}

// ============================================================================
// Auth handlers
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
struct LoginBody {
    #[validate(length(min = 1, message = "Username is required"))]
    username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
}

async fn api_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Result<Json<LoginBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return invalid_body(vec![json!({ "message": rejection.body_text() })]);
        }
    };

    if let Err(errors) = body.validate() {
        return invalid_body(validation_details(&errors));
    }

    // Unknown username, inactive account, and wrong password all collapse
    // into the same response so usernames cannot be enumerated.
    let user = match state.users.get_by_username(&body.username) {
        Ok(Some(user)) if user.active => user,
        Ok(_) => return AuthError::InvalidCredentials.into_response(),
        Err(e) => return e.into_response(),
    };

    if user.verify_password(&body.password).is_err() {
        return AuthError::InvalidCredentials.into_response();
    }

    if let Err(e) = state.users.update_last_login(&user.id) {
        return e.into_response();
    }

    let (token, _expires) = match state.codec.issue(
        &user.id,
        &user.username,
        user.name.as_deref(),
        user.role,
    ) {
        Ok(issued) => issued,
        Err(e) => return e.into_response(),
    };

    tracing::info!(username = %user.username, "login succeeded");

    let jar = cookie::write(jar, token, state.codec.ttl(), state.cookie_secure);
    (jar, Json(json!({ "ok": true, "user": user.to_public() }))).into_response()
}

async fn api_logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let jar = cookie::clear(jar, state.cookie_secure);
    (jar, Json(json!({ "ok": true }))).into_response()
}

async fn api_me(
    State(state): State<Arc<AppState>>,
    CurrentUser(claims): CurrentUser,
) -> Response {
    match state.users.get(&claims.sub) {
        Ok(Some(user)) => Json(json!({ "ok": true, "user": user.to_public() })).into_response(),
        Ok(None) => AuthError::UserNotFound(claims.sub).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize, Validate)]
struct RegisterBody {
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    password: String,
    name: String,
    role: String,
}

async fn api_register(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    body: Result<Json<RegisterBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return invalid_body(vec![json!({ "message": rejection.body_text() })]);
        }
    };

    if let Err(errors) = body.validate() {
        return invalid_body(validation_details(&errors));
    }

    let Ok(role) = body.role.parse::<Role>() else {
        return invalid_body(vec![json!({
            "field": "role",
            "message": "Role must be ENCODER or ADMIN",
        })]);
    };

    let Ok(name) = sanitize_text(&body.name, limits::MAX_FULLNAME_LENGTH) else {
        return invalid_body(vec![json!({ "field": "name", "message": "Name is required" })]);
    };

    let user = match User::new(body.username, &body.password, Some(name), role) {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };

    if let Err(e) = state.users.create(&user) {
        return e.into_response();
    }

    tracing::info!(username = %user.username, role = %user.role, "user registered");

    (
        StatusCode::CREATED,
        Json(json!({ "ok": true, "user": user.to_public() })),
    )
        .into_response()
}

// ============================================================================
// Registry handlers
// ============================================================================

async fn api_yakap_list(
    State(state): State<Arc<AppState>>,
    CurrentUser(_claims): CurrentUser,
) -> Response {
    match state.registry.list_yakaps() {
        Ok(records) => Json(json!({ "ok": true, "data": records })).into_response(),
        Err(e) => registry_error(e),
    }
}

#[derive(Debug, Deserialize, Validate)]
struct CreateYakapBody {
    #[validate(length(min = 1, message = "Fullname is required"))]
    fullname: String,
    address: Option<String>,
    #[validate(length(min = 1, message = "Barangay is required"))]
    brgy_id: String,
}

async fn api_yakap_create(
    State(state): State<Arc<AppState>>,
    CurrentUser(claims): CurrentUser,
    body: Result<Json<CreateYakapBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return invalid_body(vec![json!({ "message": rejection.body_text() })]);
        }
    };

    if let Err(errors) = body.validate() {
        return invalid_body(validation_details(&errors));
    }

    let Ok(fullname) = sanitize_text(&body.fullname, limits::MAX_FULLNAME_LENGTH) else {
        return invalid_body(vec![json!({
            "field": "fullname",
            "message": "Fullname is required",
        })]);
    };

    let address = match &body.address {
        Some(raw) => match sanitize_text(raw, limits::MAX_ADDRESS_LENGTH) {
            Ok(addr) => Some(addr),
            Err(_) => None,
        },
        None => None,
    };

    // The encoder is the session subject, never client input.
    let result = state.registry.create_yakap(
        &fullname,
        address.as_deref(),
        &BrgyId::new(body.brgy_id),
        &UserId::new(claims.sub),
    );

    match result {
        Ok(record) => (
            StatusCode::CREATED,
            Json(json!({ "ok": true, "yakap": record })),
        )
            .into_response(),
        Err(e) => registry_error(e),
    }
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateYakapBody {
    #[validate(length(min = 1, message = "Fullname is required"))]
    fullname: String,
    #[validate(length(min = 1, message = "Barangay is required"))]
    brgy_id: String,
}

async fn api_yakap_update(
    State(state): State<Arc<AppState>>,
    CurrentUser(_claims): CurrentUser,
    Path(yakap_id): Path<String>,
    body: Result<Json<UpdateYakapBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return invalid_body(vec![json!({ "message": rejection.body_text() })]);
        }
    };

    if let Err(errors) = body.validate() {
        return invalid_body(validation_details(&errors));
    }

    let Ok(fullname) = sanitize_text(&body.fullname, limits::MAX_FULLNAME_LENGTH) else {
        return invalid_body(vec![json!({
            "field": "fullname",
            "message": "Fullname is required",
        })]);
    };

    let result = state.registry.update_yakap(
        &YakapId::new(yakap_id),
        &fullname,
        &BrgyId::new(body.brgy_id),
    );

    match result {
        Ok(record) => Json(json!({ "ok": true, "yakap": record })).into_response(),
        Err(e) => registry_error(e),
    }
}

async fn api_brgy_list(
    State(state): State<Arc<AppState>>,
    CurrentUser(_claims): CurrentUser,
) -> Response {
    match state.registry.list_brgys() {
        Ok(rows) => Json(json!({ "ok": true, "data": rows })).into_response(),
        Err(e) => registry_error(e),
    }
}

async fn api_dashboard(
    State(state): State<Arc<AppState>>,
    CurrentUser(_claims): CurrentUser,
) -> Response {
    match state.registry.dashboard() {
        Ok(summary) => Json(json!({
            "ok": true,
            "total": summary.total,
            "by_brgy": summary.by_brgy,
            "by_user": summary.by_user,
            "by_date": summary.by_date,
        }))
        .into_response(),
        Err(e) => registry_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_requires_secret() {
        let config = Config::default();
        assert!(matches!(
            GatewayConfig::from_config(&config),
            Err(GatewayError::Config(_))
        ));
    }

    #[test]
    fn test_config_from_loaded_config() {
        let mut config = Config::default();
        config.session.secret = Some(hex::encode([3u8; 32]));
        config.gateway.port = 9999;

        let gw = GatewayConfig::from_config(&config).unwrap();
        assert_eq!(gw.port, 9999);
        assert_eq!(gw.session_secret.len(), 32);
        assert_eq!(gw.session_ttl, Duration::from_secs(8 * 3600));
    }

    #[test]
    fn test_validation_details_shape() {
        let body = LoginBody {
            username: String::new(),
            password: "x".to_string(),
        };
        let errors = body.validate().unwrap_err();
        let details = validation_details(&errors);
        assert_eq!(details.len(), 1);
        assert_eq!(details[0]["field"], "username");
    }
}
