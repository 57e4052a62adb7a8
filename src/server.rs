// 🌐 HTTP API - JSON routes over the catalog and the account store
// Enabled with the `server` feature

use crate::accounts::{AccountStore, AuthError, UserAccount, ValidationError};
use crate::catalog::{Catalog, Origin, ScholarshipId, ScholarshipRecord};
use crate::filter::{self, FilterCriteria};
use crate::storage::KeyValueStore;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

pub type DynStore = Box<dyn KeyValueStore + Send>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    catalog: Arc<Catalog>,
    accounts: Arc<Mutex<AccountStore<DynStore>>>,
}

impl AppState {
    pub fn new(catalog: Catalog, accounts: AccountStore<DynStore>) -> Self {
        Self {
            catalog: Arc::new(catalog),
            accounts: Arc::new(Mutex::new(accounts)),
        }
    }

    fn accounts(&self) -> MutexGuard<'_, AccountStore<DynStore>> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    let body: ApiResponse<()> = ApiResponse {
        success: false,
        data: None,
        error: Some(message.into()),
    };
    (status, Json(body)).into_response()
}

/// Record as shown on a card: catalog fields plus badge and saved state
#[derive(Serialize)]
struct ScholarshipView {
    #[serde(flatten)]
    record: ScholarshipRecord,
    origin: Origin,
    saved: bool,
}

impl ScholarshipView {
    fn new(record: &ScholarshipRecord, saved: &BTreeSet<ScholarshipId>) -> Self {
        Self {
            origin: record.origin(),
            saved: saved.contains(&record.id),
            record: record.clone(),
        }
    }
}

/// Account without the password
#[derive(Serialize)]
struct AccountView {
    id: i64,
    username: String,
    email: String,
    saved_scholarships: BTreeSet<ScholarshipId>,
}

impl From<UserAccount> for AccountView {
    fn from(user: UserAccount) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            saved_scholarships: user.saved_scholarships,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FilterQuery {
    category: String,
    income: String,
    state: String,
    education: String,
}

#[derive(Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
struct ToggleResponse {
    id: ScholarshipId,
    saved: bool,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/scholarships - Filtered listing
async fn list_scholarships(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Response {
    let criteria =
        FilterCriteria::from_form(&query.category, &query.income, &query.state, &query.education);
    let saved = state.accounts().saved_ids();

    let records: Vec<ScholarshipView> = filter::filter(state.catalog.all(), &criteria)
        .iter()
        .map(|record| ScholarshipView::new(record, &saved))
        .collect();

    (StatusCode::OK, Json(ApiResponse::ok(records))).into_response()
}

/// GET /api/scholarships/:id - Detail view
async fn get_scholarship(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = ScholarshipId::from(id);
    match state.catalog.find(&id) {
        Some(record) => {
            let saved = state.accounts().saved_ids();
            let view = ScholarshipView::new(record, &saved);
            (StatusCode::OK, Json(ApiResponse::ok(view))).into_response()
        }
        None => failure(StatusCode::NOT_FOUND, format!("Scholarship not found: {}", id)),
    }
}

/// GET /api/states - Distinct states for the state picker
async fn list_states(State(state): State<AppState>) -> Response {
    (StatusCode::OK, Json(ApiResponse::ok(state.catalog.states()))).into_response()
}

/// POST /api/register
async fn register(State(state): State<AppState>, Json(req): Json<RegisterRequest>) -> Response {
    let result = state.accounts().register(&req.username, &req.email, &req.password);

    match result {
        Ok(user) => {
            (StatusCode::CREATED, Json(ApiResponse::ok(AccountView::from(user)))).into_response()
        }
        Err(ValidationError::Storage(e)) => {
            error!(error = %e, "register failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Storage unavailable")
        }
        Err(e) => failure(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

/// POST /api/login
async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Response {
    let result = state.accounts().login(&req.email, &req.password);

    match result {
        Ok(user) => {
            (StatusCode::OK, Json(ApiResponse::ok(AccountView::from(user)))).into_response()
        }
        Err(e) => auth_failure(e),
    }
}

/// POST /api/logout
async fn logout(State(state): State<AppState>) -> Response {
    let result = state.accounts().logout();

    match result {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::ok("logged out"))).into_response(),
        Err(e) => {
            error!(error = %e, "logout failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Storage unavailable")
        }
    }
}

/// GET /api/me - Current session account
async fn current_user(State(state): State<AppState>) -> Response {
    match state.accounts().current_user() {
        Some(user) => {
            (StatusCode::OK, Json(ApiResponse::ok(AccountView::from(user)))).into_response()
        }
        None => auth_failure(AuthError::NotLoggedIn),
    }
}

/// GET /api/saved - Saved records of the current user
async fn list_saved(State(state): State<AppState>) -> Response {
    let Some(user) = state.accounts().current_user() else {
        return auth_failure(AuthError::NotLoggedIn);
    };

    let records: Vec<ScholarshipView> = state
        .catalog
        .records_for(&user.saved_scholarships)
        .iter()
        .map(|record| ScholarshipView::new(record, &user.saved_scholarships))
        .collect();

    (StatusCode::OK, Json(ApiResponse::ok(records))).into_response()
}

/// POST /api/saved/:id - Toggle a bookmark
async fn toggle_saved(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = ScholarshipId::from(id);
    if state.catalog.find(&id).is_none() {
        return failure(StatusCode::NOT_FOUND, format!("Scholarship not found: {}", id));
    }

    let result = state.accounts().toggle_saved(&id);
    match result {
        Ok(saved) => {
            let body = ApiResponse::ok(ToggleResponse { id, saved });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => auth_failure(e),
    }
}

fn auth_failure(err: AuthError) -> Response {
    match err {
        AuthError::MissingField => failure(StatusCode::BAD_REQUEST, err.to_string()),
        AuthError::InvalidCredentials | AuthError::NotLoggedIn => {
            failure(StatusCode::UNAUTHORIZED, err.to_string())
        }
        AuthError::Storage(e) => {
            error!(error = %e, "account storage failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Storage unavailable")
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/scholarships", get(list_scholarships))
        .route("/scholarships/:id", get(get_scholarship))
        .route("/states", get(list_states))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(current_user))
        .route("/saved", get(list_saved))
        .route("/saved/:id", post(toggle_saved))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::record;
    use crate::storage::MemoryStore;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        let catalog = Catalog::from_records(vec![
            record("1", "Kerala", "SC", "Rs. 2,50,000"),
            record("2", "All India", "all", "Varies"),
            record("3", "Tamil Nadu", "OBC", "Rs. 1,00,000"),
        ])
        .unwrap();
        let accounts: AccountStore<DynStore> = AccountStore::new(Box::new(MemoryStore::new()));
        router(AppState::new(catalog, accounts))
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn ids(body: &Value) -> Vec<String> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_filter_by_query() {
        let app = app();

        let (status, body) = send(&app, "GET", "/api/scholarships", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), vec!["1", "2", "3"]);

        let (_, body) = send(&app, "GET", "/api/scholarships?state=Kerala", None).await;
        assert_eq!(ids(&body), vec!["1", "2"]);

        let (_, body) = send(&app, "GET", "/api/scholarships?income=200000&state=", None).await;
        assert_eq!(ids(&body), vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_detail_and_missing() {
        let app = app();

        let (status, body) = send(&app, "GET", "/api/scholarships/2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["state"], "All India");
        assert_eq!(body["data"]["origin"], "Central");
        assert_eq!(body["data"]["saved"], false);

        let (status, body) = send(&app, "GET", "/api/scholarships/99", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_account_flow() {
        let app = app();
        let creds = serde_json::json!({ "email": "asha@example.com", "password": "secret" });

        let (status, _) = send(&app, "POST", "/api/saved/1", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &app,
            "POST",
            "/api/register",
            Some(serde_json::json!({
                "username": "Asha",
                "email": "Asha@Example.com",
                "password": "secret"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["data"].get("password").is_none());

        let (status, _) = send(&app, "GET", "/api/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, "POST", "/api/login", Some(creds.clone())).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, "POST", "/api/saved/3", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["saved"], true);

        let (_, body) = send(&app, "GET", "/api/saved", None).await;
        assert_eq!(ids(&body), vec!["3"]);

        send(&app, "POST", "/api/logout", None).await;
        let (status, _) = send(&app, "GET", "/api/saved", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        send(&app, "POST", "/api/login", Some(creds)).await;
        let (_, body) = send(&app, "GET", "/api/scholarships/3", None).await;
        assert_eq!(body["data"]["saved"], true);
    }

    #[tokio::test]
    async fn test_register_validation_errors() {
        let app = app();

        let (status, body) = send(
            &app,
            "POST",
            "/api/register",
            Some(serde_json::json!({ "username": "Asha", "email": "a@x.com", "password": "abc" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Password must be at least 4 characters.");
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let app = app();
        send(
            &app,
            "POST",
            "/api/register",
            Some(serde_json::json!({
                "username": "Asha",
                "email": "a@x.com",
                "password": "secret"
            })),
        )
        .await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/login",
            Some(serde_json::json!({ "email": "a@x.com", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid email or password. Please try again.");
    }
}
