use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersonalToken {
    pub token: String,
    pub user_id: String,
}

/// One request as seen by the server, before auth or fault handling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

#[derive(Default)]
struct Store {
    users: HashMap<String, User>,
    tokens: HashMap<String, PersonalToken>,
    reset_codes: HashMap<String, String>,
}

#[derive(Default)]
struct Faults {
    remaining: u32,
    status: u16,
}

/// Shared state of the mock user service.
#[derive(Default)]
pub struct MockState {
    store: RwLock<Store>,
    credentials: Option<(String, String)>,
    faults: Mutex<Faults>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Require Basic auth with exactly these credentials.
    pub fn with_credentials(username: &str, password: &str) -> Arc<Self> {
        Arc::new(Self {
            credentials: Some((username.to_string(), password.to_string())),
            ..Self::default()
        })
    }

    /// Answer the next `count` requests with `status` and an empty body.
    pub fn fail_next(&self, count: u32, status: u16) {
        let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
        faults.remaining = count;
        faults.status = status;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub async fn reset_code_for(&self, email: &str) -> Option<String> {
        self.store.read().await.reset_codes.get(email).cloned()
    }

    fn take_fault(&self) -> Option<StatusCode> {
        let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
        if faults.remaining == 0 {
            return None;
        }
        faults.remaining -= 1;
        Some(StatusCode::from_u16(faults.status).unwrap_or(StatusCode::SERVICE_UNAVAILABLE))
    }

    fn expected_authorization(&self) -> Option<String> {
        self.credentials
            .as_ref()
            .map(|(user, pass)| format!("Basic {}", STANDARD.encode(format!("{user}:{pass}"))))
    }
}

pub type SharedState = Arc<MockState>;

pub fn app(state: SharedState) -> Router {
    let routes = Router::new()
        .route("/v1/usercontroller/createuser", post(create_user))
        .route("/v1/usercontroller/sendresetpasswordlink", post(send_reset_password_link))
        .route(
            "/v1/usercontroller/verifyresetpasswordconfirmationcode",
            post(verify_reset_password_code),
        )
        .route("/v1/usercontroller/patch", patch(patch_user))
        .route("/v1/usercontroller/login", post(login))
        .route("/v1/usercontroller/user/{id}", get(get_user))
        .route("/v1/personaltokencontroller/{token}", get(get_token));

    Router::new()
        .nest("/api", routes)
        .layer(middleware::from_fn_with_state(state.clone(), gatekeeper))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: SharedState) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

/// Records the request, then applies injected faults and the auth check.
async fn gatekeeper(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state
        .requests
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .push(RecordedRequest {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            authorization: authorization.clone(),
        });

    if let Some(status) = state.take_fault() {
        tracing::debug!(%status, "injected fault");
        return status.into_response();
    }
    if let Some(expected) = state.expected_authorization() {
        if authorization.as_deref() != Some(expected.as_str()) {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"}))).into_response();
        }
    }
    next.run(request).await
}

fn error(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message })))
}

fn string_field(payload: &Map<String, Value>, key: &str) -> Option<String> {
    payload.get(key).and_then(Value::as_str).map(str::to_string)
}

async fn create_user(
    State(state): State<SharedState>,
    Json(mut payload): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<User>), (StatusCode, Json<Value>)> {
    let email = string_field(&payload, "email")
        .ok_or_else(|| error(StatusCode::UNPROCESSABLE_ENTITY, "email is required"))?;
    let password = string_field(&payload, "password").unwrap_or_default();
    payload.remove("email");
    payload.remove("password");
    payload.remove("id");

    let mut store = state.store.write().await;
    if store.users.values().any(|u| u.email == email) {
        return Err(error(StatusCode::CONFLICT, "email already registered"));
    }
    let user = User {
        id: Uuid::new_v4().to_string(),
        email,
        password,
        fields: payload,
    };
    store.users.insert(user.id.clone(), user.clone());
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Deserialize)]
struct ResetLinkInput {
    email: String,
    confirmation_code: String,
}

async fn send_reset_password_link(
    State(state): State<SharedState>,
    Json(input): Json<ResetLinkInput>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut store = state.store.write().await;
    if !store.users.values().any(|u| u.email == input.email) {
        return Err(error(StatusCode::NOT_FOUND, "unknown email"));
    }
    store.reset_codes.insert(input.email, input.confirmation_code);
    Ok(Json(json!({ "sent": true })))
}

#[derive(Deserialize)]
struct VerifyResetInput {
    email: String,
    confirmation_code: String,
    new_password: String,
}

async fn verify_reset_password_code(
    State(state): State<SharedState>,
    Json(input): Json<VerifyResetInput>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut store = state.store.write().await;
    if store.reset_codes.get(&input.email) != Some(&input.confirmation_code) {
        return Err(error(StatusCode::BAD_REQUEST, "invalid confirmation code"));
    }
    store.reset_codes.remove(&input.email);
    let user = store
        .users
        .values_mut()
        .find(|u| u.email == input.email)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "unknown email"))?;
    user.password = input.new_password;
    Ok(Json(json!({ "reset": true })))
}

async fn patch_user(
    State(state): State<SharedState>,
    Json(mut payload): Json<Map<String, Value>>,
) -> Result<Json<User>, (StatusCode, Json<Value>)> {
    let id = string_field(&payload, "id")
        .ok_or_else(|| error(StatusCode::UNPROCESSABLE_ENTITY, "id is required"))?;
    payload.remove("id");

    let mut store = state.store.write().await;
    let user = store
        .users
        .get_mut(&id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "unknown user"))?;
    if let Some(email) = payload.remove("email").and_then(|v| v.as_str().map(str::to_string)) {
        user.email = email;
    }
    if let Some(password) = payload.remove("password").and_then(|v| v.as_str().map(str::to_string)) {
        user.password = password;
    }
    user.fields.extend(payload);
    Ok(Json(user.clone()))
}

async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let email = string_field(&payload, "email").unwrap_or_default();
    let password = string_field(&payload, "password").unwrap_or_default();

    let mut store = state.store.write().await;
    let user_id = store
        .users
        .values()
        .find(|u| u.email == email && u.password == password)
        .map(|u| u.id.clone())
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "invalid email or password"))?;
    let token = PersonalToken {
        token: Uuid::new_v4().simple().to_string(),
        user_id: user_id.clone(),
    };
    store.tokens.insert(token.token.clone(), token.clone());
    Ok(Json(json!({ "user_id": user_id, "token": token.token })))
}

async fn get_user(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<User>, StatusCode> {
    let store = state.store.read().await;
    store.users.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn get_token(
    State(state): State<SharedState>,
    Path(token): Path<String>,
) -> Result<Json<PersonalToken>, StatusCode> {
    let store = state.store.read().await;
    store.tokens.get(&token).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}
