//! REST/WS boundary for the queue service.
//!
//! The browser screens of the original app map onto JSON endpoints:
//! - client screen: `POST /companies/:id/tickets`, `GET /companies/:id/queue`
//! - TV screen: `GET /companies/:id/display`
//! - admin panel: `/login` plus the token-gated call/finish/reset, profile,
//!   password and rename endpoints
//! - cross-tab storage events: `GET /companies/:id/watch` (WebSocket push)

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::{header, Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::{create_jwt, validate_jwt, verify_password};
use crate::events::EventBus;
use crate::models::{AuthPayload, CompanyProfile, ProfilePatch, QueueState};
use crate::profile::{ProfileStore, RenameError};
use crate::queue::QueueStore;
use crate::storage::Storage;

/// Shared app state for handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub queue: QueueStore,
    pub profiles: ProfileStore,
    pub events: EventBus,
    /// Base URL embedded in join links and QR payloads.
    pub public_url: String,
}

impl AppState {
    pub fn new(storage: Storage, public_url: String) -> Self {
        let storage = Arc::new(storage);
        let events = EventBus::new();
        Self {
            queue: QueueStore::new(storage.clone(), events.clone()),
            profiles: ProfileStore::new(storage.clone(), events.clone()),
            storage,
            events,
            public_url,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct RestResponse {
    pub success: bool,
    pub message: String,
}

fn ok(message: impl Into<String>) -> Json<RestResponse> {
    Json(RestResponse {
        success: true,
        message: message.into(),
    })
}

fn fail(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<RestResponse>) {
    (
        status,
        Json(RestResponse {
            success: false,
            message: message.into(),
        }),
    )
}

type HandlerResult<T> = Result<T, (StatusCode, Json<RestResponse>)>;

#[derive(Deserialize, Serialize)]
pub struct LoginRequest {
    pub company_id: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub company_id: String,
    pub token: String,
}

#[derive(Serialize, Deserialize)]
pub struct TicketResponse {
    pub ticket: String,
}

#[derive(Serialize, Deserialize)]
pub struct DisplayResponse {
    pub current_ticket: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct JoinResponse {
    pub company_id: String,
    pub display_name: String,
    pub join_url: String,
    /// External image-generation endpoint; no QR rendering happens here.
    pub qr_url: String,
}

#[derive(Deserialize, Serialize)]
pub struct SetPasswordRequest {
    pub password: String,
}

#[derive(Deserialize, Serialize)]
pub struct RenameRequest {
    pub new_id: String,
}

async fn auth_middleware(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !auth_header.starts_with("Bearer ") {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let token = &auth_header[7..];
    let claims = validate_jwt(token).map_err(|_| StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Token is valid but must also belong to the company being managed.
fn require_company(claims: &AuthPayload, company_id: &str) -> HandlerResult<()> {
    if claims.sub != company_id {
        return Err(fail(
            StatusCode::FORBIDDEN,
            "token does not match this company",
        ));
    }
    Ok(())
}

pub fn create_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/companies/:id/call-next", post(call_next_handler))
        .route("/companies/:id/finish", post(finish_handler))
        .route("/companies/:id/reset", post(reset_handler))
        .route("/companies/:id/profile", put(update_profile_handler))
        .route("/companies/:id/password", post(set_password_handler))
        .route("/companies/:id/rename", post(rename_handler))
        .route_layer(middleware::from_fn(auth_middleware));

    Router::new()
        .route("/health", get(health_handler))
        .route("/login", post(login_handler))
        .route("/companies/:id/tickets", post(take_ticket_handler))
        .route("/companies/:id/queue", get(queue_handler))
        .route("/companies/:id/display", get(display_handler))
        .route("/companies/:id/profile", get(profile_handler))
        .route("/companies/:id/join", get(join_handler))
        .route("/companies/:id/watch", get(watch_handler))
        .merge(admin_routes)
        .with_state(state)
}

async fn health_handler() -> Json<RestResponse> {
    ok("fluxoagil queue service up")
}

async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> HandlerResult<Json<LoginResponse>> {
    if !verify_password(&state.storage, &payload.company_id, &payload.password) {
        return Err(fail(StatusCode::UNAUTHORIZED, "wrong company id or password"));
    }
    let token = create_jwt(&payload.company_id)
        .map_err(|_| fail(StatusCode::INTERNAL_SERVER_ERROR, "token error"))?;
    info!(company_id = %payload.company_id, "admin login");
    Ok(Json(LoginResponse {
        company_id: payload.company_id,
        token,
    }))
}

// --- Client / display endpoints ---

async fn take_ticket_handler(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> HandlerResult<Json<TicketResponse>> {
    let ticket = state
        .queue
        .generate_ticket(&company_id)
        .map_err(|_| fail(StatusCode::INTERNAL_SERVER_ERROR, "storage error"))?
        .ok_or_else(|| fail(StatusCode::BAD_REQUEST, "missing company id"))?;
    debug!(%company_id, %ticket, "ticket issued");
    Ok(Json(TicketResponse { ticket }))
}

async fn queue_handler(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> HandlerResult<Json<QueueState>> {
    state
        .queue
        .state(&company_id)
        .map(Json)
        .map_err(|_| fail(StatusCode::INTERNAL_SERVER_ERROR, "storage error"))
}

async fn display_handler(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> HandlerResult<Json<DisplayResponse>> {
    let queue = state
        .queue
        .state(&company_id)
        .map_err(|_| fail(StatusCode::INTERNAL_SERVER_ERROR, "storage error"))?;
    Ok(Json(DisplayResponse {
        current_ticket: queue.current_ticket,
    }))
}

async fn profile_handler(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> HandlerResult<Json<CompanyProfile>> {
    state
        .profiles
        .load(&company_id)
        .map(Json)
        .map_err(|_| fail(StatusCode::INTERNAL_SERVER_ERROR, "storage error"))
}

async fn join_handler(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> HandlerResult<Json<JoinResponse>> {
    let profile = state
        .profiles
        .load(&company_id)
        .map_err(|_| fail(StatusCode::INTERNAL_SERVER_ERROR, "storage error"))?;
    let join_url = format!("{}/join/{}", state.public_url, company_id);
    // Same public QR image service the original app embeds.
    let qr_url = format!(
        "https://api.qrserver.com/v1/create-qr-code/?size=300x300&data={}",
        join_url
    );
    Ok(Json(JoinResponse {
        company_id,
        display_name: profile.display_name,
        join_url,
        qr_url,
    }))
}

/// Push channel replacing the browser storage event: one JSON notice per
/// store write for this company, until the client hangs up.
async fn watch_handler(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let rx = state.events.subscribe();
    ws.on_upgrade(move |socket| watch_loop(socket, rx, company_id))
}

async fn watch_loop(
    mut socket: WebSocket,
    mut rx: tokio::sync::broadcast::Receiver<crate::events::ChangeNotice>,
    company_id: String,
) {
    loop {
        match rx.recv().await {
            Ok(notice) if notice.company_id == company_id => {
                let Ok(text) = serde_json::to_string(&notice) else {
                    continue;
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break; // client gone
                }
            }
            Ok(_) => {} // some other company
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}

// --- Admin endpoints (Bearer token for the same company) ---

async fn call_next_handler(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    Extension(claims): Extension<AuthPayload>,
) -> HandlerResult<Json<QueueState>> {
    require_company(&claims, &company_id)?;
    state
        .queue
        .call_next_ticket(&company_id)
        .map_err(|_| fail(StatusCode::INTERNAL_SERVER_ERROR, "storage error"))?;
    state
        .queue
        .state(&company_id)
        .map(Json)
        .map_err(|_| fail(StatusCode::INTERNAL_SERVER_ERROR, "storage error"))
}

async fn finish_handler(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    Extension(claims): Extension<AuthPayload>,
) -> HandlerResult<Json<QueueState>> {
    require_company(&claims, &company_id)?;
    state
        .queue
        .finish_current_ticket(&company_id)
        .map_err(|_| fail(StatusCode::INTERNAL_SERVER_ERROR, "storage error"))?;
    state
        .queue
        .state(&company_id)
        .map(Json)
        .map_err(|_| fail(StatusCode::INTERNAL_SERVER_ERROR, "storage error"))
}

async fn reset_handler(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    Extension(claims): Extension<AuthPayload>,
) -> HandlerResult<Json<QueueState>> {
    require_company(&claims, &company_id)?;
    state
        .queue
        .reset_queue(&company_id)
        .map_err(|_| fail(StatusCode::INTERNAL_SERVER_ERROR, "storage error"))?;
    info!(%company_id, "queue reset");
    state
        .queue
        .state(&company_id)
        .map(Json)
        .map_err(|_| fail(StatusCode::INTERNAL_SERVER_ERROR, "storage error"))
}

async fn update_profile_handler(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    Extension(claims): Extension<AuthPayload>,
    Json(patch): Json<ProfilePatch>,
) -> HandlerResult<Json<CompanyProfile>> {
    require_company(&claims, &company_id)?;
    state
        .profiles
        .update(&company_id, patch)
        .map_err(|_| fail(StatusCode::INTERNAL_SERVER_ERROR, "storage error"))?;
    state
        .profiles
        .load(&company_id)
        .map(Json)
        .map_err(|_| fail(StatusCode::INTERNAL_SERVER_ERROR, "storage error"))
}

async fn set_password_handler(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    Extension(claims): Extension<AuthPayload>,
    Json(payload): Json<SetPasswordRequest>,
) -> HandlerResult<Json<RestResponse>> {
    require_company(&claims, &company_id)?;
    if payload.password.is_empty() {
        return Err(fail(StatusCode::BAD_REQUEST, "password must not be empty"));
    }
    state
        .storage
        .set_password(&company_id, &payload.password)
        .map_err(|_| fail(StatusCode::INTERNAL_SERVER_ERROR, "storage error"))?;
    Ok(ok("password updated"))
}

async fn rename_handler(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    Extension(claims): Extension<AuthPayload>,
    Json(payload): Json<RenameRequest>,
) -> HandlerResult<Json<LoginResponse>> {
    require_company(&claims, &company_id)?;
    let new_id = state
        .profiles
        .rename_company_id(&company_id, &payload.new_id)
        .map_err(|e| match e {
            RenameError::Taken(_) => fail(StatusCode::CONFLICT, e.to_string()),
            RenameError::EmptyTarget | RenameError::SameId => {
                fail(StatusCode::BAD_REQUEST, e.to_string())
            }
            RenameError::Storage(_) => fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        })?;
    // Re-issue the session for the new id, like the browser app rewrites
    // its session storage after a rename.
    let token = create_jwt(&new_id)
        .map_err(|_| fail(StatusCode::INTERNAL_SERVER_ERROR, "token error"))?;
    info!(old_id = %company_id, new_id = %new_id, "company renamed");
    Ok(Json(LoginResponse {
        company_id: new_id,
        token,
    }))
}
