use axum::{
    extract::{Json as ExtractJson, Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::BookingError;
use crate::models::common::{LoadSlotsParams, LoginParams, SelectSlotParams};
use crate::models::session::UserProfile;
use crate::services::confirmation::ConfirmationPrompt;
use crate::services::connectivity::ConnectivityMonitor;
use crate::services::reservation::{ActionOutcome, BookingView, ReservationController};
use crate::services::sessions::SessionRegistry;

// AppState struct containing shared resources
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub connectivity: Arc<ConnectivityMonitor>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub session_token: String,
    pub user: UserProfile,
}

// Booking view plus the connection badge
#[derive(Debug, Serialize)]
pub struct DeskView {
    #[serde(flatten)]
    pub booking: BookingView,
    pub connected: bool,
}

#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    pub selected_slot: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub pending: Option<ConfirmationPrompt>,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub outcome: ActionOutcome,
    pub view: DeskView,
}

// Pull the signed session handle out of `Authorization: Bearer ...`
fn session_handle(headers: &HeaderMap) -> Result<&str, BookingError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|handle| !handle.is_empty())
        .ok_or(BookingError::SessionNotFound)
}

async fn controller(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Arc<ReservationController>, BookingError> {
    state.sessions.get(session_handle(headers)?).await
}

async fn desk_view(state: &AppState, controller: &ReservationController) -> DeskView {
    DeskView {
        booking: controller.view().await,
        connected: state.connectivity.is_connected(),
    }
}

// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    ExtractJson(params): ExtractJson<LoginParams>,
) -> Result<(StatusCode, Json<LoginResponse>), BookingError> {
    info!("Received login request for {}", params.email);

    let (session_token, controller) = state
        .sessions
        .login(&params.email, &params.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LoginResponse {
            session_token,
            user: controller.session().user.clone(),
        }),
    ))
}

// Logout endpoint
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, BookingError> {
    state.sessions.logout(session_handle(&headers)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Current booking screen
pub async fn booking_view(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DeskView>, BookingError> {
    let controller = controller(&state, &headers).await?;
    Ok(Json(desk_view(&state, &controller).await))
}

// Load slots for a doctor and date
pub async fn load_slots(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ExtractJson(params): ExtractJson<LoadSlotsParams>,
) -> Result<Json<DeskView>, BookingError> {
    let controller = controller(&state, &headers).await?;
    info!(
        "User {} loading slots for doctor {} on {}",
        controller.session().user_id(),
        params.doctor_id,
        params.date
    );

    controller.load(params.doctor_id, params.date).await?;
    Ok(Json(desk_view(&state, &controller).await))
}

// Toggle slot selection
pub async fn select_slot(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ExtractJson(params): ExtractJson<SelectSlotParams>,
) -> Result<Json<SelectionResponse>, BookingError> {
    let controller = controller(&state, &headers).await?;
    let selected_slot = controller.select_slot(&params.slot_id).await?;
    Ok(Json(SelectionResponse { selected_slot }))
}

pub async fn request_reserve(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<PromptResponse>, BookingError> {
    let controller = controller(&state, &headers).await?;
    Ok(Json(PromptResponse {
        pending: controller.request_reserve().await,
    }))
}

pub async fn request_confirm(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<PromptResponse>, BookingError> {
    let controller = controller(&state, &headers).await?;
    Ok(Json(PromptResponse {
        pending: controller.request_confirm().await,
    }))
}

pub async fn request_cancel(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<PromptResponse>, BookingError> {
    let controller = controller(&state, &headers).await?;
    Ok(Json(PromptResponse {
        pending: controller.request_cancel().await,
    }))
}

// Confirm the open prompt and commit the action
pub async fn accept_pending(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ActionResponse>, BookingError> {
    let controller = controller(&state, &headers).await?;
    let outcome = controller.accept_pending().await;
    debug!("Gate resolved with {:?}", outcome);

    Ok(Json(ActionResponse {
        outcome,
        view: desk_view(&state, &controller).await,
    }))
}

// Close the open prompt without committing
pub async fn dismiss_pending(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<PromptResponse>, BookingError> {
    let controller = controller(&state, &headers).await?;
    Ok(Json(PromptResponse {
        pending: controller.dismiss_pending().await,
    }))
}

pub async fn dismiss_notification(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(notification_id): Path<u64>,
) -> Result<StatusCode, BookingError> {
    let controller = controller(&state, &headers).await?;
    if controller.dismiss_notification(notification_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

// Server-sent events carrying the connection badge
pub async fn connectivity_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = state.connectivity.changes().map(|connected| {
        Ok(Event::default()
            .event("connectivity")
            .data(if connected { "connected" } else { "disconnected" }))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
