use axum::{
    extract::{rejection::FormRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};

use crate::app::identity::Identity;
use crate::app::nonce::NOTIFICATION_NONCE_ACTION;
use crate::domain::fragment;
use crate::domain::notification::{
    Acknowledgement, Fadeout, NewNotification, Notification, Owner, SessionToken,
};
use crate::http::error::Envelope;
use crate::http::{AdminToken, AppError, AuthUser, Caller};
use crate::AppState;

pub const AJAX_PATH: &str = "/ajax";
pub const ACTION_GET_NOTIFICATIONS: &str = "get_notifications";
pub const ACTION_MARK_AS_READ: &str = "mark_notification_as_read";

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = match state.store.ping().await {
        Ok(()) => "ok",
        Err(err) => {
            tracing::warn!(error = ?err, "store ping failed");
            "degraded"
        }
    };

    Json(HealthResponse { status })
}

/// Raw `/ajax` form. Every field is optional here; each action validates
/// what it needs.
#[derive(Debug, Default, Deserialize)]
pub struct AjaxForm {
    pub action: Option<String>,
    pub nonce: Option<String>,
    pub notification_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AjaxAction {
    GetNotifications,
    MarkNotificationAsRead,
}

impl AjaxForm {
    fn action(&self) -> Result<AjaxAction, AppError> {
        match self.action.as_deref().map(str::trim) {
            Some(ACTION_GET_NOTIFICATIONS) => Ok(AjaxAction::GetNotifications),
            Some(ACTION_MARK_AS_READ) => Ok(AjaxAction::MarkNotificationAsRead),
            Some(other) => Err(AppError::bad_request(format!("Unknown action: {}", other))),
            None => Err(AppError::bad_request("Action is required.")),
        }
    }

    fn nonce(&self) -> Result<&str, AppError> {
        self.nonce
            .as_deref()
            .map(str::trim)
            .filter(|nonce| !nonce.is_empty())
            .ok_or_else(AppError::invalid_nonce)
    }
}

#[derive(Debug)]
pub struct DeliveryRequest<'a> {
    pub nonce: &'a str,
}

impl<'a> DeliveryRequest<'a> {
    pub fn parse(form: &'a AjaxForm) -> Result<Self, AppError> {
        Ok(Self {
            nonce: form.nonce()?,
        })
    }
}

#[derive(Debug)]
pub struct AcknowledgeRequest {
    pub notification_id: i64,
}

impl AcknowledgeRequest {
    /// Only called once the nonce has been accepted.
    pub fn parse(form: &AjaxForm) -> Result<Self, AppError> {
        let raw = form
            .notification_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::bad_request("Notification ID is required."))?;
        let notification_id = raw
            .parse()
            .map_err(|_| AppError::bad_request("Notification ID must be an integer."))?;
        Ok(Self { notification_id })
    }
}

/// A body that does not parse as a form carries no usable nonce, so it is
/// answered like a missing one.
pub async fn ajax(
    State(state): State<AppState>,
    caller: Caller,
    form: Result<Form<AjaxForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(form) = form.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected unparseable ajax form");
        AppError::invalid_nonce()
    })?;

    match form.action()? {
        AjaxAction::GetNotifications => get_notifications(&state, caller, &form).await,
        AjaxAction::MarkNotificationAsRead => mark_notification_as_read(&state, caller, &form).await,
    }
}

fn verify_nonce(state: &AppState, identity: &Identity, nonce: &str) -> Result<(), AppError> {
    if state
        .nonce_service()
        .verify(NOTIFICATION_NONCE_ACTION, identity.nonce_uid(), nonce)
    {
        Ok(())
    } else {
        tracing::debug!(uid = identity.nonce_uid(), "rejected request with invalid nonce");
        Err(AppError::invalid_nonce())
    }
}

async fn get_notifications(
    state: &AppState,
    Caller(resolved): Caller,
    form: &AjaxForm,
) -> Result<Response, AppError> {
    let request = DeliveryRequest::parse(form)?;
    verify_nonce(state, &resolved.identity, request.nonce)?;

    let owner = resolved.identity.owner();
    let notifications = state.store.list_unread(&owner).await.map_err(|err| {
        tracing::error!(error = ?err, owner = ?owner, "failed to list notifications");
        AppError::internal("failed to list notifications")
    })?;

    let mut response = Html(fragment::render(&notifications)).into_response();
    if let Some(cookie) = resolved.set_cookie() {
        let value = HeaderValue::from_str(&cookie).map_err(|err| {
            tracing::error!(error = %err, "failed to build session cookie header");
            AppError::internal("failed to issue session")
        })?;
        response.headers_mut().append(header::SET_COOKIE, value);
    }

    Ok(response)
}

async fn mark_notification_as_read(
    state: &AppState,
    Caller(resolved): Caller,
    form: &AjaxForm,
) -> Result<Response, AppError> {
    verify_nonce(state, &resolved.identity, form.nonce()?)?;
    let request = AcknowledgeRequest::parse(form)?;
    let id = request.notification_id;

    let outcome = state.store.acknowledge(id).await.map_err(|err| {
        tracing::error!(error = ?err, notification_id = id, "failed to acknowledge notification");
        AppError::internal("failed to acknowledge notification")
    })?;

    match outcome {
        Acknowledgement::NotFound => Err(AppError::not_found("Notification not found.")),
        Acknowledgement::Deleted | Acknowledgement::MarkedRead => {
            tracing::debug!(notification_id = id, outcome = ?outcome, "notification acknowledged");
            Ok(Json(Envelope::success("Notification marked as read or deleted.")).into_response())
        }
    }
}

#[derive(Serialize)]
pub struct NonceResponse {
    pub ajax_url: &'static str,
    pub nonce: String,
}

/// Page bootstrap data: where to post and the nonce to post with.
pub async fn issue_nonce(
    auth: Option<AuthUser>,
    State(state): State<AppState>,
) -> Result<Json<NonceResponse>, AppError> {
    let uid = auth.map(|auth| auth.user_id).unwrap_or(0);
    let nonce = state
        .nonce_service()
        .create(NOTIFICATION_NONCE_ACTION, uid)
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to create nonce");
            AppError::internal("failed to create nonce")
        })?;

    Ok(Json(NonceResponse {
        ajax_url: AJAX_PATH,
        nonce,
    }))
}

#[derive(Deserialize)]
pub struct CreateNotificationRequest {
    pub message: String,
    pub user_id: Option<i64>,
    pub session_id: Option<String>,
    pub fadeout: Option<Fadeout>,
    pub delete_after_read: Option<bool>,
}

impl CreateNotificationRequest {
    fn into_new_notification(self) -> Result<NewNotification, AppError> {
        if self.message.trim().is_empty() {
            return Err(AppError::bad_request("message is required"));
        }

        let owner = match (self.user_id, self.session_id) {
            (Some(user_id), None) => Owner::User(user_id),
            (None, Some(session_id)) => Owner::Session(
                SessionToken::parse(&session_id)
                    .map_err(|err| AppError::bad_request(err.to_string()))?,
            ),
            _ => {
                return Err(AppError::bad_request(
                    "exactly one of user_id or session_id is required",
                ))
            }
        };

        let mut new = NewNotification::new(owner, self.message);
        if let Some(fadeout) = self.fadeout {
            new = new.fadeout(fadeout);
        }
        if let Some(delete_after_read) = self.delete_after_read {
            new = new.delete_after_read(delete_after_read);
        }
        Ok(new)
    }
}

pub async fn create_notification(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    let new = payload.into_new_notification()?;
    let notification = state.store.create(new).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to create notification");
        AppError::internal("failed to create notification")
    })?;

    tracing::info!(
        notification_id = notification.id,
        owner = ?notification.owner,
        "notification created"
    );
    Ok((StatusCode::CREATED, Json(notification)))
}
