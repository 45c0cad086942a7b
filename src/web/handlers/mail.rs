//! Outbound mail handler.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::mail::{ComposeError, OutboundMessage};
use crate::web::dto::{ApiResponse, SendMailRequest, SendMailResponse, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;
use crate::ServdeskError;

/// POST /api/mail/send - Compose one message and deliver it directly to
/// each recipient domain's mail exchange (staff only).
///
/// With fail-silently enabled, `sent` may be lower than the recipient count.
#[utoipa::path(
    post,
    path = "/api/mail/send",
    tag = "mail",
    request_body = SendMailRequest,
    responses(
        (status = 200, description = "Deliveries attempted", body = SendMailResponse),
        (status = 403, description = "Staff access required"),
        (status = 422, description = "Invalid address or no recipients"),
        (status = 502, description = "Delivery failed for a recipient domain"),
        (status = 503, description = "Mail delivery is not configured")
    ),
    security(("bearer_auth" = []))
)]
pub async fn send_mail(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<SendMailRequest>,
) -> Result<Json<ApiResponse<SendMailResponse>>, ApiError> {
    user.actor().require_staff()?;

    let mailer = state
        .mailer
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Mail delivery is not configured"))?;

    let from = req
        .from
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(&state.default_from);

    let message = OutboundMessage::compose(from, &req.to, &req.cc, &req.bcc, &req.subject, &req.body)
        .map_err(|e| match e {
            ComposeError::Build(msg) => {
                tracing::error!("Failed to build message: {}", msg);
                ApiError::internal("Failed to build message")
            }
            other => ApiError::unprocessable(other.to_string()),
        })?;

    let recipients = message.recipients().len();
    let sent = mailer
        .send_all(std::slice::from_ref(&message))
        .await
        .map_err(ServdeskError::from)?;

    tracing::info!(recipients, sent, by = user.0.sub, "Mail sent");
    Ok(Json(ApiResponse::new(SendMailResponse { sent })))
}
