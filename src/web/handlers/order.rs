//! Service-order handlers, including bulk CSV import.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::str::FromStr;
use std::sync::Arc;

use crate::auth::Actor;
use crate::order::{
    self, ImportError, OrderQuery, Ordering, ServiceOrder, ServiceOrderInput, ServiceOrderPatch,
    ServiceOrderRepository,
};
use crate::web::dto::{
    ApiResponse, ImportResponse, JsonBody, OrderListQuery, PaginatedResponse,
    ServiceOrderResponse,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;
use crate::ServdeskError;

fn parse_filter<T>(value: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: FromStr<Err = String>,
{
    value
        .filter(|v| !v.is_empty())
        .map(|v| v.parse().map_err(ApiError::bad_request))
        .transpose()
}

fn protocol_conflict(err: ServdeskError) -> ApiError {
    match err {
        ServdeskError::Conflict(_) => {
            ApiError::conflict("A service order with this protocol already exists.")
        }
        other => other.into(),
    }
}

/// Load an order the actor may see, or fail with 404/403.
async fn load_visible(state: &AppState, actor: Actor, id: i64) -> Result<ServiceOrder, ApiError> {
    let order = ServiceOrderRepository::new(state.db.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Service order not found"))?;
    actor.can_access(order.created_by)?;
    Ok(order)
}

/// GET /api/service-orders - List service orders.
///
/// Staff see every order; members see only their own.
#[utoipa::path(
    get,
    path = "/api/service-orders",
    tag = "service-orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Page of service orders", body = Vec<ServiceOrderResponse>),
        (status = 400, description = "Unknown filter value or ordering"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<OrderListQuery>,
) -> Result<Json<PaginatedResponse<ServiceOrderResponse>>, ApiError> {
    let actor = user.actor();
    let pagination = params.pagination();
    let (offset, limit) = pagination.to_offset_limit();

    let query = OrderQuery {
        created_by: (!actor.is_staff()).then_some(actor.id),
        status: parse_filter(params.status.as_deref())?,
        order_type: parse_filter(params.order_type.as_deref())?,
        provider: parse_filter(params.provider.as_deref())?,
        priority: parse_filter(params.priority.as_deref())?,
        search: params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        ordering: parse_filter::<Ordering>(params.ordering.as_deref())?.unwrap_or_default(),
        offset,
        limit,
    };

    let repo = ServiceOrderRepository::new(state.db.pool());
    let orders = repo.list(&query).await?;
    let total = repo.count(&query).await?;

    let now = Utc::now();
    Ok(Json(PaginatedResponse::new(
        orders
            .into_iter()
            .map(|o| ServiceOrderResponse::at(o, now))
            .collect(),
        pagination.page,
        pagination.per_page,
        total as u64,
    )))
}

/// POST /api/service-orders - Create a service order owned by the caller.
#[utoipa::path(
    post,
    path = "/api/service-orders",
    tag = "service-orders",
    request_body = ServiceOrderInput,
    responses(
        (status = 201, description = "Service order created", body = ServiceOrderResponse),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Protocol already exists"),
        (status = 422, description = "Validation failed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    JsonBody(input): JsonBody<ServiceOrderInput>,
) -> Result<(StatusCode, Json<ApiResponse<ServiceOrderResponse>>), ApiError> {
    let new_order = input
        .into_new_order(user.0.sub)
        .map_err(ApiError::validation)?;

    let order = ServiceOrderRepository::new(state.db.pool())
        .create(&new_order)
        .await
        .map_err(protocol_conflict)?;

    tracing::info!(order_id = order.id, protocol = %order.protocol, by = user.0.sub, "Service order created");
    Ok((StatusCode::CREATED, Json(ApiResponse::new(order.into()))))
}

/// GET /api/service-orders/:id - Get a service order.
#[utoipa::path(
    get,
    path = "/api/service-orders/{id}",
    tag = "service-orders",
    params(("id" = i64, Path, description = "Service order ID")),
    responses(
        (status = 200, description = "Service order", body = ServiceOrderResponse),
        (status = 403, description = "Not permitted"),
        (status = 404, description = "Service order not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ServiceOrderResponse>>, ApiError> {
    let order = load_visible(&state, user.actor(), id).await?;
    Ok(Json(ApiResponse::new(order.into())))
}

/// PATCH /api/service-orders/:id - Update supplied fields of a service order.
#[utoipa::path(
    patch,
    path = "/api/service-orders/{id}",
    tag = "service-orders",
    params(("id" = i64, Path, description = "Service order ID")),
    request_body = ServiceOrderPatch,
    responses(
        (status = 200, description = "Updated service order", body = ServiceOrderResponse),
        (status = 403, description = "Not permitted"),
        (status = 404, description = "Service order not found"),
        (status = 409, description = "Protocol already exists"),
        (status = 422, description = "Validation failed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    JsonBody(patch): JsonBody<ServiceOrderPatch>,
) -> Result<Json<ApiResponse<ServiceOrderResponse>>, ApiError> {
    load_visible(&state, user.actor(), id).await?;
    let update = patch.into_update().map_err(ApiError::validation)?;

    let order = ServiceOrderRepository::new(state.db.pool())
        .update(id, &update)
        .await
        .map_err(protocol_conflict)?
        .ok_or_else(|| ApiError::not_found("Service order not found"))?;

    tracing::info!(order_id = id, by = user.0.sub, "Service order updated");
    Ok(Json(ApiResponse::new(order.into())))
}

/// DELETE /api/service-orders/:id - Delete a service order.
#[utoipa::path(
    delete,
    path = "/api/service-orders/{id}",
    tag = "service-orders",
    params(("id" = i64, Path, description = "Service order ID")),
    responses(
        (status = 204, description = "Service order deleted"),
        (status = 403, description = "Not permitted"),
        (status = 404, description = "Service order not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    load_visible(&state, user.actor(), id).await?;
    ServiceOrderRepository::new(state.db.pool())
        .delete(id)
        .await?;

    tracing::info!(order_id = id, by = user.0.sub, "Service order deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/service-orders/import - Bulk import from a CSV upload (staff only).
///
/// Request body: multipart/form-data with a "file" field. Either every row
/// is imported or none is.
#[utoipa::path(
    post,
    path = "/api/service-orders/import",
    tag = "service-orders",
    responses(
        (status = 201, description = "All rows imported", body = ImportResponse),
        (status = 400, description = "Missing, unreadable or invalid file; row errors listed"),
        (status = 403, description = "Staff access required"),
        (status = 409, description = "A protocol already exists")
    ),
    security(("bearer_auth" = []))
)]
pub async fn import_orders(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<ImportResponse>>), axum::response::Response> {
    use axum::response::IntoResponse;

    user.actor()
        .require_staff()
        .map_err(|e| ApiError::from(e).into_response())?;

    let mut upload: Option<(Option<String>, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data").into_response()
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| {
            tracing::warn!("Failed to read uploaded file: {}", e);
            ApiError::bad_request("Failed to read file").into_response()
        })?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let (filename, bytes) = upload.ok_or_else(|| ImportError::MissingFile.into_response())?;
    order::import::check_filename(filename.as_deref()).map_err(IntoResponse::into_response)?;
    if bytes.len() > state.max_upload_size {
        return Err(ApiError::bad_request(format!(
            "File too large (max {} MB)",
            state.max_upload_size / 1024 / 1024
        ))
        .into_response());
    }

    let imported = order::import_csv(state.db.pool(), &bytes, user.0.sub)
        .await
        .map_err(|e| {
            tracing::info!(error = %e, "CSV import refused");
            e.into_response()
        })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(ImportResponse {
            message: format!("Successfully imported {imported} service orders."),
            imported,
        })),
    ))
}
