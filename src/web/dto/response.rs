//! Response DTOs for Web API.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::{Role, User};
use crate::order::{self, ServiceOrder, SlaStatus};

// ============================================================================
// Generic Response Wrappers
// ============================================================================

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Paginated response wrapper.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    /// Response data.
    pub data: Vec<T>,
    /// Pagination metadata.
    pub meta: PaginationMeta,
}

impl<T: Serialize> PaginatedResponse<T> {
    /// Create a new paginated response.
    pub fn new(data: Vec<T>, page: u32, per_page: u32, total: u64) -> Self {
        Self {
            data,
            meta: PaginationMeta {
                page,
                per_page,
                total,
            },
        }
    }
}

/// Pagination metadata.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginationMeta {
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
    /// Total number of items.
    pub total: u64,
}

/// Plain confirmation message.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// Auth & User DTOs
// ============================================================================

/// Issued token pair.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    /// Access token (JWT).
    pub access: String,
    /// Refresh token.
    pub refresh: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// A user account as exposed by the API; the password hash is never included.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: String,
    pub last_login: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

/// Registration result.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserResponse,
}

// ============================================================================
// Service Order DTOs
// ============================================================================

/// A service order with its derived labels and SLA figures.
///
/// The CPF is write-only: only its masked form is returned.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceOrderResponse {
    pub id: i64,
    pub protocol: String,
    pub so_number: String,
    #[serde(rename = "type")]
    pub order_type: order::OrderType,
    pub type_display: String,
    pub status: order::OrderStatus,
    pub status_display: String,
    pub provider: order::ProviderType,
    pub provider_display: String,
    pub priority: order::OrderPriority,
    pub priority_display: String,
    pub recipient_name: String,
    pub cpf_masked: String,
    pub description: String,
    /// Username of the creator.
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub sla_status: SlaStatus,
    /// Seconds until due, negative once overdue; null for closed orders.
    pub time_remaining_seconds: Option<i64>,
}

impl ServiceOrderResponse {
    /// Render an order as seen at `now`.
    pub fn at(order: ServiceOrder, now: DateTime<Utc>) -> Self {
        let sla = order::evaluate(order.created_at, order.priority, order.status, now);
        Self {
            id: order.id,
            type_display: order.order_type.label().to_string(),
            status_display: order.status.label().to_string(),
            provider_display: order.provider.label().to_string(),
            priority_display: order.priority.label().to_string(),
            cpf_masked: order::mask_cpf(&order.cpf),
            protocol: order.protocol,
            so_number: order.so_number,
            order_type: order.order_type,
            status: order.status,
            provider: order.provider,
            priority: order.priority,
            recipient_name: order.recipient_name,
            description: order.description,
            created_by: order.created_by_username,
            created_at: order.created_at,
            updated_at: order.updated_at,
            due_date: sla.due_date,
            sla_status: sla.status,
            time_remaining_seconds: sla.time_remaining_seconds,
        }
    }
}

impl From<ServiceOrder> for ServiceOrderResponse {
    fn from(order: ServiceOrder) -> Self {
        Self::at(order, Utc::now())
    }
}

/// Successful CSV import.
#[derive(Debug, Serialize, ToSchema)]
pub struct ImportResponse {
    pub message: String,
    pub imported: usize,
}

// ============================================================================
// Mail DTOs
// ============================================================================

/// Outcome of a send request.
#[derive(Debug, Serialize, ToSchema)]
pub struct SendMailResponse {
    /// Number of (message, recipient) deliveries that succeeded.
    pub sent: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderPriority, OrderStatus, OrderType, ProviderType};
    use chrono::{Duration, TimeZone};

    fn order(status: OrderStatus) -> ServiceOrder {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        ServiceOrder {
            id: 1,
            protocol: "PRT-1".to_string(),
            so_number: "SO-1".to_string(),
            order_type: OrderType::Repair,
            status,
            provider: ProviderType::ThirdParty,
            priority: OrderPriority::High,
            recipient_name: "Ana".to_string(),
            cpf: "123.456.789-09".to_string(),
            description: String::new(),
            created_by: 3,
            created_by_username: "ana".to_string(),
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_order_response_hides_cpf() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let json = serde_json::to_value(ServiceOrderResponse::at(order(OrderStatus::Open), now))
            .unwrap();

        assert!(json.get("cpf").is_none());
        assert_eq!(json["cpf_masked"], "123.***.***-09");
        assert_eq!(json["type"], "repair");
        assert_eq!(json["provider_display"], "Third Party");
        assert_eq!(json["created_by"], "ana");
        assert_eq!(json["sla_status"], "on_time");
        assert_eq!(json["time_remaining_seconds"], 23 * 3600);
    }

    #[test]
    fn test_order_response_overdue_and_closed() {
        let late = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap() + Duration::hours(30);

        let open = ServiceOrderResponse::at(order(OrderStatus::InProgress), late);
        assert_eq!(open.sla_status, SlaStatus::Overdue);
        assert_eq!(open.time_remaining_seconds, Some(-6 * 3600));

        let done = ServiceOrderResponse::at(order(OrderStatus::Completed), late);
        assert_eq!(done.sla_status, SlaStatus::OnTime);
        assert!(done.time_remaining_seconds.is_none());
    }
}
