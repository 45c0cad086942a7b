//! Service-order model types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Defines a closed set of choices stored and serialised as snake_case text,
/// each with a human label.
macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $what:literal {
            $($(#[$vmeta:meta])* $variant:ident => ($value:literal, $label:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash,
            Serialize, Deserialize, sqlx::Type, utoipa::ToSchema,
        )]
        #[serde(rename_all = "snake_case")]
        #[sqlx(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every choice, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Stored representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }

            /// Human-readable label.
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            /// Comma-separated list of accepted values, for error messages.
            pub fn choices() -> String {
                Self::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ")
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    _ => Err(format!(
                        "\"{s}\" is not a valid {}. Choose one of: {}.",
                        $what,
                        Self::choices()
                    )),
                }
            }
        }
    };
}

choice_enum! {
    /// Kind of work requested.
    OrderType, "type" {
        Installation => ("installation", "Installation"),
        Maintenance => ("maintenance", "Maintenance"),
        Repair => ("repair", "Repair"),
        Administrative => ("administrative", "Administrative"),
    }
}

choice_enum! {
    /// Lifecycle state.
    OrderStatus, "status" {
        Open => ("open", "Open"),
        InProgress => ("in_progress", "In Progress"),
        Completed => ("completed", "Completed"),
        Canceled => ("canceled", "Canceled"),
    }
}

choice_enum! {
    /// Who carries out the work.
    ProviderType, "provider" {
        Technical => ("technical", "Technical"),
        Specialized => ("specialized", "Specialized"),
        ThirdParty => ("third_party", "Third Party"),
    }
}

choice_enum! {
    /// Urgency; drives the SLA window.
    OrderPriority, "priority" {
        Low => ("low", "Low"),
        Medium => ("medium", "Medium"),
        High => ("high", "High"),
    }
}

impl OrderStatus {
    /// Closed orders are no longer measured against their SLA.
    pub fn is_closed(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Canceled)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Open
    }
}

impl Default for OrderPriority {
    fn default() -> Self {
        OrderPriority::Medium
    }
}

/// A stored service order, joined with its creator's username.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ServiceOrder {
    pub id: i64,
    pub protocol: String,
    pub so_number: String,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub provider: ProviderType,
    pub priority: OrderPriority,
    pub recipient_name: String,
    pub cpf: String,
    pub description: String,
    pub created_by: i64,
    pub created_by_username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for creating a service order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewServiceOrder {
    pub protocol: String,
    pub so_number: String,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub provider: ProviderType,
    pub priority: OrderPriority,
    pub recipient_name: String,
    pub cpf: String,
    pub description: String,
    pub created_by: i64,
}

/// Partial update of a service order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceOrderUpdate {
    pub protocol: Option<String>,
    pub so_number: Option<String>,
    pub order_type: Option<OrderType>,
    pub status: Option<OrderStatus>,
    pub provider: Option<ProviderType>,
    pub priority: Option<OrderPriority>,
    pub recipient_name: Option<String>,
    pub cpf: Option<String>,
    pub description: Option<String>,
}

impl ServiceOrderUpdate {
    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Column a listing can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingField {
    CreatedAt,
    UpdatedAt,
    Protocol,
    Priority,
    Status,
}

impl OrderingField {
    /// SQL expression to sort by. Priority and status sort by rank, not text.
    pub fn sql(&self) -> &'static str {
        match self {
            OrderingField::CreatedAt => "o.created_at",
            OrderingField::UpdatedAt => "o.updated_at",
            OrderingField::Protocol => "o.protocol",
            OrderingField::Priority => {
                "CASE o.priority WHEN 'low' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END"
            }
            OrderingField::Status => {
                "CASE o.status WHEN 'open' THEN 0 WHEN 'in_progress' THEN 1 \
                 WHEN 'completed' THEN 2 ELSE 3 END"
            }
        }
    }
}

/// Sort order for listings, written `field` or `-field` for descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering {
    pub field: OrderingField,
    pub descending: bool,
}

impl Default for Ordering {
    fn default() -> Self {
        Self {
            field: OrderingField::CreatedAt,
            descending: true,
        }
    }
}

impl FromStr for Ordering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let field = match name {
            "created_at" => OrderingField::CreatedAt,
            "updated_at" => OrderingField::UpdatedAt,
            "protocol" => OrderingField::Protocol,
            "priority" => OrderingField::Priority,
            "status" => OrderingField::Status,
            _ => {
                return Err(format!(
                    "\"{s}\" is not a valid ordering. Use one of: created_at, updated_at, \
                     protocol, priority, status (prefix with '-' for descending)."
                ))
            }
        };
        Ok(Self { field, descending })
    }
}

/// Filters, search and paging for a listing.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Restrict to orders created by this user.
    pub created_by: Option<i64>,
    pub status: Option<OrderStatus>,
    pub order_type: Option<OrderType>,
    pub provider: Option<ProviderType>,
    pub priority: Option<OrderPriority>,
    /// Case-insensitive substring over protocol, SO number, recipient and description.
    pub search: Option<String>,
    pub ordering: Ordering,
    pub offset: i64,
    pub limit: i64,
}
