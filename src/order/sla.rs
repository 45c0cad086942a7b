//! SLA classification and CPF helpers.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::types::{OrderPriority, OrderStatus};

/// Where an order stands against its resolution window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SlaStatus {
    OnTime,
    NearingDueDate,
    Overdue,
}

/// SLA figures derived for one order at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sla {
    pub due_date: DateTime<Utc>,
    pub status: SlaStatus,
    /// Seconds until due (negative once overdue); `None` for closed orders.
    pub time_remaining_seconds: Option<i64>,
}

/// Resolution window for a priority.
pub fn window(priority: OrderPriority) -> Duration {
    match priority {
        OrderPriority::High => Duration::hours(24),
        OrderPriority::Medium => Duration::hours(72),
        OrderPriority::Low => Duration::hours(168),
    }
}

/// Classify an order created at `created_at` as seen at `now`.
///
/// Open orders are `nearing_due_date` once no more than 20% of the window
/// remains and `overdue` once the due date has passed.
pub fn evaluate(
    created_at: DateTime<Utc>,
    priority: OrderPriority,
    status: OrderStatus,
    now: DateTime<Utc>,
) -> Sla {
    let window = window(priority);
    let due_date = created_at + window;

    if status.is_closed() {
        return Sla {
            due_date,
            status: SlaStatus::OnTime,
            time_remaining_seconds: None,
        };
    }

    let remaining = due_date - now;
    let sla_status = if now > due_date {
        SlaStatus::Overdue
    } else if remaining.num_seconds() * 5 <= window.num_seconds() {
        SlaStatus::NearingDueDate
    } else {
        SlaStatus::OnTime
    };

    Sla {
        due_date,
        status: sla_status,
        time_remaining_seconds: Some(remaining.num_seconds()),
    }
}

/// Mask a CPF as `123.***.***-45`; anything not 14 characters long is `N/A`.
pub fn mask_cpf(cpf: &str) -> String {
    let chars: Vec<char> = cpf.chars().collect();
    if chars.len() != 14 {
        return "N/A".to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[12..].iter().collect();
    format!("{head}.***.***-{tail}")
}

/// Whether `cpf` has the shape `###.###.###-##`.
pub fn is_cpf_format(cpf: &str) -> bool {
    let bytes = cpf.as_bytes();
    bytes.len() == 14
        && bytes.iter().enumerate().all(|(i, b)| match i {
            3 | 7 => *b == b'.',
            11 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}
