//! Validated service-order input shared by the JSON API and CSV import.

use std::collections::BTreeMap;

use serde::Deserialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use super::sla::is_cpf_format;
use super::types::{
    NewServiceOrder, OrderPriority, OrderStatus, OrderType, ProviderType, ServiceOrderUpdate,
};

/// Field name to error messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Flatten `validator` errors into [`FieldErrors`].
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {field}"))
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

fn validate_cpf(value: &str) -> Result<(), ValidationError> {
    if is_cpf_format(value) {
        Ok(())
    } else {
        Err(ValidationError::new("cpf")
            .with_message("CPF must be formatted as ###.###.###-##.".into()))
    }
}

fn default_status() -> String {
    OrderStatus::default().as_str().to_string()
}

fn default_priority() -> String {
    OrderPriority::default().as_str().to_string()
}

/// A service order as submitted for creation.
///
/// Choice fields are kept as text until validated so that a bad value is
/// reported per field, under its wire name, rather than as a malformed body.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ServiceOrderInput {
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "Protocol is required (at most 50 characters)."))]
    pub protocol: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "SO number is required (at most 50 characters)."))]
    pub so_number: String,
    #[serde(rename = "type", default)]
    pub order_type: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Recipient name is required (at most 255 characters)."
    ))]
    pub recipient_name: String,
    #[serde(default)]
    #[validate(custom(function = "validate_cpf"))]
    pub cpf: String,
    #[serde(default)]
    pub description: String,
}

impl ServiceOrderInput {
    /// Validate and convert into a row owned by `created_by`.
    pub fn into_new_order(mut self, created_by: i64) -> Result<NewServiceOrder, FieldErrors> {
        trim_in_place(&mut self.protocol);
        trim_in_place(&mut self.so_number);
        trim_in_place(&mut self.recipient_name);

        let mut errors = collect(&self);

        let order_type = parse_field(&mut errors, "type", &self.order_type);
        let status = parse_field(&mut errors, "status", &self.status);
        let provider = parse_field(&mut errors, "provider", &self.provider);
        let priority = parse_field(&mut errors, "priority", &self.priority);

        match (order_type, status, provider, priority) {
            (Some(order_type), Some(status), Some(provider), Some(priority))
                if errors.is_empty() =>
            {
                Ok(NewServiceOrder {
                    protocol: self.protocol,
                    so_number: self.so_number,
                    order_type,
                    status,
                    provider,
                    priority,
                    recipient_name: self.recipient_name,
                    cpf: self.cpf,
                    description: self.description,
                    created_by,
                })
            }
            _ => Err(errors),
        }
    }
}

/// A partial update; only supplied fields are validated and written.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct ServiceOrderPatch {
    #[validate(length(min = 1, max = 50, message = "Protocol is required (at most 50 characters)."))]
    pub protocol: Option<String>,
    #[validate(length(min = 1, max = 50, message = "SO number is required (at most 50 characters)."))]
    pub so_number: Option<String>,
    #[serde(rename = "type")]
    pub order_type: Option<String>,
    pub status: Option<String>,
    pub provider: Option<String>,
    pub priority: Option<String>,
    #[validate(length(
        min = 1,
        max = 255,
        message = "Recipient name is required (at most 255 characters)."
    ))]
    pub recipient_name: Option<String>,
    #[validate(custom(function = "validate_cpf"))]
    pub cpf: Option<String>,
    pub description: Option<String>,
}

impl ServiceOrderPatch {
    /// Validate and convert into a repository update.
    pub fn into_update(mut self) -> Result<ServiceOrderUpdate, FieldErrors> {
        for field in [
            &mut self.protocol,
            &mut self.so_number,
            &mut self.recipient_name,
        ] {
            if let Some(value) = field {
                trim_in_place(value);
            }
        }

        let mut errors = collect(&self);

        let update = ServiceOrderUpdate {
            order_type: self
                .order_type
                .as_deref()
                .and_then(|v| parse_field(&mut errors, "type", v)),
            status: self
                .status
                .as_deref()
                .and_then(|v| parse_field(&mut errors, "status", v)),
            provider: self
                .provider
                .as_deref()
                .and_then(|v| parse_field(&mut errors, "provider", v)),
            priority: self
                .priority
                .as_deref()
                .and_then(|v| parse_field(&mut errors, "priority", v)),
            protocol: self.protocol,
            so_number: self.so_number,
            recipient_name: self.recipient_name,
            cpf: self.cpf,
            description: self.description,
        };

        if errors.is_empty() {
            Ok(update)
        } else {
            Err(errors)
        }
    }
}

/// Derived checks as [`FieldErrors`]; empty when all pass.
fn collect(input: &impl Validate) -> FieldErrors {
    input
        .validate()
        .err()
        .map(|e| field_errors(&e))
        .unwrap_or_default()
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

fn parse_field<T>(errors: &mut FieldErrors, field: &str, value: &str) -> Option<T>
where
    T: std::str::FromStr<Err = String>,
{
    match value.parse() {
        Ok(v) => Some(v),
        Err(msg) => {
            errors.entry(field.to_string()).or_default().push(msg);
            None
        }
    }
}
