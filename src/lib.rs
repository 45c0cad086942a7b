//! servdesk - service-order desk backend
//!
//! A JSON API for tracking service orders with SLA deadlines, bulk CSV
//! import, token authentication, and outbound mail delivered straight to
//! each recipient domain's mail exchange.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod mail;
pub mod order;
pub mod web;

pub use auth::{
    ensure_admin, hash_password, validate_password, verify_password, Actor, PasswordError,
    PermissionError,
};
pub use config::Config;
pub use db::{Database, NewUser, Role, User, UserRepository, UserUpdate};
pub use error::{Result, ServdeskError};
pub use mail::{build_mailer, MailError, Mailer, OutboundMessage};
pub use order::{ServiceOrder, ServiceOrderRepository};
pub use web::WebServer;
