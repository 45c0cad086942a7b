//! Web API module for servdesk.
//!
//! JSON REST API for accounts, service orders, CSV import and outbound mail,
//! with an OpenAPI document served next to Swagger UI.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use openapi::ApiDoc;
pub use router::create_router;
pub use server::WebServer;
