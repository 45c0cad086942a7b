//! Service orders: model, validation, SLA rules, storage and CSV import.

pub mod import;
pub mod input;
pub mod repository;
pub mod sla;
pub mod types;

pub use import::{import_csv, ImportError, RowError};
pub use input::{field_errors, FieldErrors, ServiceOrderInput, ServiceOrderPatch};
pub use repository::ServiceOrderRepository;
pub use sla::{evaluate, mask_cpf, Sla, SlaStatus};
pub use types::{
    NewServiceOrder, OrderPriority, OrderQuery, OrderStatus, OrderType, Ordering, OrderingField,
    ProviderType, ServiceOrder, ServiceOrderUpdate,
};
