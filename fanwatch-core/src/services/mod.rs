// fanwatch-core/src/services/mod.rs

pub mod grouping;
pub mod formatter;
pub mod detectors;
pub mod monitor_service;
pub mod registration_service;

pub use grouping::{group_by_entity, EntityWorkItem};
pub use monitor_service::{ItemOutcome, MonitorService};
pub use registration_service::RegistrationService;
