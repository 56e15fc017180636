pub mod audit_log;

pub use audit_log::{AuditLog, LOG_TIMESTAMP_FORMAT};
