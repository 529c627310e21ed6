pub mod audit_log;
pub mod partitioner;

pub use audit_log::AuditLog;
pub use partitioner::RecordPartitioner;
