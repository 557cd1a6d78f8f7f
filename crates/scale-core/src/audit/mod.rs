//! Audit sink implementations

pub mod file;
pub mod memory;

pub use file::FileAuditSink;
pub use memory::MemoryAuditSink;
