//! # Volley Core
//!
//! Target enumeration, probe execution, the bounded worker pool, scan
//! orchestration, false-positive elimination, summaries and the audit log,
//! plus the raw-socket adapters that back them in production.

pub mod audit;
pub mod discovery;
pub mod filter;
pub mod network;
pub mod pool;
pub mod probe;
pub mod scanner;
pub mod summary;
