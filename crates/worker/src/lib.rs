//! Background workers that drain the bulk team member import queue.

pub mod config;
pub mod pool;
pub mod worker;

pub use config::WorkerConfig;
pub use pool::WorkerPool;
pub use worker::{BulkImportWorker, JobDisposition};
