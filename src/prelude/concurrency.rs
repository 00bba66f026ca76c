/// Concurrency is responsible for abstracting of different Rust async runtimes
pub use crate::concurrency::lockable::{AsyncLockable, Lockable, SyncLockable};
