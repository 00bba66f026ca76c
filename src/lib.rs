pub mod allocators;
#[cfg(feature = "bootstrap")]
pub mod bootstrap;
pub mod command;
pub mod concurrency;
pub mod config;
pub mod core;
pub mod destruction;
pub mod device;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod frame;
pub mod pipeline_cache;
pub mod prelude;
pub mod resource;
pub mod sync;
pub mod transient;
pub mod util;
pub mod wsi;

pub mod descriptor;
pub mod traits;

pub use engine::Engine;
pub use error::{EngineError, InitError};

// Re-exports
pub use ash;
pub use ash_window;
#[cfg(feature = "gpu-allocator")]
pub use gpu_allocator;
pub use raw_window_handle;
#[cfg(feature = "vk-mem-rs")]
pub use vk_mem;
#[cfg(feature = "winit")]
pub use winit;
