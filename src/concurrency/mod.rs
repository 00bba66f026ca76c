/// Defines generic traits to abstract over various async libraries

pub mod lockable;
mod lockable_impl;

/// Redefines
#[cfg(feature = "winit")]
pub use winit;
#[cfg(feature = "tokio")]
pub use tokio;

pub use raw_window_handle;
pub use ash;

/// Locking primitive used where a caller hasn't opted into a specific async runtime.
#[allow(non_camel_case_types)]
pub type DEFAULT_LOCKABLE<T> = std::sync::Mutex<T>;