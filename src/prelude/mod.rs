#![allow(unused_imports)]

pub mod concurrency;

#[cfg(feature = "gpu-allocator")]
pub use gpu_allocator;
#[cfg(feature = "winit")]
pub use winit;

pub use crate::config::{BindlessCapacities, EngineConfig};
pub use crate::descriptor::{BindlessTable, ResourceBinding};
pub use crate::engine::Engine;
pub use crate::error::{BindlessKind, EngineError, InitError};
pub use crate::resource::{Buffer, Handle, Image, ImageView, Sampler, Table};
pub use crate::traits::Destructible;
