/// Types describing what a caller wants out of device/feature selection.
/// Used by [`crate::device::physical_device::PhysicalDevice::select`] and consumed by
/// [`crate::engine::Engine::init`].
pub mod app_info;

pub use app_info::{AppSettings, Expected, GPURequirements, QueueRequest};
