pub mod debug_utils;
pub mod execution_manager;
pub mod logical_device;
pub mod physical_device;
pub mod queue;

pub use debug_utils::DebugMessenger;
pub use execution_manager::ExecutionManager;
pub use logical_device::{LogicalDevice, LogicalDeviceCreateInfo, WeakLogicalDevice};
pub use physical_device::PhysicalDevice;
pub use queue::{Queue, QueueInfo};
