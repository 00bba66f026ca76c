pub mod binary_semaphore;
/// Handles synchronization
pub mod fence;
pub mod frame_sync;
mod memory_barrier;
pub mod semaphore;

pub use binary_semaphore::BinarySemaphore;
pub use fence::Fence;
pub use frame_sync::FrameSync;
pub use semaphore::Semaphore;
