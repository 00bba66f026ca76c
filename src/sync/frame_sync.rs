//! Per-frame CPU/GPU synchronization primitive.
//!
//! Picks between a binary fence and a timeline semaphore at startup depending on
//! driver support for `VK_KHR_timeline_semaphore`. Rather than a `union`-like type
//! switched on a runtime flag, this is an enum: operations the active variant
//! doesn't support return [`EngineError::OperationNotSupported`] instead of being
//! silently ignored.

use ash::vk;

use crate::error::EngineError;
use crate::sync::{Fence, Semaphore};

/// A frame's CPU/GPU handshake primitive: either a binary fence reset every frame,
/// or a single monotonically increasing timeline semaphore shared across frames.
pub enum FrameSync {
    Fence(Fence),
    TimelineSemaphore { semaphore: Semaphore, target: u64 },
}

impl FrameSync {
    pub fn from_fence(fence: Fence) -> Self {
        FrameSync::Fence(fence)
    }

    pub fn from_timeline(semaphore: Semaphore, initial_target: u64) -> Self {
        FrameSync::TimelineSemaphore {
            semaphore,
            target: initial_target,
        }
    }

    /// Blocks until the primitive reaches its signaled state, up to `timeout` ns.
    pub fn wait(&self, timeout: u64) -> Result<(), EngineError> {
        match self {
            FrameSync::Fence(fence) => fence.wait(timeout).map_err(EngineError::from),
            FrameSync::TimelineSemaphore { semaphore, target } => semaphore.wait(*target, timeout),
        }
    }

    /// Resets a binary fence for reuse; timeline semaphores never reset and instead
    /// advance their target value monotonically.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        match self {
            FrameSync::Fence(fence) => fence.reset().map_err(EngineError::from),
            FrameSync::TimelineSemaphore { .. } => Err(EngineError::OperationNotSupported),
        }
    }

    /// Advances the timeline target by one submission; a no-op error on a binary fence.
    pub fn advance(&mut self) -> Result<u64, EngineError> {
        match self {
            FrameSync::Fence(_) => Err(EngineError::OperationNotSupported),
            FrameSync::TimelineSemaphore { target, .. } => {
                *target += 1;
                Ok(*target)
            }
        }
    }

    pub fn raw_fence(&self) -> Option<vk::Fence> {
        match self {
            FrameSync::Fence(fence) => Some(fence.handle()),
            FrameSync::TimelineSemaphore { .. } => None,
        }
    }

    pub fn raw_semaphore(&self) -> Option<(vk::Semaphore, u64)> {
        match self {
            FrameSync::Fence(_) => None,
            FrameSync::TimelineSemaphore { semaphore, target } => {
                Some((semaphore.handle(), *target))
            }
        }
    }
}

impl crate::traits::Destructible for FrameSync {
    fn destroy(&mut self) {
        match self {
            FrameSync::Fence(fence) => fence.destroy(),
            FrameSync::TimelineSemaphore { semaphore, .. } => semaphore.destroy(),
        }
    }
}
