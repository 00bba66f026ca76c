//! Per-frame ring.
//!
//! Each slot bundles a command pool/buffer pair, a CPU/GPU sync primitive, and a
//! bump-allocated staging buffer that is reset every time the slot comes back around.
//! `begin_frame` waits on the slot's sync primitive before recording into a slot that
//! might still be in flight.

use ash::vk;

use crate::allocators::{Allocator, ArcAllocator, MemoryLocation};
use crate::command::{CommandBuffer, CommandPool};
use crate::error::EngineError;
use crate::resource::{Buffer, BufferCreateInfo};
use crate::sync::FrameSync;

/// A single bump-pointer allocation handed out by a slot's staging ring.
#[derive(Debug, Clone, Copy)]
pub struct StagingAllocation {
    pub offset: vk::DeviceSize,
    pub size: vk::DeviceSize,
}

struct StagingRing<A: Allocator> {
    buffer: Buffer<A>,
    capacity: vk::DeviceSize,
    cursor: vk::DeviceSize,
}

impl<A: Allocator> StagingRing<A> {
    fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Bump-allocates `size` bytes aligned to `align`, or reports exhaustion.
    fn alloc(&mut self, size: vk::DeviceSize, align: vk::DeviceSize) -> Result<StagingAllocation, EngineError> {
        let aligned = crate::resource::buffer::align_up(self.cursor, align);
        if aligned + size > self.capacity {
            return Err(EngineError::StagingExhausted {
                needed: aligned + size,
                available: self.capacity.saturating_sub(self.cursor),
            });
        }
        self.cursor = aligned + size;
        Ok(StagingAllocation {
            offset: aligned,
            size,
        })
    }
}

/// One slot of the frame ring: an independent command pool/buffer, sync primitive, and
/// staging ring, so `frames_in_flight` frames can be recorded without contending on GPU
/// resources still in flight.
pub struct FrameSlot<A: Allocator> {
    pub command_pool: CommandPool,
    pub command_buffer: CommandBuffer,
    pub sync: FrameSync,
    staging: StagingRing<A>,
}

impl<A: Allocator> FrameSlot<A> {
    /// Resets the staging bump pointer; called once the slot's sync primitive is known
    /// to have been reached by the GPU.
    pub fn reset_staging(&mut self) {
        self.staging.reset();
    }

    pub fn alloc_staging(
        &mut self,
        size: vk::DeviceSize,
        align: vk::DeviceSize,
    ) -> Result<StagingAllocation, EngineError> {
        self.staging.alloc(size, align)
    }

    pub fn staging_buffer(&self) -> &Buffer<A> {
        &self.staging.buffer
    }
}

/// Owns the `frames_in_flight` [`FrameSlot`]s and tracks which one is current.
pub struct FrameRing<A: Allocator> {
    slots: Vec<FrameSlot<A>>,
    current: usize,
}

impl<A: Allocator> FrameRing<A> {
    pub fn new(
        device: crate::device::LogicalDevice,
        queue: &crate::device::Queue,
        allocator: &mut ArcAllocator<A>,
        frames_in_flight: usize,
        staging_bytes_per_frame: vk::DeviceSize,
    ) -> anyhow::Result<Self> {
        let mut slots = Vec::with_capacity(frames_in_flight);
        for i in 0..frames_in_flight {
            let command_pool = CommandPool::new(
                device.clone(),
                queue,
                vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            )?;
            let command_buffer = command_pool
                .allocate(&vk::CommandBufferAllocateInfo {
                    s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO,
                    p_next: std::ptr::null(),
                    command_pool: command_pool.handle(),
                    level: vk::CommandBufferLevel::PRIMARY,
                    command_buffer_count: 1,
                    _marker: Default::default(),
                })?
                .remove(0);
            let fence = crate::sync::Fence::new(device.clone(), vk::FenceCreateFlags::SIGNALED)?;
            let staging = crate::resource::traits::Resource::new(BufferCreateInfo::NewEmptyBuffer {
                device: device.clone(),
                name: Some(format!("frame-staging-{i}")),
                allocator,
                size: staging_bytes_per_frame,
                memory_type: MemoryLocation::CpuToGpu,
                usage_flags: vk::BufferUsageFlags::TRANSFER_SRC,
            })?;
            slots.push(FrameSlot {
                command_pool,
                command_buffer,
                sync: FrameSync::from_fence(fence),
                staging: StagingRing {
                    buffer: staging,
                    capacity: staging_bytes_per_frame,
                    cursor: 0,
                },
            });
        }
        Ok(Self { slots, current: 0 })
    }

    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Waits on the current slot's fence, resets the fence and staging bump pointer,
    /// and returns the slot ready to record into.
    pub fn begin_frame(&mut self, timeout_ns: u64) -> Result<&mut FrameSlot<A>, EngineError> {
        let slot = &mut self.slots[self.current];
        slot.sync.wait(timeout_ns)?;
        slot.sync.reset()?;
        slot.reset_staging();
        Ok(slot)
    }

    pub fn current(&self) -> &FrameSlot<A> {
        &self.slots[self.current]
    }

    pub fn current_mut(&mut self) -> &mut FrameSlot<A> {
        &mut self.slots[self.current]
    }

    /// Advances to the next slot in the ring. Does not itself touch the
    /// deferred-destruction ring — callers drive that separately.
    pub fn advance(&mut self) {
        self.current = (self.current + 1) % self.slots.len();
    }
}
