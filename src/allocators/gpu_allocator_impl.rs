/// Mostly taken from https://github.com/NotAPenguin0/phobos-rs/blob/master/src/allocator/default_allocator.rs
///
/// Implements [`gpu_allocator`]
use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use ash::vk;
use gpu_allocator::vulkan::{AllocationCreateDesc, AllocationScheme, AllocatorCreateDesc};
use gpu_allocator::MemoryLocation as GpuMemoryLocation;

use super::MemoryLocation;

#[derive(Clone)]
pub struct GPUAllocatorImpl {
    handle: Arc<Mutex<gpu_allocator::vulkan::Allocator>>,
    device: crate::device::LogicalDevice,
}

impl std::fmt::Debug for GPUAllocatorImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GPUAllocatorImpl").finish_non_exhaustive()
    }
}

unsafe impl Send for GPUAllocatorImpl {}
unsafe impl Sync for GPUAllocatorImpl {}

#[derive(Default)]
pub struct GPUAllocation {
    allocator: Option<Arc<Mutex<gpu_allocator::vulkan::Allocator>>>,
    handle: Option<gpu_allocator::vulkan::Allocation>,
    name: String,
}

impl std::fmt::Debug for GPUAllocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GPUAllocation")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

unsafe impl Send for GPUAllocation {}
unsafe impl Sync for GPUAllocation {}

impl Drop for GPUAllocation {
    fn drop(&mut self) {
        if let (Some(allocator), Some(allocation)) = (self.allocator.take(), self.handle.take()) {
            if let Ok(mut allocator) = allocator.lock() {
                #[cfg(feature = "log-memory-allocations")]
                tracing::trace!("Freeing GPU allocation {}", self.name);
                let _ = allocator.free(allocation);
            }
        }
    }
}

impl GPUAllocatorImpl {
    /// Wraps a [`gpu_allocator::vulkan::Allocator`] created from `create_info`.
    ///
    /// `create_info.instance`/`device`/`physical_device` must come from the same
    /// logical device passed as `device`, mirroring how [`ash::Device`] and
    /// [`crate::device::LogicalDevice`] wrap the same underlying handle.
    pub fn new(
        create_info: AllocatorCreateDesc,
        device: crate::device::LogicalDevice,
    ) -> Result<Self> {
        let allocator = gpu_allocator::vulkan::Allocator::new(&create_info)?;
        Ok(Self {
            handle: Arc::new(Mutex::new(allocator)),
            device,
        })
    }
}

impl super::Allocator for GPUAllocatorImpl {
    type Allocation = GPUAllocation;

    fn allocate(
        &mut self,
        name: &str,
        requirements: &vk::MemoryRequirements,
        ty: MemoryLocation,
    ) -> Result<Self::Allocation> {
        let mut allocator = self
            .handle
            .lock()
            .map_err(|_| anyhow::Error::from(crate::error::EngineError::PoisonError))?;
        let allocation = allocator.allocate(&AllocationCreateDesc {
            name,
            requirements: *requirements,
            location: GpuMemoryLocation::from(ty),
            linear: true,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })?;

        #[cfg(feature = "log-memory-allocations")]
        tracing::trace!("Allocated GPU allocation {} ({} bytes)", name, requirements.size);

        Ok(GPUAllocation {
            allocator: Some(self.handle.clone()),
            handle: Some(allocation),
            name: name.to_string(),
        })
    }

    fn free(&mut self, mut allocation: Self::Allocation) -> Result<()> {
        if let Some(handle) = allocation.handle.take() {
            let mut allocator = self
                .handle
                .lock()
                .map_err(|_| anyhow::Error::from(crate::error::EngineError::PoisonError))?;
            allocator.free(handle)?;
        }
        allocation.allocator.take();
        Ok(())
    }

    fn get_device(&self) -> &crate::device::LogicalDevice {
        &self.device
    }

    fn device(&self) -> crate::device::LogicalDevice {
        self.device.clone()
    }
}

impl super::Allocation for GPUAllocation {
    fn memory(&self) -> vk::DeviceMemory {
        self.handle.as_ref().unwrap().memory()
    }

    fn offset(&self) -> vk::DeviceSize {
        self.handle.as_ref().unwrap().offset()
    }

    fn mapped_ptr(&self) -> Option<NonNull<c_void>> {
        self.handle.as_ref().unwrap().mapped_ptr()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl From<MemoryLocation> for GpuMemoryLocation {
    fn from(value: MemoryLocation) -> Self {
        match value {
            MemoryLocation::GpuOnly => GpuMemoryLocation::GpuOnly,
            MemoryLocation::CpuToGpu => GpuMemoryLocation::CpuToGpu,
            MemoryLocation::GpuToCpu => GpuMemoryLocation::GpuToCpu,
            MemoryLocation::CpuOnly => GpuMemoryLocation::CpuToGpu,
        }
    }
}
