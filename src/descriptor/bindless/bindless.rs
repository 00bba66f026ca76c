//! Bindless descriptor table.
//!
//! One `update_after_bind` descriptor set with five parallel arrays, in binding order
//! `0: sampled image, 1: sampler, 2: storage image, 3: storage buffer, 4: uniform buffer`.
//! Index allocation is grounded on [`crate::util::free_list_allocator::FreeList`]'s
//! free-list-of-indices discipline (LIFO reuse of freed slots); descriptor writes follow
//! [`crate::descriptor::descriptor_set::DescriptorSet::write`]'s pattern of batching
//! `vk::DescriptorImageInfo`/`vk::DescriptorBufferInfo` into side `Vec`s that outlive the
//! `vkUpdateDescriptorSets` call, fixing the dangling-pointer hazard a naive
//! `Vec<*const T>` of pending writes would have.

use std::ptr;
use std::sync::Mutex;

use ash::vk;

use crate::config::BindlessCapacities;
use crate::descriptor::{
    DescriptorPool, DescriptorSetLayoutBinding, DescriptorSetLayoutBuilder, PoolSize,
};
use crate::error::{BindlessKind, EngineError};
use crate::traits::Destructible;

pub const SAMPLED_IMAGE_BINDING: u32 = 0;
pub const SAMPLER_BINDING: u32 = 1;
pub const STORAGE_IMAGE_BINDING: u32 = 2;
pub const STORAGE_BUFFER_BINDING: u32 = 3;
pub const UNIFORM_BUFFER_BINDING: u32 = 4;

/// A pending write waiting for the next [`BindlessTable::flush_pending`]. Owns its
/// payload so a burst of registrations between flushes can't leave the table holding
/// a pointer into memory the caller has since dropped.
enum PendingWrite {
    Image {
        binding: u32,
        index: u32,
        info: vk::DescriptorImageInfo,
    },
    Buffer {
        binding: u32,
        index: u32,
        info: vk::DescriptorBufferInfo,
    },
}

/// One free-list-backed index allocator for a single descriptor array.
struct ArrayAllocator {
    capacity: u32,
    next: u32,
    free: Vec<u32>,
    kind: BindlessKind,
}

impl ArrayAllocator {
    fn new(capacity: u32, kind: BindlessKind) -> Self {
        Self {
            capacity,
            next: 0,
            free: Vec::new(),
            kind,
        }
    }

    fn allocate(&mut self) -> Result<u32, EngineError> {
        if let Some(index) = self.free.pop() {
            return Ok(index);
        }
        if self.next >= self.capacity {
            return Err(EngineError::BindlessCapacityExceeded(self.kind));
        }
        let index = self.next;
        self.next += 1;
        Ok(index)
    }

    fn free(&mut self, index: u32) {
        self.free.push(index);
    }
}

struct Arrays {
    sampled_images: ArrayAllocator,
    samplers: ArrayAllocator,
    storage_images: ArrayAllocator,
    storage_buffers: ArrayAllocator,
    uniform_buffers: ArrayAllocator,
    pending: Vec<PendingWrite>,
}

/// A single allocated slot in one of the five bindless arrays. Freeing it returns the
/// index to its array's free list; it does not by itself destroy the underlying
/// resource (that still goes through the resource arena / deferred destruction ring).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceBinding {
    pub kind: BindlessKind,
    pub index: u32,
}

/// The bindless descriptor set plus the index allocators and pending-write queue behind
/// it. A single mutex covers index allocation, the pending list, and the flush
/// operation — registrations from different threads never race each other, and a
/// flush always sees a consistent snapshot of what's pending.
pub struct BindlessTable {
    device: crate::device::LogicalDevice,
    pool: DescriptorPool,
    layout: crate::descriptor::DescriptorSetLayout,
    set: vk::DescriptorSet,
    arrays: Mutex<Arrays>,
}

impl BindlessTable {
    pub fn new(
        device: crate::device::LogicalDevice,
        capacities: BindlessCapacities,
    ) -> anyhow::Result<Self> {
        let pool_sizes = [
            PoolSize::default()
                .descriptor_type(vk::DescriptorType::SAMPLED_IMAGE)
                .descriptor_count(capacities.max_sampled_images),
            PoolSize::default()
                .descriptor_type(vk::DescriptorType::SAMPLER)
                .descriptor_count(capacities.max_samplers),
            PoolSize::default()
                .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
                .descriptor_count(capacities.max_storage_images),
            PoolSize::default()
                .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
                .descriptor_count(capacities.max_storage_buffers),
            PoolSize::default()
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(capacities.max_uniform_buffers),
        ];
        let pool = DescriptorPool::new_with_pool_sizes(
            device.clone(),
            vk::DescriptorPoolCreateFlags::UPDATE_AFTER_BIND,
            1,
            &pool_sizes,
        )?;

        let binding_flags = vk::DescriptorBindingFlags::PARTIALLY_BOUND
            | vk::DescriptorBindingFlags::UPDATE_AFTER_BIND
            | vk::DescriptorBindingFlags::UPDATE_UNUSED_WHILE_PENDING;
        let layout = DescriptorSetLayoutBuilder::default()
            .add_raw_binding(&[
                DescriptorSetLayoutBinding::default()
                    .binding(SAMPLED_IMAGE_BINDING)
                    .descriptor_count(capacities.max_sampled_images)
                    .descriptor_type(vk::DescriptorType::SAMPLED_IMAGE)
                    .stage_flags(vk::ShaderStageFlags::ALL)
                    .flag(binding_flags),
                DescriptorSetLayoutBinding::default()
                    .binding(SAMPLER_BINDING)
                    .descriptor_count(capacities.max_samplers)
                    .descriptor_type(vk::DescriptorType::SAMPLER)
                    .stage_flags(vk::ShaderStageFlags::ALL)
                    .flag(binding_flags),
                DescriptorSetLayoutBinding::default()
                    .binding(STORAGE_IMAGE_BINDING)
                    .descriptor_count(capacities.max_storage_images)
                    .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
                    .stage_flags(vk::ShaderStageFlags::ALL)
                    .flag(binding_flags),
                DescriptorSetLayoutBinding::default()
                    .binding(STORAGE_BUFFER_BINDING)
                    .descriptor_count(capacities.max_storage_buffers)
                    .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
                    .stage_flags(vk::ShaderStageFlags::ALL)
                    .flag(binding_flags),
                DescriptorSetLayoutBinding::default()
                    .binding(UNIFORM_BUFFER_BINDING)
                    .descriptor_count(capacities.max_uniform_buffers)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .stage_flags(vk::ShaderStageFlags::ALL)
                    .flag(binding_flags),
            ])
            .build(
                device.clone(),
                vk::ShaderStageFlags::ALL,
                ptr::null(),
                vk::DescriptorSetLayoutCreateFlags::UPDATE_AFTER_BIND_POOL,
            )?;

        let set = pool.allocate(layout.handle())?;

        Ok(Self {
            device,
            pool,
            layout,
            set,
            arrays: Mutex::new(Arrays {
                sampled_images: ArrayAllocator::new(
                    capacities.max_sampled_images,
                    BindlessKind::SampledImage,
                ),
                samplers: ArrayAllocator::new(capacities.max_samplers, BindlessKind::Sampler),
                storage_images: ArrayAllocator::new(
                    capacities.max_storage_images,
                    BindlessKind::StorageImage,
                ),
                storage_buffers: ArrayAllocator::new(
                    capacities.max_storage_buffers,
                    BindlessKind::StorageBuffer,
                ),
                uniform_buffers: ArrayAllocator::new(
                    capacities.max_uniform_buffers,
                    BindlessKind::UniformBuffer,
                ),
                pending: Vec::new(),
            }),
        })
    }

    pub fn descriptor_set(&self) -> vk::DescriptorSet {
        self.set
    }

    pub fn descriptor_set_layout(&self) -> vk::DescriptorSetLayout {
        self.layout.handle()
    }

    /// Allocates an index and queues the write; call [`BindlessTable::flush_pending`]
    /// before the next submit that reads it (`update_after_bind` permits this as long
    /// as the flush lands before the command buffer referencing it executes).
    pub fn register_sampled_image(
        &self,
        image_view: vk::ImageView,
        image_layout: vk::ImageLayout,
    ) -> Result<ResourceBinding, EngineError> {
        let mut arrays = self.arrays.lock()?;
        let index = arrays.sampled_images.allocate()?;
        arrays.pending.push(PendingWrite::Image {
            binding: SAMPLED_IMAGE_BINDING,
            index,
            info: vk::DescriptorImageInfo {
                sampler: vk::Sampler::null(),
                image_view,
                image_layout,
            },
        });
        Ok(ResourceBinding {
            kind: BindlessKind::SampledImage,
            index,
        })
    }

    pub fn register_sampler(&self, sampler: vk::Sampler) -> Result<ResourceBinding, EngineError> {
        let mut arrays = self.arrays.lock()?;
        let index = arrays.samplers.allocate()?;
        arrays.pending.push(PendingWrite::Image {
            binding: SAMPLER_BINDING,
            index,
            info: vk::DescriptorImageInfo {
                sampler,
                image_view: vk::ImageView::null(),
                image_layout: vk::ImageLayout::UNDEFINED,
            },
        });
        Ok(ResourceBinding {
            kind: BindlessKind::Sampler,
            index,
        })
    }

    /// Overwrites an already-allocated sampled-image slot in place, without touching
    /// the index allocator — used when a view is rebuilt (e.g. after a resize) but the
    /// bindless index it's known by must stay the same.
    pub fn update_sampled_image(
        &self,
        index: u32,
        image_view: vk::ImageView,
        image_layout: vk::ImageLayout,
    ) -> Result<(), EngineError> {
        let mut arrays = self.arrays.lock()?;
        arrays.pending.push(PendingWrite::Image {
            binding: SAMPLED_IMAGE_BINDING,
            index,
            info: vk::DescriptorImageInfo {
                sampler: vk::Sampler::null(),
                image_view,
                image_layout,
            },
        });
        Ok(())
    }

    /// Overwrites an already-allocated sampler slot in place, without allocating a new
    /// index.
    pub fn update_sampler(&self, index: u32, sampler: vk::Sampler) -> Result<(), EngineError> {
        let mut arrays = self.arrays.lock()?;
        arrays.pending.push(PendingWrite::Image {
            binding: SAMPLER_BINDING,
            index,
            info: vk::DescriptorImageInfo {
                sampler,
                image_view: vk::ImageView::null(),
                image_layout: vk::ImageLayout::UNDEFINED,
            },
        });
        Ok(())
    }

    pub fn register_storage_image(
        &self,
        image_view: vk::ImageView,
        image_layout: vk::ImageLayout,
    ) -> Result<ResourceBinding, EngineError> {
        let mut arrays = self.arrays.lock()?;
        let index = arrays.storage_images.allocate()?;
        arrays.pending.push(PendingWrite::Image {
            binding: STORAGE_IMAGE_BINDING,
            index,
            info: vk::DescriptorImageInfo {
                sampler: vk::Sampler::null(),
                image_view,
                image_layout,
            },
        });
        Ok(ResourceBinding {
            kind: BindlessKind::StorageImage,
            index,
        })
    }

    pub fn register_storage_buffer(
        &self,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        range: vk::DeviceSize,
    ) -> Result<ResourceBinding, EngineError> {
        let mut arrays = self.arrays.lock()?;
        let index = arrays.storage_buffers.allocate()?;
        arrays.pending.push(PendingWrite::Buffer {
            binding: STORAGE_BUFFER_BINDING,
            index,
            info: vk::DescriptorBufferInfo {
                buffer,
                offset,
                range,
            },
        });
        Ok(ResourceBinding {
            kind: BindlessKind::StorageBuffer,
            index,
        })
    }

    pub fn register_uniform_buffer(
        &self,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        range: vk::DeviceSize,
    ) -> Result<ResourceBinding, EngineError> {
        let mut arrays = self.arrays.lock()?;
        let index = arrays.uniform_buffers.allocate()?;
        arrays.pending.push(PendingWrite::Buffer {
            binding: UNIFORM_BUFFER_BINDING,
            index,
            info: vk::DescriptorBufferInfo {
                buffer,
                offset,
                range,
            },
        });
        Ok(ResourceBinding {
            kind: BindlessKind::UniformBuffer,
            index,
        })
    }

    /// Returns `binding`'s index to its array's free list for LIFO reuse. Does not
    /// clear the descriptor slot; a stale read is harmless because `PARTIALLY_BOUND`
    /// permits reading an unwritten/reused slot and the caller is expected to have
    /// already stopped referencing the index from any in-flight command buffer.
    pub fn unregister(&self, binding: ResourceBinding) -> Result<(), EngineError> {
        let mut arrays = self.arrays.lock()?;
        match binding.kind {
            BindlessKind::SampledImage => arrays.sampled_images.free(binding.index),
            BindlessKind::Sampler => arrays.samplers.free(binding.index),
            BindlessKind::StorageImage => arrays.storage_images.free(binding.index),
            BindlessKind::StorageBuffer => arrays.storage_buffers.free(binding.index),
            BindlessKind::UniformBuffer => arrays.uniform_buffers.free(binding.index),
        }
        Ok(())
    }

    /// Drains every pending write and issues one `vkUpdateDescriptorSets` call.
    ///
    /// Every `vk::DescriptorImageInfo`/`vk::DescriptorBufferInfo` is copied into a
    /// `Vec` owned by this stack frame before any `vk::WriteDescriptorSet` points into
    /// it, so the pointers stay valid for the duration of the call — unlike a design
    /// that stores `*const` pointers in the pending queue itself, which would dangle
    /// the moment the caller's temporary went out of scope.
    pub fn flush_pending(&self) -> Result<(), EngineError> {
        let pending = {
            let mut arrays = self.arrays.lock()?;
            std::mem::take(&mut arrays.pending)
        };
        if pending.is_empty() {
            return Ok(());
        }

        let mut image_infos = Vec::with_capacity(pending.len());
        let mut buffer_infos = Vec::with_capacity(pending.len());
        for write in &pending {
            match write {
                PendingWrite::Image { info, .. } => image_infos.push(*info),
                PendingWrite::Buffer { info, .. } => buffer_infos.push(*info),
            }
        }

        let mut writes = Vec::with_capacity(pending.len());
        let mut image_cursor = 0usize;
        let mut buffer_cursor = 0usize;
        for write in &pending {
            let write_set = match write {
                PendingWrite::Image { binding, index, .. } => {
                    let w = vk::WriteDescriptorSet {
                        s_type: vk::StructureType::WRITE_DESCRIPTOR_SET,
                        p_next: ptr::null(),
                        dst_set: self.set,
                        dst_binding: *binding,
                        dst_array_element: *index,
                        descriptor_count: 1,
                        descriptor_type: binding_descriptor_type(*binding),
                        p_image_info: &image_infos[image_cursor],
                        p_buffer_info: ptr::null(),
                        p_texel_buffer_view: ptr::null(),
                        _marker: Default::default(),
                    };
                    image_cursor += 1;
                    w
                }
                PendingWrite::Buffer { binding, index, .. } => {
                    let w = vk::WriteDescriptorSet {
                        s_type: vk::StructureType::WRITE_DESCRIPTOR_SET,
                        p_next: ptr::null(),
                        dst_set: self.set,
                        dst_binding: *binding,
                        dst_array_element: *index,
                        descriptor_count: 1,
                        descriptor_type: binding_descriptor_type(*binding),
                        p_image_info: ptr::null(),
                        p_buffer_info: &buffer_infos[buffer_cursor],
                        p_texel_buffer_view: ptr::null(),
                        _marker: Default::default(),
                    };
                    buffer_cursor += 1;
                    w
                }
            };
            writes.push(write_set);
        }

        unsafe {
            self.device.get_handle().update_descriptor_sets(&writes, &[]);
        }
        Ok(())
    }
}

fn binding_descriptor_type(binding: u32) -> vk::DescriptorType {
    match binding {
        SAMPLED_IMAGE_BINDING => vk::DescriptorType::SAMPLED_IMAGE,
        SAMPLER_BINDING => vk::DescriptorType::SAMPLER,
        STORAGE_IMAGE_BINDING => vk::DescriptorType::STORAGE_IMAGE,
        STORAGE_BUFFER_BINDING => vk::DescriptorType::STORAGE_BUFFER,
        UNIFORM_BUFFER_BINDING => vk::DescriptorType::UNIFORM_BUFFER,
        _ => unreachable!("bindless table only ever writes its five known bindings"),
    }
}

impl Destructible for BindlessTable {
    fn destroy(&mut self) {
        self.layout.destroy();
        self.pool.destroy();
    }
}

#[cfg(feature = "raii")]
impl Drop for BindlessTable {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_allocator_reuses_freed_index_lifo() {
        let mut alloc = ArrayAllocator::new(4, BindlessKind::SampledImage);
        let a = alloc.allocate().unwrap();
        let b = alloc.allocate().unwrap();
        alloc.free(a);
        alloc.free(b);
        assert_eq!(alloc.allocate().unwrap(), b);
        assert_eq!(alloc.allocate().unwrap(), a);
    }

    #[test]
    fn array_allocator_reports_capacity_exceeded() {
        let mut alloc = ArrayAllocator::new(1, BindlessKind::Sampler);
        alloc.allocate().unwrap();
        assert!(matches!(
            alloc.allocate(),
            Err(EngineError::BindlessCapacityExceeded(BindlessKind::Sampler))
        ));
    }

    #[test]
    fn binding_descriptor_type_matches_layout_order() {
        assert_eq!(
            binding_descriptor_type(SAMPLED_IMAGE_BINDING),
            vk::DescriptorType::SAMPLED_IMAGE
        );
        assert_eq!(
            binding_descriptor_type(UNIFORM_BUFFER_BINDING),
            vk::DescriptorType::UNIFORM_BUFFER
        );
    }
}
