//! Public resource facade.
//!
//! `Engine` is the single owner of the Vulkan instance/device, the two resource
//! allocators, the bindless table, the per-frame ring, and the render-thread
//! dispatcher. Its `init`/`shutdown` pair brings up instance, surface, physical
//! device, logical device, and allocators in sequence, then stands up the
//! deferred-destruction ring, the dispatcher, the frame ring, and the bindless
//! table on top. Swapchain/presentation ownership stays outside `Engine` — callers
//! that present build their own swapchain against `Engine::surface`.

use std::collections::HashMap;
use std::ffi::{c_char, c_void, CString};
use std::path::PathBuf;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::allocators::{ArcAllocator, GPUAllocatorImpl, MemoryLocation, SlotMapMemoryAllocator};
use crate::bootstrap::{AppSettings, Expected, GPURequirements, QueueRequest};
use crate::command::{CmdBuffer, CommandBufferExecutable, CommandBufferRecording};
use crate::config::EngineConfig;
use crate::core::Instance;
use crate::descriptor::{BindlessTable, ResourceBinding};
use crate::destruction::DestructionRing;
use crate::device::{ExecutionManager, LogicalDevice, LogicalDeviceCreateInfo, PhysicalDevice, Queue};
use crate::dispatcher::Dispatcher;
use crate::error::{EngineError, InitError};
use crate::frame::FrameRing;
use crate::pipeline_cache::PipelineStateCache;
use crate::resource::buffer::BufferCreateInfo;
use crate::resource::image::ImageCreateInfo;
use crate::resource::image_view::ImageViewCreateInfo;
use crate::resource::sampler::SamplerCreateInfo;
use crate::resource::traits::Resource;
use crate::resource::{Buffer, Handle, Image, ImageView, Sampler, Table};
use crate::traits::AsRaw;
use crate::wsi::{PresentationWindow, Surface, SurfaceQueried};

const DEFAULT_FRAME_TIMEOUT_NS: u64 = 5_000_000_000;

/// Description of an image to be created through [`Engine::create_image`].
#[derive(Debug, Clone)]
pub struct ImageDesc {
    pub format: vk::Format,
    pub extent: vk::Extent3D,
    pub usage: vk::ImageUsageFlags,
    pub image_type: vk::ImageType,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: vk::SampleCountFlags,
    pub tiling: vk::ImageTiling,
    /// Whether a default sampler + bindless sampled-image registration should be made.
    pub sampled: bool,
}

impl Default for ImageDesc {
    fn default() -> Self {
        Self {
            format: vk::Format::R8G8B8A8_UNORM,
            extent: vk::Extent3D {
                width: 1,
                height: 1,
                depth: 1,
            },
            usage: vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST,
            image_type: vk::ImageType::TYPE_2D,
            mip_levels: 1,
            array_layers: 1,
            samples: vk::SampleCountFlags::TYPE_1,
            tiling: vk::ImageTiling::OPTIMAL,
            sampled: true,
        }
    }
}

/// Opaque record backing a [`BufferHandle`]. Fields are private; callers only ever
/// hold the generational [`Handle`].
pub struct BufferRecord {
    buffer: Buffer<GPUAllocatorImpl>,
    bindless: Option<ResourceBinding>,
    cpu_visible: bool,
    mapped: AtomicBool,
}

/// Opaque record backing an [`ImageHandle`].
pub struct ImageRecord {
    image: Image<GPUAllocatorImpl>,
    view: ImageView,
    sampler: Option<Sampler>,
    sampled_binding: Option<ResourceBinding>,
    sampler_binding: Option<ResourceBinding>,
    storage_binding: Option<ResourceBinding>,
    current_layout: vk::ImageLayout,
}

pub type BufferHandle = Handle<BufferRecord>;
pub type ImageHandle = Handle<ImageRecord>;

/// Picks the depth/stencil aspect for formats that carry one; every other format is
/// treated as color. Used instead of [`Image::acquire_full_image_view`], which infers
/// aspect from attachment usage bits and panics for plain sampled/storage images.
fn aspect_for_format(format: vk::Format) -> vk::ImageAspectFlags {
    match format {
        vk::Format::D16_UNORM | vk::Format::X8_D24_UNORM_PACK32 | vk::Format::D32_SFLOAT => {
            vk::ImageAspectFlags::DEPTH
        }
        vk::Format::S8_UINT => vk::ImageAspectFlags::STENCIL,
        vk::Format::D16_UNORM_S8_UINT
        | vk::Format::D24_UNORM_S8_UINT
        | vk::Format::D32_SFLOAT_S8_UINT => {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        }
        _ => vk::ImageAspectFlags::COLOR,
    }
}

fn view_type_for_image_type(image_type: vk::ImageType) -> vk::ImageViewType {
    match image_type {
        vk::ImageType::TYPE_1D => vk::ImageViewType::TYPE_1D,
        vk::ImageType::TYPE_3D => vk::ImageViewType::TYPE_3D,
        _ => vk::ImageViewType::TYPE_2D,
    }
}

/// Submit-path failures carry a typed [`ash::vk::Result`]; wait-path failures go
/// through `anyhow` first and land in [`EngineError::Other`]. This normalizes both so
/// a single check can flip [`Engine`] into its lost state.
fn is_device_lost(err: &EngineError) -> bool {
    match err {
        EngineError::Vulkan(vk::Result::ERROR_DEVICE_LOST) => true,
        EngineError::Other(err) => err
            .downcast_ref::<ash::vk::Result>()
            .map(|result| *result == vk::Result::ERROR_DEVICE_LOST)
            .unwrap_or(false),
        _ => false,
    }
}

fn default_gpu_requirements(want_surface: bool) -> GPURequirements {
    let mut device_extensions = Vec::new();
    if want_surface {
        device_extensions.push(Expected::Required(
            ash::khr::swapchain::NAME.to_string_lossy().to_string(),
        ));
    }

    let mut features_2 = vk::PhysicalDeviceVulkan12Features::default();
    features_2.buffer_device_address = vk::TRUE;
    features_2.descriptor_indexing = vk::TRUE;
    features_2.descriptor_binding_partially_bound = vk::TRUE;
    features_2.descriptor_binding_update_unused_while_pending = vk::TRUE;
    features_2.descriptor_binding_storage_buffer_update_after_bind = vk::TRUE;
    features_2.descriptor_binding_sampled_image_update_after_bind = vk::TRUE;
    features_2.descriptor_binding_storage_image_update_after_bind = vk::TRUE;
    features_2.runtime_descriptor_array = vk::TRUE;
    features_2.timeline_semaphore = vk::TRUE;
    features_2.scalar_block_layout = vk::TRUE;

    let mut features_3 = vk::PhysicalDeviceVulkan13Features::default();
    features_3.dynamic_rendering = vk::TRUE;
    features_3.synchronization2 = vk::TRUE;

    GPURequirements {
        dedicated: Expected::Preferred(true),
        features: vk::PhysicalDeviceFeatures::default(),
        features_1: vk::PhysicalDeviceVulkan11Features::default(),
        features_2,
        features_3,
        device_extensions,
        queues: vec![
            QueueRequest {
                strict: false,
                queue_type: Box::new([
                    Expected::Required(vk::QueueFlags::GRAPHICS),
                    Expected::Preferred(vk::QueueFlags::COMPUTE),
                ]),
                count: Expected::Required(1),
            },
            QueueRequest {
                strict: true,
                queue_type: Box::new([Expected::Required(vk::QueueFlags::TRANSFER)]),
                count: Expected::Preferred(1),
            },
        ],
    }
}

fn load_or_create_pipeline_cache(
    device: &LogicalDevice,
    path: Option<&std::path::Path>,
) -> Result<vk::PipelineCache, InitError> {
    let initial_data = path.and_then(|p| std::fs::read(p).ok()).unwrap_or_default();
    let create_info = vk::PipelineCacheCreateInfo {
        s_type: vk::StructureType::PIPELINE_CACHE_CREATE_INFO,
        p_next: ptr::null(),
        flags: vk::PipelineCacheCreateFlags::empty(),
        initial_data_size: initial_data.len(),
        p_initial_data: initial_data.as_ptr() as *const c_void,
        _marker: Default::default(),
    };
    Ok(unsafe { device.get_handle().create_pipeline_cache(&create_info, None)? })
}

/// Owns the GPU device, its resource arenas, the bindless table, and the frame ring.
///
/// Not generic over a window type: the window borrowed by [`EngineConfig`] only needs
/// to live for the duration of [`Engine::init`], which consumes it to acquire a surface
/// and then drops the borrow.
pub struct Engine {
    instance: Instance,
    physical_device: PhysicalDevice,
    surface: Option<SurfaceQueried>,
    device: LogicalDevice,
    execution_manager: ExecutionManager,
    graphics_queue: Queue,

    buffer_allocator: Mutex<ArcAllocator<GPUAllocatorImpl>>,
    image_allocator: Mutex<SlotMapMemoryAllocator<GPUAllocatorImpl>>,
    buffers: Mutex<Table<BufferRecord>>,
    images: Mutex<Table<ImageRecord>>,
    bindless: Arc<BindlessTable>,

    destruction: Arc<DestructionRing>,
    dispatcher: Dispatcher,
    frame_ring: Mutex<FrameRing<GPUAllocatorImpl>>,
    recording: Mutex<Option<CommandBufferRecording>>,
    frame_timeout_ns: u64,

    graphics_pipelines: PipelineStateCache,
    compute_pipelines: PipelineStateCache,
    pipeline_cache: vk::PipelineCache,
    pipeline_cache_path: Option<PathBuf>,

    lost: AtomicBool,
}

impl Engine {
    /// Brings up instance, surface, device, allocators, bindless table, frame ring, and
    /// the render-thread dispatcher in one call.
    pub fn init<W: PresentationWindow>(config: EngineConfig<'_, W>) -> Result<Self, InitError> {
        config.validate()?;

        let application_name = CString::new(config.app_name.clone()).map_err(anyhow::Error::from)?;
        let engine_name = CString::new(config.engine_name.clone()).map_err(anyhow::Error::from)?;
        let application_info = vk::ApplicationInfo {
            s_type: vk::StructureType::APPLICATION_INFO,
            p_next: ptr::null(),
            p_application_name: application_name.as_ptr(),
            application_version: config.app_version,
            p_engine_name: engine_name.as_ptr(),
            engine_version: config.engine_version,
            api_version: vk::make_api_version(0, 1, 3, 0),
            _marker: Default::default(),
        };

        let mut layers: Vec<CString> = Vec::new();
        if config.validation {
            layers.push(CString::new("VK_LAYER_KHRONOS_validation").unwrap());
        }

        let display_handle = match config.window {
            Some(window) => Some(
                window
                    .display_handle()
                    .map_err(anyhow::Error::from)?
                    .as_raw(),
            ),
            None => None,
        };

        let mut extensions: Vec<CString> = Vec::new();
        if let Some(display_handle) = display_handle {
            for ext in ash_window::enumerate_required_extensions(display_handle)? {
                extensions.push(unsafe { std::ffi::CStr::from_ptr(*ext) }.to_owned());
            }
        }
        if config.validation {
            extensions.push(ash::ext::debug_utils::NAME.to_owned());
        }

        let layers_ptr: Vec<*const c_char> = layers.iter().map(|s| s.as_ptr()).collect();
        let extensions_ptr: Vec<*const c_char> = extensions.iter().map(|s| s.as_ptr()).collect();

        let instance = Instance::new(vk::InstanceCreateInfo {
            s_type: vk::StructureType::INSTANCE_CREATE_INFO,
            p_next: ptr::null(),
            flags: vk::InstanceCreateFlags::empty(),
            p_application_info: &application_info,
            enabled_layer_count: layers_ptr.len() as u32,
            pp_enabled_layer_names: layers_ptr.as_ptr(),
            enabled_extension_count: extensions_ptr.len() as u32,
            pp_enabled_extension_names: extensions_ptr.as_ptr(),
            _marker: Default::default(),
        })?;

        let surface: Option<Surface> = match config.window {
            Some(window) => Some(Surface::new(instance.get_entry(), instance.get_instance(), window)?),
            None => None,
        };

        let gpu_requirements = default_gpu_requirements(surface.is_some());
        let app_settings = AppSettings {
            name: config.app_name.clone(),
            version: config.app_version,
            engine_name: config.engine_name.clone(),
            engine_version: config.engine_version,
            api_version: (0, 1, 3, 0),
            enable_validation: config.validation,
            debug_utils: config.validation,
            window: config.window,
            surface_format: None,
            present_mode: None,
            gpu_requirements,
        };

        let mut features_3 = app_settings.gpu_requirements.features_3;
        let mut features_2 = app_settings.gpu_requirements.features_2;
        features_2.p_next = &mut features_3 as *mut _ as *mut c_void;
        let mut features_1 = app_settings.gpu_requirements.features_1;
        features_1.p_next = &mut features_2 as *mut _ as *mut c_void;
        let features = app_settings.gpu_requirements.features;
        let debug_utils = app_settings.debug_utils;

        let physical_device = PhysicalDevice::select(&instance, surface.as_ref(), app_settings)?;

        let features2 = vk::PhysicalDeviceFeatures2 {
            s_type: vk::StructureType::PHYSICAL_DEVICE_FEATURES_2,
            p_next: &mut features_1 as *mut _ as *mut c_void,
            features,
            _marker: Default::default(),
        };

        let queue_priorities = vec![1.0f32; physical_device.get_active_queues().len()];
        let mut family_queue_counts: HashMap<u32, u32> = HashMap::new();
        for queue in physical_device.get_active_queues() {
            *family_queue_counts.entry(queue.family_index).or_insert(0) += 1;
        }
        let queue_cis: Vec<vk::DeviceQueueCreateInfo> = family_queue_counts
            .into_iter()
            .map(|(family_index, count)| vk::DeviceQueueCreateInfo {
                s_type: vk::StructureType::DEVICE_QUEUE_CREATE_INFO,
                p_next: ptr::null(),
                flags: vk::DeviceQueueCreateFlags::empty(),
                queue_family_index: family_index,
                queue_count: count,
                p_queue_priorities: queue_priorities.as_ptr(),
                _marker: Default::default(),
            })
            .collect();

        let enabled_extensions: Vec<CString> = physical_device
            .get_extensions()
            .iter()
            .map(|s| CString::new(s.clone()).unwrap())
            .collect();
        let enabled_extensions_ptr: Vec<*const c_char> =
            enabled_extensions.iter().map(|s| s.as_ptr()).collect();

        let device_ci = vk::DeviceCreateInfo {
            s_type: vk::StructureType::DEVICE_CREATE_INFO,
            p_next: &features2 as *const _ as *const c_void,
            flags: vk::DeviceCreateFlags::empty(),
            queue_create_info_count: queue_cis.len() as u32,
            p_queue_create_infos: queue_cis.as_ptr(),
            enabled_layer_count: 0,
            pp_enabled_layer_names: ptr::null(),
            enabled_extension_count: enabled_extensions_ptr.len() as u32,
            pp_enabled_extension_names: enabled_extensions_ptr.as_ptr(),
            p_enabled_features: ptr::null(),
            _marker: Default::default(),
        };

        let device = LogicalDevice::new(LogicalDeviceCreateInfo {
            instance: instance.get_instance(),
            physical_device: physical_device.clone(),
            device_ci,
            debug_utils,
        })?;

        let execution_manager = ExecutionManager::from_device(device.clone(), &physical_device);
        let graphics_queue = execution_manager
            .acquire_queue(vk::QueueFlags::GRAPHICS)
            .ok_or(InitError::NoAdapter)?;

        let raw_allocator = GPUAllocatorImpl::new(
            gpu_allocator::vulkan::AllocatorCreateDesc {
                instance: instance.get_instance().clone(),
                device: device.get_handle().clone(),
                physical_device: unsafe { *physical_device.as_raw() },
                debug_settings: Default::default(),
                buffer_device_address: true,
                allocation_sizes: Default::default(),
            },
            device.clone(),
        )?;

        let mut buffer_allocator = ArcAllocator::new(raw_allocator.clone());
        let image_allocator = SlotMapMemoryAllocator::new(raw_allocator);

        let frames_in_flight = config.frames_in_flight as usize;
        let frame_ring = FrameRing::new(
            device.clone(),
            &graphics_queue,
            &mut buffer_allocator,
            frames_in_flight,
            config.staging_ring_bytes,
        )?;

        let bindless = Arc::new(BindlessTable::new(device.clone(), config.bindless)?);

        let destruction = Arc::new(DestructionRing::new(frames_in_flight));
        let dispatcher = Dispatcher::new(destruction.clone());
        dispatcher.spawn();

        let pipeline_cache = load_or_create_pipeline_cache(&device, config.pipeline_cache_path.as_deref())?;

        let surface = surface
            .map(|s| s.query_details(physical_device.handle()))
            .transpose()?;

        Ok(Self {
            instance,
            physical_device,
            surface,
            device,
            execution_manager,
            graphics_queue,
            buffer_allocator: Mutex::new(buffer_allocator),
            image_allocator: Mutex::new(image_allocator),
            buffers: Mutex::new(Table::new()),
            images: Mutex::new(Table::new()),
            bindless,
            destruction,
            dispatcher,
            frame_ring: Mutex::new(frame_ring),
            recording: Mutex::new(None),
            frame_timeout_ns: DEFAULT_FRAME_TIMEOUT_NS,
            graphics_pipelines: PipelineStateCache::new(),
            compute_pipelines: PipelineStateCache::new(),
            pipeline_cache,
            pipeline_cache_path: config.pipeline_cache_path,
            lost: AtomicBool::new(false),
        })
    }

    fn check_not_lost(&self) -> Result<(), EngineError> {
        if self.lost.load(Ordering::SeqCst) {
            return Err(EngineError::DeviceLost);
        }
        Ok(())
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn physical_device(&self) -> &PhysicalDevice {
        &self.physical_device
    }

    pub fn device(&self) -> &LogicalDevice {
        &self.device
    }

    pub fn execution_manager(&self) -> &ExecutionManager {
        &self.execution_manager
    }

    pub fn surface(&self) -> Option<&SurfaceQueried> {
        self.surface.as_ref()
    }

    pub fn bindless_table(&self) -> &BindlessTable {
        self.bindless.as_ref()
    }

    pub fn graphics_pipelines(&self) -> &PipelineStateCache {
        &self.graphics_pipelines
    }

    pub fn compute_pipelines(&self) -> &PipelineStateCache {
        &self.compute_pipelines
    }

    pub fn pipeline_cache(&self) -> vk::PipelineCache {
        self.pipeline_cache
    }

    /// Creates a buffer, registering it in the bindless storage-buffer or
    /// uniform-buffer array when its usage flags call for it.
    pub fn create_buffer(
        &self,
        size: vk::DeviceSize,
        mut usage: vk::BufferUsageFlags,
        memory_type: MemoryLocation,
        name: Option<&str>,
    ) -> Result<BufferHandle, EngineError> {
        self.check_not_lost()?;
        let cpu_visible = !matches!(memory_type, MemoryLocation::GpuOnly);

        if usage.contains(vk::BufferUsageFlags::VERTEX_BUFFER)
            || usage.contains(vk::BufferUsageFlags::INDEX_BUFFER)
        {
            usage |= vk::BufferUsageFlags::TRANSFER_DST;
        }

        let is_storage = usage.contains(vk::BufferUsageFlags::STORAGE_BUFFER);
        let size = if is_storage {
            let alignment = self
                .physical_device
                .get_properties()
                .limits
                .min_storage_buffer_offset_alignment;
            crate::resource::buffer::align_up(size, alignment)
        } else {
            size
        };

        let buffer: Buffer<GPUAllocatorImpl> = {
            let mut allocator = self.buffer_allocator.lock()?;
            Buffer::new(BufferCreateInfo::NewEmptyBuffer {
                device: self.device.clone(),
                name: name.map(|s| s.to_string()),
                allocator: &mut allocator,
                size,
                memory_type,
                usage_flags: usage,
            })?
        };

        let bindless = if is_storage {
            Some(self.bindless.register_storage_buffer(buffer.handle(), 0, size)?)
        } else if usage.contains(vk::BufferUsageFlags::UNIFORM_BUFFER) {
            Some(self.bindless.register_uniform_buffer(buffer.handle(), 0, size)?)
        } else {
            None
        };
        self.bindless.flush_pending()?;

        let record = BufferRecord {
            buffer,
            bindless,
            cpu_visible,
            mapped: AtomicBool::new(false),
        };
        Ok(self.buffers.lock()?.insert(record))
    }

    /// Shorthand for a host-visible, `TRANSFER_SRC` staging buffer.
    pub fn create_staging_buffer(&self, size: vk::DeviceSize, name: Option<&str>) -> Result<BufferHandle, EngineError> {
        self.create_buffer(
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
            name,
        )
    }

    /// Creates an image plus a default full-extent view (and, depending on `desc`, a
    /// default sampler and bindless registrations). Every newly created image is
    /// eagerly transitioned out of `UNDEFINED` into its steady-state layout here,
    /// rather than lazily on first use, so bindless reads never race a pending
    /// transition.
    pub fn create_image(&self, desc: ImageDesc, name: Option<&str>) -> Result<ImageHandle, EngineError> {
        self.check_not_lost()?;

        let image_ci = vk::ImageCreateInfo {
            s_type: vk::StructureType::IMAGE_CREATE_INFO,
            p_next: ptr::null(),
            flags: vk::ImageCreateFlags::empty(),
            image_type: desc.image_type,
            format: desc.format,
            extent: desc.extent,
            mip_levels: desc.mip_levels,
            array_layers: desc.array_layers,
            samples: desc.samples,
            tiling: desc.tiling,
            usage: desc.usage,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            queue_family_index_count: 0,
            p_queue_family_indices: ptr::null(),
            initial_layout: vk::ImageLayout::UNDEFINED,
            _marker: Default::default(),
        };

        let image: Image<GPUAllocatorImpl> = {
            let mut allocator = self.image_allocator.lock()?;
            Image::new(ImageCreateInfo::NewAllocated {
                device: self.device.clone(),
                allocator: &mut allocator,
                location: MemoryLocation::GpuOnly,
                image_ci,
                name: name.map(|s| s.to_string()),
            })?
        };

        let aspect = aspect_for_format(desc.format);
        let view = ImageView::new(ImageViewCreateInfo::FromCreateInfo {
            device: self.device.clone(),
            create_info: vk::ImageViewCreateInfo {
                s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
                p_next: ptr::null(),
                flags: vk::ImageViewCreateFlags::empty(),
                image: image.handle(),
                view_type: view_type_for_image_type(desc.image_type),
                format: desc.format,
                components: vk::ComponentMapping::default(),
                subresource_range: Image::<GPUAllocatorImpl>::image_subresource_range(aspect),
                _marker: Default::default(),
            },
        })?;

        let mut sampler = None;
        let mut sampler_binding = None;
        if desc.sampled {
            let new_sampler = Sampler::new(SamplerCreateInfo::FromCreateInfo {
                device: self.device.clone(),
                create_info: vk::SamplerCreateInfo {
                    s_type: vk::StructureType::SAMPLER_CREATE_INFO,
                    p_next: ptr::null(),
                    flags: vk::SamplerCreateFlags::empty(),
                    mag_filter: vk::Filter::LINEAR,
                    min_filter: vk::Filter::LINEAR,
                    mipmap_mode: vk::SamplerMipmapMode::LINEAR,
                    address_mode_u: vk::SamplerAddressMode::REPEAT,
                    address_mode_v: vk::SamplerAddressMode::REPEAT,
                    address_mode_w: vk::SamplerAddressMode::REPEAT,
                    mip_lod_bias: 0.0,
                    anisotropy_enable: vk::FALSE,
                    max_anisotropy: 1.0,
                    compare_enable: vk::FALSE,
                    compare_op: vk::CompareOp::ALWAYS,
                    min_lod: 0.0,
                    max_lod: vk::LOD_CLAMP_NONE,
                    border_color: vk::BorderColor::FLOAT_TRANSPARENT_BLACK,
                    unnormalized_coordinates: vk::FALSE,
                    _marker: Default::default(),
                },
                name: None,
            })?;
            sampler_binding = Some(self.bindless.register_sampler(new_sampler.handle())?);
            sampler = Some(new_sampler);
        }

        let target_layout = if desc.usage.contains(vk::ImageUsageFlags::STORAGE) {
            Some(vk::ImageLayout::GENERAL)
        } else if desc.sampled {
            Some(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
        } else {
            None
        };

        let mut current_layout = vk::ImageLayout::UNDEFINED;
        if let Some(target_layout) = target_layout {
            let recording = crate::transient::begin_transient(&self.device, &self.graphics_queue)?;
            image.transition(&recording, &self.graphics_queue, current_layout, target_layout);
            crate::transient::flush_transient(
                recording,
                &self.device,
                &self.graphics_queue,
                crate::transient::DEFAULT_TRANSIENT_TIMEOUT_NS,
            )
            .map_err(|err| {
                if is_device_lost(&err) {
                    self.lost.store(true, Ordering::SeqCst);
                    EngineError::DeviceLost
                } else {
                    err
                }
            })?;
            current_layout = target_layout;
        }

        let sampled_binding = if desc.sampled {
            Some(
                self.bindless
                    .register_sampled_image(view.handle(), current_layout)?,
            )
        } else {
            None
        };
        let storage_binding = if desc.usage.contains(vk::ImageUsageFlags::STORAGE) {
            Some(
                self.bindless
                    .register_storage_image(view.handle(), current_layout)?,
            )
        } else {
            None
        };
        self.bindless.flush_pending()?;

        let record = ImageRecord {
            image,
            view,
            sampler,
            sampled_binding,
            sampler_binding,
            storage_binding,
            current_layout,
        };
        Ok(self.images.lock()?.insert(record))
    }

    /// Writes `data` into `dst` at `offset`. Host-visible buffers are written
    /// directly; device-local buffers are staged through the current frame's staging
    /// ring and copied with a recorded `cmd_copy_buffer` — callers must be between a
    /// [`Engine::begin_frame`]/[`Engine::end_frame`] pair for the latter case.
    pub fn upload_to_buffer(&self, dst: BufferHandle, data: &[u8], offset: vk::DeviceSize) -> Result<(), EngineError> {
        self.check_not_lost()?;

        let dst_handle = {
            let mut buffers = self.buffers.lock()?;
            let record = buffers.get_mut(dst)?;
            if record.cpu_visible {
                record.buffer.write(offset, data)?;
                return Ok(());
            }
            record.buffer.handle()
        };

        let recording_guard = self.recording.lock()?;
        let recording = recording_guard.as_ref().ok_or_else(|| {
            EngineError::Other(anyhow::anyhow!("upload_to_buffer requires an active begin_frame"))
        })?;

        let mut frame_ring = self.frame_ring.lock()?;
        let slot = frame_ring.current_mut();
        let alloc = slot.alloc_staging(data.len() as vk::DeviceSize, 16)?;
        unsafe {
            slot.staging_buffer().write_unsafe(alloc.offset, data)?;
        }

        let copy_region = vk::BufferCopy {
            src_offset: alloc.offset,
            dst_offset: offset,
            size: data.len() as vk::DeviceSize,
        };
        unsafe {
            self.device.get_handle().cmd_copy_buffer(
                recording.handle(),
                slot.staging_buffer().handle(),
                dst_handle,
                &[copy_region],
            );
        }
        Ok(())
    }

    /// Records a `cmd_copy_buffer_to_image`, transitioning `dst` to
    /// `TRANSFER_DST_OPTIMAL` first if it isn't already there. Must be called between
    /// a [`Engine::begin_frame`]/[`Engine::end_frame`] pair.
    pub fn copy_buffer_to_image(
        &self,
        src: BufferHandle,
        dst: ImageHandle,
        region: vk::BufferImageCopy,
    ) -> Result<(), EngineError> {
        self.check_not_lost()?;

        let src_handle = self.buffers.lock()?.get(src)?.buffer.handle();

        let recording_guard = self.recording.lock()?;
        let recording = recording_guard.as_ref().ok_or_else(|| {
            EngineError::Other(anyhow::anyhow!("copy_buffer_to_image requires an active begin_frame"))
        })?;

        let dst_handle = {
            let mut images = self.images.lock()?;
            let record = images.get_mut(dst)?;
            if record.current_layout != vk::ImageLayout::TRANSFER_DST_OPTIMAL {
                record.image.transition(
                    recording,
                    &self.graphics_queue,
                    record.current_layout,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                );
                record.current_layout = vk::ImageLayout::TRANSFER_DST_OPTIMAL;
            }
            record.image.handle()
        };

        unsafe {
            self.device.get_handle().cmd_copy_buffer_to_image(
                recording.handle(),
                src_handle,
                dst_handle,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }
        Ok(())
    }

    /// Marks `buffer` as mapped and returns its persistently-mapped host pointer.
    /// `gpu-allocator` keeps host-visible allocations mapped for their whole lifetime,
    /// so this only tracks state — it issues no `vkMapMemory` call.
    pub fn map(&self, buffer: BufferHandle) -> Result<*mut u8, EngineError> {
        self.check_not_lost()?;
        let buffers = self.buffers.lock()?;
        let record = buffers.get(buffer)?;
        let ptr = record.buffer.mapped_ptr().ok_or(EngineError::MappingFailed)?;
        record.mapped.store(true, Ordering::SeqCst);
        Ok(ptr.as_ptr() as *mut u8)
    }

    pub fn unmap(&self, buffer: BufferHandle) -> Result<(), EngineError> {
        self.check_not_lost()?;
        let buffers = self.buffers.lock()?;
        let record = buffers.get(buffer)?;
        record.mapped.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Invalidates `handle` immediately and defers the underlying Vulkan destroy to the
    /// render-thread dispatcher's destruction ring.
    pub fn destroy_buffer(&self, handle: BufferHandle) -> Result<(), EngineError> {
        let record = self.buffers.lock()?.remove(handle)?;
        if record.mapped.load(Ordering::SeqCst) {
            tracing::error!("destroying buffer while still marked mapped");
        }
        let bindless = self.bindless.clone();
        self.dispatcher.enqueue_resource_free(move || {
            let mut record = record;
            if let Some(binding) = record.bindless {
                if let Err(err) = bindless.unregister(binding) {
                    tracing::error!(?err, "failed to release bindless index on deferred buffer destroy");
                }
            }
            record.buffer.destroy();
        });
        Ok(())
    }

    pub fn destroy_image(&self, handle: ImageHandle) -> Result<(), EngineError> {
        let record = self.images.lock()?.remove(handle)?;
        let bindless = self.bindless.clone();
        self.dispatcher.enqueue_resource_free(move || {
            let mut record = record;
            for binding in [record.sampled_binding, record.sampler_binding, record.storage_binding]
                .into_iter()
                .flatten()
            {
                if let Err(err) = bindless.unregister(binding) {
                    tracing::error!(?err, "failed to release bindless index on deferred image destroy");
                }
            }
            if let Some(mut sampler) = record.sampler.take() {
                sampler.destroy();
            }
            record.view.destroy();
            record.image.destroy();
        });
        Ok(())
    }

    /// Waits on the next frame slot's sync primitive, resets it, and opens a
    /// one-time-submit recording on its command buffer.
    pub fn begin_frame(&self) -> Result<(), EngineError> {
        self.check_not_lost()?;

        let mut frame_ring = self.frame_ring.lock()?;
        let slot = match frame_ring.begin_frame(self.frame_timeout_ns) {
            Ok(slot) => slot,
            Err(err) if is_device_lost(&err) => {
                self.lost.store(true, Ordering::SeqCst);
                return Err(EngineError::DeviceLost);
            }
            Err(err) => return Err(err),
        };

        let recording = slot
            .command_buffer
            .clone()
            .begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)
            .map_err(|(_, result)| EngineError::Vulkan(result))?;
        drop(frame_ring);

        *self.recording.lock()? = Some(recording);
        Ok(())
    }

    /// Ends and submits the current frame's recording, signaling its slot's sync
    /// primitive, then advances both the frame ring and the deferred-destruction ring
    ///.
    pub fn end_frame(&self) -> Result<(), EngineError> {
        self.check_not_lost()?;
        self.bindless.flush_pending()?;

        let recording = self
            .recording
            .lock()?
            .take()
            .ok_or_else(|| EngineError::Other(anyhow::anyhow!("end_frame called without a matching begin_frame")))?;

        let executable = recording.end()?;
        let submit_info = CommandBufferExecutable::submit_info_sync(&[executable.submit_info()], &[], &[]);

        let mut frame_ring = self.frame_ring.lock()?;
        let fence = frame_ring
            .current()
            .sync
            .raw_fence()
            .ok_or(EngineError::OperationNotSupported)?;

        match executable.submit(self.graphics_queue.handle(), &[submit_info], fence) {
            Ok(_) => {}
            Err((_, vk::Result::ERROR_DEVICE_LOST)) => {
                self.lost.store(true, Ordering::SeqCst);
                return Err(EngineError::DeviceLost);
            }
            Err((_, result)) => return Err(EngineError::Vulkan(result)),
        }

        frame_ring.advance();
        drop(frame_ring);
        self.dispatcher.advance_frame();
        Ok(())
    }

    fn save_pipeline_cache_blob(&self) {
        let Some(path) = self.pipeline_cache_path.as_ref() else {
            return;
        };
        match unsafe { self.device.get_handle().get_pipeline_cache_data(self.pipeline_cache) } {
            Ok(data) => {
                if let Err(err) = std::fs::write(path, data) {
                    tracing::error!("failed to persist pipeline cache blob: {err}");
                }
            }
            Err(err) => tracing::error!("failed to read pipeline cache data: {err:?}"),
        }
    }

    /// Idles the device, persists the pipeline-cache blob, destroys every cached
    /// pipeline and the raw pipeline cache, then drains every outstanding resource
    /// record. Everything else (bindless table, frame ring, logical device, instance)
    /// tears itself down through raii as `self` drops.
    pub fn shutdown(self) -> Result<(), EngineError> {
        self.dispatcher.shutdown();
        unsafe {
            self.device.get_handle().device_wait_idle()?;
        }
        self.save_pipeline_cache_blob();

        for pipeline in self
            .graphics_pipelines
            .drain()
            .into_iter()
            .chain(self.compute_pipelines.drain())
        {
            unsafe {
                self.device.get_handle().destroy_pipeline(pipeline, None);
            }
        }
        unsafe {
            self.device.get_handle().destroy_pipeline_cache(self.pipeline_cache, None);
        }

        for mut record in self.buffers.lock()?.drain() {
            record.buffer.destroy();
        }
        for mut record in self.images.lock()?.drain() {
            if let Some(mut sampler) = record.sampler.take() {
                sampler.destroy();
            }
            record.view.destroy();
            record.image.destroy();
        }
        self.destruction.drain_all();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_for_format_picks_depth_stencil() {
        assert_eq!(aspect_for_format(vk::Format::D32_SFLOAT), vk::ImageAspectFlags::DEPTH);
        assert_eq!(aspect_for_format(vk::Format::S8_UINT), vk::ImageAspectFlags::STENCIL);
        assert_eq!(
            aspect_for_format(vk::Format::D24_UNORM_S8_UINT),
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        );
        assert_eq!(aspect_for_format(vk::Format::R8G8B8A8_UNORM), vk::ImageAspectFlags::COLOR);
    }

    #[test]
    fn view_type_follows_image_type() {
        assert_eq!(view_type_for_image_type(vk::ImageType::TYPE_1D), vk::ImageViewType::TYPE_1D);
        assert_eq!(view_type_for_image_type(vk::ImageType::TYPE_2D), vk::ImageViewType::TYPE_2D);
        assert_eq!(view_type_for_image_type(vk::ImageType::TYPE_3D), vk::ImageViewType::TYPE_3D);
    }

    #[test]
    fn is_device_lost_matches_vulkan_variant() {
        assert!(is_device_lost(&EngineError::Vulkan(vk::Result::ERROR_DEVICE_LOST)));
        assert!(!is_device_lost(&EngineError::Vulkan(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY)));
        assert!(!is_device_lost(&EngineError::StaleHandle));
    }

    #[test]
    fn is_device_lost_unwraps_downcast_other_variant() {
        let wrapped = EngineError::Other(anyhow::Error::new(vk::Result::ERROR_DEVICE_LOST));
        assert!(is_device_lost(&wrapped));
        let unrelated = EngineError::Other(anyhow::anyhow!("staging buffer misaligned"));
        assert!(!is_device_lost(&unrelated));
    }

    #[test]
    fn image_desc_default_is_sampled_rgba8() {
        let desc = ImageDesc::default();
        assert_eq!(desc.format, vk::Format::R8G8B8A8_UNORM);
        assert_eq!(desc.extent, vk::Extent3D { width: 1, height: 1, depth: 1 });
        assert!(desc.sampled);
        assert!(desc.usage.contains(vk::ImageUsageFlags::SAMPLED));
        assert!(desc.usage.contains(vk::ImageUsageFlags::TRANSFER_DST));
    }

    #[test]
    fn default_gpu_requirements_always_enables_bindless_features() {
        let reqs = default_gpu_requirements(false);
        assert_eq!(reqs.features_2.descriptor_indexing, vk::TRUE);
        assert_eq!(reqs.features_2.buffer_device_address, vk::TRUE);
        assert_eq!(reqs.features_3.dynamic_rendering, vk::TRUE);
        assert_eq!(reqs.features_3.synchronization2, vk::TRUE);
        assert!(reqs.queues.iter().any(|q| q.queue_type.iter().any(|expected| matches!(
            expected,
            Expected::Required(flags) if flags.contains(vk::QueueFlags::GRAPHICS)
        ))));
    }
}
