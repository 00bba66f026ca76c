use std::path::PathBuf;

/// Bindless table capacities, one per descriptor array.
#[derive(Debug, Clone, Copy)]
pub struct BindlessCapacities {
    pub max_sampled_images: u32,
    pub max_samplers: u32,
    pub max_storage_images: u32,
    pub max_storage_buffers: u32,
    pub max_uniform_buffers: u32,
}

impl Default for BindlessCapacities {
    fn default() -> Self {
        Self {
            max_sampled_images: 4096,
            max_samplers: 512,
            max_storage_images: 512,
            max_storage_buffers: 1024,
            max_uniform_buffers: 256,
        }
    }
}

/// Configuration accepted by [`crate::engine::Engine::init`].
///
/// `W` is the window handle type used to acquire a surface; pass a window-less
/// marker type when no presentation surface is needed.
#[derive(Debug, Clone)]
pub struct EngineConfig<'a, W: crate::wsi::PresentationWindow> {
    pub app_name: String,
    pub app_version: u32,
    pub engine_name: String,
    pub engine_version: u32,

    /// Ring depth. Valid range 1-4, default 3.
    pub frames_in_flight: u32,
    pub bindless: BindlessCapacities,
    pub validation: bool,
    pub prefer_discrete_gpu: bool,
    pub enable_vsync: bool,
    /// Size, in bytes, of each frame slot's CPU staging ring.
    pub staging_ring_bytes: u64,
    /// Where to persist the pipeline-cache blob across runs.
    pub pipeline_cache_path: Option<PathBuf>,

    /// Window to acquire a presentation surface from, if any.
    pub window: Option<&'a W>,
}

impl<'a, W: crate::wsi::PresentationWindow> EngineConfig<'a, W> {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            app_version: ash::vk::make_api_version(0, 0, 1, 0),
            engine_name: "scenery-vk-core".to_string(),
            engine_version: ash::vk::make_api_version(0, 0, 1, 0),
            frames_in_flight: 3,
            bindless: BindlessCapacities::default(),
            validation: cfg!(debug_assertions),
            prefer_discrete_gpu: true,
            enable_vsync: true,
            staging_ring_bytes: 16 * 1024 * 1024,
            pipeline_cache_path: None,
            window: None,
        }
    }

    pub fn validate(&self) -> Result<(), crate::error::InitError> {
        if self.frames_in_flight == 0 || self.frames_in_flight > 4 {
            return Err(crate::error::InitError::Other(anyhow::anyhow!(
                "frames_in_flight must be in 1..=4, got {}",
                self.frames_in_flight
            )));
        }
        Ok(())
    }
}
