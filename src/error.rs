use std::sync::PoisonError;

use thiserror::Error;

/// Which bindless array an operation concerns.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BindlessKind {
    SampledImage,
    Sampler,
    StorageImage,
    StorageBuffer,
    UniformBuffer,
}

/// Top-level error type returned across the engine's public boundary.
///
/// Internal helpers are free to return [`anyhow::Result`] the way the rest of the
/// crate does; callers crossing into [`crate::engine::Engine`] convert into this enum.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no adapter satisfies the required feature/extension set")]
    NoAdapter,

    #[error("required device extension not supported: {0}")]
    MissingExtension(String),

    #[error("no queue family satisfies the requested capability: {0:?}")]
    QueueFamilyUnavailable(ash::vk::QueueFlags),

    #[error("out of memory allocating {requested_bytes} bytes ({kind})")]
    OutOfMemory {
        kind: &'static str,
        requested_bytes: u64,
    },

    #[error("failed to map memory")]
    MappingFailed,

    #[error("handle is stale: generation mismatch")]
    StaleHandle,

    #[error("bindless capacity exceeded for {0:?}")]
    BindlessCapacityExceeded(BindlessKind),

    #[error("staging ring exhausted: needed {needed} bytes, {available} available")]
    StagingExhausted { needed: u64, available: u64 },

    #[error("device lost")]
    DeviceLost,

    #[error("surface is out of date and must be recreated")]
    SurfaceOutOfDate,

    #[error("timeline semaphore value regressed")]
    TimelineRegression,

    #[error("operation timed out after {ns} ns")]
    Timeout { ns: u64 },

    #[error("validation failure: {0}")]
    ValidationFailure(String),

    #[error("operation not supported by this FrameSync variant")]
    OperationNotSupported,

    #[error("a poisoned lock was encountered")]
    PoisonError,

    #[error("memory allocation has already been freed")]
    EmptyMemoryAllocation,

    #[error("no queue satisfies the requested capability set")]
    ImpossibleQueue,

    #[error(transparent)]
    Vulkan(#[from] ash::vk::Result),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl<T> From<PoisonError<T>> for EngineError {
    fn from(_: PoisonError<T>) -> Self {
        EngineError::PoisonError
    }
}

/// Failures that can occur while bootstrapping [`crate::engine::Engine::init`].
///
/// Kept distinct from [`EngineError`] because initialization failure means the
/// engine was never constructed; there is no partially-usable value to hand back.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("no adapter satisfies the required feature/extension set")]
    NoAdapter,

    #[error("required device extension not supported: {0}")]
    MissingExtension(String),

    #[error(transparent)]
    Vulkan(#[from] ash::vk::Result),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
