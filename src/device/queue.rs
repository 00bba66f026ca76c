use ash::vk;

/// Quick easy abstraction over queues

/// Describes a queue slot as selected during physical device selection: which family and
/// index it came from, whether the request that claimed it was strict, and what it's good for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct QueueInfo {
    /// Index to the family queue
    pub family_index: u32,
    /// Queue's index in the family
    pub index: u32,
    /// Whether the request that allocated this queue required an exact flag match
    pub strict: bool,
    /// Flags of the family this queue was taken from
    pub queue_flags: vk::QueueFlags,
    /// Whether this queue is suitable for presentation
    pub can_present: bool,
}

/// Represents a [`vk::Queue`] and its indices
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Queue {
    /// Handle to [`vk::Queue`]
    handle: vk::Queue,

    /// Family + index + capability info this queue was acquired with
    info: QueueInfo,
}

impl Queue {
    pub fn new(handle: vk::Queue, info: QueueInfo) -> Self {
        Self { handle, info }
    }

    /// Get the underlying reference to [`VkQueue`](vk::Queue)
    pub fn get_handle(&self) -> &vk::Queue {
        &self.handle
    }

    /// Get the underlying copy of [`VkQueue`](vk::Queue)
    pub fn handle(&self) -> vk::Queue {
        self.handle
    }

    pub fn get_index(&self) -> u32 {
        self.info.index
    }

    pub fn get_family_index(&self) -> u32 {
        self.info.family_index
    }

    pub fn info(&self) -> &QueueInfo {
        &self.info
    }

    pub fn can_present(&self) -> bool {
        self.info.can_present
    }

    pub fn queue_flags(&self) -> vk::QueueFlags {
        self.info.queue_flags
    }

    pub fn is_strict(&self) -> bool {
        self.info.strict
    }
}
