use std::ptr;
use std::sync::Arc;

use ash::vk;

/// Owns every queue acquired from a [`LogicalDevice`](crate::device::LogicalDevice) and answers
/// "give me a queue I can submit work / present with".
///
/// Queue submission itself is already serialized through a single render-thread
/// [`Dispatcher`](crate::dispatcher::Dispatcher), so this does not attempt to hand out
/// per-queue locks the way a fully concurrent submitter would - it only needs to pick
/// which [`vk::Queue`] is appropriate for a given role.
#[derive(Debug, Clone)]
pub struct ExecutionManager {
    device: crate::device::LogicalDevice,
    queues: Arc<[crate::device::Queue]>,
}

impl ExecutionManager {
    pub fn from_queues(
        device: crate::device::LogicalDevice,
        queues: Vec<crate::device::Queue>,
    ) -> Self {
        Self {
            device,
            queues: queues.into(),
        }
    }

    /// All queues managed by this execution manager
    pub fn queues(&self) -> &[crate::device::Queue] {
        &self.queues
    }

    /// Acquire a queue capable of presenting, preferring one that also supports graphics
    pub fn acquire_present_queue(&self) -> Option<crate::device::Queue> {
        self.queues
            .iter()
            .filter(|queue| queue.can_present())
            .max_by_key(|queue| queue.queue_flags().contains(vk::QueueFlags::GRAPHICS))
            .copied()
    }

    /// Acquire a queue matching the given flags, preferring the most specialized match
    pub fn acquire_queue(&self, flags: vk::QueueFlags) -> Option<crate::device::Queue> {
        self.queues
            .iter()
            .filter(|queue| queue.queue_flags().contains(flags))
            .min_by_key(|queue| queue.queue_flags().as_raw().count_ones())
            .copied()
    }

    pub fn device(&self) -> &crate::device::LogicalDevice {
        &self.device
    }

    /// Builds an execution manager over every active queue on the device
    pub fn from_device(
        device: crate::device::LogicalDevice,
        physical_device: &crate::device::PhysicalDevice,
    ) -> Self {
        let queues = physical_device
            .get_active_queues()
            .iter()
            .map(|q| unsafe {
                device.get_queue(
                    &vk::DeviceQueueInfo2 {
                        s_type: vk::StructureType::DEVICE_QUEUE_INFO_2,
                        p_next: ptr::null(),
                        flags: Default::default(),
                        queue_family_index: q.family_index,
                        queue_index: q.index,
                        _marker: Default::default(),
                    },
                    q.queue_flags,
                    q.strict,
                    q.can_present,
                )
            })
            .collect::<Vec<crate::device::Queue>>();
        Self {
            device,
            queues: queues.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use ash::vk;

    fn queue(flags: vk::QueueFlags, can_present: bool) -> crate::device::Queue {
        crate::device::Queue::new(
            vk::Queue::null(),
            crate::device::QueueInfo {
                family_index: 0,
                index: 0,
                strict: false,
                queue_flags: flags,
                can_present,
            },
        )
    }

    /// Mirrors [`super::ExecutionManager::acquire_queue`]'s selection rule without needing a
    /// live device to build the manager itself around.
    fn acquire_queue(queues: &[crate::device::Queue], flags: vk::QueueFlags) -> Option<crate::device::Queue> {
        queues
            .iter()
            .filter(|q| q.queue_flags().contains(flags))
            .min_by_key(|q| q.queue_flags().as_raw().count_ones())
            .copied()
    }

    #[test]
    fn acquire_queue_prefers_most_specialized_match() {
        let graphics = queue(
            vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
            false,
        );
        let transfer_only = queue(vk::QueueFlags::TRANSFER, false);
        let queues = vec![graphics, transfer_only];
        let acquired = acquire_queue(&queues, vk::QueueFlags::TRANSFER);
        assert_eq!(acquired, Some(transfer_only));
    }

    #[test]
    fn acquire_queue_returns_none_when_no_match() {
        let queues = vec![queue(vk::QueueFlags::TRANSFER, false)];
        assert_eq!(acquire_queue(&queues, vk::QueueFlags::GRAPHICS), None);
    }
}
