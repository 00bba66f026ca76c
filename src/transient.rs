//! One-time-submit command recording for uploads, layout transitions, and other
//! fire-and-forget GPU work.
//!
//! Generalized from a single owned pool into one pool per thread per queue family so
//! uploads issued from different worker threads don't serialize on a shared command
//! pool (Vulkan command pools are not internally synchronized).

use std::cell::RefCell;
use std::collections::HashMap;
use std::ptr;

use ash::vk;

use crate::command::{CmdBuffer, CommandBufferRecording, CommandPool};
use crate::error::EngineError;

thread_local! {
    static POOLS: RefCell<HashMap<u32, CommandPool>> = RefCell::new(HashMap::new());
}

/// Begins recording a one-time-submit primary command buffer on a pool scoped to the
/// calling thread and `queue`'s family, creating the pool on first use.
pub fn begin_transient(
    device: &crate::device::LogicalDevice,
    queue: &crate::device::Queue,
) -> Result<CommandBufferRecording, EngineError> {
    let family = queue.get_family_index();
    let command_buffer = POOLS.with(|pools| -> anyhow::Result<_> {
        let mut pools = pools.borrow_mut();
        if !pools.contains_key(&family) {
            let pool = CommandPool::new(
                device.clone(),
                queue,
                vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            )?;
            pools.insert(family, pool);
        }
        let pool = pools.get(&family).unwrap();
        let cb = pool
            .allocate(&vk::CommandBufferAllocateInfo {
                s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO,
                p_next: ptr::null(),
                command_pool: pool.handle(),
                level: vk::CommandBufferLevel::PRIMARY,
                command_buffer_count: 1,
                _marker: Default::default(),
            })?
            .remove(0);
        Ok(cb)
    })?;
    command_buffer
        .begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)
        .map_err(|(_, result)| EngineError::Vulkan(result))
}

/// Ends recording, submits with a fresh single-use fence, waits (default timeout 30s
/// unless `timeout_ns` overrides it), then frees the command buffer.
pub fn flush_transient(
    cb: CommandBufferRecording,
    device: &crate::device::LogicalDevice,
    queue: &crate::device::Queue,
    timeout_ns: u64,
) -> Result<(), EngineError> {
    let executable = cb.end()?;
    let raw_cb = executable.handle();
    let fence = crate::sync::Fence::new(device.clone(), vk::FenceCreateFlags::empty())?;
    let submit_info =
        crate::command::CommandBufferExecutable::submit_info_sync(&[executable.submit_info()], &[], &[]);
    let result = executable.submit(queue.handle(), &[submit_info], fence.handle());
    let cb = match result {
        Ok(cb) => cb,
        Err((_, result)) => return Err(EngineError::Vulkan(result)),
    };
    fence.wait(timeout_ns)?;

    let family = queue.get_family_index();
    POOLS.with(|pools| {
        if let Some(pool) = pools.borrow().get(&family) {
            unsafe {
                device
                    .get_handle()
                    .free_command_buffers(pool.handle(), &[raw_cb]);
            }
        }
    });
    drop(cb);
    Ok(())
}

/// Default timeout for [`flush_transient`] when the caller has no tighter budget.
pub const DEFAULT_TRANSIENT_TIMEOUT_NS: u64 = 30_000_000_000;
