use crate::traits::Destructible;
use anyhow::Result;
use ash::vk;

/// Every GPU resource in the engine has a lifetime, a device it belongs to, and is
/// debuggable through a Vulkan debug-utils object name.
pub trait Resource<'a>: Destructible + Sized {
    /// Create-info enum accepted by [`Resource::new`].
    type CreateInfo: 'a;
    /// Underlying Vulkan handle type this resource wraps.
    type HandleType;

    /// Attempt to create a new resource given the [`Self::CreateInfo`].
    fn new(create_info: Self::CreateInfo) -> Result<Self>
    where
        Self: Sized;

    /// Borrow the underlying Vulkan handle.
    fn get_handle(&self) -> &Self::HandleType;

    /// Copy the underlying Vulkan handle.
    fn handle(&self) -> Self::HandleType;

    /// The device this resource was created against.
    fn get_device(&self) -> &crate::device::LogicalDevice;
}

/// Resources that can carry a debug-utils object name.
pub trait Nameable: Resource<'static> + Sized
where
    Self::HandleType: vk::Handle,
{
    const OBJECT_TYPE: vk::ObjectType;

    /// Sets (or replaces) the object's debug-utils name.
    fn set_name(&mut self, debug_utils: &ash::ext::debug_utils::Device, name: &str) -> Result<()>;

    /// The last name set via [`Nameable::set_name`], if any.
    fn get_name(&self) -> Option<&str> {
        None
    }
}

/// Issues a `vkSetDebugUtilsObjectNameEXT` call for any handle implementing [`Nameable`].
pub fn name_nameable<T>(
    debug_utils: &ash::ext::debug_utils::Device,
    raw_handle: u64,
    name: &str,
) -> Result<()>
where
    T: Nameable,
    T::HandleType: vk::Handle,
{
    let c_name = std::ffi::CString::new(name)?;
    let name_info = vk::DebugUtilsObjectNameInfoEXT {
        s_type: vk::StructureType::DEBUG_UTILS_OBJECT_NAME_INFO_EXT,
        p_next: std::ptr::null(),
        object_type: T::OBJECT_TYPE,
        object_handle: raw_handle,
        p_object_name: c_name.as_ptr(),
        _marker: Default::default(),
    };
    unsafe { debug_utils.set_debug_utils_object_name(&name_info)? };
    Ok(())
}

/// Convenience used by resources that accept an optional name at construction time:
/// sets the name if both a debug-utils handle and a name are present, otherwise no-ops.
pub fn update_name<T>(resource: &mut T, name: Option<&str>) -> Option<Result<()>>
where
    T: Nameable,
    T::HandleType: vk::Handle,
{
    let name = name?;
    let debug_utils = resource.get_device().get_debug_utils()?;
    Some(resource.set_name(debug_utils, name))
}
