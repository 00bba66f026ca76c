/// Describes Vulkan resources which can be destroyed
pub trait Destructible {
    /// Destroy the resource
    fn destroy(&mut self);
}

/// Exposes the raw Vulkan handle underneath a wrapper type.
///
/// Marked `unsafe` because callers can use the handle to violate whatever invariants
/// the wrapper otherwise upholds (lifetime, synchronization, ownership).
pub trait AsRaw {
    type RawType;

    /// Borrow the raw handle.
    unsafe fn as_raw(&self) -> &Self::RawType;

    /// Mutably borrow the raw handle.
    unsafe fn as_raw_mut(&mut self) -> &mut Self::RawType;

    /// Consume the wrapper and take the raw handle.
    unsafe fn raw(self) -> Self::RawType;
}
