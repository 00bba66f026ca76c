/// Utilities for acquiring a presentation surface.
pub mod surface;
pub mod traits;

pub use traits::*;

pub use surface::Surface;
pub use surface::SurfaceQueried;