pub mod arena;
pub mod image;
pub use image::Image;
pub mod image_view;
pub mod sampler;
pub mod traits;
pub mod buffer;

pub use arena::{Handle, Table};
pub use image_view::ImageView;
pub use sampler::Sampler;
pub use buffer::Buffer;
pub use buffer::BufferCreateInfo;