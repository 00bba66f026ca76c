pub mod command_buffer;
pub mod command_pool;
mod dynamic_render;

pub use command_buffer::CmdBuffer;
pub use command_buffer::CommandBuffer;
pub use command_buffer::CommandBufferExecutable;
pub use command_buffer::CommandBufferRecording;
pub use command_pool::CommandPool;
pub use dynamic_render::DynamicRenderContext;
