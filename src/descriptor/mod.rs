pub mod bindless;
pub mod descriptor_pool;
pub mod descriptor_set;
pub mod descriptor_set_layout;
pub mod descriptor_set_layout_builder;

pub use bindless::{BindlessTable, ResourceBinding};
pub use descriptor_pool::{DescriptorPool, PoolSize, PoolSizeRatio};
pub use descriptor_set::{DescriptorInfo, DescriptorSet, DescriptorType, DescriptorWriteInfo};
pub use descriptor_set_layout::DescriptorSetLayout;
pub use descriptor_set_layout_builder::{DescriptorSetLayoutBinding, DescriptorSetLayoutBuilder};
