pub mod bindless;

pub use bindless::{BindlessTable, ResourceBinding};
