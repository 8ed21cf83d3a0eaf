mod descriptor;
mod kind;

pub use descriptor::{UNSET, WindowDescriptor};
pub use kind::WindowKind;
