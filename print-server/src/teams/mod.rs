//! Team registry

mod registry;

pub use registry::TeamRegistry;
