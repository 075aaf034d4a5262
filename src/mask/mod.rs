mod builder;
mod kernel;

pub use builder::MaskBuilder;
