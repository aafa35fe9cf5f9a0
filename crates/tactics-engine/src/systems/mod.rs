pub mod fx;
pub mod fx_resolver;
pub mod lighting;
pub mod render;
