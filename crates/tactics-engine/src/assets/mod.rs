pub mod cache;
pub mod manifest;
pub mod timing;
