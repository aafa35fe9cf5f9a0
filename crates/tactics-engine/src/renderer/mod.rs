pub mod context;
pub mod device;
pub mod frame;
pub mod headless;
pub mod instance;
pub mod pass;
pub mod pass_manager;

// Re-export key types for convenient access
pub use context::RenderContext;
pub use device::{CommandEncoder, GpuDevice, LoadOp, TextureFormat, TextureId};
pub use frame::{render_frame, FrameInput, FrameSettings, FrameStats, SwapchainTarget};
pub use pass::RenderPass;
pub use pass_manager::{PassManager, PassType};
