use thiserror::Error;

/// Errors that stop the engine from starting or from loading its data.
///
/// Runtime misses (absent animations, unresolved FX, failed pooled passes)
/// are not errors: they are logged and the request becomes a no-op.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to create render pass '{name}' ({width}x{height}): {reason}")]
    PassCreation {
        name: String,
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("GPU device error: {0}")]
    Device(String),

    #[error("malformed manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("unit '{unit}' deals damage at {damage_delay}s but its attack lasts {attack_duration}s")]
    InvalidTiming {
        unit: String,
        damage_delay: f32,
        attack_duration: f32,
    },

    #[error("unit '{unit}' has no '{animation}' animation")]
    MissingAnimation { unit: String, animation: String },
}

pub type Result<T> = std::result::Result<T, EngineError>;
