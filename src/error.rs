use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("texture `{name}` has an empty size ({width}x{height})")]
    EmptyTexture { name: String, width: u32, height: u32 },

    #[error("could not allocate {bytes} bytes for texture `{name}`")]
    TextureAlloc { name: String, bytes: usize },

    #[error("config io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("could not resolve project directories")]
    NoProjectDirs,
}

pub type Result<T> = std::result::Result<T, EngineError>;
