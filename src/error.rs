// ============================================================================
// ERRORS: one enum for every failure the editor can report
// ============================================================================

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(thiserror::Error, Debug)]
pub enum EditorError {
    /// Malformed file-type token, unknown filter/transformation name,
    /// bad numeric argument, unparsable file contents.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A layer name or a source file that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("a layer named '{0}' already exists")]
    DuplicateName(String),

    #[error("there is no current layer")]
    EmptyStack,

    #[error("layer '{0}' is currently empty")]
    EmptyLayer(String),

    #[error("layer '{0}' is already invisible")]
    AlreadyInvisible(String),

    #[error("pixel ({x}, {y}) is outside the {width}x{height} image")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl EditorError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
