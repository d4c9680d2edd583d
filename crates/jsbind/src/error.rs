use thiserror::Error;

#[derive(Error, Debug)]
pub enum JsbindError {
    #[error("JavaScript execution error: {0}")]
    JavaScriptExecution(String),

    #[error("Engine call failed: {0}")]
    Engine(String),

    #[error("Property '{0}' could not be written")]
    PropertyRejected(String),

    #[error("Element {0} could not be written")]
    ElementRejected(u32),

    #[error("Value is not callable")]
    NotCallable,

    #[error("Handle has been disposed")]
    Disposed,

    #[error("Value belongs to a different context")]
    ForeignContext,

    #[error("Context has no live host handle")]
    ContextReleased,

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl JsbindError {
    pub(crate) fn engine(err: boa_engine::JsError) -> Self {
        JsbindError::Engine(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, JsbindError>;
