use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown {kind} type `{name}`")]
    UnknownType { kind: &'static str, name: String },

    #[error("missing required parameter `{0}`")]
    MissingParameter(String),

    #[error("parameter `{name}` has the wrong kind (expected {expected})")]
    ParameterType {
        name: String,
        expected: &'static str,
    },

    #[error("invalid value for `{name}`: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("scene has no light source")]
    NoLight,

    #[error("rendering failed: {0}")]
    Render(String),

    #[error("in constructing {0}: {1}")]
    Context(String, Box<Error>),
}

/// Adds an "in constructing X" frame, mirroring how scene assembly
/// reports nested factory failures.
pub trait Context<T> {
    fn context(self, what: &str) -> Result<T>;
}

impl<T> Context<T> for Result<T> {
    fn context(self, what: &str) -> Result<T> {
        self.map_err(|e| Error::Context(what.to_string(), Box::new(e)))
    }
}
