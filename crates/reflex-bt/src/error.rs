use thiserror::Error;

/// Fatal configuration errors.
///
/// A correctly compiled template table never produces these; any
/// occurrence indicates a build/version mismatch between the authoring
/// tool and the engine, and aborts the affected agent's tick. Match
/// failure and action failure are ordinary behavior outcomes absorbed by
/// the tree and are never reported here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown template id {id} for `{signature}`")]
    UnknownTemplate { id: u16, signature: String },

    #[error("no behaviors registered for intent `{intent}`")]
    UnknownIntent { intent: &'static str },

    #[error("template {id} (`{name}`): {message}")]
    MalformedTemplate {
        id: u16,
        name: &'static str,
        message: String,
    },

    #[error("intent `{intent}`: template `{name}` declares {expected} parameters, step passed {given} arguments")]
    ArityMismatch {
        intent: &'static str,
        name: &'static str,
        expected: usize,
        given: usize,
    },

    #[error("step argument `{var}` is unbound in the frame of `{signature}`")]
    UnboundStepArg { var: &'static str, signature: String },

    #[error("no leaf action registered for template {id} (`{signature}`)")]
    NoLeafRegistered { id: u16, signature: String },
}

pub type EngineResult<T> = Result<T, EngineError>;
