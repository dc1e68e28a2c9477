use thiserror::Error;

/// Errors that can occur when looking flows and nodes up in a flow store.
#[derive(Error, Debug, Clone)]
pub enum FlowError {
    #[error("Flow '{0}' was not found")]
    FlowNotFound(String),

    #[error("Node '{node_id}' was not found in flow '{flow_id}'")]
    NodeNotFound { flow_id: String, node_id: String },

    #[error("Flow '{0}' has no entry node")]
    NoEntryNode(String),
}

/// Errors that can occur while driving a debug session.
///
/// These are refusals at the session API boundary, not execution failures:
/// a malformed graph or a bad reference inside a running step degrades to a
/// console entry and a paused session instead of an `Err`.
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    #[error("The session has finished; reset it to run again")]
    SessionFinished,

    #[error("The session is waiting for a dialogue choice")]
    AwaitingChoice,

    #[error("There is no node left to execute")]
    NothingToExecute,

    #[error("Step limit of {0} reached; raising it requires an explicit continue")]
    StepLimitReached(usize),

    #[error("The step limit has not been reached")]
    LimitNotReached,

    #[error("There is no earlier step to return to")]
    NothingToUndo,

    #[error("The session is not waiting for a choice")]
    NotWaitingForChoice,

    #[error("Response '{0}' is not among the pending choices")]
    UnknownResponse(String),

    #[error("Response '{0}' is shown but its condition did not pass")]
    ChoiceNotAvailable(String),

    #[error("Variable '{0}' is not declared in this project")]
    UnknownVariable(String),

    #[error(transparent)]
    Flow(#[from] FlowError),
}

/// Errors that can occur when converting an external graph format into a
/// flow graph the engine can walk.
#[derive(Error, Debug, Clone)]
pub enum ConversionError {
    #[error("Failed to parse flow graph JSON: {0}")]
    JsonParseError(String),

    #[error("Failed to parse sheet JSON: {0}")]
    SheetParseError(String),

    #[error("Invalid flow graph: {0}")]
    ValidationError(String),
}

/// Errors that can occur when saving or loading a captured session artifact.
#[derive(Error, Debug, Clone)]
pub enum ArtifactError {
    #[error("Failed to read or write '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Failed to encode session state: {0}")]
    EncodeError(String),

    #[error("Failed to decode session state: {0}")]
    DecodeError(String),

    #[error("Artifact format version {found} is not supported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },
}
