use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraderError {
    #[error("No bars were supplied for the session.")]
    NoData,

    #[error("Execution error: {0}")]
    Execution(#[from] execution::ExecutionError),

    #[error("Core type error: {0}")]
    Core(#[from] core_types::CoreError),
}
