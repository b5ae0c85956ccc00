use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("No bars were supplied for the requested run.")]
    NoData,

    #[error("Invalid parameter for {0}: {1}")]
    InvalidParameter(String, String),

    #[error("Analytics calculation error: {0}")]
    Analytics(#[from] analytics::AnalyticsError),
}
