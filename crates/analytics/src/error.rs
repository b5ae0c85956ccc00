use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Not enough data to perform calculation: {0}")]
    NotEnoughData(String),

    #[error("Invalid parameter for {0}: {1}")]
    InvalidParameter(String, String),

    #[error("Error in calculation: {0}")]
    Calculation(String),
}
