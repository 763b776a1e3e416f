use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid bounding box: expected west,south,east,north (4 numbers), got {got}")]
    InvalidBbox { got: usize },

    #[error("Invalid date window: start {start} is not before end {end}")]
    InvalidDateWindow { start: String, end: String },

    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },
}
