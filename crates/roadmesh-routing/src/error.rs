use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("At least two waypoints are required (got {0})")]
    TooFewWaypoints(usize),
    #[error("Invalid routing configuration: {0}")]
    Config(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Routing service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed routing response: {0}")]
    MalformedResponse(String),
    #[error("Routing service found no route")]
    NoRoute,
}

pub type Result<T> = std::result::Result<T, RoutingError>;
