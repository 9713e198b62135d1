use thiserror::Error;

use bloodlink_gateway::GatewayError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A request or donor disappeared between offer and response.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("delivery failed: {0}")]
    DeliveryFailure(#[from] GatewayError),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] anyhow::Error),
}

impl EngineError {
    /// Plain-language text for the acting user. Internal detail stays in logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Sorry, the donation request is no longer valid.",
            Self::MalformedInput(_) => {
                "Sorry, that action could not be understood. Please use the buttons on the latest message."
            }
            Self::DeliveryFailure(_) | Self::PersistenceFailure(_) => {
                "Sorry, there was an error processing your response. Please try again later."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_hide_internal_detail() {
        let err = EngineError::PersistenceFailure(anyhow::anyhow!("disk I/O error at page 7"));
        assert!(!err.user_message().contains("disk"));
        assert!(EngineError::NotFound("request").user_message().contains("no longer valid"));
    }
}
