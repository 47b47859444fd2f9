use thiserror::Error;

use crate::rows::RowSourceError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("data unavailable: {0}")]
    DataUnavailable(#[from] RowSourceError),
    #[error("message delivery failed: {0}")]
    Delivery(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::DataUnavailable(_) => {
                "Sorry, I could not fetch data right now. Please try again shortly."
            }
            Self::Delivery(_) => "The reply could not be delivered.",
            Self::Configuration(_) => "The bot is not configured correctly.",
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::DataUnavailable(_) => "data_unavailable",
            Self::Delivery(_) => "delivery",
            Self::Configuration(_) => "configuration",
        }
    }
}
