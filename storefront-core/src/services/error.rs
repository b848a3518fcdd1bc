use storefront_sdk::objects::ResponseCode;

use crate::payment::GatewayError;

/// A rule violation reported to the user with a response code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} ({})", .code.errno())]
pub struct BusinessError {
    pub code: ResponseCode,
    pub message: String,
}

impl BusinessError {
    /// An error with the code's default message.
    pub fn new(code: ResponseCode) -> Self {
        Self {
            code,
            message: code.message().to_string(),
        }
    }

    pub fn with_message(code: ResponseCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Business(#[from] BusinessError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("payment gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

impl ServiceError {
    pub fn business(code: ResponseCode) -> Self {
        Self::Business(BusinessError::new(code))
    }

    pub fn business_with(code: ResponseCode, message: impl Into<String>) -> Self {
        Self::Business(BusinessError::with_message(code, message))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_message() {
        let err = BusinessError::new(ResponseCode::GoodsNoStock);
        assert_eq!(err.message, "insufficient stock");
        assert_eq!(err.to_string(), "insufficient stock (711)");
    }
}
