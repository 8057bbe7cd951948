use thiserror::Error;

/// Errors surfaced by the reservation service boundary.
///
/// Every store and gateway failure is converted into one of these kinds before
/// it leaves the service, so callers never see an unstructured error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Access denied")]
    Forbidden,
    #[error("Booking request not found")]
    NotFound,
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid payment signature")]
    InvalidSignature,
    #[error("Payment does not match order")]
    OrderMismatch,
    #[error("Payment not successful (status: {status})")]
    PaymentNotSuccessful { status: String },
    #[error("Room is no longer available")]
    RoomNoLongerAvailable,
    #[error("Payment service temporarily unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("Payment gateway error: {0}")]
    BadGateway(String),
    #[error("Identity service temporarily unavailable: {0}")]
    IdentityUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReservationError {
    /// HTTP status code for this error kind.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::BadRequest(_)
            | Self::InvalidSignature
            | Self::OrderMismatch
            | Self::PaymentNotSuccessful { .. } => 400,
            Self::Conflict(_) | Self::RoomNoLongerAvailable => 409,
            Self::GatewayUnavailable(_) | Self::IdentityUnavailable(_) => 503,
            Self::BadGateway(_) => 502,
            Self::Internal(_) => 500,
        }
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Conflict(_) => "conflict",
            Self::InvalidSignature => "invalid_signature",
            Self::OrderMismatch => "order_mismatch",
            Self::PaymentNotSuccessful { .. } => "payment_not_successful",
            Self::RoomNoLongerAvailable => "room_no_longer_available",
            Self::GatewayUnavailable(_) => "gateway_unavailable",
            Self::BadGateway(_) => "bad_gateway",
            Self::IdentityUnavailable(_) => "identity_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Errors raised by the storage adapters.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record already exists: {0}")]
    Duplicate(String),
    #[error("record not found: {0}")]
    Missing(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for ReservationError {
    fn from(err: StoreError) -> Self {
        ReservationError::Internal(err.to_string())
    }
}

/// Errors raised by payment gateway adapters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
    #[error("gateway rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("payment {0} not found")]
    PaymentNotFound(String),
}

/// Fatal configuration problems detected at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("gateway key secret is not configured")]
    MissingSecret,
    #[error("gateway key id is not configured")]
    MissingKeyId,
    #[error("invalid configuration value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type Result<T, E = ReservationError> = std::result::Result<T, E>;
