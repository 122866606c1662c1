//! Error types for providers and for the create-instance step

use thiserror::Error;

/// Provider-level errors raised by a [`ComputeProvider`](crate::ComputeProvider)
/// or a [`CloudSession`](crate::CloudSession)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CloudError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl CloudError {
    /// The provider's own diagnostic text, without the variant prefix
    pub fn diagnostic(&self) -> &str {
        match self {
            CloudError::AuthenticationFailed(message)
            | CloudError::ApiError { message, .. }
            | CloudError::Transport(message)
            | CloudError::ResourceNotFound(message)
            | CloudError::InvalidConfig(message)
            | CloudError::InvalidResponse(message) => message,
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

/// Reason attached to every step failure handed back to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FailureReason {
    /// The configuration map was rejected before any network call
    ConfigurationInvalid,
    /// The session could not be established
    AuthenticationFailed,
    /// The provider refused or failed to create the node
    RunNodesException,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::ConfigurationInvalid => write!(f, "ConfigurationInvalid"),
            FailureReason::AuthenticationFailed => write!(f, "AuthenticationFailed"),
            FailureReason::RunNodesException => write!(f, "RunNodesException"),
        }
    }
}

/// Configuration map problems found while building a
/// [`ProvisionRequest`](crate::ProvisionRequest)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("required property '{0}' is missing or empty")]
    MissingProperty(&'static str),

    #[error("property 'endpoint' is not a valid URL ({value}): {reason}")]
    InvalidEndpoint { value: String, reason: String },

    #[error("property '{key}' expects true or false, got '{value}'")]
    InvalidBoolean { key: &'static str, value: String },
}

/// Session establishment failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to open a {provider} session: {message}")]
pub struct AuthError {
    pub provider: String,
    pub message: String,
}

impl AuthError {
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Node creation failure
///
/// `message` carries the provider's diagnostic verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}: {message}")]
pub struct ProvisionError {
    pub reason: FailureReason,
    pub message: String,
}

impl ProvisionError {
    pub fn run_nodes(message: impl Into<String>) -> Self {
        Self {
            reason: FailureReason::RunNodesException,
            message: message.into(),
        }
    }
}

impl From<CloudError> for ProvisionError {
    fn from(err: CloudError) -> Self {
        ProvisionError::run_nodes(err.diagnostic())
    }
}

/// Everything the create-instance step can fail with
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("Invalid step configuration: {0}")]
    InvalidConfiguration(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),
}

impl StepError {
    pub fn reason(&self) -> FailureReason {
        match self {
            StepError::InvalidConfiguration(_) => FailureReason::ConfigurationInvalid,
            StepError::Auth(_) => FailureReason::AuthenticationFailed,
            StepError::Provision(err) => err.reason,
        }
    }

    /// Human-readable message without the reason prefix
    pub fn message(&self) -> String {
        match self {
            StepError::InvalidConfiguration(err) => err.to_string(),
            StepError::Auth(err) => err.message.clone(),
            StepError::Provision(err) => err.message.clone(),
        }
    }
}
