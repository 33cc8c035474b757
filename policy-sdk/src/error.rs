use policy_loading::ManagerError;
use thiserror::Error;

pub type SdkResult<T> = Result<T, SdkError>;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid policy core configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Manager(#[from] ManagerError),
}
