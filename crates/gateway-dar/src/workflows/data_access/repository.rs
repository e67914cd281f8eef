use serde::{Deserialize, Serialize};

use super::amendments::ReturnedEmailOptions;
use super::domain::{ApplicationId, ApplicationRecord, User, UserId};

/// Storage abstraction for data access request documents. Updates replace the whole document,
/// so concurrent writers resolve last-write-wins.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError>;
    fn update(&self, record: ApplicationRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("application already exists")]
    Conflict,
    #[error("application not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// In-app notification and e-mail hooks. Rendering and delivery belong to the implementation.
pub trait NotificationDispatcher: Send + Sync {
    fn trigger_notification_message(
        &self,
        recipients: &[UserId],
        message: &str,
        category: &str,
        reference_id: &ApplicationId,
    ) -> Result<(), NotificationError>;

    fn generate_dar_returned_email(&self, options: &ReturnedEmailOptions) -> String;

    fn send_email(&self, email: OutboundEmail) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEmail {
    pub recipients: Vec<User>,
    pub from: String,
    pub subject: String,
    pub html: String,
    pub allow_unsubscribe: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
