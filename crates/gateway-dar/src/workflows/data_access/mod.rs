//! Data access request amendments: domain model, engine, service facade and HTTP routes.

pub mod amendments;
pub mod domain;
pub mod repository;
pub mod router;
pub mod schema;
pub mod service;

#[cfg(test)]
mod tests;

pub use amendments::{AmendmentCounts, AmendmentError, NotificationType, VersionDetails};
pub use domain::{
    AboutApplication, ActiveParty, AmendmentEntry, AmendmentIteration, AmendmentStatus,
    ApplicationId, ApplicationRecord, ApplicationStatus, ApplicationType, DatasetSummary,
    StatusSnapshot, User, UserId, UserType,
};
pub use repository::{
    ApplicationRepository, NotificationDispatcher, NotificationError, OutboundEmail,
    RepositoryError,
};
pub use router::amendment_router;
pub use schema::FormSchema;
pub use service::{
    Actor, AmendmentMode, AmendmentService, AmendmentServiceError, AmendmentSummary,
    AnswerUpdate, ApplicationView, SetAmendmentRequest,
};
