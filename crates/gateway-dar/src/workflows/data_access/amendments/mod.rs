//! Amendment bookkeeping for data access requests.
//!
//! An application collects rounds ("iterations") of question level amendments exchanged between
//! the custodian reviewing it and the applicant maintaining it. At most one iteration is open
//! (unsubmitted) at a time. The functions here operate on an in-memory [`ApplicationRecord`]
//! and leave persistence to the caller.
//!
//! [`ApplicationRecord`]: super::domain::ApplicationRecord

pub mod answers;
pub mod iterations;
pub mod notifications;
pub mod party;
pub mod projection;
pub mod visibility;

use super::repository::NotificationError;

pub use answers::{format_question_answers, get_latest_question_answer};
pub use iterations::{
    add_amendment, count_amendments, do_resubmission, does_amendment_exist,
    get_current_amendment_iteration, get_latest_amendment_iteration_index,
    handle_applicant_amendment, open_iteration_position, remove_amendment, request_amendment,
    return_amendment_iteration, revert_amendment_answer, update_amendment, AmendmentCounts,
};
pub use notifications::{create_notifications, NotificationType, ReturnedEmailOptions};
pub use party::{
    calculate_amendment_status, get_amendment_iteration_details_by_version,
    get_amendment_iteration_party, get_amendment_iteration_party_by_version, VersionDetails,
};
pub use projection::{
    build_question_alert, format_schema, inject_amendments, inject_navigation_amendment,
    inject_question_amendment,
};
pub use visibility::{filter_amendments, remove_iteration_answers};

#[derive(Debug, thiserror::Error)]
pub enum AmendmentError {
    #[error("no amendments have been requested on the open iteration")]
    NoAmendmentsRequested,
    #[error("the open iteration has already been returned to the applicant")]
    AlreadyReturned,
    #[error("notification context is missing {0}")]
    MissingNotificationContext(&'static str),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}
