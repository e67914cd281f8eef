use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::amendments::{
    calculate_amendment_status, count_amendments, create_notifications, do_resubmission,
    filter_amendments, get_amendment_iteration_details_by_version, get_current_amendment_iteration,
    handle_applicant_amendment, inject_amendments, remove_amendment, request_amendment,
    return_amendment_iteration, revert_amendment_answer, AmendmentCounts, AmendmentError,
    NotificationType, VersionDetails,
};
use super::domain::{
    is_empty_answer, ApplicationId, ApplicationRecord, ApplicationStatus, ApplicationType,
    StatusSnapshot, User, UserType,
};
use super::repository::{ApplicationRepository, NotificationDispatcher, RepositoryError};
use crate::config::NotificationConfig;

/// Authenticated caller and the side of the application they are acting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user: User,
    pub user_type: UserType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AmendmentMode {
    Add,
    Remove,
    Revert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAmendmentRequest {
    pub question_id: String,
    pub question_set_id: String,
    pub mode: AmendmentMode,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerUpdate {
    pub question_id: String,
    pub question_set_id: String,
    #[serde(default)]
    pub answer: Value,
}

/// Amendment progress returned after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmendmentSummary {
    pub application_id: ApplicationId,
    pub application_status: ApplicationStatus,
    pub amendment_status: String,
    #[serde(flatten)]
    pub counts: AmendmentCounts,
}

/// Application projected for one party.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationView {
    pub application: ApplicationRecord,
    pub version: VersionDetails,
    pub amendment_status: String,
    #[serde(flatten)]
    pub counts: AmendmentCounts,
}

/// Service composing the repository, amendment engine and notification hooks.
pub struct AmendmentService<R, N> {
    repository: Arc<R>,
    notifications: Arc<N>,
    config: NotificationConfig,
}

impl<R, N> AmendmentService<R, N>
where
    R: ApplicationRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    pub fn new(repository: Arc<R>, notifications: Arc<N>, config: NotificationConfig) -> Self {
        Self {
            repository,
            notifications,
            config,
        }
    }

    fn load(&self, id: &ApplicationId) -> Result<ApplicationRecord, AmendmentServiceError> {
        let record = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Custodian adds or cancels an amendment request, applicant reverts an amended answer.
    pub fn set_amendment(
        &self,
        id: &ApplicationId,
        actor: &Actor,
        request: SetAmendmentRequest,
    ) -> Result<AmendmentSummary, AmendmentServiceError> {
        let mut record = self.load(id)?;
        let now = Utc::now();
        let SetAmendmentRequest {
            question_id,
            question_set_id,
            mode,
            reason,
        } = request;

        match mode {
            AmendmentMode::Add => {
                require_custodian(actor)?;
                require_status(
                    &record,
                    &[ApplicationStatus::Submitted, ApplicationStatus::InReview],
                )?;
                request_amendment(
                    &mut record,
                    &question_id,
                    &question_set_id,
                    reason,
                    &actor.user,
                    now,
                );
            }
            AmendmentMode::Remove => {
                require_custodian(actor)?;
                let returned = get_current_amendment_iteration(&record.amendment_iterations)
                    .map(|iteration| iteration.is_returned())
                    .unwrap_or(false);
                if returned {
                    return Err(AmendmentServiceError::InvalidState(
                        "requests cannot be cancelled once returned to the applicant".to_string(),
                    ));
                }
                remove_amendment(&mut record, &question_id);
            }
            AmendmentMode::Revert => {
                require_applicant(&record, actor)?;
                revert_amendment_answer(&mut record, &question_id, &actor.user);
                let counts = count_amendments(&record, UserType::Applicant, true);
                record.unanswered_amendments = counts.unanswered_amendments;
                record.answered_amendments = counts.answered_amendments;
            }
        }

        record.dirty_schema = true;
        info!(
            application_id = %record.id,
            question_id = %question_id,
            ?mode,
            user_type = actor.user_type.label(),
            "amendment updated"
        );
        let summary = summarise(&record, actor.user_type);
        self.repository.update(record)?;
        Ok(summary)
    }

    /// Applicant edits an answer. Before first submission this writes the baseline answers,
    /// afterwards the edit is tracked as an amendment.
    pub fn update_answer(
        &self,
        id: &ApplicationId,
        actor: &Actor,
        update: AnswerUpdate,
    ) -> Result<AmendmentSummary, AmendmentServiceError> {
        let mut record = self.load(id)?;
        require_applicant(&record, actor)?;
        require_status(
            &record,
            &[
                ApplicationStatus::InProgress,
                ApplicationStatus::Submitted,
                ApplicationStatus::InReview,
            ],
        )?;

        let AnswerUpdate {
            question_id,
            question_set_id,
            answer,
        } = update;

        if record.date_submitted.is_none() {
            if is_empty_answer(&answer) {
                record.question_answers.remove(&question_id);
            } else {
                record.question_answers.insert(question_id.clone(), answer);
            }
        } else {
            let custodian_drafting = record.application_status != ApplicationStatus::InProgress
                && get_current_amendment_iteration(&record.amendment_iterations)
                    .map(|iteration| !iteration.is_returned())
                    .unwrap_or(false);
            if custodian_drafting {
                return Err(AmendmentServiceError::InvalidState(
                    "the custodian is preparing amendment requests".to_string(),
                ));
            }
            handle_applicant_amendment(
                &mut record,
                &question_id,
                &question_set_id,
                answer,
                &actor.user,
                Utc::now(),
            );
            // An unrequested edit on a submitted application hands the form to the applicant,
            // and undoing it hands the form back.
            let opened = get_current_amendment_iteration(&record.amendment_iterations).is_some();
            if opened && record.application_status != ApplicationStatus::InProgress {
                record.reopened_from = Some(StatusSnapshot {
                    application_status: record.application_status,
                    application_type: record.application_type,
                });
                record.application_status = ApplicationStatus::InProgress;
                record.application_type = ApplicationType::Amendment;
            } else if !opened {
                if let Some(snapshot) = record.reopened_from.take() {
                    record.application_status = snapshot.application_status;
                    record.application_type = snapshot.application_type;
                    debug!(application_id = %record.id, "unrequested amendment withdrawn");
                }
            }
        }

        info!(application_id = %record.id, question_id = %question_id, "answer updated");
        let summary = summarise(&record, UserType::Applicant);
        self.repository.update(record)?;
        Ok(summary)
    }

    /// Custodian hands the open iteration back to the applicant team and notifies them.
    pub fn return_to_applicant(
        &self,
        id: &ApplicationId,
        actor: &Actor,
    ) -> Result<AmendmentSummary, AmendmentServiceError> {
        let mut record = self.load(id)?;
        require_custodian(actor)?;
        require_status(
            &record,
            &[ApplicationStatus::Submitted, ApplicationStatus::InReview],
        )?;

        return_amendment_iteration(&mut record, &actor.user, Utc::now())?;
        record.application_status = ApplicationStatus::InProgress;
        let counts = count_amendments(&record, UserType::Applicant, true);
        record.unanswered_amendments = counts.unanswered_amendments;
        record.answered_amendments = counts.answered_amendments;

        let summary = summarise(&record, actor.user_type);
        self.repository.update(record.clone())?;
        info!(application_id = %record.id, "application returned to applicant");

        if let Err(err) = create_notifications(
            NotificationType::Returned,
            &record,
            self.notifications.as_ref(),
            &self.config,
        ) {
            warn!(application_id = %record.id, error = %err, "returned notifications failed");
            return Err(err.into());
        }
        Ok(summary)
    }

    /// Applicant submits the open iteration back to the custodian.
    pub fn resubmit(
        &self,
        id: &ApplicationId,
        actor: &Actor,
    ) -> Result<AmendmentSummary, AmendmentServiceError> {
        let mut record = self.load(id)?;
        require_applicant(&record, actor)?;
        require_status(&record, &[ApplicationStatus::InProgress])?;
        if get_current_amendment_iteration(&record.amendment_iterations).is_none() {
            return Err(AmendmentServiceError::InvalidState(
                "there is no open amendment iteration to resubmit".to_string(),
            ));
        }

        do_resubmission(&mut record, &actor.user.id, Utc::now());
        record.application_status = ApplicationStatus::Submitted;
        record.reopened_from = None;
        record.unanswered_amendments = 0;
        record.answered_amendments = 0;
        record.dirty_schema = true;

        info!(application_id = %record.id, "application resubmitted");
        let summary = summarise(&record, actor.user_type);
        self.repository.update(record)?;
        Ok(summary)
    }

    /// Application as the acting party should see it, at the latest or a historical version.
    pub fn view(
        &self,
        id: &ApplicationId,
        actor: &Actor,
        minor_version: Option<usize>,
    ) -> Result<ApplicationView, AmendmentServiceError> {
        let mut record = self.load(id)?;
        if actor.user_type == UserType::Applicant {
            require_applicant(&record, actor)?;
        }

        let version = get_amendment_iteration_details_by_version(&record, minor_version);
        let counts = count_amendments(&record, actor.user_type, version.is_latest_minor_version);
        let amendment_status = status_label(&record, actor.user_type);

        inject_amendments(
            &mut record,
            actor.user_type,
            &actor.user,
            version.version_index,
            version.is_latest_minor_version,
        );
        record.amendment_iterations = filter_amendments(&record, actor.user_type, None);

        Ok(ApplicationView {
            application: record,
            version,
            amendment_status,
            counts,
        })
    }
}

fn status_label(record: &ApplicationRecord, user_type: UserType) -> String {
    calculate_amendment_status(record, user_type)
        .map(|status| status.label().to_string())
        .unwrap_or_default()
}

fn summarise(record: &ApplicationRecord, user_type: UserType) -> AmendmentSummary {
    AmendmentSummary {
        application_id: record.id.clone(),
        application_status: record.application_status,
        amendment_status: status_label(record, user_type),
        counts: count_amendments(record, user_type, true),
    }
}

fn require_custodian(actor: &Actor) -> Result<(), AmendmentServiceError> {
    if actor.user_type == UserType::Custodian {
        Ok(())
    } else {
        Err(AmendmentServiceError::Forbidden(
            "only the custodian may manage amendment requests",
        ))
    }
}

fn require_applicant(record: &ApplicationRecord, actor: &Actor) -> Result<(), AmendmentServiceError> {
    if actor.user_type == UserType::Applicant && record.is_applicant(&actor.user.id) {
        Ok(())
    } else {
        Err(AmendmentServiceError::Forbidden(
            "only the applicant team may change answers",
        ))
    }
}

fn require_status(
    record: &ApplicationRecord,
    allowed: &[ApplicationStatus],
) -> Result<(), AmendmentServiceError> {
    if allowed.contains(&record.application_status) {
        Ok(())
    } else {
        Err(AmendmentServiceError::InvalidState(format!(
            "application is {}",
            record.application_status.label()
        )))
    }
}

/// Error raised by the amendment service.
#[derive(Debug, thiserror::Error)]
pub enum AmendmentServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Amendment(#[from] AmendmentError),
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("invalid application state: {0}")]
    InvalidState(String),
}
