use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::AmendmentError;
use crate::config::NotificationConfig;
use crate::workflows::data_access::domain::{ApplicationId, ApplicationRecord, User, UserId};
use crate::workflows::data_access::repository::{NotificationDispatcher, OutboundEmail};

pub const DATA_ACCESS_REQUEST_CATEGORY: &str = "data access request";

/// Amendment events that reach the applicant team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    Returned,
}

/// Structured content handed to the e-mail generator for a returned application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnedEmailOptions {
    pub id: ApplicationId,
    pub publisher: String,
    pub project_name: String,
    pub dataset_titles: String,
    pub date_submitted: Option<DateTime<Utc>>,
    pub application_url: String,
}

pub fn create_notifications<N>(
    notification: NotificationType,
    record: &ApplicationRecord,
    dispatcher: &N,
    config: &NotificationConfig,
) -> Result<(), AmendmentError>
where
    N: NotificationDispatcher + ?Sized,
{
    match notification {
        NotificationType::Returned => notify_returned(record, dispatcher, config),
    }
}

fn notify_returned<N>(
    record: &ApplicationRecord,
    dispatcher: &N,
    config: &NotificationConfig,
) -> Result<(), AmendmentError>
where
    N: NotificationDispatcher + ?Sized,
{
    let publisher = record
        .publisher()
        .filter(|publisher| !publisher.trim().is_empty())
        .ok_or(AmendmentError::MissingNotificationContext("publisher"))?
        .to_string();
    if record.datasets.is_empty() {
        return Err(AmendmentError::MissingNotificationContext("datasets"));
    }
    let dataset_titles = record
        .datasets
        .iter()
        .map(|dataset| dataset.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let recipients = applicant_team(record);
    let recipient_ids: Vec<UserId> = recipients.iter().map(|user| user.id.clone()).collect();

    dispatcher.trigger_notification_message(
        &recipient_ids,
        &format!("Updates have been requested by {publisher} for your Data Access Request application"),
        DATA_ACCESS_REQUEST_CATEGORY,
        &record.id,
    )?;

    let options = ReturnedEmailOptions {
        id: record.id.clone(),
        publisher: publisher.clone(),
        project_name: record.about_application.project_name.clone(),
        dataset_titles,
        date_submitted: record.date_submitted,
        application_url: format!(
            "{}/data-access-request/{}",
            config.gateway_url.trim_end_matches('/'),
            record.id
        ),
    };
    let html = dispatcher.generate_dar_returned_email(&options);

    dispatcher.send_email(OutboundEmail {
        recipients,
        from: config.sender.clone(),
        subject: format!("{publisher} has requested updates to your Data Access Request application"),
        html,
        allow_unsubscribe: false,
    })?;

    info!(
        application_id = %record.id,
        recipients = recipient_ids.len(),
        "returned application notifications dispatched"
    );
    Ok(())
}

/// Main applicant followed by any authors not already listed.
fn applicant_team(record: &ApplicationRecord) -> Vec<User> {
    let mut team = vec![record.main_applicant.clone()];
    for author in &record.authors {
        if team.iter().all(|member| member.id != author.id) {
            team.push(author.clone());
        }
    }
    team
}
