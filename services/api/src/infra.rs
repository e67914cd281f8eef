use chrono::{DateTime, Utc};
use gateway_dar::config::NotificationConfig;
use gateway_dar::workflows::data_access::amendments::ReturnedEmailOptions;
use gateway_dar::workflows::data_access::{
    AboutApplication, ApplicationId, ApplicationRecord, ApplicationRepository, ApplicationStatus,
    ApplicationType, DatasetSummary, FormSchema, NotificationDispatcher, NotificationError,
    OutboundEmail, RepositoryError, User, UserId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

pub(crate) const DEMO_APPLICATION_ID: &str = "dar-demo-001";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationRepository {
    records: Arc<Mutex<HashMap<ApplicationId, ApplicationRecord>>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))?;
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: ApplicationRecord) -> Result<(), RepositoryError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))?;
        if guard.contains_key(&record.id) {
            guard.insert(record.id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }
}

/// Dispatcher that logs every notification and keeps the outgoing e-mails in memory.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotificationDispatcher {
    outbox: Arc<Mutex<Vec<OutboundEmail>>>,
}

impl LoggingNotificationDispatcher {
    pub(crate) fn outbox(&self) -> Vec<OutboundEmail> {
        self.outbox
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl NotificationDispatcher for LoggingNotificationDispatcher {
    fn trigger_notification_message(
        &self,
        recipients: &[UserId],
        message: &str,
        category: &str,
        reference_id: &ApplicationId,
    ) -> Result<(), NotificationError> {
        info!(
            application_id = %reference_id,
            recipients = recipients.len(),
            category,
            message,
            "in-app notification"
        );
        Ok(())
    }

    fn generate_dar_returned_email(&self, options: &ReturnedEmailOptions) -> String {
        let submitted = options
            .date_submitted
            .map(|date| date.format("%d/%m/%Y").to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "<h1>{publisher} has requested updates</h1>\
             <p>Project: {project}</p>\
             <p>Datasets: {datasets}</p>\
             <p>Submitted: {submitted}</p>\
             <p><a href=\"{url}\">Review the requested updates</a></p>",
            publisher = options.publisher,
            project = options.project_name,
            datasets = options.dataset_titles,
            url = options.application_url,
        )
    }

    fn send_email(&self, email: OutboundEmail) -> Result<(), NotificationError> {
        info!(
            from = %email.from,
            recipients = email.recipients.len(),
            subject = %email.subject,
            "e-mail queued"
        );
        self.outbox
            .lock()
            .map_err(|_| NotificationError::Transport("outbox mutex poisoned".to_string()))?
            .push(email);
        Ok(())
    }
}

pub(crate) fn demo_applicant() -> User {
    User {
        id: UserId("user-applicant".to_string()),
        firstname: "Ada".to_string(),
        lastname: "Byron".to_string(),
        email: Some("ada@example.org".to_string()),
    }
}

pub(crate) fn demo_custodian() -> User {
    User {
        id: UserId("user-custodian".to_string()),
        firstname: "Rosalind".to_string(),
        lastname: "Franklin".to_string(),
        email: Some("rosalind@example.org".to_string()),
    }
}

/// Submitted application used to seed the in-memory store.
pub(crate) fn demo_application(submitted_at: DateTime<Utc>) -> Result<ApplicationRecord, serde_json::Error> {
    let json_schema: FormSchema = serde_json::from_value(json!({
        "pages": [
            { "pageId": "safePeople", "title": "Safe people" },
            { "pageId": "safeProject", "title": "Safe project" }
        ],
        "questionPanels": [
            { "panelId": "applicant", "pageId": "safePeople", "navHeader": "Applicant" },
            { "panelId": "project", "pageId": "safeProject", "navHeader": "About the project" }
        ],
        "questionSets": [
            {
                "questionSetId": "applicant",
                "questionSetHeader": "Applicant",
                "questions": [
                    { "questionId": "fullName", "question": "Full name", "input": { "type": "textInput" } },
                    { "questionId": "orcid", "question": "ORCID", "input": { "type": "textInput" } }
                ]
            },
            {
                "questionSetId": "project",
                "questionSetHeader": "About the project",
                "questions": [
                    { "questionId": "projectTitle", "question": "Project title", "input": { "type": "textInput" } },
                    { "questionId": "lawfulBasis", "question": "Lawful basis", "input": { "type": "textareaInput" } }
                ]
            }
        ]
    }))?;

    let mut question_answers = BTreeMap::new();
    question_answers.insert("fullName".to_string(), json!("Ada Byron"));
    question_answers.insert("orcid".to_string(), json!("0000-0002-1825-0097"));
    question_answers.insert("projectTitle".to_string(), json!("Cardiac outcomes cohort"));
    question_answers.insert("lawfulBasis".to_string(), json!("Public task"));

    Ok(ApplicationRecord {
        id: ApplicationId(DEMO_APPLICATION_ID.to_string()),
        application_status: ApplicationStatus::Submitted,
        application_type: ApplicationType::Initial,
        date_submitted: Some(submitted_at),
        json_schema,
        question_answers,
        amendment_iterations: Vec::new(),
        main_applicant: demo_applicant(),
        authors: Vec::new(),
        datasets: vec![DatasetSummary {
            dataset_id: "ds-hes".to_string(),
            name: "Hospital episode statistics".to_string(),
            publisher: "Alliance Trust".to_string(),
        }],
        about_application: AboutApplication {
            project_name: "Cardiac outcomes cohort".to_string(),
            research_aim: Some("Compare post-operative outcomes across regions".to_string()),
        },
        unanswered_amendments: 0,
        answered_amendments: 0,
        dirty_schema: false,
        reopened_from: None,
    })
}

/// Repository pre-loaded with the demo application.
pub(crate) fn seeded_repository(
    submitted_at: DateTime<Utc>,
) -> Result<InMemoryApplicationRepository, RepositoryError> {
    let repository = InMemoryApplicationRepository::default();
    let record = demo_application(submitted_at)
        .map_err(|err| RepositoryError::Unavailable(format!("demo fixture invalid: {err}")))?;
    repository.insert(record)?;
    Ok(repository)
}

pub(crate) fn notification_dispatcher(config: &NotificationConfig) -> LoggingNotificationDispatcher {
    info!(sender = %config.sender, gateway_url = %config.gateway_url, "notifications logged locally");
    LoggingNotificationDispatcher::default()
}
