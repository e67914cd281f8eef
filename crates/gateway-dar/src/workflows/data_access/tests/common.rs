use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use crate::config::NotificationConfig;
use crate::workflows::data_access::amendments::ReturnedEmailOptions;
use crate::workflows::data_access::domain::{
    AboutApplication, AmendmentEntry, AmendmentIteration, ApplicationId, ApplicationRecord,
    ApplicationStatus, ApplicationType, DatasetSummary, User, UserId, UserType,
};
use crate::workflows::data_access::repository::{
    ApplicationRepository, NotificationDispatcher, NotificationError, OutboundEmail,
    RepositoryError,
};
use crate::workflows::data_access::schema::FormSchema;
use crate::workflows::data_access::service::{Actor, AmendmentService};

pub(super) fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn applicant() -> User {
    User {
        id: UserId("user-applicant".to_string()),
        firstname: "Ada".to_string(),
        lastname: "Byron".to_string(),
        email: Some("ada@example.org".to_string()),
    }
}

pub(super) fn author() -> User {
    User {
        id: UserId("user-author".to_string()),
        firstname: "Mary".to_string(),
        lastname: "Somerville".to_string(),
        email: Some("mary@example.org".to_string()),
    }
}

pub(super) fn custodian() -> User {
    User {
        id: UserId("user-custodian".to_string()),
        firstname: "Rosalind".to_string(),
        lastname: "Franklin".to_string(),
        email: None,
    }
}

pub(super) fn applicant_actor() -> Actor {
    Actor {
        user: applicant(),
        user_type: UserType::Applicant,
    }
}

pub(super) fn custodian_actor() -> Actor {
    Actor {
        user: custodian(),
        user_type: UserType::Custodian,
    }
}

pub(super) fn schema() -> FormSchema {
    serde_json::from_value(json!({
        "pages": [
            { "pageId": "safePeople", "title": "Safe people" },
            { "pageId": "safeProject", "title": "Safe project" }
        ],
        "questionPanels": [
            { "panelId": "applicant", "pageId": "safePeople", "navHeader": "Applicant" },
            { "panelId": "project", "pageId": "safeProject", "navHeader": "Project" }
        ],
        "questionSets": [
            {
                "questionSetId": "applicant",
                "questions": [
                    {
                        "questionId": "q1",
                        "question": "Full name",
                        "input": { "type": "textInput" }
                    },
                    {
                        "questionId": "hasFunding",
                        "question": "Is the project funded?",
                        "input": {
                            "type": "radioOptionsInput",
                            "options": [{
                                "value": "yes",
                                "text": "Yes",
                                "conditionalQuestions": [{
                                    "questionId": "funder",
                                    "question": "Funder name",
                                    "input": { "type": "textInput" }
                                }]
                            }]
                        }
                    },
                    { "questionId": "heading", "question": "Declarations" }
                ]
            },
            {
                "questionSetId": "project",
                "questions": [{
                    "questionId": "projectTitle",
                    "question": "Project title",
                    "input": { "type": "textInput" }
                }]
            }
        ]
    }))
    .expect("schema fixture parses")
}

/// Application submitted on 1 March with two baseline answers.
pub(super) fn submitted_record() -> ApplicationRecord {
    let mut question_answers = BTreeMap::new();
    question_answers.insert("q1".to_string(), json!("oldAnswer"));
    question_answers.insert("projectTitle".to_string(), json!("Cohort study"));

    ApplicationRecord {
        id: ApplicationId("dar-001".to_string()),
        application_status: ApplicationStatus::Submitted,
        application_type: ApplicationType::Initial,
        date_submitted: Some(at(1, 9)),
        json_schema: schema(),
        question_answers,
        amendment_iterations: Vec::new(),
        main_applicant: applicant(),
        authors: vec![author()],
        datasets: vec![
            DatasetSummary {
                dataset_id: "ds-1".to_string(),
                name: "Hospital episodes".to_string(),
                publisher: "Alliance Trust".to_string(),
            },
            DatasetSummary {
                dataset_id: "ds-2".to_string(),
                name: "Primary care records".to_string(),
                publisher: "Alliance Trust".to_string(),
            },
        ],
        about_application: AboutApplication {
            project_name: "Cohort study".to_string(),
            research_aim: None,
        },
        unanswered_amendments: 0,
        answered_amendments: 0,
        dirty_schema: false,
        reopened_from: None,
    }
}

pub(super) fn requested_entry(question_set_id: &str, day: u32) -> AmendmentEntry {
    AmendmentEntry::requested(
        question_set_id,
        Some("Please clarify".to_string()),
        &custodian(),
        at(day, 10),
    )
}

pub(super) fn answered_entry(question_set_id: &str, answer: Value, day: u32) -> AmendmentEntry {
    AmendmentEntry::volunteered(question_set_id, answer, &applicant(), at(day, 12))
}

pub(super) fn iteration(
    created: DateTime<Utc>,
    returned: Option<DateTime<Utc>>,
    submitted: Option<DateTime<Utc>>,
    entries: Vec<(&str, AmendmentEntry)>,
) -> AmendmentIteration {
    AmendmentIteration {
        date_created: created,
        created_by: custodian().id,
        date_returned: returned,
        returned_by: returned.map(|_| custodian().id),
        date_submitted: submitted,
        submitted_by: submitted.map(|_| applicant().id),
        question_answers: entries
            .into_iter()
            .map(|(question_id, entry)| (question_id.to_string(), entry))
            .collect(),
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<ApplicationId, ApplicationRecord>>>,
}

impl MemoryRepository {
    pub(super) fn with(record: ApplicationRecord) -> Self {
        let repository = Self::default();
        repository.insert(record).expect("fixture inserts");
        repository
    }

    pub(super) fn stored(&self, id: &ApplicationId) -> ApplicationRecord {
        self.fetch(id)
            .expect("fetch succeeds")
            .expect("record present")
    }
}

impl ApplicationRepository for MemoryRepository {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: ApplicationRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: ApplicationRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SentMessage {
    pub(super) recipients: Vec<UserId>,
    pub(super) message: String,
    pub(super) category: String,
    pub(super) reference_id: ApplicationId,
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifications {
    messages: Arc<Mutex<Vec<SentMessage>>>,
    emails: Arc<Mutex<Vec<OutboundEmail>>>,
}

impl MemoryNotifications {
    pub(super) fn messages(&self) -> Vec<SentMessage> {
        self.messages.lock().expect("message mutex poisoned").clone()
    }

    pub(super) fn emails(&self) -> Vec<OutboundEmail> {
        self.emails.lock().expect("email mutex poisoned").clone()
    }
}

impl NotificationDispatcher for MemoryNotifications {
    fn trigger_notification_message(
        &self,
        recipients: &[UserId],
        message: &str,
        category: &str,
        reference_id: &ApplicationId,
    ) -> Result<(), NotificationError> {
        self.messages
            .lock()
            .expect("message mutex poisoned")
            .push(SentMessage {
                recipients: recipients.to_vec(),
                message: message.to_string(),
                category: category.to_string(),
                reference_id: reference_id.clone(),
            });
        Ok(())
    }

    fn generate_dar_returned_email(&self, options: &ReturnedEmailOptions) -> String {
        format!(
            "<p>{} requested updates for {} ({})</p>",
            options.publisher, options.project_name, options.dataset_titles
        )
    }

    fn send_email(&self, email: OutboundEmail) -> Result<(), NotificationError> {
        self.emails.lock().expect("email mutex poisoned").push(email);
        Ok(())
    }
}

pub(super) struct OfflineNotifications;

impl NotificationDispatcher for OfflineNotifications {
    fn trigger_notification_message(
        &self,
        _recipients: &[UserId],
        _message: &str,
        _category: &str,
        _reference_id: &ApplicationId,
    ) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay down".to_string()))
    }

    fn generate_dar_returned_email(&self, _options: &ReturnedEmailOptions) -> String {
        String::new()
    }

    fn send_email(&self, _email: OutboundEmail) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay down".to_string()))
    }
}

pub(super) fn build_service(
    record: ApplicationRecord,
) -> (
    AmendmentService<MemoryRepository, MemoryNotifications>,
    MemoryRepository,
    MemoryNotifications,
) {
    let repository = MemoryRepository::with(record);
    let notifications = MemoryNotifications::default();
    let service = AmendmentService::new(
        Arc::new(repository.clone()),
        Arc::new(notifications.clone()),
        NotificationConfig::default(),
    );
    (service, repository, notifications)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
