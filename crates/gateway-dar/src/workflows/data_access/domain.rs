use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::schema::FormSchema;

/// Identifier wrapper for data access request applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for gateway users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Acting user as resolved by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub firstname: String,
    pub lastname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }
}

/// The two parties exchanging amendments on an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserType {
    Applicant,
    Custodian,
}

impl UserType {
    pub const fn label(self) -> &'static str {
        match self {
            UserType::Applicant => "applicant",
            UserType::Custodian => "custodian",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "applicant" => Some(UserType::Applicant),
            "custodian" => Some(UserType::Custodian),
            _ => None,
        }
    }
}

/// Party currently expected to act on the application.
pub type ActiveParty = UserType;

/// Lifecycle status of the overall application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApplicationStatus {
    InProgress,
    Submitted,
    InReview,
    Approved,
    #[serde(rename = "approved with conditions")]
    ApprovedWithConditions,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::InProgress => "inProgress",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::InReview => "inReview",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::ApprovedWithConditions => "approved with conditions",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    /// A custodian has reached a final decision on the application.
    pub const fn is_decided(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Approved
                | ApplicationStatus::ApprovedWithConditions
                | ApplicationStatus::Rejected
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApplicationType {
    #[default]
    Initial,
    Amendment,
    Resubmission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub application_status: ApplicationStatus,
    pub application_type: ApplicationType,
}

/// Summary label describing where an amendment round currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AmendmentStatus {
    UpdatesSubmitted,
    UpdatesRequested,
    UpdatesReceived,
    AwaitingUpdates,
}

impl AmendmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AmendmentStatus::UpdatesSubmitted => "Updates submitted",
            AmendmentStatus::UpdatesRequested => "Updates requested",
            AmendmentStatus::UpdatesReceived => "Updates received",
            AmendmentStatus::AwaitingUpdates => "Awaiting updates",
        }
    }
}

/// One amended question within an iteration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmendmentEntry {
    pub question_set_id: String,
    #[serde(default)]
    pub requested: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_by_user: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_requested: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by_user: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_updated: Option<DateTime<Utc>>,
}

impl AmendmentEntry {
    pub fn requested(
        question_set_id: &str,
        reason: Option<String>,
        user: &User,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            question_set_id: question_set_id.to_string(),
            requested: true,
            reason,
            requested_by: Some(user.full_name()),
            requested_by_user: Some(user.id.clone()),
            date_requested: Some(now),
            ..Self::default()
        }
    }

    pub fn volunteered(question_set_id: &str, answer: Value, user: &User, now: DateTime<Utc>) -> Self {
        let mut entry = Self {
            question_set_id: question_set_id.to_string(),
            ..Self::default()
        };
        entry.record_answer(answer, user, now);
        entry
    }

    pub fn record_answer(&mut self, answer: Value, user: &User, now: DateTime<Utc>) {
        self.answer = Some(answer);
        self.updated_by = Some(user.full_name());
        self.updated_by_user = Some(user.id.clone());
        self.date_updated = Some(now);
    }

    /// Drop the supplied answer, leaving any custodian request in place.
    pub fn clear_answer(&mut self) {
        self.answer = None;
        self.updated_by = None;
        self.updated_by_user = None;
        self.date_updated = None;
    }

    pub fn is_answered(&self) -> bool {
        self.answer.is_some()
    }
}

/// One round trip of amendments between custodian and applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmendmentIteration {
    pub date_created: DateTime<Utc>,
    pub created_by: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_returned: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_submitted: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<UserId>,
    #[serde(default)]
    pub question_answers: BTreeMap<String, AmendmentEntry>,
}

impl AmendmentIteration {
    pub fn open(created_by: &User, now: DateTime<Utc>) -> Self {
        Self {
            date_created: now,
            created_by: created_by.id.clone(),
            date_returned: None,
            returned_by: None,
            date_submitted: None,
            submitted_by: None,
            question_answers: BTreeMap::new(),
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.date_submitted.is_some()
    }

    pub fn is_returned(&self) -> bool {
        self.date_returned.is_some()
    }
}

/// Dataset referenced by an application, carrying the publishing custodian.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub dataset_id: String,
    pub name: String,
    pub publisher: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutApplication {
    #[serde(default)]
    pub project_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_aim: Option<String>,
}

/// Data access request document as stored by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    pub application_status: ApplicationStatus,
    #[serde(default)]
    pub application_type: ApplicationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_submitted: Option<DateTime<Utc>>,
    pub json_schema: FormSchema,
    #[serde(default)]
    pub question_answers: BTreeMap<String, Value>,
    #[serde(default)]
    pub amendment_iterations: Vec<AmendmentIteration>,
    pub main_applicant: User,
    #[serde(default)]
    pub authors: Vec<User>,
    #[serde(default)]
    pub datasets: Vec<DatasetSummary>,
    #[serde(default)]
    pub about_application: AboutApplication,
    #[serde(default)]
    pub unanswered_amendments: u32,
    #[serde(default)]
    pub answered_amendments: u32,
    #[serde(default)]
    pub dirty_schema: bool,
    /// Status and type held before an unrequested applicant edit reopened the application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reopened_from: Option<StatusSnapshot>,
}

impl ApplicationRecord {
    /// Custodian publishing the first dataset on the application.
    pub fn publisher(&self) -> Option<&str> {
        self.datasets.first().map(|dataset| dataset.publisher.as_str())
    }

    /// Close an iteration on behalf of the applicant. Out of range indexes are ignored.
    pub fn submit_amendment_iteration(
        &mut self,
        index: usize,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> &mut Self {
        if let Some(iteration) = self.amendment_iterations.get_mut(index) {
            iteration.date_submitted = Some(now);
            iteration.submitted_by = Some(user_id.clone());
        }
        self
    }

    pub fn is_applicant(&self, user: &UserId) -> bool {
        &self.main_applicant.id == user || self.authors.iter().any(|author| &author.id == user)
    }
}

/// Treat null, blank strings and empty collections as an absent answer.
pub fn is_empty_answer(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
