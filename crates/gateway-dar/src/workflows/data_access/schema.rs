//! Typed model of the dynamic application form rendered to applicants and custodians.
//!
//! The form is laid out as pages, each listing question panels in the navigation, each panel
//! pointing at one or more question sets. Questions may carry nested conditional questions under
//! their input options. Amendment state is attached to individual questions as an
//! [`AmendmentAnnotation`] and summarised on panels and pages as a [`FlagStatus`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Severity of a navigation flag. Ordering follows severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagStatus {
    Success,
    Warning,
    Danger,
}

/// Follow-up the rendering client can offer next to an amended question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertAction {
    CancelRequest,
    RevertToPreviousAnswer,
}

impl AlertAction {
    pub const fn text(self) -> &'static str {
        match self {
            AlertAction::CancelRequest => "Cancel request",
            AlertAction::RevertToPreviousAnswer => "Revert to previous answer",
        }
    }
}

/// Where the iteration holding an amendment sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IterationStatus {
    Submitted,
    Returned,
    InProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AmendmentCompletion {
    Completed,
    Incomplete,
}

/// Amendment alert merged onto a single question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmendmentAnnotation {
    pub status: FlagStatus,
    pub text: String,
    #[serde(default)]
    pub options: Vec<AlertAction>,
    pub iteration_status: IterationStatus,
    pub completed: AmendmentCompletion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub question_panels: Vec<QuestionPanel>,
    #[serde(default)]
    pub question_sets: Vec<QuestionSet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub page_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<FlagStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPanel {
    pub panel_id: String,
    pub page_id: String,
    #[serde(default)]
    pub nav_header: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<FlagStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSet {
    pub question_set_id: String,
    #[serde(default)]
    pub question_set_header: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question_id: String,
    #[serde(default)]
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<QuestionInput>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amendment: Option<AmendmentAnnotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
    #[serde(rename = "type")]
    pub input_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<InputOption>,
    /// Renderer specific settings (validators, placeholders) carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputOption {
    pub value: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditional_questions: Vec<Question>,
}

impl FormSchema {
    pub fn panel_mut(&mut self, panel_id: &str) -> Option<&mut QuestionPanel> {
        self.question_panels
            .iter_mut()
            .find(|panel| panel.panel_id == panel_id)
    }

    pub fn page_mut(&mut self, page_id: &str) -> Option<&mut Page> {
        self.pages.iter_mut().find(|page| page.page_id == page_id)
    }

    pub fn question_set_mut(&mut self, question_set_id: &str) -> Option<&mut QuestionSet> {
        self.question_sets
            .iter_mut()
            .find(|set| set.question_set_id == question_set_id)
    }
}

impl QuestionSet {
    /// Depth-first search through top level and conditional questions.
    pub fn find_question_mut(&mut self, question_id: &str) -> Option<&mut Question> {
        find_in(&mut self.questions, question_id)
    }
}

fn find_in<'a>(questions: &'a mut [Question], question_id: &str) -> Option<&'a mut Question> {
    for question in questions.iter_mut() {
        if question.question_id == question_id {
            return Some(question);
        }
        if let Some(input) = question.input.as_mut() {
            for option in input.options.iter_mut() {
                if let Some(found) = find_in(&mut option.conditional_questions, question_id) {
                    return Some(found);
                }
            }
        }
    }
    None
}

impl Question {
    /// Attach an amendment alert. Read-only is sticky once set.
    pub fn annotate(&mut self, annotation: AmendmentAnnotation, read_only: bool) {
        self.amendment = Some(annotation);
        self.read_only = self.read_only || read_only;
    }
}
