//! Projection of amendment state onto the form schema and answers shown to one party.

use chrono::{DateTime, Datelike, Utc};

use super::answers::format_question_answers;
use super::iterations::get_latest_amendment_iteration_index;
use super::visibility::{filter_amendments, remove_iteration_answers};
use crate::workflows::data_access::domain::{
    AmendmentEntry, AmendmentIteration, ApplicationRecord, User, UserType,
};
use crate::workflows::data_access::schema::{
    AlertAction, AmendmentAnnotation, AmendmentCompletion, FlagStatus, FormSchema,
    IterationStatus,
};

const DEFAULT_PUBLISHER: &str = "Custodian";

/// Prepare `record` for rendering to `user_type`: annotate the schema with the relevant
/// iteration and overlay the latest visible answers.
///
/// `version_index` selects a historical iteration; requests raised against it live in the
/// iteration that follows, which is preferred when present.
pub fn inject_amendments<'a>(
    record: &'a mut ApplicationRecord,
    user_type: UserType,
    user: &User,
    version_index: Option<usize>,
    include_completed: bool,
) -> &'a mut ApplicationRecord {
    let len = record.amendment_iterations.len();
    if len == 0 {
        return record;
    }

    let mut index = match version_index {
        Some(version) if version.saturating_add(1) < len => version + 1,
        Some(version) if version < len => version,
        _ => get_latest_amendment_iteration_index(record).unwrap_or(len - 1),
    };

    // Applicants wait for the hand-off, custodians for their first request.
    let target = &record.amendment_iterations[index];
    let not_yet_visible = match user_type {
        UserType::Applicant => !target.is_returned(),
        UserType::Custodian => target.question_answers.is_empty(),
    };
    if not_yet_visible {
        if index == 0 {
            return record;
        }
        index -= 1;
    }

    let publisher = record.publisher().unwrap_or(DEFAULT_PUBLISHER).to_string();
    let iteration = record.amendment_iterations[index].clone();
    format_schema(
        &mut record.json_schema,
        &iteration,
        user_type,
        user,
        &publisher,
        include_completed,
    );

    let visible = filter_amendments(record, user_type, Some(index));
    record.question_answers = format_question_answers(&record.question_answers, &visible);
    record
}

pub fn iteration_status(iteration: &AmendmentIteration) -> IterationStatus {
    if iteration.is_submitted() {
        IterationStatus::Submitted
    } else if iteration.is_returned() {
        IterationStatus::Returned
    } else {
        IterationStatus::InProgress
    }
}

pub fn format_schema(
    schema: &mut FormSchema,
    iteration: &AmendmentIteration,
    user_type: UserType,
    user: &User,
    publisher: &str,
    include_completed: bool,
) {
    let status = iteration_status(iteration);
    // Custodians see requests, not draft answers, until the applicant resubmits.
    let redacted;
    let iteration = if user_type == UserType::Custodian && !iteration.is_submitted() {
        redacted = remove_iteration_answers(iteration);
        &redacted
    } else {
        iteration
    };
    for (question_id, entry) in &iteration.question_answers {
        if !entry.requested && !entry.is_answered() {
            continue;
        }
        let completion = if entry.answer.is_none() || !include_completed {
            AmendmentCompletion::Incomplete
        } else {
            AmendmentCompletion::Completed
        };
        let annotation = build_question_alert(user_type, status, completion, entry, user, publisher);

        inject_navigation_amendment(schema, &entry.question_set_id, annotation.status);
        inject_question_amendment(
            schema,
            question_id,
            &entry.question_set_id,
            annotation,
            user_type,
            include_completed,
        );
    }
}

/// Raise the panel and page flags for `question_set_id`. Flags only ever move up in severity.
pub fn inject_navigation_amendment(schema: &mut FormSchema, question_set_id: &str, flag: FlagStatus) {
    let Some(panel) = schema.panel_mut(question_set_id) else {
        return;
    };
    let page_id = panel.page_id.clone();
    if schema.pages.iter().all(|page| page.page_id != page_id) {
        return;
    }
    if let Some(panel) = schema.panel_mut(question_set_id) {
        panel.flag = panel.flag.max(Some(flag));
    }
    if let Some(page) = schema.page_mut(&page_id) {
        page.flag = page.flag.max(Some(flag));
    }
}

pub fn inject_question_amendment(
    schema: &mut FormSchema,
    question_id: &str,
    question_set_id: &str,
    annotation: AmendmentAnnotation,
    user_type: UserType,
    include_completed: bool,
) {
    let read_only = user_type == UserType::Custodian
        || annotation.iteration_status == IterationStatus::Submitted
        || !include_completed;

    let Some(question) = schema
        .question_set_mut(question_set_id)
        .and_then(|set| set.find_question_mut(question_id))
    else {
        return;
    };
    if question.input.is_none() {
        return;
    }
    question.annotate(annotation, read_only);
}

fn navigation_flag(
    user_type: UserType,
    status: IterationStatus,
    completion: AmendmentCompletion,
) -> FlagStatus {
    use AmendmentCompletion::{Completed, Incomplete};
    use IterationStatus::{InProgress, Returned, Submitted};

    match (user_type, status, completion) {
        (_, Submitted, Completed) => FlagStatus::Success,
        (UserType::Applicant, Returned, Completed) => FlagStatus::Success,
        (UserType::Applicant, Returned, Incomplete) => FlagStatus::Danger,
        (_, Submitted, Incomplete) | (_, InProgress, _) | (UserType::Custodian, Returned, _) => {
            FlagStatus::Warning
        }
    }
}

pub fn build_question_alert(
    user_type: UserType,
    status: IterationStatus,
    completion: AmendmentCompletion,
    entry: &AmendmentEntry,
    user: &User,
    publisher: &str,
) -> AmendmentAnnotation {
    let mut options = Vec::new();
    match (user_type, status) {
        (UserType::Custodian, IterationStatus::InProgress) if entry.requested => {
            options.push(AlertAction::CancelRequest)
        }
        (UserType::Applicant, IterationStatus::Returned)
            if entry.requested && completion == AmendmentCompletion::Completed =>
        {
            options.push(AlertAction::RevertToPreviousAnswer)
        }
        _ => {}
    }

    let text = if entry.is_answered() {
        let actor = if entry.updated_by_user.as_ref() == Some(&user.id) {
            "You".to_string()
        } else {
            entry
                .updated_by
                .clone()
                .unwrap_or_else(|| "The applicant".to_string())
        };
        describe(&actor, "updated this answer", entry.date_updated)
    } else {
        let actor = if entry.requested_by_user.as_ref() == Some(&user.id) {
            "You".to_string()
        } else if user_type == UserType::Custodian {
            entry
                .requested_by
                .clone()
                .unwrap_or_else(|| publisher.to_string())
        } else {
            publisher.to_string()
        };
        describe(&actor, "requested an update", entry.date_requested)
    };

    AmendmentAnnotation {
        status: navigation_flag(user_type, status, completion),
        text,
        options,
        iteration_status: status,
        completed: completion,
        reason: entry.reason.clone(),
    }
}

fn describe(actor: &str, action: &str, date: Option<DateTime<Utc>>) -> String {
    match date {
        Some(date) => format!("{actor} {action} on {}", display_date(date)),
        None => format!("{actor} {action}"),
    }
}

/// Renders dates as `17th Oct 2026`.
pub fn display_date(date: DateTime<Utc>) -> String {
    let day = date.day();
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{day}{suffix} {}", date.format("%b %Y"))
}
