use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::answers::get_latest_question_answer;
use super::AmendmentError;
use crate::workflows::data_access::domain::{
    is_empty_answer, AmendmentEntry, AmendmentIteration, ApplicationRecord, ApplicationType, User,
    UserId, UserType,
};

/// Position of the open iteration: the newest `date_created` among iterations that have not
/// been submitted. Every "current iteration" lookup goes through here.
pub fn open_iteration_position(iterations: &[AmendmentIteration]) -> Option<usize> {
    iterations
        .iter()
        .enumerate()
        .filter(|(_, iteration)| !iteration.is_submitted())
        .max_by_key(|(_, iteration)| iteration.date_created)
        .map(|(index, _)| index)
}

/// Index of the open iteration on the record, `None` when every iteration has been submitted.
pub fn get_latest_amendment_iteration_index(record: &ApplicationRecord) -> Option<usize> {
    open_iteration_position(&record.amendment_iterations)
}

pub fn get_current_amendment_iteration(
    iterations: &[AmendmentIteration],
) -> Option<&AmendmentIteration> {
    open_iteration_position(iterations).map(|index| &iterations[index])
}

fn open_iteration_mut(record: &mut ApplicationRecord) -> Option<&mut AmendmentIteration> {
    let index = get_latest_amendment_iteration_index(record)?;
    record.amendment_iterations.get_mut(index)
}

/// True when the most recently created iteration, submitted or not, amends `question_id`.
pub fn does_amendment_exist(record: &ApplicationRecord, question_id: &str) -> bool {
    record
        .amendment_iterations
        .iter()
        .max_by_key(|iteration| iteration.date_created)
        .map(|iteration| iteration.question_answers.contains_key(question_id))
        .unwrap_or(false)
}

/// Record a new amendment against `question_id`, opening an iteration when none is open.
///
/// Iterations opened by an unrequested applicant edit are marked returned straight away so the
/// custodian sees them without waiting for a hand-off.
#[allow(clippy::too_many_arguments)]
pub fn add_amendment(
    record: &mut ApplicationRecord,
    question_id: &str,
    question_set_id: &str,
    answer: Option<Value>,
    reason: Option<String>,
    user: &User,
    requested: bool,
    now: DateTime<Utc>,
) {
    let entry = if requested {
        let mut entry = AmendmentEntry::requested(question_set_id, reason, user, now);
        entry.answer = answer;
        entry
    } else {
        AmendmentEntry::volunteered(question_set_id, answer.unwrap_or(Value::Null), user, now)
    };

    match open_iteration_mut(record) {
        Some(iteration) => {
            iteration
                .question_answers
                .insert(question_id.to_string(), entry);
        }
        None => {
            let mut iteration = AmendmentIteration::open(user, now);
            if !requested {
                iteration.date_returned = Some(now);
                iteration.returned_by = Some(user.id.clone());
            }
            iteration
                .question_answers
                .insert(question_id.to_string(), entry);
            debug!(
                application_id = %record.id,
                question_id,
                requested,
                "opened amendment iteration"
            );
            record.amendment_iterations.push(iteration);
        }
    }
}

/// Custodian request for an update to `question_id`. An answer already supplied on the open
/// iteration is kept so re-raising a request does not discard applicant work.
pub fn request_amendment(
    record: &mut ApplicationRecord,
    question_id: &str,
    question_set_id: &str,
    reason: Option<String>,
    user: &User,
    now: DateTime<Utc>,
) {
    let previous = open_iteration_mut(record)
        .and_then(|iteration| iteration.question_answers.get(question_id).cloned());

    add_amendment(
        record,
        question_id,
        question_set_id,
        None,
        reason,
        user,
        true,
        now,
    );

    if let Some(previous) = previous.filter(AmendmentEntry::is_answered) {
        if let Some(entry) = open_iteration_mut(record)
            .and_then(|iteration| iteration.question_answers.get_mut(question_id))
        {
            entry.answer = previous.answer;
            entry.updated_by = previous.updated_by;
            entry.updated_by_user = previous.updated_by_user;
            entry.date_updated = previous.date_updated;
        }
    }
}

/// Apply a new answer to an existing amendment on the open iteration.
///
/// An answer equal to the latest known answer undoes the amendment: a requested entry loses its
/// answer, an unrequested one is removed.
pub fn update_amendment<'a>(
    record: &'a mut ApplicationRecord,
    question_id: &str,
    answer: Value,
    user: &User,
    now: DateTime<Utc>,
) -> &'a mut ApplicationRecord {
    let Some(index) = get_latest_amendment_iteration_index(record) else {
        debug!(application_id = %record.id, question_id, "no open iteration to update");
        return record;
    };
    let Some(requested) = record.amendment_iterations[index]
        .question_answers
        .get(question_id)
        .map(|entry| entry.requested)
    else {
        debug!(application_id = %record.id, question_id, "no amendment to update");
        return record;
    };

    match get_latest_question_answer(record, question_id) {
        Some(latest) if latest == answer => {
            if requested {
                if let Some(entry) = record.amendment_iterations[index]
                    .question_answers
                    .get_mut(question_id)
                {
                    entry.clear_answer();
                }
            } else {
                remove_amendment(record, question_id);
            }
            return record;
        }
        None if is_empty_answer(&answer) && !requested => {
            remove_amendment(record, question_id);
            return record;
        }
        _ => {}
    }

    if let Some(entry) = record.amendment_iterations[index]
        .question_answers
        .get_mut(question_id)
    {
        entry.record_answer(answer, user, now);
    }
    record
}

/// Drop the amendment for `question_id` from the open iteration, pruning the iteration when it
/// no longer holds any entries.
pub fn remove_amendment(record: &mut ApplicationRecord, question_id: &str) {
    let Some(index) = get_latest_amendment_iteration_index(record) else {
        return;
    };
    let iteration = &mut record.amendment_iterations[index];
    iteration.question_answers.remove(question_id);
    if iteration.question_answers.is_empty() {
        record.amendment_iterations.remove(index);
    }
}

/// Applicant edit of an answer after the application has been submitted.
pub fn handle_applicant_amendment<'a>(
    record: &'a mut ApplicationRecord,
    question_id: &str,
    question_set_id: &str,
    answer: Value,
    user: &User,
    now: DateTime<Utc>,
) -> &'a mut ApplicationRecord {
    let amends_open_iteration = does_amendment_exist(record, question_id)
        && get_latest_amendment_iteration_index(record).is_some();

    if amends_open_iteration {
        update_amendment(record, question_id, answer, user, now);
    } else {
        let changed = match get_latest_question_answer(record, question_id) {
            None => true,
            Some(latest) => latest != answer,
        };
        if changed {
            add_amendment(
                record,
                question_id,
                question_set_id,
                Some(answer),
                None,
                user,
                false,
                now,
            );
        }
    }

    let counts = count_amendments(record, UserType::Applicant, true);
    record.unanswered_amendments = counts.unanswered_amendments;
    record.answered_amendments = counts.answered_amendments;
    record.dirty_schema = true;
    record
}

/// Put a requested amendment back to "awaiting answer".
pub fn revert_amendment_answer(record: &mut ApplicationRecord, question_id: &str, user: &User) {
    let application_id = record.id.clone();
    let Some(entry) = open_iteration_mut(record)
        .and_then(|iteration| iteration.question_answers.get_mut(question_id))
        .filter(|entry| entry.is_answered())
    else {
        debug!(%application_id, question_id, "nothing to revert");
        return;
    };
    entry.clear_answer();
    debug!(%application_id, question_id, user = %user.id.0, "amendment answer reverted");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmendmentCounts {
    pub unanswered_amendments: u32,
    pub answered_amendments: u32,
}

pub fn count_amendments(
    record: &ApplicationRecord,
    user_type: UserType,
    is_latest_version: bool,
) -> AmendmentCounts {
    if !is_latest_version {
        return AmendmentCounts::default();
    }
    let Some(iteration) = get_current_amendment_iteration(&record.amendment_iterations) else {
        return AmendmentCounts::default();
    };
    if user_type == UserType::Applicant && !iteration.is_returned() {
        return AmendmentCounts::default();
    }

    iteration
        .question_answers
        .values()
        .fold(AmendmentCounts::default(), |mut counts, entry| {
            if entry.is_answered() {
                counts.answered_amendments += 1;
            } else {
                counts.unanswered_amendments += 1;
            }
            counts
        })
}

/// Close the open iteration as a resubmission.
pub fn do_resubmission<'a>(
    record: &'a mut ApplicationRecord,
    user_id: &UserId,
    now: DateTime<Utc>,
) -> &'a mut ApplicationRecord {
    let Some(index) = get_latest_amendment_iteration_index(record) else {
        return record;
    };
    record.application_type = ApplicationType::Resubmission;
    record.submit_amendment_iteration(index, user_id, now)
}

/// Custodian hands the open iteration to the applicant.
pub fn return_amendment_iteration(
    record: &mut ApplicationRecord,
    user: &User,
    now: DateTime<Utc>,
) -> Result<(), AmendmentError> {
    let iteration = open_iteration_mut(record)
        .filter(|iteration| !iteration.question_answers.is_empty())
        .ok_or(AmendmentError::NoAmendmentsRequested)?;
    if iteration.is_returned() {
        return Err(AmendmentError::AlreadyReturned);
    }
    iteration.date_returned = Some(now);
    iteration.returned_by = Some(user.id.clone());
    Ok(())
}
