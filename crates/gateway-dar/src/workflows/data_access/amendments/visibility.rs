use crate::workflows::data_access::domain::{AmendmentIteration, ApplicationRecord, UserType};

/// Iterations the given party may see, optionally cut off after `last_iteration_index`.
///
/// Applicants only see iterations that were handed to them. Custodians see every iteration but
/// never the answers of one the applicant has not yet submitted.
pub fn filter_amendments(
    record: &ApplicationRecord,
    user_type: UserType,
    last_iteration_index: Option<usize>,
) -> Vec<AmendmentIteration> {
    let iterations = &record.amendment_iterations;
    let visible = match last_iteration_index {
        Some(last) => &iterations[..last.saturating_add(1).min(iterations.len())],
        None => &iterations[..],
    };

    match user_type {
        UserType::Applicant => visible
            .iter()
            .filter(|iteration| iteration.is_returned())
            .cloned()
            .collect(),
        UserType::Custodian => visible
            .iter()
            .map(|iteration| {
                if iteration.is_submitted() {
                    iteration.clone()
                } else {
                    remove_iteration_answers(iteration)
                }
            })
            .collect(),
    }
}

/// Copy of `iteration` keeping amendment metadata but none of the applicant's draft answers.
pub fn remove_iteration_answers(iteration: &AmendmentIteration) -> AmendmentIteration {
    let mut redacted = iteration.clone();
    for entry in redacted.question_answers.values_mut() {
        entry.clear_answer();
    }
    redacted
}
