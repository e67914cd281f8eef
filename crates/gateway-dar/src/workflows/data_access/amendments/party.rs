use serde::Serialize;

use crate::workflows::data_access::domain::{
    ActiveParty, AmendmentStatus, ApplicationRecord, ApplicationStatus, UserType,
};

/// Party expected to act next, either on the live application or on a specific iteration.
pub fn get_amendment_iteration_party(
    record: &ApplicationRecord,
    version_index: Option<usize>,
) -> Option<ActiveParty> {
    if let Some(index) = version_index {
        return get_amendment_iteration_party_by_version(record, index);
    }

    let returned_to_applicant = record
        .amendment_iterations
        .iter()
        .any(|iteration| !iteration.is_submitted() && iteration.is_returned());
    let in_progress = record.application_status == ApplicationStatus::InProgress;

    match (returned_to_applicant, in_progress) {
        (true, true) => Some(UserType::Applicant),
        (false, false) => Some(UserType::Custodian),
        _ => None,
    }
}

/// Only the final iteration has an active party; closed history has none.
pub fn get_amendment_iteration_party_by_version(
    record: &ApplicationRecord,
    version_index: usize,
) -> Option<ActiveParty> {
    let iterations = &record.amendment_iterations;
    if iterations.is_empty() || version_index + 1 != iterations.len() {
        return None;
    }
    let iteration = &iterations[version_index];
    if !iteration.is_submitted() && iteration.is_returned() {
        Some(UserType::Applicant)
    } else {
        Some(UserType::Custodian)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDetails {
    pub version_index: Option<usize>,
    pub active_party: Option<ActiveParty>,
    pub is_latest_minor_version: bool,
}

/// Resolve a 1-based minor version (`1.1` is the first amendment iteration) to an iteration
/// index. Without a minor version the latest state is assumed.
pub fn get_amendment_iteration_details_by_version(
    record: &ApplicationRecord,
    minor_version: Option<usize>,
) -> VersionDetails {
    let iterations = &record.amendment_iterations;
    let version_index = minor_version.and_then(|minor| minor.checked_sub(1));
    let active_party = get_amendment_iteration_party(record, version_index);

    let is_latest_minor_version = match (minor_version, version_index) {
        (None, _) => true,
        (Some(_), Some(index)) => index + 1 == iterations.len(),
        (Some(_), None) => iterations.is_empty(),
    };

    VersionDetails {
        version_index,
        active_party,
        is_latest_minor_version,
    }
}

/// Status label for the current amendment round, `None` when there has never been a round or
/// the application has been decided.
pub fn calculate_amendment_status(
    record: &ApplicationRecord,
    user_type: UserType,
) -> Option<AmendmentStatus> {
    let last = record.amendment_iterations.last()?;
    if record.application_status.is_decided() {
        return None;
    }

    match (last.is_submitted(), last.is_returned(), user_type) {
        (true, _, UserType::Applicant) => Some(AmendmentStatus::UpdatesSubmitted),
        (true, _, UserType::Custodian) => Some(AmendmentStatus::UpdatesReceived),
        (false, true, UserType::Applicant) => Some(AmendmentStatus::UpdatesRequested),
        (false, true, UserType::Custodian) => Some(AmendmentStatus::AwaitingUpdates),
        (false, false, _) => None,
    }
}
