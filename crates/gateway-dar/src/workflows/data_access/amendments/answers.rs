use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::iterations::get_latest_amendment_iteration_index;
use crate::workflows::data_access::domain::{AmendmentIteration, ApplicationRecord};

#[derive(Debug, Clone)]
struct DatedAnswer {
    answer: Option<Value>,
    date_updated: Option<DateTime<Utc>>,
}

impl DatedAnswer {
    /// Undated entries never replace one already seen.
    fn supersedes(&self, current: &DatedAnswer) -> bool {
        match (self.date_updated, current.date_updated) {
            (Some(candidate), Some(existing)) => candidate > existing,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

fn fold_latest(latest: &mut BTreeMap<String, DatedAnswer>, question_id: &str, next: DatedAnswer) {
    match latest.get_mut(question_id) {
        Some(current) => {
            if next.supersedes(current) {
                *current = next;
            }
        }
        None => {
            latest.insert(question_id.to_string(), next);
        }
    }
}

/// Most recent answer to `question_id` across the original submission and every closed
/// amendment iteration. The open iteration holds live edits and is not consulted.
pub fn get_latest_question_answer(record: &ApplicationRecord, question_id: &str) -> Option<Value> {
    let open = get_latest_amendment_iteration_index(record);
    let mut latest = BTreeMap::new();

    if let Some(answer) = record.question_answers.get(question_id) {
        fold_latest(
            &mut latest,
            question_id,
            DatedAnswer {
                answer: Some(answer.clone()),
                date_updated: record.date_submitted,
            },
        );
    }

    for (index, iteration) in record.amendment_iterations.iter().enumerate() {
        if Some(index) == open {
            continue;
        }
        if let Some(entry) = iteration.question_answers.get(question_id) {
            fold_latest(
                &mut latest,
                question_id,
                DatedAnswer {
                    answer: entry.answer.clone(),
                    date_updated: entry.date_updated,
                },
            );
        }
    }

    latest.remove(question_id).and_then(|dated| dated.answer)
}

/// Overlay the most recently dated amendment answer per question onto the baseline answers.
pub fn format_question_answers(
    question_answers: &BTreeMap<String, Value>,
    amendment_iterations: &[AmendmentIteration],
) -> BTreeMap<String, Value> {
    let mut latest = BTreeMap::new();
    for iteration in amendment_iterations {
        for (question_id, entry) in &iteration.question_answers {
            fold_latest(
                &mut latest,
                question_id,
                DatedAnswer {
                    answer: entry.answer.clone(),
                    date_updated: entry.date_updated,
                },
            );
        }
    }

    let mut merged = question_answers.clone();
    for (question_id, dated) in latest {
        if let Some(answer) = dated.answer.filter(|answer| !answer.is_null()) {
            merged.insert(question_id, answer);
        }
    }
    merged
}
