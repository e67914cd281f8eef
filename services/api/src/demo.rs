use crate::infra::{
    demo_applicant, demo_custodian, seeded_repository, LoggingNotificationDispatcher,
    DEMO_APPLICATION_ID,
};
use chrono::{Duration, Utc};
use clap::Args;
use gateway_dar::config::NotificationConfig;
use gateway_dar::error::AppError;
use gateway_dar::workflows::data_access::{
    Actor, AmendmentMode, AmendmentService, AmendmentServiceError, AmendmentSummary,
    AnswerUpdate, ApplicationId, ApplicationView, SetAmendmentRequest, UserType,
};
use serde_json::json;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Stop once the application has been returned to the applicant.
    #[arg(long)]
    pub(crate) skip_resubmit: bool,
    /// Print the final custodian view as JSON.
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        skip_resubmit,
        json: print_json,
    } = args;

    let repository = seeded_repository(Utc::now() - Duration::days(7))
        .map_err(|err| AppError::Amendment(err.into()))?;
    let notifications = Arc::new(LoggingNotificationDispatcher::default());
    let service = AmendmentService::new(
        Arc::new(repository),
        notifications.clone(),
        NotificationConfig::default(),
    );

    let id = ApplicationId(DEMO_APPLICATION_ID.to_string());
    let custodian = Actor {
        user: demo_custodian(),
        user_type: UserType::Custodian,
    };
    let applicant = Actor {
        user: demo_applicant(),
        user_type: UserType::Applicant,
    };

    println!("Data access request amendment demo ({id})");

    for (question_id, question_set_id, reason) in [
        ("orcid", "applicant", "The ORCID does not match the applicant record"),
        ("lawfulBasis", "project", "Explain why public task applies"),
    ] {
        let summary = service.set_amendment(
            &id,
            &custodian,
            SetAmendmentRequest {
                question_id: question_id.to_string(),
                question_set_id: question_set_id.to_string(),
                mode: AmendmentMode::Add,
                reason: Some(reason.to_string()),
            },
        )?;
        print_summary(&format!("Custodian requested an update to {question_id}"), &summary);
    }

    let summary = service.return_to_applicant(&id, &custodian)?;
    print_summary("Custodian returned the application", &summary);
    for email in notifications.outbox() {
        println!(
            "  e-mail to {} recipient(s) from {}: {}",
            email.recipients.len(),
            email.from,
            email.subject
        );
    }

    let view = service.view(&id, &applicant, None)?;
    print_flags("Applicant sees", &view);

    let summary = service.update_answer(
        &id,
        &applicant,
        AnswerUpdate {
            question_id: "orcid".to_string(),
            question_set_id: "applicant".to_string(),
            answer: json!("0000-0001-5109-3700"),
        },
    )?;
    print_summary("Applicant answered orcid", &summary);

    if skip_resubmit {
        return Ok(());
    }

    match service.resubmit(&id, &applicant) {
        Ok(summary) => print_summary("Applicant resubmitted", &summary),
        Err(AmendmentServiceError::InvalidState(reason)) => {
            println!("Resubmission refused: {reason}");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    }

    let view = service.view(&id, &custodian, None)?;
    print_flags("Custodian sees", &view);
    if print_json {
        match serde_json::to_string_pretty(&view) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => println!("failed to render view: {err}"),
        }
    }

    Ok(())
}

fn print_summary(step: &str, summary: &AmendmentSummary) {
    let status = if summary.amendment_status.is_empty() {
        "-"
    } else {
        summary.amendment_status.as_str()
    };
    println!(
        "- {step}: {} | {status} | {} unanswered, {} answered",
        summary.application_status.label(),
        summary.counts.unanswered_amendments,
        summary.counts.answered_amendments
    );
}

fn print_flags(heading: &str, view: &ApplicationView) {
    println!("{heading} ({}):", view.amendment_status);
    for page in &view.application.json_schema.pages {
        let flag = page
            .flag
            .map(|flag| format!("{flag:?}"))
            .unwrap_or_else(|| "-".to_string());
        println!("  {} [{flag}]", page.title);
    }
    for set in &view.application.json_schema.question_sets {
        for question in &set.questions {
            if let Some(amendment) = &question.amendment {
                println!("    {}: {}", question.question_id, amendment.text);
            }
        }
    }
}
