use crate::infra::{parse_override, ReplayCollaborator, ScoreOverride};
use chrono::Utc;
use clap::Args;
use disaster_triage::config::AppConfig;
use disaster_triage::error::AppError;
use disaster_triage::workflows::triage::export::write_csv_to_path;
use disaster_triage::workflows::triage::{
    AssessmentRecord, AssessmentSession, ResearchRequest, Rubric, SessionId, SessionView,
};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// Saved collaborator output: raw text, or a JSON envelope with `text` and `grounding_urls`
    #[arg(long)]
    pub(crate) response: PathBuf,
    /// Query the response answers (shown in the report and CSV)
    #[arg(long)]
    pub(crate) query: Option<String>,
    /// Extra target source domain; may be repeated
    #[arg(long = "source")]
    pub(crate) sources: Vec<String>,
    /// Analyst override as `<indicator>=<score>`; may be repeated
    #[arg(long = "override", value_parser = parse_override)]
    pub(crate) overrides: Vec<ScoreOverride>,
    /// Write the assessment as CSV to this path
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
    /// Print the session view as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_assessment(args: AssessArgs) -> Result<(), AppError> {
    let AssessArgs {
        response,
        query,
        sources,
        overrides,
        csv,
        json,
    } = args;

    let config = AppConfig::load()?;
    let rubric = Rubric::standard();
    let collaborator = ReplayCollaborator::from_path(&response)?;

    let query = query.unwrap_or_else(|| response.display().to_string());
    let request = sources.iter().fold(
        ResearchRequest::new(query).with_target_sources(config.research.target_sources),
        |request, domain| request.with_custom_source(domain),
    );

    let mut session = AssessmentSession::new(SessionId("cli-assessment".to_string()));
    session.run_research(&collaborator, &request, &rubric)?;
    for ScoreOverride { indicator, score } in &overrides {
        session.override_score(&rubric, indicator, *score)?;
    }

    let view = session.view(&rubric);
    if json {
        println!("{}", render_json(&view)?);
    } else {
        render_view(&view);
    }

    if let Some(path) = csv {
        let record = AssessmentRecord::from_session(&session, &rubric, Utc::now())?;
        write_csv_to_path(&record, &path)?;
        println!("\nCSV written to {}", path.display());
    }

    Ok(())
}

fn render_json(view: &SessionView) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(view)?)
}

fn render_view(view: &SessionView) {
    if let Some(summary) = &view.summary {
        println!("{} ({})", summary.title, summary.country);
        println!("Reported: {}", summary.date);
        println!("{}", summary.description);
    }

    println!("\nKey figures");
    for figure in &view.key_figures {
        let link = figure.url.as_deref().unwrap_or("-");
        println!(
            "- {}: {} ({} | {} | {})",
            figure.label, figure.value, figure.date, figure.source, link
        );
    }

    println!("\nIndicators");
    for indicator in &view.indicators {
        let marker = if indicator.defaulted { " [default]" } else { "" };
        println!(
            "- {} = {}{} | {}",
            indicator.indicator, indicator.score, marker, indicator.extracted_value
        );
        println!("    {}", indicator.justification);
    }

    if !view.unmatched_keys.is_empty() {
        println!("\nIgnored keys: {}", view.unmatched_keys.join(", "));
    }

    if let Some(result) = &view.result {
        println!(
            "\nSeverity {:.2} / 5 (INFORM {:.2}) -> Category {} ({})",
            result.severity_index,
            result.inform_equivalent,
            result.category.code(),
            result.category_label
        );
        println!("Action: {}", result.recommended_action);
        for dimension in &result.dimensions {
            println!("  - {}: {:.2}", dimension.label, dimension.weighted_score);
        }
    }

    if !view.sources.is_empty() {
        println!("\nSources");
        for source in &view.sources {
            println!("- {source}");
        }
    }
}

pub(crate) fn print_rubric() {
    let rubric = Rubric::standard();
    println!(
        "Severity rubric {} ({} equally weighted dimensions)",
        rubric.version(),
        rubric.dimension_count()
    );
    for dimension in rubric.dimensions() {
        println!("\n{}. {}", dimension.kind.ordinal(), dimension.label);
        for indicator in &dimension.indicators {
            println!("- {} [{:.2}]", indicator.id, indicator.weight);
            println!("    {}", indicator.rubric);
        }
    }
}
