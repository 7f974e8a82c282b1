//! Visibility checker for Formstr forms
//!
//! Reads a form template's tags and a set of answers, then reports which
//! questions a respondent would currently see.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use formstr_core::{
    questions_from_tags, AnswerMap, ConditionValidator, ErrorPolicy, Question, VisibilityConfig,
    VisibilityFilter,
};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Form file: a JSON array of tags, or an object with a `tags` array
    #[arg(short, long)]
    form: PathBuf,

    /// Answers file: a JSON object keyed by question id
    #[arg(short, long)]
    answers: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Visibility of questions whose conditions cannot be evaluated
    /// (defaults to FORMSTR_CONDITIONS_ERROR_POLICY, then "show")
    #[arg(short, long, value_enum)]
    policy: Option<PolicyArg>,

    /// Also check condition trees for builder errors
    #[arg(long)]
    validate: bool,

    /// Log evaluation details
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human readable listing
    Text,
    /// Machine readable report
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Show questions whose conditions are broken
    Show,
    /// Hide questions whose conditions are broken
    Hide,
}

impl From<PolicyArg> for ErrorPolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Show => ErrorPolicy::ShowQuestion,
            PolicyArg::Hide => ErrorPolicy::HideQuestion,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuestionSummary {
    id: String,
    label: String,
    kind: String,
}

impl From<&Question> for QuestionSummary {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id().to_string(),
            label: question.label().to_string(),
            kind: question.kind().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    visible: Vec<QuestionSummary>,
    hidden: Vec<String>,
    missing_required: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    problems: Option<Vec<String>>,
}

fn load_form(path: &Path) -> Result<Vec<Question>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read form file {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Form file {} is not valid JSON", path.display()))?;

    let tags = match value {
        Value::Array(_) => value,
        Value::Object(mut object) => match object.remove("tags") {
            Some(tags) => tags,
            None => bail!("Form object in {} has no `tags` array", path.display()),
        },
        _ => bail!("Form file {} must hold an array of tags", path.display()),
    };
    let tags: Vec<Vec<String>> =
        serde_json::from_value(tags).context("Form tags must be arrays of strings")?;

    let questions = questions_from_tags(&tags);
    tracing::debug!("Loaded {} questions from {}", questions.len(), path.display());
    Ok(questions)
}

fn load_answers(path: Option<&Path>) -> Result<AnswerMap> {
    let Some(path) = path else {
        return Ok(AnswerMap::new());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read answers file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Answers file {} is not a JSON object of answers", path.display()))
}

fn find_problems(questions: &[Question], config: &VisibilityConfig) -> Vec<String> {
    let validator = ConditionValidator::with_config(config);
    let problems: Vec<String> = questions
        .iter()
        .filter_map(|q| {
            validator
                .validate_question(q, questions)
                .err()
                .map(|e| format!("{}: {}", q.id(), e))
        })
        .collect();

    if !problems.is_empty() {
        return problems;
    }
    match validator.validate_form(questions) {
        Ok(()) => Vec::new(),
        Err(e) => vec![e.to_string()],
    }
}

fn build_report(questions: &[Question], answers: &AnswerMap, config: VisibilityConfig, validate: bool) -> Report {
    let problems = validate.then(|| find_problems(questions, &config));
    let filter = VisibilityFilter::with_config(questions, config);

    let mut visible = Vec::new();
    let mut hidden = Vec::new();
    for question in questions {
        if filter.is_visible(question, answers) {
            visible.push(QuestionSummary::from(question));
        } else {
            hidden.push(question.id().to_string());
        }
    }
    let missing_required = filter
        .missing_required(answers)
        .into_iter()
        .map(|q| q.id().to_string())
        .collect();

    Report {
        visible,
        hidden,
        missing_required,
        problems,
    }
}

fn render_text(report: &Report) -> String {
    let mut out = String::new();
    out.push_str(&format!("Visible questions ({}):\n", report.visible.len()));
    for question in &report.visible {
        out.push_str(&format!("  {} [{}] {}\n", question.id, question.kind, question.label));
    }
    if !report.hidden.is_empty() {
        out.push_str(&format!("Hidden: {}\n", report.hidden.join(", ")));
    }
    if !report.missing_required.is_empty() {
        out.push_str(&format!(
            "Missing required answers: {}\n",
            report.missing_required.join(", ")
        ));
    }
    if let Some(problems) = &report.problems {
        if problems.is_empty() {
            out.push_str("Conditions: ok\n");
        } else {
            out.push_str("Condition problems:\n");
            for problem in problems {
                out.push_str(&format!("  {}\n", problem));
            }
        }
    }
    out
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Ignoring .env file: {}", e),
    }

    let mut config = VisibilityConfig::from_env();
    if let Some(policy) = cli.policy {
        config = config.with_error_policy(policy.into());
    }

    let questions = load_form(&cli.form)?;
    let answers = load_answers(cli.answers.as_deref())?;
    let report = build_report(&questions, &answers, config, cli.validate);

    match cli.format {
        OutputFormat::Text => print!("{}", render_text(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    let has_problems = report.problems.as_ref().is_some_and(|p| !p.is_empty());
    Ok(if has_problems {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_json(value: &Value) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", value).unwrap();
        file
    }

    fn form() -> Value {
        serde_json::json!([
            ["d", "rsvp"],
            ["field", "attend", "option", "Attending?", "[[\"yes\",\"Yes\"],[\"no\",\"No\"]]",
                "{\"renderElement\":\"radioButton\",\"required\":true}"],
            ["field", "guests", "number", "Guests", "[]",
                "{\"renderElement\":\"number\",\"required\":true,\"conditions\":{\"rules\":[{\"questionId\":\"attend\",\"value\":\"yes\"}]}}"]
        ])
    }

    #[test]
    fn test_load_form_from_array_and_object() {
        let array = write_json(&form());
        assert_eq!(load_form(array.path()).unwrap().len(), 2);

        let object = write_json(&serde_json::json!({"kind": 30168, "tags": form()}));
        let questions = load_form(object.path()).unwrap();
        assert_eq!(questions[1].id(), "guests");
    }

    #[test]
    fn test_load_form_rejects_bad_input() {
        let scalar = write_json(&serde_json::json!(42));
        assert!(load_form(scalar.path()).is_err());

        let no_tags = write_json(&serde_json::json!({"content": ""}));
        assert!(load_form(no_tags.path()).is_err());

        assert!(load_form(Path::new("/nonexistent/form.json")).is_err());
    }

    #[test]
    fn test_report() {
        let form = write_json(&form());
        let answers = write_json(&serde_json::json!({"attend": "yes"}));
        let questions = load_form(form.path()).unwrap();
        let answers = load_answers(Some(answers.path())).unwrap();

        let report = build_report(&questions, &answers, VisibilityConfig::default(), true);
        let ids: Vec<&str> = report.visible.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["attend", "guests"]);
        assert_eq!(report.missing_required, vec!["guests"]);
        assert_eq!(report.problems, Some(Vec::new()));

        let text = render_text(&report);
        assert!(text.contains("guests [number] Guests"));
        assert!(text.contains("Conditions: ok"));
    }

    #[test]
    fn test_null_and_numeric_answers() {
        let form = write_json(&form());
        let answers = write_json(&serde_json::json!({"attend": "yes", "guests": 2, "notes": null}));
        let questions = load_form(form.path()).unwrap();
        let answers = load_answers(Some(answers.path())).unwrap();

        assert_eq!(answers.get("guests").map(|a| a.to_text()), Some("2".to_string()));
        assert!(!answers.is_answered("notes"));

        let report = build_report(&questions, &answers, VisibilityConfig::default(), false);
        assert!(report.missing_required.is_empty());
        assert!(report.hidden.is_empty());

        let answers = write_json(&serde_json::json!({"attend": null}));
        let answers = load_answers(Some(answers.path())).unwrap();
        let report = build_report(&questions, &answers, VisibilityConfig::default(), false);
        assert_eq!(report.hidden, vec!["guests"]);
    }

    #[test]
    fn test_report_without_answers() {
        let form = write_json(&form());
        let questions = load_form(form.path()).unwrap();
        let answers = load_answers(None).unwrap();

        let report = build_report(&questions, &answers, VisibilityConfig::default(), false);
        assert_eq!(report.hidden, vec!["guests"]);
        assert_eq!(report.missing_required, vec!["attend"]);
        assert!(report.problems.is_none());

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("problems").is_none());
        assert_eq!(json["missingRequired"], serde_json::json!(["attend"]));
    }

    #[test]
    fn test_policy_for_broken_conditions() {
        let broken = serde_json::json!([
            ["field", "q1", "text", "Broken", "[]", "{\"conditions\":\"yes\"}"]
        ]);
        let form = write_json(&broken);
        let questions = load_form(form.path()).unwrap();

        let shown = build_report(&questions, &AnswerMap::new(), VisibilityConfig::default(), true);
        assert_eq!(shown.visible.len(), 1);
        assert_eq!(shown.problems.as_ref().map(Vec::len), Some(1));

        let config = VisibilityConfig::default().with_error_policy(PolicyArg::Hide.into());
        let hidden = build_report(&questions, &AnswerMap::new(), config, false);
        assert_eq!(hidden.hidden, vec!["q1"]);
    }
}
