//! Plain-text rendering of run results.

use std::fmt::Write;

use council_core::{
    short_name, ItemStatus, Metric, ModelResponse, RevealedEvaluation, ScoreboardEntry,
};
use council_pipeline::PipelineRun;
use serde_json::{json, Value};

/// Stage 1 answers, one block per member.
pub fn responses(responses: &[ModelResponse]) -> String {
    let mut out = String::new();
    for response in responses {
        let _ = writeln!(out, "── {} ──", short_name(&response.model));
        match response.status() {
            ItemStatus::Failed(err) => {
                let _ = writeln!(out, "[error] {err}");
            }
            ItemStatus::Answered(text) if !text.trim().is_empty() => {
                let _ = writeln!(out, "{}", text.trim_end());
            }
            ItemStatus::Answered(_) | ItemStatus::Empty => {
                let _ = writeln!(out, "[no response]");
            }
        }
        out.push('\n');
    }
    out
}

/// Stage 2 evaluations with identities restored.
pub fn evaluations(evaluations: &[RevealedEvaluation]) -> String {
    let mut out = String::new();
    for eval in evaluations {
        let _ = writeln!(out, "── {} evaluates ──", eval.evaluator_short());
        if let Some(err) = &eval.error {
            let _ = writeln!(out, "[error] {err}");
        }
        for (target, card) in &eval.cards {
            let scores: Vec<String> = Metric::ALL
                .iter()
                .filter_map(|m| card.get(m.as_str()).map(|s| format!("{} {}", m.title(), s.score)))
                .collect();
            let _ = writeln!(out, "  {target}: {}", scores.join(", "));
        }
        if !eval.raw_response.trim().is_empty() {
            let _ = writeln!(out, "{}", eval.raw_response.trim_end());
        }
        out.push('\n');
    }
    out
}

/// The final scoreboard as an aligned table, best first.
pub fn scoreboard(rows: &[ScoreboardEntry]) -> String {
    let width = rows
        .iter()
        .map(|r| short_name(&r.model).chars().count())
        .max()
        .unwrap_or(0)
        .max("Model".len());

    let mut out = String::new();
    let _ = write!(out, "{:<4} {:<width$} {:>7}", "Rank", "Model", "Average");
    for metric in Metric::ALL {
        let _ = write!(out, " {:>13}", metric.title());
    }
    out.push('\n');

    for (rank, row) in rows.iter().enumerate() {
        let _ = write!(
            out,
            "{:<4} {:<width$} {:>7.1}",
            rank + 1,
            short_name(&row.model),
            row.average_score
        );
        for metric in Metric::ALL {
            let _ = write!(out, " {:>13.1}", row.scores.get(metric));
        }
        out.push('\n');
    }
    out
}

/// Machine-readable form of a finished or partial run.
pub fn run_json(run: &PipelineRun) -> Value {
    json!({
        "question": run.query().map(|q| q.as_str()),
        "state": run.state().to_string(),
        "stage1": run.stage1(),
        "label_to_model": run.labels(),
        "stage2": run.stage2(),
        "stage3": run.scoreboard(),
        "error": run.error().map(ToString::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_core::MetricScores;

    #[test]
    fn test_responses_marks_errors() {
        let out = responses(&[
            ModelResponse::answered("org/alpha", "Yes.\n"),
            ModelResponse::failed("org/beta", "rate limited"),
        ]);
        assert!(out.contains("── alpha ──\nYes.\n"));
        assert!(out.contains("── beta ──\n[error] rate limited"));
    }

    #[test]
    fn test_responses_blank_error_is_not_a_failure() {
        let answered = ModelResponse {
            model: "org/alpha".to_string(),
            response: Some("Yes.".to_string()),
            error: Some(String::new()),
        };
        let silent = ModelResponse {
            model: "org/beta".to_string(),
            response: None,
            error: Some(String::new()),
        };
        let out = responses(&[answered, silent]);
        assert!(!out.contains("[error]"));
        assert!(out.contains("── alpha ──\nYes.\n"));
        assert!(out.contains("── beta ──\n[no response]"));
    }

    #[test]
    fn test_scoreboard_table() {
        let rows = vec![ScoreboardEntry {
            model: "openai/gpt-4o".to_string(),
            average_score: 0.25,
            scores: MetricScores {
                bias: 1.0,
                ..MetricScores::default()
            },
        }];
        let table = scoreboard(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Rank Model "));
        assert!(lines[1].starts_with("1    gpt-4o "));
        assert!(lines[1].contains("    1.0"));
    }

    #[test]
    fn test_run_json_of_idle_run() {
        let value = run_json(&PipelineRun::idle());
        assert_eq!(value["state"], "idle");
        assert!(value["stage1"].is_null());
        assert!(value["error"].is_null());
    }
}
