use colored::Colorize;
use parking_lot::Mutex;

use crate::analysis::{match_score, AnalysisSnapshot, RunState};

/// Prints a progress line whenever the percentage or message changes
#[derive(Debug, Default)]
pub struct ProgressPrinter {
    last: Mutex<Option<(u8, String)>>,
}

impl ProgressPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, snapshot: &AnalysisSnapshot) {
        if let Some(line) = self.next_line(snapshot) {
            eprintln!("{}", line);
        }
    }

    fn next_line(&self, snapshot: &AnalysisSnapshot) -> Option<String> {
        let key = (snapshot.progress.percent, snapshot.progress.message.clone());
        let mut last = self.last.lock();
        if last.as_ref() == Some(&key) {
            return None;
        }
        *last = Some(key);
        Some(format_progress(snapshot))
    }
}

/// One-line progress summary
pub fn format_progress(snapshot: &AnalysisSnapshot) -> String {
    let progress = format!("[{:>3}%]", snapshot.progress.percent);
    let step = format!("{}/2", snapshot.progress.step);
    let mut line = format!("{} {} {}", progress.cyan(), step.dimmed(), snapshot.progress.message);
    if snapshot.state == RunState::Phase1Streaming && !snapshot.progress.keywords.is_empty() {
        line.push_str(&format!(" [{}]", snapshot.progress.keywords.join(", ")));
    }
    line
}

/// Final result as human-readable text
pub fn format_results(snapshot: &AnalysisSnapshot) -> String {
    let mut output = String::new();

    if let Some(error) = &snapshot.error {
        output.push_str(&format!("{} {}\n", "Error:".red().bold(), error));
        output.push_str("Run again to retry.\n");
        return output;
    }

    if snapshot.from_cache {
        output.push_str(&format!("{}\n", "(cached result)".dimmed()));
    }

    if let Some(analysis) = &snapshot.analysis {
        output.push_str(&format!("{}\n", "1. AI-based User Analysis".bold()));
        output.push_str(&format!("   {}\n", analysis.analysis_text));
    }
    if let Some(full_response) = snapshot.full_response.as_deref().filter(|r| !r.is_empty()) {
        for line in full_response.lines() {
            output.push_str(&format!("   {}\n", line.dimmed()));
        }
    }

    output.push_str(&format!(
        "\n{}\n",
        "2. Similarity Search for Personalized Performances".bold()
    ));
    for item in &snapshot.recommendations {
        output.push_str(&format!(
            "  {:>2}. {} - {} [{}] {}\n",
            item.rank,
            item.title.bold(),
            item.artist,
            item.genre,
            format!("{}% match", match_score(item.similarity_score)).green()
        ));
    }

    output
}

/// Final result as JSON
pub fn format_json(snapshot: &AnalysisSnapshot) -> String {
    serde_json::to_string_pretty(snapshot)
        .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize result: {}\"}}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisResults, RecommendationItem};

    fn completed() -> AnalysisSnapshot {
        let item = RecommendationItem {
            id: Some(1),
            title: "BARCODE".to_string(),
            artist: "Company B".to_string(),
            genre: "dance".to_string(),
            duration: None,
            similarity_score: 0.876,
            rank: 1,
            extra: Default::default(),
        };
        AnalysisSnapshot::from_cache(
            vec![item],
            Some(AnalysisResults::complete(vec!["dance".into()])),
            "Prefers movement.".into(),
        )
    }

    #[test]
    fn test_results_text() {
        colored::control::set_override(false);
        let text = format_results(&completed());
        assert!(text.contains("(cached result)"));
        assert!(text.contains("Preference analysis complete: dance"));
        assert!(text.contains(" 1. BARCODE - Company B [dance] 88% match"));
    }

    #[test]
    fn test_results_error() {
        colored::control::set_override(false);
        let mut snapshot = AnalysisSnapshot::default();
        snapshot.state = RunState::Failed;
        snapshot.error = Some("Analysis timed out".into());
        let text = format_results(&snapshot);
        assert!(text.starts_with("Error: Analysis timed out"));
    }

    #[test]
    fn test_progress_printer_dedups() {
        let printer = ProgressPrinter::new();
        let snapshot = completed();
        assert!(printer.next_line(&snapshot).is_some());
        assert!(printer.next_line(&snapshot).is_none());

        let mut changed = snapshot.clone();
        changed.progress.message = "other".into();
        assert!(printer.next_line(&changed).is_some());
    }

    #[test]
    fn test_json_output() {
        let json: serde_json::Value = serde_json::from_str(&format_json(&completed())).unwrap();
        assert_eq!(json["state"], "completed");
        assert_eq!(json["recommendations"][0]["rank"], 1);
    }
}
