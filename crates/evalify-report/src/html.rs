//! Standalone HTML report over stored evaluation results.
//!
//! Styles, the distribution chart and the sort script are all inline, so the
//! file can be mailed or opened without a server.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;

use evalify_core::model::{EvaluationResult, ExamLayout};
use evalify_core::statistics::{summarize, ScoreBucket};

use crate::csv::DATE_FORMAT;

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Generate an HTML report from stored results.
pub fn generate_html(results: &[EvaluationResult], layout: &ExamLayout) -> String {
    let summary = summarize(results, layout);
    let n = layout.question_count;
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str("<title>evalify results</title>\n");
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str("<h1>evalify results</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">{} evaluations | {} questions | {} subjects | generated {}</p>\n",
        summary.evaluation_count,
        n,
        layout.subjects.len(),
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    // Summary dashboard
    html.push_str("<section id=\"summary\">\n");
    html.push_str("<h2>Summary</h2>\n");
    html.push_str(&format!(
        "<p>Average score: <strong>{:.1}/{}</strong></p>\n",
        summary.average_score, n
    ));

    html.push_str("<table>\n");
    html.push_str("<thead><tr><th>Subject</th><th>Questions</th><th>Average</th><th>Performance</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for subject in &summary.subjects {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{:.1}</td><td class=\"{}\">{:.1}%</td></tr>\n",
            html_escape(&subject.subject),
            subject.total_questions,
            subject.average_score,
            grade_class(subject.performance_pct / 100.0),
            subject.performance_pct,
        ));
    }
    html.push_str("</tbody></table>\n");

    if summary.evaluation_count > 0 {
        html.push_str("<h3>Score distribution</h3>\n");
        html.push_str(&generate_bar_chart(&summary.distribution));
    }

    html.push_str("</section>\n");

    // Per-sheet results
    html.push_str("<section>\n");
    html.push_str("<h2>Results</h2>\n");
    html.push_str("<table id=\"results\">\n");
    html.push_str("<thead><tr><th onclick=\"sortTable(0)\">Date</th><th onclick=\"sortTable(1)\">Name</th><th onclick=\"sortTable(2)\">File</th><th onclick=\"sortTable(3)\">Answer Key</th>");
    for (i, subject) in layout.subjects.iter().enumerate() {
        html.push_str(&format!(
            "<th onclick=\"sortTable({})\">{}</th>",
            i + 4,
            html_escape(&subject.name)
        ));
    }
    html.push_str(&format!(
        "<th onclick=\"sortTable({})\">Total</th></tr></thead>\n",
        layout.subjects.len() + 4
    ));
    html.push_str("<tbody>\n");

    for r in results {
        let fraction = if n == 0 {
            0.0
        } else {
            r.total_score as f64 / n as f64
        };
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td>",
            r.evaluation_date.format(DATE_FORMAT),
            html_escape(r.evaluation_name.as_deref().unwrap_or("")),
            html_escape(&r.image_file_name),
            html_escape(&r.answer_key_name),
        ));
        for subject in &layout.subjects {
            let cell = r
                .subject_scores
                .get(&subject.name)
                .map(|s| format!("{}/{}", s.score, s.total))
                .unwrap_or_else(|| "N/A".to_string());
            html.push_str(&format!("<td class=\"score\">{cell}</td>"));
        }
        html.push_str(&format!(
            "<td class=\"score {}\">{}/{}</td></tr>\n",
            grade_class(fraction),
            r.total_score,
            n
        ));
    }

    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    // Raw JSON
    html.push_str("<section>\n");
    html.push_str("<details>\n<summary>Stored results (JSON)</summary>\n<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(results).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n</details>\n</section>\n");

    // JavaScript for sorting
    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(
    results: &[EvaluationResult],
    layout: &ExamLayout,
    path: &Path,
) -> Result<()> {
    let html = generate_html(results, layout);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, html).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn grade_class(fraction: f64) -> &'static str {
    if fraction >= 0.8 {
        "high"
    } else if fraction >= 0.5 {
        "mid"
    } else {
        "low"
    }
}

fn generate_bar_chart(buckets: &[ScoreBucket]) -> String {
    let bar_height = 24;
    let max_width = 400;
    let padding = 8;
    let label_width = 90;

    let max_count = buckets.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    let total_height = buckets.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, bucket) in buckets.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let width = bucket.count * max_width / max_count;

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"13\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(&bucket.label)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"#6366f1\" rx=\"4\"/>\n",
            label_width, y, width, bar_height
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{}</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            bucket.count
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --paper: #fafaf9; --ink: #1c1917; --rule: #d6d3d1; --head: #f5f5f4; --high: #d1fae5; --mid: #fef3c7; --low: #fee2e2; }
@media (prefers-color-scheme: dark) {
  :root { --paper: #1c1917; --ink: #f5f5f4; --rule: #44403c; --head: #292524; --high: #065f46; --mid: #78350f; --low: #7f1d1d; }
}
body { font: 15px/1.5 system-ui, sans-serif; max-width: 72rem; margin: 0 auto; padding: 1.5rem; background: var(--paper); color: var(--ink); }
section { margin-top: 2.5rem; }
.meta { opacity: 0.7; }
table { border-collapse: collapse; width: 100%; }
th, td { border-bottom: 1px solid var(--rule); padding: 0.4rem 0.75rem; text-align: left; }
thead th { background: var(--head); }
#results thead th { cursor: pointer; user-select: none; }
td.score { text-align: right; font-variant-numeric: tabular-nums; }
.high { background: var(--high); }
.mid { background: var(--mid); }
.low { background: var(--low); }
pre { overflow-x: auto; padding: 0.75rem; background: var(--head); }
code { font: 0.8rem ui-monospace, monospace; }
summary { cursor: pointer; }
"#;

// Clicking a header twice flips the order; "9/100" sorts below "83/100".
const JS: &str = r#"
function sortTable(col) {
  const body = document.querySelector('#results tbody');
  const desc = body.dataset.col === String(col) && body.dataset.dir !== 'desc';
  const sorted = Array.from(body.rows).sort((x, y) =>
    x.cells[col].textContent.localeCompare(y.cells[col].textContent, undefined, { numeric: true }));
  if (desc) sorted.reverse();
  body.dataset.col = col;
  body.dataset.dir = desc ? 'desc' : 'asc';
  body.append(...sorted);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use evalify_core::model::{DetectedAnswers, SubjectRange, SubjectScoreEntry};
    use std::collections::BTreeMap;

    fn layout() -> ExamLayout {
        ExamLayout {
            question_count: 10,
            subjects: vec![
                SubjectRange {
                    name: "Math".into(),
                    start: 1,
                    end: 5,
                },
                SubjectRange {
                    name: "Science & Tech".into(),
                    start: 6,
                    end: 10,
                },
            ],
        }
    }

    fn make_result(file: &str, math: u32, science: u32) -> EvaluationResult {
        let mut subject_scores = BTreeMap::new();
        subject_scores.insert("Math".to_string(), SubjectScoreEntry { score: math, total: 5 });
        subject_scores.insert(
            "Science & Tech".to_string(),
            SubjectScoreEntry {
                score: science,
                total: 5,
            },
        );
        EvaluationResult {
            id: uuid::Uuid::nil(),
            evaluation_name: Some("Unit <1>".into()),
            image_file_name: file.into(),
            evaluation_date: Utc::now(),
            total_score: math + science,
            subject_scores,
            detected_answers: DetectedAnswers::new(),
            answer_key_name: "Set A".into(),
        }
    }

    #[test]
    fn html_report_contains_required_elements() {
        let html = generate_html(&[make_result("roll-17.png", 4, 3)], &layout());

        assert!(html.contains("<html"));
        assert!(html.contains("</html>"));
        assert!(html.contains("roll-17.png"));
        assert!(html.contains("7/10"));
        assert!(html.contains("Science &amp; Tech"));
        assert!(html.contains("Unit &lt;1&gt;"));
        assert!(html.contains("<svg"));
    }

    #[test]
    fn html_report_without_results() {
        let html = generate_html(&[], &layout());
        assert!(html.contains("0 evaluations"));
        assert!(!html.contains("<svg"));
    }

    #[test]
    fn html_report_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.html");

        write_html_report(&[make_result("a.png", 5, 5)], &layout(), &path).unwrap();
        assert!(path.exists());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<html"));
    }
}
