use crate::{OutputFormat, Settings};
use anyhow::{Result, anyhow};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use pagecheck_client::FetchError;
use pagecheck_core::format::{display_url, format_duration, format_percent, truncate_text};
use pagecheck_core::report::VitalMetric;
use pagecheck_core::{NormalizedReport, ScoreLevel, Strategy};
use serde::Serialize;
use std::time::Duration;

/// Give bare hosts such as `example.com` an https scheme
pub fn normalize_target(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

enum Outcome {
    Finished(Result<NormalizedReport, FetchError>),
    Cancelled,
}

pub fn execute(
    settings: &Settings,
    url: &str,
    strategy: Strategy,
    all_audits: bool,
    format: OutputFormat,
) -> Result<()> {
    let target = normalize_target(url);
    tracing::debug!("Resolved target {} -> {}", url, target);

    let analyzer = settings.build_analyzer()?;
    let runtime = tokio::runtime::Runtime::new()?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")?);

    let outcome = runtime.block_on(async {
        let mut updates = analyzer.subscribe();
        let follow = async {
            while updates.changed().await.is_ok() {
                let state = updates.borrow_and_update().clone();
                if state.loading {
                    spinner.set_message(format!(
                        "Analyzing {} ({})...",
                        state.current_url, state.current_strategy
                    ));
                    spinner.enable_steady_tick(Duration::from_millis(100));
                } else {
                    spinner.finish_and_clear();
                }
            }
            std::future::pending::<()>().await
        };

        tokio::select! {
            result = analyzer.analyze(&target, strategy) => Outcome::Finished(result),
            _ = tokio::signal::ctrl_c() => Outcome::Cancelled,
            _ = follow => Outcome::Cancelled,
        }
    });
    spinner.finish_and_clear();

    match outcome {
        Outcome::Finished(Ok(report)) => {
            let from_cache = analyzer.state().is_from_cache;
            match format {
                OutputFormat::Json => output_json(&report, from_cache)?,
                OutputFormat::Table => output_table(&report, all_audits),
                OutputFormat::Pretty => output_pretty(&report, from_cache, all_audits),
            }
            Ok(())
        }
        Outcome::Finished(Err(err)) => {
            report_failure(&err, format)?;
            let message = err.user_message();
            Err(anyhow::Error::new(err).context(message))
        }
        Outcome::Cancelled => {
            eprintln!("{}", style("Analysis cancelled; nothing was cached").yellow());
            Err(anyhow!("Analysis cancelled"))
        }
    }
}

fn report_failure(err: &FetchError, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        let failure = crate::AnalysisFailure::from(err);
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "error": failure }))?);
        return Ok(());
    }

    if !err.suggestions().is_empty() {
        eprintln!("\n{}", style("Suggestions:").bold());
        for suggestion in err.suggestions() {
            eprintln!("  - {}", suggestion);
        }
        eprintln!();
    }
    Ok(())
}

fn styled_level(text: String, level: ScoreLevel) -> console::StyledObject<String> {
    match level {
        ScoreLevel::Good => style(text).green(),
        ScoreLevel::NeedsImprovement => style(text).yellow(),
        ScoreLevel::Poor => style(text).red(),
    }
}

fn score_line(label: &str, score: u8) -> String {
    let level = ScoreLevel::from_percent(score);
    format!(
        "  {:<16} {}  ({})",
        label,
        styled_level(format!("{:>3}", score), level),
        level
    )
}

fn vital_line(label: &str, vital: &VitalMetric) -> String {
    if vital.is_missing() {
        return format!("  {:<28} {}", label, style("N/A").dim());
    }
    format!(
        "  {:<28} {}",
        label,
        styled_level(vital.display_value.clone(), vital.level())
    )
}

fn output_pretty(report: &NormalizedReport, from_cache: bool, all_audits: bool) {
    println!("\n{}", style("PageSpeed Report").bold().cyan());
    println!("{}", style("================").cyan());

    println!("\n  URL:       {}", report.url);
    println!("  Strategy:  {}", report.strategy);
    println!(
        "  Captured:  {}{}",
        report.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        if from_cache {
            style(" (cached)").dim().to_string()
        } else {
            String::new()
        }
    );

    println!("\n{}", style("Scores:").bold());
    println!("{}", score_line("Performance", report.scores.performance));
    println!("{}", score_line("Accessibility", report.scores.accessibility));
    println!("{}", score_line("Best Practices", report.scores.best_practices));
    println!("{}", score_line("SEO", report.scores.seo));
    println!("{}", score_line("Overall", report.overall_score));

    let vitals = &report.core_web_vitals;
    println!("\n{}", style("Core Web Vitals:").bold());
    println!("{}", vital_line("Largest Contentful Paint", &vitals.lcp));
    println!("{}", vital_line("Interaction Responsiveness", &vitals.fid));
    println!("{}", vital_line("Cumulative Layout Shift", &vitals.cls));

    if !report.improvements.is_empty() {
        println!("\n{}", style("Top Improvements:").bold());
        for (i, improvement) in report.improvements.iter().enumerate() {
            let score = (improvement.score * 100.0).round() as i64;
            let display = improvement
                .display_value
                .as_deref()
                .map(|value| format!(" - {}", value))
                .unwrap_or_default();
            println!(
                "  {}. [{}] {}{}",
                i + 1,
                styled_level(format!("{:>3}", score), improvement.level()),
                improvement.title,
                display
            );
        }
    }

    if all_audits {
        for (category, audits) in report.audits_by_category() {
            println!("\n{}", style(format!("Audits - {}:", category)).bold());
            for audit in audits {
                let marker = match audit.level() {
                    Some(level) => styled_level(format!("{:>3}", percent(audit.score)), level),
                    None => style("  -".to_string()).dim(),
                };
                println!("  [{}] {}", marker, truncate_text(&audit.title, 80));
            }
        }
    }

    println!();
}

fn percent(score: Option<f64>) -> i64 {
    score.map_or(0, |value| (value * 100.0).round() as i64)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutput<'a> {
    from_cache: bool,
    #[serde(flatten)]
    report: &'a NormalizedReport,
}

fn output_json(report: &NormalizedReport, from_cache: bool) -> Result<()> {
    let json = serde_json::to_string_pretty(&JsonOutput { from_cache, report })?;
    println!("{}", json);
    Ok(())
}

/// Metric/value rows of the table output
pub fn report_rows(report: &NormalizedReport, all_audits: bool) -> Vec<(String, String)> {
    let vitals = &report.core_web_vitals;
    let mut rows = vec![
        ("URL".to_string(), display_url(&report.url)),
        ("Strategy".to_string(), report.strategy.to_string()),
        ("Captured".to_string(), report.timestamp.to_rfc3339()),
        ("Performance".to_string(), report.scores.performance.to_string()),
        ("Accessibility".to_string(), report.scores.accessibility.to_string()),
        ("Best Practices".to_string(), report.scores.best_practices.to_string()),
        ("SEO".to_string(), report.scores.seo.to_string()),
        ("Overall".to_string(), report.overall_score.to_string()),
        ("LCP".to_string(), format_duration(vitals.lcp.value)),
        ("Interaction".to_string(), format_duration(vitals.fid.value)),
        ("CLS".to_string(), format!("{:.3}", vitals.cls.value)),
    ];

    for improvement in &report.improvements {
        rows.push((
            format!("Improvement: {}", improvement.id),
            format_percent(improvement.score),
        ));
    }

    if all_audits {
        for audit in &report.audits {
            rows.push((
                format!("Audit [{}]: {}", audit.category, audit.id),
                audit
                    .score
                    .map_or_else(|| "-".to_string(), |score| percent(Some(score)).to_string()),
            ));
        }
    }

    rows
}

fn output_table(report: &NormalizedReport, all_audits: bool) {
    println!("Metric,Value");
    for (metric, value) in report_rows(report, all_audits) {
        println!("{},{}", metric, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_target_adds_scheme() {
        assert_eq!(normalize_target("example.com"), "https://example.com");
        assert_eq!(normalize_target("  example.com/a "), "https://example.com/a");
        assert_eq!(normalize_target("http://example.com"), "http://example.com");
        assert_eq!(normalize_target("ftp://example.com"), "ftp://example.com");
        assert_eq!(normalize_target("   "), "");
    }
}
