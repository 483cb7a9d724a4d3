//! History commands over the local analysis log.
//!
//! ```bash
//! pagecheck history list --url https://example.com
//! pagecheck history stats
//! pagecheck history favorite "https://example.com_mobile_1714557600000"
//! ```

use crate::{OutputFormat, Settings};
use anyhow::{Result, anyhow};
use console::style;
use pagecheck_core::ScoreLevel;
use pagecheck_store::HistoryEntry;

fn captured(entry: &HistoryEntry) -> String {
    entry
        .captured_at()
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn styled_score(score: u8) -> console::StyledObject<u8> {
    match ScoreLevel::from_percent(score) {
        ScoreLevel::Good => style(score).green(),
        ScoreLevel::NeedsImprovement => style(score).yellow(),
        ScoreLevel::Poor => style(score).red(),
    }
}

pub fn list(settings: &Settings, url: Option<&str>, format: OutputFormat) -> Result<()> {
    let history = settings.open_history()?;
    let entries = match url {
        Some(url) => history.list_by_url(url),
        None => history.entries(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Table => {
            println!("ID,URL,Strategy,Captured,Overall,Performance,Accessibility,Best Practices,SEO,Favorite");
            for entry in &entries {
                println!(
                    "{},{},{},{},{},{},{},{},{},{}",
                    entry.id,
                    entry.url,
                    entry.strategy,
                    captured(entry),
                    entry.overall_score,
                    entry.scores.performance,
                    entry.scores.accessibility,
                    entry.scores.best_practices,
                    entry.scores.seo,
                    entry.is_favorite
                );
            }
        }
        OutputFormat::Pretty => {
            if entries.is_empty() {
                println!("No analyses recorded yet.");
                return Ok(());
            }
            println!("\n{}", style("Analysis History").bold().cyan());
            println!("{}", style("================").cyan());
            for entry in &entries {
                let star = if entry.is_favorite { "★ " } else { "  " };
                println!(
                    "{}{:>3}  {:<8} {}  {}",
                    star,
                    styled_score(entry.overall_score),
                    entry.strategy,
                    captured(entry),
                    entry.url
                );
                println!("       {}", style(&entry.id).dim());
            }
            println!();
        }
    }
    Ok(())
}

pub fn stats(settings: &Settings, format: OutputFormat) -> Result<()> {
    let stats = settings.open_history()?.stats();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Table => {
            println!("Metric,Value");
            println!("Total,{}", stats.total);
            println!("Today,{}", stats.today);
            println!("This Week,{}", stats.this_week);
            println!("This Month,{}", stats.this_month);
            println!("Average Score,{}", stats.average_score);
        }
        OutputFormat::Pretty => {
            println!("\n{}", style("History Statistics").bold().cyan());
            println!("{}", style("==================").cyan());
            println!("  Total Analyses:  {}", stats.total);
            println!("  Today:           {}", stats.today);
            println!("  This Week:       {}", stats.this_week);
            println!("  This Month:      {}", stats.this_month);
            println!("  Average Score:   {}", styled_score(stats.average_score));
            println!();
        }
    }
    Ok(())
}

pub fn timeline(settings: &Settings, format: OutputFormat) -> Result<()> {
    let days = settings.open_history()?.timeline();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&days)?),
        OutputFormat::Table => {
            println!("Date,Count,Average Score");
            for day in &days {
                println!("{},{},{}", day.date, day.count, day.average_score);
            }
        }
        OutputFormat::Pretty => {
            if days.is_empty() {
                println!("No analyses recorded yet.");
                return Ok(());
            }
            println!("\n{}", style("Analyses by Day").bold().cyan());
            println!("{}", style("===============").cyan());
            for day in &days {
                println!(
                    "  {}  {:>3} analyses  avg {}",
                    day.date,
                    day.count,
                    styled_score(day.average_score)
                );
            }
            println!();
        }
    }
    Ok(())
}

pub fn remove(settings: &Settings, id: &str) -> Result<()> {
    if !settings.open_history()?.remove(id) {
        return Err(anyhow!("No history entry with id '{}'", id));
    }
    println!("{} Removed {}", style("✓").green(), id);
    Ok(())
}

pub fn favorite(settings: &Settings, id: &str) -> Result<()> {
    let flag = settings
        .open_history()?
        .toggle_favorite(id)
        .ok_or_else(|| anyhow!("No history entry with id '{}'", id))?;

    let label = if flag { "Marked" } else { "Unmarked" };
    println!("{} {} {} as favorite", style("✓").green(), label, id);
    Ok(())
}

pub fn clear(settings: &Settings) -> Result<()> {
    settings.open_history()?.clear();
    println!("{} History cleared", style("✓").green());
    Ok(())
}
