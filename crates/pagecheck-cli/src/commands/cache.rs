use crate::{OutputFormat, Settings};
use anyhow::Result;
use console::style;

pub fn size(settings: &Settings, format: OutputFormat) -> Result<()> {
    let cache = settings.open_cache()?;
    let entries = cache.size();

    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "entries": entries })),
        OutputFormat::Table => {
            println!("Metric,Value");
            println!("Cached Reports,{}", entries);
        }
        OutputFormat::Pretty => println!(
            "{} cached report(s) in {}",
            style(entries).bold(),
            settings.cache_dir().display()
        ),
    }
    Ok(())
}

pub fn clear(settings: &Settings) -> Result<()> {
    let cache = settings.open_cache()?;
    let before = cache.size();
    cache.clear();
    tracing::info!("Cleared {} cached report(s)", before);
    println!("{} Cleared {} cached report(s)", style("✓").green(), before);
    Ok(())
}
