use crate::{OutputFormat, Settings};
use anyhow::Result;
use console::style;

/// Print the resolved settings
pub fn execute(settings: &Settings, format: OutputFormat) -> Result<()> {
    let summary = settings.summary();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Table => {
            println!("Setting,Value");
            println!("Endpoint,{}", summary.endpoint);
            println!("API Key,{}", summary.api_key.as_deref().unwrap_or("(none)"));
            println!("Data Directory,{}", summary.data_dir);
            println!("Retry Profile,{}", summary.profile);
            println!("Max Attempts,{}", summary.max_attempts);
            println!("Retry Delay (ms),{}", summary.retry_delay_ms);
            println!("Budget (s),{}", summary.budget_secs);
        }
        OutputFormat::Pretty => {
            println!("\n{}", style("pagecheck configuration").bold().cyan());
            println!("{}", style("=======================").cyan());
            println!("  Endpoint:        {}", summary.endpoint);
            println!(
                "  API Key:         {}",
                summary.api_key.as_deref().unwrap_or("(none)")
            );
            println!("  Data Directory:  {}", summary.data_dir);
            println!("  Retry Profile:   {}", summary.profile);
            let timeouts: Vec<String> = summary
                .attempt_timeouts_secs
                .iter()
                .map(|secs| format!("{}s", secs))
                .collect();
            println!(
                "  Attempts:        {} ({})",
                summary.max_attempts,
                timeouts.join(", ")
            );
            println!("  Retry Delay:     {}ms", summary.retry_delay_ms);
            println!("  Budget:          {}s", summary.budget_secs);
            println!();
        }
    }
    Ok(())
}
