use crate::{OutputFormat, Settings};
use anyhow::{Result, anyhow};
use console::style;

pub fn list(settings: &Settings, format: OutputFormat) -> Result<()> {
    let favorites = settings.open_favorites()?.list();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&favorites)?),
        OutputFormat::Table => {
            println!("Name,URL,Added");
            for favorite in &favorites {
                println!("{},{},{}", favorite.name, favorite.url, favorite.added_at);
            }
        }
        OutputFormat::Pretty => {
            if favorites.is_empty() {
                println!("No favorites yet. Add one with 'pagecheck favorites add <URL>'.");
                return Ok(());
            }
            println!("\n{}", style("Favorites").bold().cyan());
            println!("{}", style("=========").cyan());
            for favorite in &favorites {
                println!("  {:<24} {}", style(&favorite.name).bold(), favorite.url);
            }
            println!();
        }
    }
    Ok(())
}

pub fn add(settings: &Settings, url: &str, name: Option<&str>) -> Result<()> {
    if settings.open_favorites()?.add(url, name) {
        println!("{} Added {} to favorites", style("✓").green(), url);
    } else {
        println!("{} is already a favorite", url);
    }
    Ok(())
}

pub fn remove(settings: &Settings, url: &str) -> Result<()> {
    if !settings.open_favorites()?.remove(url) {
        return Err(anyhow!("'{}' is not a favorite", url));
    }
    println!("{} Removed {} from favorites", style("✓").green(), url);
    Ok(())
}

pub fn rename(settings: &Settings, url: &str, name: &str) -> Result<()> {
    if !settings.open_favorites()?.rename(url, name) {
        return Err(anyhow!("'{}' is not a favorite", url));
    }
    println!("{} Renamed {} to '{}'", style("✓").green(), url, name);
    Ok(())
}

/// Prints `true`/`false`; exits non-zero when the URL is not a favorite
pub fn check(settings: &Settings, url: &str) -> Result<bool> {
    let is_favorite = settings.open_favorites()?.is_favorite(url);
    println!("{}", is_favorite);
    Ok(is_favorite)
}
