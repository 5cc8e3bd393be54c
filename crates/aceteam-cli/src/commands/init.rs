//! `aceteam init` — provision the managed Python environment.

use std::path::PathBuf;

use aceteam_core::config::{config_path, default_venv_dir, load_config, save_config};
use aceteam_core::runtime::{provision, DEPENDENCY_PACKAGE};
use console::style;

use super::CommandResult;

/// Create (or repair) the environment and record it in the config so later
/// runs resolve straight to it.
pub async fn run(venv_dir: Option<PathBuf>) -> CommandResult {
    let mut config = load_config()?;
    let dir = venv_dir
        .or_else(|| config.venv_dir.clone())
        .unwrap_or_else(default_venv_dir);

    println!(
        "{} Setting up {} in {}",
        style("→").cyan(),
        DEPENDENCY_PACKAGE,
        dir.display()
    );
    let handle = provision(&dir).await?;

    config.venv_dir = Some(dir);
    config.python_path = Some(handle.path.clone());
    save_config(&config)?;

    match handle.version {
        Some(version) => println!(
            "{} Ready: Python {} at {}",
            style("✓").green(),
            version,
            handle.path.display()
        ),
        None => println!("{} Ready: {}", style("✓").green(), handle.path.display()),
    }
    println!("   Saved to {}", config_path().display());
    Ok(())
}
