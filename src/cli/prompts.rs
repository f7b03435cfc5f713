//! Interactive prompts using dialoguer

use std::path::Path;

use anyhow::Result;
use dialoguer::Confirm;

/// Prompt user to confirm proceeding with an action
pub fn confirm_step(message: &str) -> Result<bool> {
    let confirmed = Confirm::new()
        .with_prompt(message)
        .default(true)
        .interact()?;
    Ok(confirmed)
}

/// Ask before writing into a path that already holds output.
/// Returns true straight away when there is nothing to overwrite.
pub fn confirm_overwrite(path: &Path) -> Result<bool> {
    let occupied = if path.is_dir() {
        std::fs::read_dir(path)?.next().is_some()
    } else {
        path.exists()
    };
    if !occupied {
        return Ok(true);
    }
    confirm_step(&format!("{} already exists. Overwrite?", path.display()))
}
