//! # arcshim Commands Listing
//!
//! File: cli/src/commands/list.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! Implements `arcshim commands`, listing every intercepted command, its
//! family and the host binary that would be tried first.
//!
//! ```text
//! $ arcshim commands
//! Command | Family | Host binary
//! --------+--------+------------------------------
//! tar     | tar    | /usr/bin/tar
//! unrar   | zip    | (embedded engine only: ...)
//! ```
//!
use crate::common::process::HostLocator;
use crate::core::config;
use crate::core::error::Result;
use crate::shim::Registry;
use anyhow::Context;
use clap::Parser;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(about = "List the commands arcshim intercepts")]
pub struct ListArgs {}

/// Builds the listing table.
fn render(registry: &Registry, locator: &HostLocator) -> Vec<String> {
    let mut lines = vec![
        format!("{:<7} | {:<6} | Host binary", "Command", "Family"),
        format!("{:-<8}+{:-<8}+{:-<30}", "", "", ""),
    ];
    for (name, family) in registry.names() {
        let host = match locator.locate(name) {
            Ok(path) => path.display().to_string(),
            Err(e) => format!("(embedded engine only: {})", e),
        };
        lines.push(format!("{:<7} | {:<6} | {}", name, family, host));
    }
    lines
}

/// # Handle Commands Listing (`handle_list`)
pub fn handle_list(_args: ListArgs, registry: &Registry) -> Result<()> {
    let cfg = config::load_config().context("Failed to load arcshim configuration")?;
    let locator = HostLocator::from_config(&cfg.host);
    debug!("Listing commands with {:?}", locator);
    for line in render(registry, &locator) {
        println!("{}", line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::HostConfig;

    #[test]
    fn test_render_lists_every_command() {
        let empty = tempfile::tempdir().unwrap();
        let locator = HostLocator::from_config(&HostConfig::default())
            .with_search_path(empty.path().as_os_str())
            .with_self_exe(None);
        let lines = render(&Registry::with_defaults(), &locator);
        assert_eq!(lines.len(), 6);
        assert!(lines[2].starts_with("tar     | tar"));
        assert!(lines[5].starts_with("zip     | zip"));
        assert!(lines[5].contains("embedded engine only"));
    }
}
