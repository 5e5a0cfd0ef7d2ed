//! # arcshim Command Registry (`shim::registry`)
//!
//! File: cli/src/shim/registry.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! Maps the base name of an intercepted executable to the family that resolves
//! its arguments. Built once at startup with `Registry::with_defaults` and only
//! read afterwards.
//!
use super::{tar, zip, Invocation};
use crate::core::error::Result;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// The closed set of intercepted command families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandFamily {
    Tar,
    /// `zip`, `unzip` and `unrar`.
    Zip,
}

impl CommandFamily {
    pub fn name(&self) -> &'static str {
        match self {
            CommandFamily::Tar => "tar",
            CommandFamily::Zip => "zip",
        }
    }

    /// Resolves the arguments of `tool` (a registered base name) into an
    /// `Invocation`.
    pub fn resolve(&self, tool: &str, args: &[String]) -> Result<Invocation> {
        match self {
            CommandFamily::Tar => tar::resolve(args).map(Invocation::Tar),
            CommandFamily::Zip => zip::resolve(tool, args).map(Invocation::Zip),
        }
    }
}

impl fmt::Display for CommandFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: BTreeMap<String, CommandFamily>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every supported command.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        tar::register(&mut registry);
        zip::register(&mut registry);
        debug!("Registered commands: {:?}", registry.entries);
        registry
    }

    /// Adds `name`. Existing entries are never replaced; returns whether the
    /// entry was added.
    pub fn register(&mut self, name: &str, family: CommandFamily) -> bool {
        if let Some(existing) = self.entries.get(name) {
            warn!(
                "Command '{}' is already registered to the {} family; ignoring {}",
                name, existing, family
            );
            return false;
        }
        self.entries.insert(name.to_string(), family);
        true
    }

    pub fn lookup(&self, name: &str) -> Option<CommandFamily> {
        self.entries.get(name).copied()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = (&str, CommandFamily)> + '_ {
        self.entries
            .iter()
            .map(|(name, family)| (name.as_str(), *family))
    }
}
