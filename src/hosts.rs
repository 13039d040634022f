// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Line-oriented hosts-file model.
//!
//! The synchronizer only needs three operations on the hosts file:
//! remove a set of names, add one address-to-names binding, and save.
//! This module implements them over an in-memory copy of the file that
//! preserves everything it does not understand - comments, blank lines,
//! unrelated bindings, even malformed lines are written back verbatim.
//!
//! Binding lines the synchronizer has not touched are also rendered from
//! their original text, so formatting survives a round trip; only lines
//! this process edits are re-rendered.

use crate::errors::SyncError;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// One line of the hosts file.
#[derive(Debug, Clone)]
enum HostsLine {
    /// An `address names...` binding. `raw` holds the original line text
    /// until the binding is modified; `comment` is any trailing inline
    /// `# ...` suffix, carried across edits.
    Binding {
        addr: String,
        names: Vec<String>,
        comment: Option<String>,
        raw: Option<String>,
    },
    /// Anything else: comments, blank lines, lines we cannot parse.
    Verbatim(String),
}

impl HostsLine {
    fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Self::Verbatim(line.to_string());
        }

        let (entry, comment) = match trimmed.find('#') {
            Some(idx) => (&trimmed[..idx], Some(trimmed[idx..].to_string())),
            None => (trimmed, None),
        };

        let mut tokens = entry.split_whitespace();

        let Some(addr) = tokens.next() else {
            return Self::Verbatim(line.to_string());
        };
        if addr.parse::<IpAddr>().is_err() {
            return Self::Verbatim(line.to_string());
        }

        let names: Vec<String> = tokens.map(str::to_string).collect();
        if names.is_empty() {
            return Self::Verbatim(line.to_string());
        }

        Self::Binding {
            addr: addr.to_string(),
            names,
            comment,
            raw: Some(line.to_string()),
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Binding {
                addr,
                names,
                comment,
                raw,
            } => raw.clone().unwrap_or_else(|| match comment {
                Some(comment) => format!("{addr}\t{} {comment}", names.join(" ")),
                None => format!("{addr}\t{}", names.join(" ")),
            }),
            Self::Verbatim(line) => line.clone(),
        }
    }
}

/// In-memory hosts file, loaded from and saved to one path.
#[derive(Debug, Clone)]
pub struct HostsFile {
    path: PathBuf,
    lines: Vec<HostsLine>,
}

impl HostsFile {
    /// Load and parse the hosts file at `path`.
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let contents = fs::read_to_string(path).map_err(|source| SyncError::HostsRead {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            lines: contents.lines().map(HostsLine::parse).collect(),
        })
    }

    /// Remove every occurrence of the given names, across all bindings.
    ///
    /// A binding that loses all of its names is dropped entirely; a
    /// binding that shares a line with unrelated names keeps those.
    pub fn remove_names<S: AsRef<str>>(&mut self, names: &[S]) {
        let targets: Vec<&str> = names.iter().map(AsRef::as_ref).collect();

        self.lines.retain_mut(|line| {
            let HostsLine::Binding { names, raw, .. } = line else {
                return true;
            };
            if !names.iter().any(|name| targets.contains(&name.as_str())) {
                return true;
            }

            names.retain(|name| !targets.contains(&name.as_str()));
            *raw = None;
            !names.is_empty()
        });
    }

    /// Append a binding mapping `addr` to `names`.
    ///
    /// Callers remove the old names first; this method does not check for
    /// duplicates.
    pub fn add_binding(&mut self, addr: IpAddr, names: &[String]) {
        self.lines.push(HostsLine::Binding {
            addr: addr.to_string(),
            names: names.to_vec(),
            comment: None,
            raw: None,
        });
    }

    /// Write the file back to the path it was loaded from.
    pub fn save(&self) -> Result<(), SyncError> {
        let mut rendered: String = self
            .lines
            .iter()
            .map(HostsLine::render)
            .collect::<Vec<_>>()
            .join("\n");
        rendered.push('\n');

        fs::write(&self.path, rendered).map_err(|source| SyncError::HostsSave {
            path: self.path.clone(),
            source,
        })
    }

    /// All current bindings as `(address, names)` pairs, in file order.
    #[must_use]
    pub fn bindings(&self) -> Vec<(String, Vec<String>)> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                HostsLine::Binding { addr, names, .. } => Some((addr.clone(), names.clone())),
                HostsLine::Verbatim(_) => None,
            })
            .collect()
    }

    /// The addresses currently bound to `name`, in file order.
    #[must_use]
    pub fn addresses_for(&self, name: &str) -> Vec<String> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                HostsLine::Binding { addr, names, .. }
                    if names.iter().any(|n| n == name) =>
                {
                    Some(addr.clone())
                }
                _ => None,
            })
            .collect()
    }
}

/// Copy the hosts file to its backup location.
///
/// Runs once, before watching begins; the process aborts if this fails so
/// it never runs without a restorable backup.
pub fn backup(path: &Path, backup: &Path) -> Result<(), SyncError> {
    fs::copy(path, backup)
        .map(|_| ())
        .map_err(|source| SyncError::Backup {
            path: path.to_path_buf(),
            backup: backup.to_path_buf(),
            source,
        })
}

#[cfg(test)]
#[path = "hosts_tests.rs"]
mod hosts_tests;
