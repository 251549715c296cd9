//! Descriptor discovery.
//!
//! Walks each search root for descriptor files. One unreadable or malformed
//! descriptor never stops the rest from loading: failures are collected in
//! the [`DiscoveryReport`]. Two descriptors declaring the same name are a
//! configuration error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use sentir_core::{Error, Result};

use crate::descriptor::{is_descriptor_file, PluginDescriptor};

/// A descriptor that could not be loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of walking the search roots.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    pub descriptors: Vec<PluginDescriptor>,
    pub failures: Vec<DiscoveryFailure>,
}

impl DiscoveryReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Single error summarising every failure, for strict startup.
    pub fn failure_summary(&self) -> Option<Error> {
        if self.failures.is_empty() {
            return None;
        }
        let lines: Vec<String> = self
            .failures
            .iter()
            .map(|f| format!("{}: {}", f.path.display(), f.error))
            .collect();
        Some(Error::Configuration(format!(
            "{} plugin descriptor(s) failed to load: {}",
            self.failures.len(),
            lines.join("; ")
        )))
    }
}

/// Hidden (`.git`) and private (`_build`) directories are never searched.
fn is_skipped(entry: &walkdir::DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name.starts_with('_')
}

/// Walks `roots` for plugin descriptors.
pub fn discover<P: AsRef<Path>>(roots: &[P]) -> Result<DiscoveryReport> {
    let mut report = DiscoveryReport::default();
    let mut seen: HashMap<String, PathBuf> = HashMap::new();

    for root in roots {
        let root = root.as_ref();
        if !root.exists() {
            warn!(path = %root.display(), "Plugin folder does not exist, skipping");
            report.failures.push(DiscoveryFailure {
                path: root.to_path_buf(),
                error: "folder does not exist".to_string(),
            });
            continue;
        }

        let walker = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_skipped(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                    warn!(path = %path.display(), error = %e, "Could not read plugin folder entry");
                    report.failures.push(DiscoveryFailure {
                        path,
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || !is_descriptor_file(path) {
                continue;
            }

            match load_descriptor(path) {
                Ok(descriptor) => {
                    if let Some(previous) = seen.get(&descriptor.name) {
                        return Err(Error::Configuration(format!(
                            "duplicate plugin name '{}' in {} and {}",
                            descriptor.name,
                            previous.display(),
                            path.display()
                        )));
                    }
                    debug!(
                        plugin = %descriptor.name,
                        descriptor = %path.display(),
                        "Found plugin descriptor"
                    );
                    seen.insert(descriptor.name.clone(), path.to_path_buf());
                    report.descriptors.push(descriptor);
                }
                Err(e) => {
                    warn!(
                        descriptor = %path.display(),
                        error = %e,
                        "Skipping invalid plugin descriptor"
                    );
                    report.failures.push(DiscoveryFailure {
                        path: path.to_path_buf(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    info!(
        plugin_count = report.descriptors.len(),
        failures = report.failures.len(),
        "Plugin discovery complete"
    );
    Ok(report)
}

fn load_descriptor(path: &Path) -> Result<PluginDescriptor> {
    let text = std::fs::read_to_string(path)?;
    PluginDescriptor::from_yaml(&text, Some(path))
}
