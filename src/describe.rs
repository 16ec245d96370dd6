/**
 * Description engine: derives the canonical Description text from a file's
 * path and writes or cleans it through the metadata gateway
 */

use log::{debug, warn};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use crate::batch::{Outcome, SkipReason};
use crate::metadata::MetadataGateway;
use crate::paths::decompose;

/// The single metadata field this engine owns.
pub const DESCRIPTION_FIELD: &str = "Description";

/// Default prefix marker composed into new descriptions and used to detect
/// previously written ones.
pub const DEFAULT_PREFIX: &str = "[EXIF writer]";

/// Only still images carry the description; everything else is skipped.
const ALLOWED_EXTENSION: &str = ".jpg";

/// Configuration for one describe pass. No ambient state.
#[derive(Debug, Clone)]
pub struct DescribeConfig {
    pub root: PathBuf,
    pub prefix: String,
    /// Alternative marker treated as safe to replace; defaults to `prefix`.
    pub existing_prefix: Option<String>,
    pub force: bool,
    pub dry_run: bool,
}

/// Decision for one file in write mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WritePlan {
    Write(String),
    Skip(SkipReason),
}

/// Decision for one file in clean mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanPlan {
    Remove,
    Skip(SkipReason),
}

pub struct Describer<'a> {
    root: String,
    prefix: String,
    existing_prefix: String,
    force: bool,
    dry_run: bool,
    gateway: &'a dyn MetadataGateway,
}

impl<'a> Describer<'a> {
    pub fn new(config: DescribeConfig, gateway: &'a dyn MetadataGateway) -> Self {
        let existing_prefix = config
            .existing_prefix
            .unwrap_or_else(|| config.prefix.clone());
        Self {
            root: config.root.to_string_lossy().into_owned(),
            prefix: config.prefix,
            existing_prefix,
            force: config.force,
            dry_run: config.dry_run,
            gateway,
        }
    }

    /// The canonical description: the prefix marker, then the path below the
    /// root with the root boundary turned into a space. Separators inside the
    /// trimmed path are kept, so the directory structure stays readable.
    pub fn derive_description(&self, path: &Path) -> String {
        let path_str = path.to_string_lossy();
        let trimmed = path_str.get(self.root.len()..).unwrap_or("");
        let joined = match trimmed.strip_prefix(MAIN_SEPARATOR) {
            Some(rest) => format!(" {}", rest),
            None => trimmed.to_string(),
        };
        format!("{} {}", self.prefix, joined)
    }

    /// Pure write-mode decision given the file's current description.
    ///
    /// An existing description is only replaced when it is empty, carries the
    /// existing-prefix marker, or `force` is set; user-authored text is never
    /// clobbered. Re-deriving after a successful write reproduces the stored
    /// string exactly, so an exact match means there is nothing to do.
    pub fn plan_write(&self, path: &Path, current: Option<&str>) -> WritePlan {
        let comps = decompose(path);
        if comps.extension != ALLOWED_EXTENSION {
            return WritePlan::Skip(SkipReason::IneligibleExtension);
        }

        let current = current.unwrap_or("");
        let replaceable =
            current.is_empty() || current.contains(&self.existing_prefix) || self.force;
        if !replaceable {
            return WritePlan::Skip(SkipReason::ForeignDescription);
        }

        let new_desc = self.derive_description(path);
        if new_desc == current {
            WritePlan::Skip(SkipReason::AlreadyWritten)
        } else {
            WritePlan::Write(new_desc)
        }
    }

    /// Pure clean-mode decision: only descriptions carrying the marker are
    /// removed, so a clean run never touches unrelated text.
    pub fn plan_clean(&self, path: &Path, current: Option<&str>) -> CleanPlan {
        let comps = decompose(path);
        if comps.extension != ALLOWED_EXTENSION {
            return CleanPlan::Skip(SkipReason::IneligibleExtension);
        }

        match current {
            Some(desc) if !desc.is_empty() && desc.contains(&self.existing_prefix) => {
                CleanPlan::Remove
            }
            _ => CleanPlan::Skip(SkipReason::NoMatchingPrefix),
        }
    }

    /// Write-mode per-file operation for the batch runner.
    pub fn process_write(&self, path: &Path) -> Outcome {
        let current = match self.gateway.get_field(path, DESCRIPTION_FIELD) {
            Ok(current) => current,
            Err(e) => {
                warn!("Unable to process image {}: {}", path.display(), e);
                return Outcome::Failed;
            }
        };

        match self.plan_write(path, current.as_deref()) {
            WritePlan::Skip(reason) => {
                debug!("NOT Updated {}: {}", path.display(), reason);
                Outcome::Skipped
            }
            WritePlan::Write(new_desc) => {
                if !self.dry_run {
                    if let Err(e) =
                        self.gateway
                            .set_field(path, DESCRIPTION_FIELD, &new_desc, true)
                    {
                        warn!("Unable to process image {}: {}", path.display(), e);
                        return Outcome::Failed;
                    }
                }
                debug!("{} {}: '{}'", self.update_tag(), path.display(), new_desc);
                Outcome::Updated
            }
        }
    }

    /// Clean-mode per-file operation for the batch runner.
    pub fn process_clean(&self, path: &Path) -> Outcome {
        let current = match self.gateway.get_field(path, DESCRIPTION_FIELD) {
            Ok(current) => current,
            Err(e) => {
                warn!("Unable to process image {}: {}", path.display(), e);
                return Outcome::Failed;
            }
        };

        match self.plan_clean(path, current.as_deref()) {
            CleanPlan::Skip(reason) => {
                debug!("NOT Updated {}: {}", path.display(), reason);
                Outcome::Skipped
            }
            CleanPlan::Remove => {
                // Writing the empty string is the defined "remove field" mechanism.
                if !self.dry_run {
                    if let Err(e) = self.gateway.set_field(path, DESCRIPTION_FIELD, "", true) {
                        warn!("Unable to process image {}: {}", path.display(), e);
                        return Outcome::Failed;
                    }
                }
                debug!("{} {} -- Removed description", self.update_tag(), path.display());
                Outcome::Updated
            }
        }
    }

    fn update_tag(&self) -> &'static str {
        if self.dry_run {
            "[DRY RUN] Updated"
        } else {
            "Updated"
        }
    }
}
