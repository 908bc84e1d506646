//! # Permission Generator
//!
//! Orchestration of one generation run:
//!
//! 1. Validate the configuration
//! 2. Capture one grant snapshot (the store session is released right away)
//! 3. Build the base document with every role and category declared
//! 4. Resolve and merge the fragments of every subsystem, role by role
//! 5. Report conflicts, skipped rows and catalog issues
//!
//! A run is all-or-nothing: any fatal error aborts it and no document is
//! returned. Non-fatal problems end up in the [`RunReport`]; when error
//! entries were logged the document is not published unless
//! `ignore_errors` is set.

use chrono::{DateTime, Utc};
use permgen_core::{GrantSnapshot, PermGenResult, PermissionStore, ResourceType, SkippedRow};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::config::GeneratorConfig;
use crate::document::PermissionDocument;
use crate::merge::{merge_fragment, MergeConflict, MergeContext};
use crate::resolver::{resolve_role, ResolveContext};

/// Severity of a run log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Informational
    Info,
    /// Recovered problem
    Warning,
    /// Problem that blocks publishing
    Error,
}

impl LogLevel {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message collected during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunLog {
    /// Severity
    pub level: LogLevel,
    /// Message
    pub msg: String,
    /// When the entry was logged
    pub timestamp: DateTime<Utc>,
}

/// Outcome of a run, besides the document itself.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Run ID (UUIDv7, time ordered)
    pub run_id: Uuid,
    /// Start of the run
    pub started_at: DateTime<Utc>,
    /// End of the run
    pub finished_at: DateTime<Utc>,
    /// Number of resolved roles
    pub role_count: usize,
    /// Number of grants in the snapshot
    pub grant_count: usize,
    /// Conflicting values found while merging
    pub conflicts: Vec<MergeConflict>,
    /// Store rows left out of the snapshot
    pub skipped: Vec<SkippedRow>,
    /// Collected log entries
    pub logs: Vec<RunLog>,
    /// Fingerprint of the document
    pub fingerprint: String,
}

impl RunReport {
    /// Check whether error entries were logged.
    pub fn has_errors(&self) -> bool {
        self.logs.iter().any(|log| log.level == LogLevel::Error)
    }

    /// Log entries of a level.
    pub fn entries(&self, level: LogLevel) -> impl Iterator<Item = &RunLog> {
        self.logs.iter().filter(move |log| log.level == level)
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct GenerationRun {
    /// The generated document
    pub document: PermissionDocument,
    /// Run report
    pub report: RunReport,
    ignore_errors: bool,
}

impl GenerationRun {
    /// Check whether the document may be published.
    pub fn publishable(&self) -> bool {
        self.ignore_errors || !self.report.has_errors()
    }

    /// Write the document to `path` if it is publishable.
    ///
    /// # Returns
    ///
    /// `true` if the document was written, `false` if it was withheld
    /// because of logged errors. An existing file is left untouched in
    /// that case.
    pub fn persist(&self, path: &Path) -> PermGenResult<bool> {
        if !self.publishable() {
            error!(
                run_id = %self.report.run_id,
                path = %path.display(),
                "Errors occurred during the run, the permissions file was not updated"
            );
            return Ok(false);
        }
        write_atomic(path, &self.document.to_json_pretty()?)?;
        info!(
            run_id = %self.report.run_id,
            path = %path.display(),
            "Permissions file written"
        );
        Ok(true)
    }
}

/// Replace `path` with `contents` in one step.
///
/// The contents are written to a temporary sibling which is then renamed
/// over `path`, so readers see either the old or the new file.
pub fn write_atomic(path: &Path, contents: &str) -> PermGenResult<()> {
    let tmp = temp_sibling(path);
    if let Err(err) = std::fs::write(&tmp, contents).and_then(|_| std::fs::rename(&tmp, path)) {
        let _ = std::fs::remove_file(&tmp);
        return Err(err.into());
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.tmp", Uuid::now_v7().simple()));
    path.with_file_name(name)
}

/// Collects log entries of a run while forwarding them to `tracing`.
#[derive(Debug, Default)]
struct RunLogger {
    logs: Vec<RunLog>,
}

impl RunLogger {
    fn log(&mut self, level: LogLevel, msg: String) {
        match level {
            LogLevel::Info => info!("{}", msg),
            LogLevel::Warning => warn!("{}", msg),
            LogLevel::Error => error!("{}", msg),
        }
        self.logs.push(RunLog {
            level,
            msg,
            timestamp: Utc::now(),
        });
    }
}

/// Generates permission documents for one tenant.
///
/// # Example
///
/// ```
/// use permgen_core::MemoryStore;
/// use permgen_engine::{Catalog, GeneratorConfig, PermissionGenerator};
///
/// let store = MemoryStore::default()
///     .with_role("admin")
///     .with_resource(1, "viewer_task", "measure", None)
///     .with_grant(1, "admin", 1, 0, false);
///
/// let generator = PermissionGenerator::new(GeneratorConfig::default(), Catalog::new());
/// let run = generator.run(&store).unwrap();
///
/// let admin = run.document.role("admin").unwrap();
/// assert_eq!(admin.viewer_tasks, vec!["measure"]);
/// assert!(run.publishable());
/// ```
#[derive(Debug, Clone, Default)]
pub struct PermissionGenerator {
    config: GeneratorConfig,
    catalog: Catalog,
}

impl PermissionGenerator {
    /// Create a generator.
    pub fn new(config: GeneratorConfig, catalog: Catalog) -> Self {
        Self { config, catalog }
    }

    /// Get the configuration.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Get the catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Generate the permission document from the current store content.
    ///
    /// # Errors
    ///
    /// Invalid settings, store failures and malformed resource graphs abort
    /// the run.
    #[instrument(skip_all, fields(run_id = tracing::field::Empty))]
    pub fn run(&self, store: &dyn PermissionStore) -> PermGenResult<GenerationRun> {
        self.config.validate()?;

        let run_id = Uuid::now_v7();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));
        let started_at = Utc::now();
        let mut logger = RunLogger::default();

        let snapshot = GrantSnapshot::capture(store)?;
        for row in snapshot.skipped_rows() {
            logger.log(LogLevel::Warning, row.to_string());
        }
        for issue in self.catalog.issues() {
            logger.log(LogLevel::Error, issue);
        }
        for role in unknown_grant_roles(&snapshot) {
            logger.log(
                LogLevel::Warning,
                format!("Grants for unknown role '{}' are ignored", role),
            );
        }

        let mut document =
            PermissionDocument::base(snapshot.principals(), &self.config.custom_resource_types);
        let mut conflicts = Vec::new();
        for entry in &mut document.roles {
            let ctx = ResolveContext::new(&snapshot, &self.config, &self.catalog, &entry.role);
            let mut merge = MergeContext::new(&entry.role);
            for fragment in resolve_role(&ctx) {
                merge_fragment(&mut entry.permissions, fragment, &mut merge);
            }
            conflicts.extend(merge.into_conflicts());
        }
        for conflict in &conflicts {
            logger.log(LogLevel::Warning, conflict.to_string());
        }

        let fingerprint = document.fingerprint()?;
        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            role_count: document.roles.len(),
            grant_count: snapshot.grant_count(),
            conflicts,
            skipped: snapshot.skipped_rows().to_vec(),
            logs: logger.logs,
            fingerprint,
        };

        info!(
            roles = report.role_count,
            users = document.users.len(),
            groups = document.groups.len(),
            grants = report.grant_count,
            conflicts = report.conflicts.len(),
            skipped = report.skipped.len(),
            fingerprint = %report.fingerprint,
            "Permissions generated"
        );

        Ok(GenerationRun {
            document,
            report,
            ignore_errors: self.config.ignore_errors,
        })
    }
}

/// Roles holding grants without being listed in the store, sorted.
fn unknown_grant_roles(snapshot: &GrantSnapshot) -> Vec<String> {
    let known: HashSet<&str> = snapshot
        .principals()
        .ordered_roles()
        .into_iter()
        .collect();
    let mut unknown: Vec<String> = ResourceType::all()
        .into_iter()
        .flat_map(|resource_type| snapshot.all_grants_of_type(resource_type.into()))
        .map(|g| g.grant.role.as_str())
        .filter(|role| !known.contains(role))
        .map(str::to_string)
        .collect();
    unknown.sort();
    unknown.dedup();
    unknown
}
