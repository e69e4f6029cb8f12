//! Startup self-checks module
//!
//! This module performs system verification before the server starts accepting requests.
//! Checks include:
//! - Database connectivity and schema
//! - Movie catalog configuration and reachability
//! - Required directories exist and are writable

use serde::Serialize;
use tracing::{error, info, warn};

use crate::catalog::MovieCatalog;
use crate::config::Config;
use crate::DbPool;

/// Result of a single startup check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Name of the check
    pub name: String,
    /// Whether the check passed
    pub passed: bool,
    /// Whether this check is critical (failure should abort startup)
    pub critical: bool,
    /// Human-readable message describing the result
    pub message: String,
    /// Additional details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            critical: false,
            message: message.into(),
            details: None,
        }
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>, critical: bool) -> Self {
        Self {
            name: name.into(),
            passed: false,
            critical,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Aggregated startup check results
#[derive(Debug, Clone, Serialize)]
pub struct StartupCheckReport {
    /// All check results
    pub checks: Vec<CheckResult>,
    /// Whether all critical checks passed
    pub all_critical_passed: bool,
    /// Whether all checks passed (including non-critical)
    pub all_passed: bool,
    /// Summary message
    pub summary: String,
}

impl StartupCheckReport {
    pub fn new(checks: Vec<CheckResult>) -> Self {
        let all_critical_passed = checks.iter().filter(|c| c.critical).all(|c| c.passed);
        let all_passed = checks.iter().all(|c| c.passed);

        let failed_critical = checks.iter().filter(|c| c.critical && !c.passed).count();
        let failed_non_critical = checks.iter().filter(|c| !c.critical && !c.passed).count();
        let total = checks.len();
        let passed = checks.iter().filter(|c| c.passed).count();

        let summary = if all_passed {
            format!("All {} startup checks passed", total)
        } else if all_critical_passed {
            format!(
                "{}/{} checks passed ({} non-critical warnings)",
                passed, total, failed_non_critical
            )
        } else {
            format!(
                "{}/{} checks passed ({} critical failures)",
                passed, total, failed_critical
            )
        };

        Self {
            checks,
            all_critical_passed,
            all_passed,
            summary,
        }
    }
}

/// Run all startup self-checks
pub async fn run_startup_checks(
    config: &Config,
    db: &DbPool,
    catalog: &dyn MovieCatalog,
) -> StartupCheckReport {
    info!("Running startup self-checks...");

    let mut checks = Vec::new();

    // 1. Database connectivity check
    checks.push(check_database_connectivity(db).await);

    // 2. Database schema check
    checks.push(check_database_schema(db).await);

    // 3. Movie catalog check
    checks.push(check_catalog(config, catalog).await);

    // 4. Data directory checks
    checks.push(check_data_directory(config));
    checks.push(check_directory_writability(config));

    let report = StartupCheckReport::new(checks);

    // Log results
    for check in &report.checks {
        if check.passed {
            info!(
                check = %check.name,
                message = %check.message,
                "Startup check PASSED"
            );
        } else if check.critical {
            error!(
                check = %check.name,
                message = %check.message,
                details = ?check.details,
                "Startup check FAILED (CRITICAL)"
            );
        } else {
            warn!(
                check = %check.name,
                message = %check.message,
                details = ?check.details,
                "Startup check FAILED (non-critical)"
            );
        }
    }

    info!(
        summary = %report.summary,
        all_passed = report.all_passed,
        all_critical_passed = report.all_critical_passed,
        "Startup checks completed"
    );

    report
}

/// Check database connectivity
async fn check_database_connectivity(db: &DbPool) -> CheckResult {
    match sqlx::query("SELECT 1").fetch_one(db).await {
        Ok(_) => CheckResult::pass("database_connectivity", "Database connection successful"),
        Err(e) => CheckResult::fail(
            "database_connectivity",
            "Failed to connect to database",
            true,
        )
        .with_details(e.to_string()),
    }
}

/// Check that the migrated schema carries the tables we depend on
async fn check_database_schema(db: &DbPool) -> CheckResult {
    let result: Result<Vec<(String,)>, _> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )
    .fetch_all(db)
    .await;

    match result {
        Ok(tables) => {
            let table_names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();

            let essential_tables = ["users", "watchlist", "sessions"];
            let missing: Vec<&str> = essential_tables
                .iter()
                .filter(|t| !table_names.contains(*t))
                .copied()
                .collect();

            if missing.is_empty() {
                CheckResult::pass(
                    "database_schema",
                    format!("Database schema valid ({} tables)", tables.len()),
                )
                .with_details(format!("Tables: {}", table_names.join(", ")))
            } else {
                CheckResult::fail("database_schema", "Missing essential database tables", true)
                    .with_details(format!("Missing: {}", missing.join(", ")))
            }
        }
        Err(e) => CheckResult::fail("database_schema", "Failed to query database schema", true)
            .with_details(e.to_string()),
    }
}

/// Check catalog configuration and reachability. Both failures are
/// non-critical: the server still serves watchlists, browsing degrades.
async fn check_catalog(config: &Config, catalog: &dyn MovieCatalog) -> CheckResult {
    if config.catalog.api_key.is_empty() {
        return CheckResult::fail("catalog", "Catalog API key not configured", false)
            .with_details("Set catalog.api_key or REELIST_TMDB_API_KEY to enable browsing");
    }

    match catalog.fetch_popular(1).await {
        Ok(movies) => CheckResult::pass(
            "catalog",
            format!("{} reachable", catalog.name()),
        )
        .with_details(format!("{} movies on page 1", movies.len())),
        Err(e) => CheckResult::fail(
            "catalog",
            format!("{} not reachable", catalog.name()),
            false,
        )
        .with_details(e.to_string()),
    }
}

/// Check that the data directory exists
fn check_data_directory(config: &Config) -> CheckResult {
    let data_dir = &config.server.data_dir;

    if data_dir.exists() {
        CheckResult::pass("data_directory", "Data directory exists")
            .with_details(format!("Path: {}", data_dir.display()))
    } else {
        CheckResult::fail("data_directory", "Data directory is missing", true)
            .with_details(format!("Path: {}", data_dir.display()))
    }
}

/// Check that the data directory is writable
fn check_directory_writability(config: &Config) -> CheckResult {
    let data_dir = &config.server.data_dir;

    // Try to create a test file
    let test_file = data_dir.join(".reelist_write_test");

    match std::fs::write(&test_file, "test") {
        Ok(_) => {
            // Clean up test file
            let _ = std::fs::remove_file(&test_file);
            CheckResult::pass("directory_writability", "Data directory is writable")
                .with_details(format!("Path: {}", data_dir.display()))
        }
        Err(e) => CheckResult::fail(
            "directory_writability",
            "Data directory is not writable",
            true,
        )
        .with_details(format!("{}: {}", data_dir.display(), e)),
    }
}
