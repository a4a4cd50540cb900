//! Output formatter trait for CLI results.

use anyhow::Result;
use apkscope_core::AbiClassification;
use apkscope_core::AbiSet;
use apkscope_core::PackageReport;
use apkscope_core::dex::DexClassSummary;
use serde::Serialize;

/// Result of the `abi` command.
#[derive(Debug, Serialize)]
pub struct AbiReport {
    pub path: String,
    pub abi_set: AbiSet,
    pub abi: AbiClassification,
}

/// Result of the `classes` command.
#[derive(Debug, Serialize)]
pub struct ClassesReport {
    pub path: String,
    pub containers: usize,
    pub kotlin_runtime: bool,
    pub classes: DexClassSummary,
}

/// Result of the `has-class` command.
#[derive(Debug, Serialize)]
pub struct ClassQuery {
    pub path: String,
    pub class: String,
    pub found: bool,
}

/// One line of the `list` command.
#[derive(Debug, Serialize)]
pub struct PackageRow {
    pub id: String,
    pub path: String,
    pub splits: usize,
    pub frozen: bool,
    pub abi: AbiClassification,
}

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format a full package report
    fn format_report(&self, report: &PackageReport) -> Result<()>;

    /// Format an ABI resolution
    fn format_abi(&self, report: &AbiReport) -> Result<()>;

    /// Format a class summary
    fn format_classes(&self, report: &ClassesReport) -> Result<()>;

    /// Format a class lookup
    fn format_class_query(&self, query: &ClassQuery) -> Result<()>;

    /// Format the installed package list
    fn format_packages(&self, rows: &[PackageRow]) -> Result<()>;

    /// Format warning message
    fn format_warning(&self, message: &str);
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Warning,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Success,
            data: Some(data),
        }
    }

    pub fn warning(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Warning,
            data: Some(data),
        }
    }
}
