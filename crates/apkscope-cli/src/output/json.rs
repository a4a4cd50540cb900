//! JSON output formatter for machine-readable results.

use super::formatter::AbiReport;
use super::formatter::ClassQuery;
use super::formatter::ClassesReport;
use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use super::formatter::PackageRow;
use anyhow::Result;
use apkscope_core::PackageReport;
use serde::Serialize;
use std::io::Write;
use std::io::{self};

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &PackageReport) -> Result<()> {
        Self::output(&JsonOutput::success("inspect", report))
    }

    fn format_abi(&self, report: &AbiReport) -> Result<()> {
        Self::output(&JsonOutput::success("abi", report))
    }

    fn format_classes(&self, report: &ClassesReport) -> Result<()> {
        Self::output(&JsonOutput::success("classes", report))
    }

    fn format_class_query(&self, query: &ClassQuery) -> Result<()> {
        Self::output(&JsonOutput::success("has-class", query))
    }

    fn format_packages(&self, rows: &[PackageRow]) -> Result<()> {
        Self::output(&JsonOutput::success("list", rows))
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData<'a> {
            message: &'a str,
        }

        let _ = Self::output(&JsonOutput::warning("warning", WarningData { message }));
    }
}
