//! Human-readable output formatter with colors and styling.

use super::formatter::AbiReport;
use super::formatter::ClassQuery;
use super::formatter::ClassesReport;
use super::formatter::OutputFormatter;
use super::formatter::PackageRow;
use anyhow::Result;
use apkscope_core::Abi;
use apkscope_core::PackageReport;
use apkscope_core::metadata::ComponentKind;
use apkscope_core::metadata::EnabledState;
use console::Term;
use console::style;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    fn heading(&self, text: &str) {
        if self.use_colors {
            self.line(&format!("{}", style(text).bold()));
        } else {
            self.line(text);
        }
    }

    fn field(&self, name: &str, value: impl std::fmt::Display) {
        self.line(&format!("  {:<18}{value}", format!("{name}:")));
    }

    fn abi_list(abis: impl Iterator<Item = Abi>) -> String {
        let names: Vec<String> = abis.map(|abi| abi.to_string()).collect();
        if names.is_empty() {
            "-".to_string()
        } else {
            names.join(", ")
        }
    }

    const fn kind_label(kind: ComponentKind) -> &'static str {
        match kind {
            ComponentKind::Activity => "activity",
            ComponentKind::Service => "service",
            ComponentKind::Receiver => "receiver",
            ComponentKind::Provider => "provider",
        }
    }

    const fn state_label(state: EnabledState) -> &'static str {
        match state {
            EnabledState::Enabled => "enabled",
            EnabledState::Disabled => "disabled",
            EnabledState::Default => "default",
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_report(&self, report: &PackageReport) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let title = report
            .package
            .clone()
            .unwrap_or_else(|| report.path.display().to_string());
        self.heading(&title);

        let summary = &report.summary;
        if let Some(version) = &summary.version_name {
            match summary.version_code {
                Some(code) => self.field("Version", format!("{version} ({code})")),
                None => self.field("Version", version),
            }
        }
        if let Some(min) = summary.min_sdk {
            let target = summary
                .target_sdk
                .map_or_else(|| "-".to_string(), |t| t.to_string());
            self.field("SDK", format!("min {min}, target {target}"));
        }
        self.field("Path", report.path.display());
        self.field("Splits", report.splits);
        self.field("ABI", report.abi);
        self.field("ABI set", Self::abi_list(report.abi_set.iter()));
        self.field(
            "Native libraries",
            format!(
                "{} ({})",
                report.native_libraries.len(),
                Self::format_size(report.native_size())
            ),
        );
        if self.verbose {
            for lib in &report.native_libraries {
                self.line(&format!(
                    "    {:<32} {:>10}",
                    lib.name,
                    Self::format_size(lib.size)
                ));
            }
        }

        for lib in &report.static_libraries {
            self.field("Static library", format!("{} v{}", lib.name, lib.version));
        }

        let provenance = &report.provenance;
        if let Some(version) = &provenance.build_plugin_version {
            self.field("Build plugin", version);
        }
        self.field("Kotlin", if provenance.kotlin { "yes" } else { "no" });
        self.field("Compose", if provenance.compose { "yes" } else { "no" });

        self.field("Permissions", report.permissions.len());
        self.field("Components", report.components.len());
        if self.verbose {
            for permission in &report.permissions {
                self.line(&format!("    {}", permission.name));
            }
            for component in &report.components {
                self.line(&format!(
                    "    {:<9} {:<9} {}",
                    Self::kind_label(component.kind),
                    Self::state_label(component.state),
                    component.name
                ));
            }
        }

        if !report.metadata.is_empty() {
            self.line("");
            self.heading("Metadata");
            for entry in &report.metadata {
                self.line(&format!(
                    "  {} = {}",
                    entry.name,
                    entry.source.as_deref().unwrap_or("")
                ));
            }
        }

        if !report.classes.is_empty() {
            self.line("");
            self.heading(&format!("Classes ({})", report.classes.len()));
            for path in report.classes.iter() {
                self.line(&format!("  {path}"));
            }
        }

        Ok(())
    }

    fn format_abi(&self, report: &AbiReport) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.line(&report.abi.to_string());
        if self.verbose {
            self.field("ABI set", Self::abi_list(report.abi_set.iter()));
            self.field("Path", &report.path);
        }
        Ok(())
    }

    fn format_classes(&self, report: &ClassesReport) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        for path in report.classes.iter() {
            self.line(path);
        }
        if self.verbose {
            self.line("");
            self.line(&format!(
                "{} entries from {} DEX containers{}",
                report.classes.len(),
                report.containers,
                if report.kotlin_runtime {
                    ", Kotlin runtime bundled"
                } else {
                    ""
                }
            ));
        }
        Ok(())
    }

    fn format_class_query(&self, query: &ClassQuery) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        if query.found {
            if self.use_colors {
                self.line(&format!("{} {} found", style("✓").green().bold(), query.class));
            } else {
                self.line(&format!("{} found", query.class));
            }
        } else if self.use_colors {
            self.line(&format!("{} {} not found", style("✗").red().bold(), query.class));
        } else {
            self.line(&format!("{} not found", query.class));
        }
        Ok(())
    }

    fn format_packages(&self, rows: &[PackageRow]) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        for row in rows {
            if self.verbose {
                self.line(&format!(
                    "{:<48} {:<28} {} splits  {}",
                    row.id,
                    row.abi.to_string(),
                    row.splits,
                    row.path
                ));
            } else {
                self.line(&format!("{:<48} {}", row.id, row.abi));
            }
        }

        self.line("");
        self.line(&format!("Total: {} packages", rows.len()));
        Ok(())
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            let _ = Term::stderr().write_line(&format!("{} {message}", style("⚠").yellow().bold()));
        } else {
            let _ = Term::stderr().write_line(&format!("WARNING: {message}"));
        }
    }
}
