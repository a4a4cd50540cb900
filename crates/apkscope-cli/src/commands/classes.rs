//! Classes command implementation.

use crate::cli::ClassesArgs;
use crate::commands::load_config;
use crate::commands::open_standalone;
use crate::output::ClassesReport;
use crate::output::OutputFormatter;
use anyhow::Result;
use apkscope_core::dex;
use apkscope_core::dex::DexLimits;
use apkscope_core::metadata;

pub fn execute(args: &ClassesArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let config = load_config(&args.engine)?;
    let handle = open_standalone(&args.archive)?;

    let own_package = args
        .own_package
        .clone()
        .or_else(|| metadata::summary(&handle).package);
    let scan = dex::scan_classes(
        &handle,
        own_package.as_deref(),
        DexLimits::from(&config),
        &config.deep_hierarchy_exceptions,
    );

    formatter.format_classes(&ClassesReport {
        path: args.archive.display().to_string(),
        containers: scan.containers,
        kotlin_runtime: scan.saw_runtime,
        classes: scan.summary,
    })
}
