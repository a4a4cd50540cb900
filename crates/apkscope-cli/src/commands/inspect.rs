//! Inspect command implementation.

use crate::cli::InspectArgs;
use crate::commands::device_profile;
use crate::commands::load_config;
use crate::error::add_target_context;
use crate::output::OutputFormatter;
use anyhow::Result;
use apkscope_core::InspectOptions;
use apkscope_core::Inspector;
use apkscope_core::registry::DirectoryRegistry;

pub fn execute(args: &InspectArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let inspector = Inspector::new(load_config(&args.engine)?, device_profile(&args.engine));
    let options = InspectOptions {
        abi_override: args.abi,
        ignore_device_filter: args.all_abis,
    };

    // With --root the target is a package id, otherwise a file
    let report = match &args.root {
        Some(root) => {
            let registry =
                add_target_context(DirectoryRegistry::open(root), &root.display().to_string())?;
            add_target_context(
                inspector.inspect_package(&registry, &args.target, options),
                &args.target,
            )?
        }
        None => add_target_context(inspector.inspect_archive(&args.target, options), &args.target)?,
    };

    formatter.format_report(&report)
}
