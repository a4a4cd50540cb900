//! ABI command implementation.

use crate::cli::AbiArgs;
use crate::commands::device_profile;
use crate::commands::load_config;
use crate::commands::open_standalone;
use crate::output::AbiReport;
use crate::output::OutputFormatter;
use anyhow::Result;
use apkscope_core::abi::AbiHints;
use apkscope_core::abi::AbiResolver;
use apkscope_core::abi::ScanOptions;
use apkscope_core::metadata;

pub fn execute(args: &AbiArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let config = load_config(&args.engine)?;
    let device = device_profile(&args.engine);
    let handle = open_standalone(&args.archive)?;

    let hints = AbiHints {
        is_overlay: metadata::summary(&handle).is_overlay,
        ..AbiHints::default()
    };
    let resolver = AbiResolver::new(&device, &config);
    let abi_set = resolver.resolve_abi_set(
        &handle,
        ScanOptions {
            is_overlay: hints.is_overlay,
            ignore_device_filter: args.all_abis,
        },
    );
    // Ranking always needs the unfiltered set; reuse it when that is what we scanned
    let abi = resolver.resolve_abi(&handle, &hints, args.all_abis.then_some(&abi_set));

    formatter.format_abi(&AbiReport {
        path: args.archive.display().to_string(),
        abi_set,
        abi,
    })
}
