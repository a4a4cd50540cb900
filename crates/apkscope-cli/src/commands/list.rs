//! List command implementation.

use crate::cli::ListArgs;
use crate::commands::device_profile;
use crate::commands::load_config;
use crate::error::add_target_context;
use crate::output::OutputFormatter;
use crate::output::PackageRow;
use crate::progress::CliProgress;
use anyhow::Result;
use apkscope_core::Inspector;
use apkscope_core::abi::AbiHints;
use apkscope_core::abi::AbiResolver;
use apkscope_core::archive::resolve_handle;
use apkscope_core::metadata;
use apkscope_core::registry::DirectoryRegistry;
use tracing::debug;

pub fn execute(args: &ListArgs, formatter: &dyn OutputFormatter, suppress_progress: bool) -> Result<()> {
    let root = args.root.display().to_string();
    let inspector = Inspector::new(load_config(&args.engine)?, device_profile(&args.engine));
    let registry = add_target_context(DirectoryRegistry::open(&args.root), &root)?;
    let records = add_target_context(inspector.list_packages(&registry), &root)?;

    let progress = CliProgress::should_show(suppress_progress)
        .then(|| CliProgress::new(records.len(), "Resolving"));
    let resolver = AbiResolver::new(inspector.device(), inspector.config());

    let mut rows = Vec::with_capacity(records.len());
    for record in &records {
        if let Some(progress) = &progress {
            progress.start(&record.id);
        }

        match resolve_handle(record) {
            Ok(handle) => {
                let mut hints = AbiHints::from_record(record);
                hints.is_overlay |= metadata::summary(&handle).is_overlay;
                let abi = resolver.resolve_abi(&handle, &hints, None);
                debug!(package = %record.id, abi = %abi, "resolved");
                rows.push(PackageRow {
                    id: record.id.clone(),
                    path: record.source_dir.display().to_string(),
                    splits: handle.splits().len(),
                    frozen: handle.is_frozen(),
                    abi,
                });
            }
            Err(e) => formatter.format_warning(&format!("skipping {}: {e}", record.id)),
        }

        if let Some(progress) = &progress {
            progress.finish_one();
        }
    }
    drop(progress);

    formatter.format_packages(&rows)
}
