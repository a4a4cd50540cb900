//! Has-class command implementation.

use crate::cli::HasClassArgs;
use crate::commands::load_config;
use crate::commands::open_standalone;
use crate::output::ClassQuery;
use crate::output::OutputFormatter;
use anyhow::Result;
use anyhow::bail;
use apkscope_core::dex;
use apkscope_core::dex::DexLimits;

pub fn execute(args: &HasClassArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let config = load_config(&args.engine)?;
    let handle = open_standalone(&args.archive)?;

    let found = dex::contains_class(&handle, &args.class, DexLimits::from(&config));
    formatter.format_class_query(&ClassQuery {
        path: args.archive.display().to_string(),
        class: args.class.clone(),
        found,
    })?;

    // Exit non-zero on a miss so scripts can branch on it
    if !found {
        bail!("class not found: {}", args.class);
    }
    Ok(())
}
