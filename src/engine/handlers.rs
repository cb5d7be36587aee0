//! Command handlers for build, lookup and check

use anyhow::{Context, Result, bail};
use log::debug;

use crate::build::build_variants;
use crate::check::check_dir;
use crate::engine::arg_parser::{BuildArgs, CheckArgs, LookupArgs};
use crate::pipeline::CancelToken;
use crate::transform::ProcessorKind;
use crate::utils::{apply_file_to_opts, load_imgen_toml, setup_logging};
use crate::{OutputFormat, Opts, lookup_variant};

/// Opts from defaults, then `.imgen.toml` in the input directory, then CLI flags.
pub fn resolve_build_opts(args: &BuildArgs) -> Result<Opts> {
    let mut opts = Opts {
        in_dir: args.in_dir(),
        ..Opts::default()
    };
    if let Some(file) = load_imgen_toml(&opts.in_dir)? {
        apply_file_to_opts(&file, &mut opts)?;
    }

    if let Some(p) = &args.out_dir {
        opts.out_dir = p.clone();
    }
    if let Some(p) = &args.breakpoints {
        opts.breakpoints_path = p.clone();
    }
    if let Some(p) = &args.db {
        opts.db_path = Some(p.clone());
    }
    if let Some(n) = args.workers {
        opts.workers = Some(n);
    }
    if let Some(name) = &args.processor {
        opts.processor = name.parse::<ProcessorKind>()?;
    }
    if !args.formats.is_empty() {
        opts.formats = args
            .formats
            .iter()
            .map(|f| f.parse::<OutputFormat>())
            .collect::<Result<Vec<_>, _>>()?;
    }
    if let Some(secs) = args.resize_timeout {
        opts.resize_timeout_secs = secs;
    }
    if let Some(v) = args.verbose {
        opts.verbose = v;
    }
    opts.images = args.images.clone();
    Ok(opts)
}

/// Handle the default build command. Ctrl+C cancels the run like a failed job.
pub fn handle_build(args: &BuildArgs) -> Result<()> {
    let opts = resolve_build_opts(args)?;
    setup_logging(opts.verbose);
    debug!("{:#?}", opts);

    let cancel = CancelToken::new();
    let cancel_handler = cancel.clone();
    ctrlc::set_handler(move || {
        if cancel_handler.cancel() {
            log::warn!("Interrupted; waiting for running jobs to finish");
        }
    })
    .context("set Ctrl+C handler")?;

    build_variants(&opts, &cancel).context("build failed")?;
    Ok(())
}

/// Handle lookup command
pub fn handle_lookup(args: &LookupArgs) -> Result<()> {
    setup_logging(args.verbose.unwrap_or(false));
    let format = args.format.parse::<OutputFormat>()?;
    let db_path = args.db_path();
    let found = lookup_variant(
        &db_path,
        args.name.as_deref(),
        args.width,
        args.height,
        format,
    )
    .with_context(|| format!("lookup in {}", db_path.display()))?;
    println!("{}", serde_json::to_string_pretty(&found)?);
    Ok(())
}

/// Handle check command
pub fn handle_check(args: &CheckArgs) -> Result<()> {
    setup_logging(args.verbose.unwrap_or(false));
    let report = check_dir(&args.in_dir)?;
    if !report.is_consistent() {
        bail!(
            "{}: {} unlisted, {} missing",
            args.in_dir.display(),
            report.unlisted.len(),
            report.missing.len()
        );
    }
    Ok(())
}
