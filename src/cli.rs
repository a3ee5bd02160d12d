// Command-line front end for oxibps.
//
// Uses explicit subcommands and long-form options over the file helpers in
// `io` and the patch model in `bps`.

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::bps::patch::Patch;
use crate::engine::{CreateOptions, DiffMode};
use crate::hash::config::{self, DEFAULT, FAST, THOROUGH};
use crate::io::{self, IoError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const DEFAULT_LEVEL: u32 = 6;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// BPS binary patch creator/applier.
#[derive(Parser, Debug)]
#[command(
    name = "oxibps",
    version,
    about = "BPS binary patch creator/applier",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create a patch that turns SOURCE into TARGET.
    Create(CreateArgs),
    /// Apply a patch to a source file.
    Apply(ApplyArgs),
    /// Check that a source file matches the one a patch was made from.
    Validate(ValidateArgs),
    /// Print patch header, sizes, checksums and an action summary.
    Info(PatchArgs),
    /// Print every action with its output offset.
    Actions(PatchArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Linear,
    Delta,
}

impl From<ModeArg> for DiffMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Linear => DiffMode::Linear,
            ModeArg::Delta => DiffMode::Delta,
        }
    }
}

#[derive(Args, Debug)]
struct CreateArgs {
    /// Original (source) file.
    #[arg(long, short = 's', value_hint = ValueHint::FilePath)]
    source: PathBuf,

    /// Modified (target) file.
    #[arg(long, short = 't', value_hint = ValueHint::FilePath)]
    target: PathBuf,

    /// Diff strategy.
    #[arg(long, short = 'm', value_enum, default_value_t = ModeArg::Delta)]
    mode: ModeArg,

    /// Search effort level (0-9).
    #[arg(long, short = 'l', value_parser = clap::value_parser!(u32).range(0..=9), default_value_t = DEFAULT_LEVEL)]
    level: u32,

    /// Text stored in the patch metadata field.
    #[arg(long, default_value = "")]
    metadata: String,

    /// Patch file to write.
    #[arg(value_hint = ValueHint::FilePath)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Original (source) file.
    #[arg(long, short = 's', value_hint = ValueHint::FilePath)]
    source: PathBuf,

    /// Skip the source checksum check (the target checksum is still verified).
    #[arg(long = "no-verify-source")]
    no_verify_source: bool,

    /// Patch file.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,

    /// Output (target) file to write.
    #[arg(value_hint = ValueHint::FilePath)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Source file to check.
    #[arg(long, short = 's', value_hint = ValueHint::FilePath)]
    source: PathBuf,

    /// Patch file.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,
}

#[derive(Args, Debug)]
struct PatchArgs {
    /// Patch file.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Create,
    Apply,
    Validate,
    Info,
    Actions,
    Config,
}

#[derive(Debug)]
struct Options {
    command: Command,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    mode: DiffMode,
    level: u32,
    metadata: String,
    verify_source: bool,
    source_file: Option<PathBuf>,
    target_file: Option<PathBuf>,
    patch_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
}

impl Options {
    fn new(command: Command, cli: &Cli) -> Self {
        Self {
            command,
            force: cli.force,
            quiet: cli.quiet,
            verbose: cli.verbose.min(2),
            json_output: cli.json_output,
            mode: DiffMode::Delta,
            level: DEFAULT_LEVEL,
            metadata: String::new(),
            verify_source: true,
            source_file: None,
            target_file: None,
            patch_file: None,
            output_file: None,
        }
    }
}

fn resolve_options(cli: Cli) -> Options {
    match &cli.command {
        Cmd::Create(args) => Options {
            mode: args.mode.into(),
            level: args.level,
            metadata: args.metadata.clone(),
            source_file: Some(args.source.clone()),
            target_file: Some(args.target.clone()),
            output_file: Some(args.output.clone()),
            ..Options::new(Command::Create, &cli)
        },
        Cmd::Apply(args) => Options {
            verify_source: !args.no_verify_source,
            source_file: Some(args.source.clone()),
            patch_file: Some(args.patch.clone()),
            output_file: Some(args.output.clone()),
            ..Options::new(Command::Apply, &cli)
        },
        Cmd::Validate(args) => Options {
            source_file: Some(args.source.clone()),
            patch_file: Some(args.patch.clone()),
            ..Options::new(Command::Validate, &cli)
        },
        Cmd::Info(args) => Options {
            patch_file: Some(args.patch.clone()),
            ..Options::new(Command::Info, &cli)
        },
        Cmd::Actions(args) => Options {
            patch_file: Some(args.patch.clone()),
            ..Options::new(Command::Actions, &cli)
        },
        Cmd::Config => Options::new(Command::Config, &cli),
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("oxibps".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Path that `resolve_options` fills in for the running command.
fn required<'a>(path: &'a Option<PathBuf>, what: &str) -> Result<&'a Path, i32> {
    path.as_deref().ok_or_else(|| {
        eprintln!("oxibps: missing {what} file");
        1
    })
}

fn check_overwrite(path: &Path, force: bool) -> Result<(), i32> {
    if path.exists() && !force {
        eprintln!(
            "oxibps: output file exists, use -f to overwrite: {}",
            path.display()
        );
        return Err(1);
    }
    Ok(())
}

fn report_error(e: &IoError) -> i32 {
    eprintln!("oxibps: {e}");
    1
}

fn print_json(json: &serde_json::Value) {
    match serde_json::to_string_pretty(json) {
        Ok(s) => eprintln!("{s}"),
        Err(e) => eprintln!("oxibps: json error: {e}"),
    }
}

fn hex_digest(digest: Option<[u8; 32]>) -> Option<String> {
    digest.map(|d| d.iter().map(|b| format!("{b:02x}")).collect())
}

fn load_patch(path: &Path) -> Result<Patch, i32> {
    io::read_patch_file(path).map_err(|e| report_error(&e))
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> Result<(), i32> {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("oxibps version {version} (Rust), Copyright (C) oxibps contributors");
    eprintln!("Licensed under the MIT License");

    let file_io = cfg!(feature = "file-io") as u8;
    let ptr_size = std::mem::size_of::<*const ()>();

    eprintln!("FILE_IO={file_io}");
    eprintln!("DEFAULT_LEVEL={DEFAULT_LEVEL}");
    for profile in [FAST, DEFAULT, THOROUGH] {
        eprintln!(
            "PROFILE_{}: min_source_read={} min_copy={} max_chain={} long_enough={}",
            profile.name.to_ascii_uppercase(),
            profile.min_source_read,
            profile.min_copy,
            profile.max_chain,
            profile.long_enough
        );
    }
    eprintln!("sizeof(usize)={ptr_size}");

    Ok(())
}

// ---------------------------------------------------------------------------
// Create command
// ---------------------------------------------------------------------------

fn cmd_create(opts: &Options) -> Result<(), i32> {
    let source = required(&opts.source_file, "source")?;
    let target = required(&opts.target_file, "target")?;
    let output = required(&opts.output_file, "output")?;
    check_overwrite(output, opts.force)?;

    let create_opts = CreateOptions {
        mode: opts.mode,
        level: opts.level,
        metadata: opts.metadata.clone(),
    };
    let stats = io::create_file(source, target, output, &create_opts).map_err(|e| report_error(&e))?;

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "oxibps: create: source size: {}, target size: {}, patch size: {}, actions: {}",
            stats.source_size, stats.target_size, stats.patch_size, stats.actions
        );
    }

    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "create",
            "mode": opts.mode.name(),
            "level": opts.level,
            "profile": config::config_for_level(opts.level).name,
            "source_size": stats.source_size,
            "target_size": stats.target_size,
            "patch_size": stats.patch_size,
            "actions": stats.actions,
            "source_sha256": hex_digest(stats.source_sha256),
            "target_sha256": hex_digest(stats.target_sha256),
        }));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Apply command
// ---------------------------------------------------------------------------

fn cmd_apply(opts: &Options) -> Result<(), i32> {
    let source = required(&opts.source_file, "source")?;
    let patch = required(&opts.patch_file, "patch")?;
    let output = required(&opts.output_file, "output")?;
    check_overwrite(output, opts.force)?;

    let stats =
        io::apply_file(source, patch, output, opts.verify_source).map_err(|e| report_error(&e))?;

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "oxibps: apply: source size: {}, patch size: {}, output size: {}, actions: {}",
            stats.source_size, stats.patch_size, stats.output_size, stats.actions
        );
    }

    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "apply",
            "verify_source": opts.verify_source,
            "source_size": stats.source_size,
            "patch_size": stats.patch_size,
            "output_size": stats.output_size,
            "actions": stats.actions,
            "output_sha256": hex_digest(stats.output_sha256),
        }));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Validate command
// ---------------------------------------------------------------------------

fn cmd_validate(opts: &Options) -> Result<(), i32> {
    let source = required(&opts.source_file, "source")?;
    let patch = required(&opts.patch_file, "patch")?;

    let valid = io::validate_source_file(source, patch).map_err(|e| report_error(&e))?;

    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "validate",
            "valid": valid,
        }));
    }

    if !valid {
        eprintln!(
            "oxibps: source does not match patch: {}",
            source.display()
        );
        return Err(1);
    }
    if !opts.quiet {
        eprintln!("oxibps: source matches patch");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Print commands (info, actions)
// ---------------------------------------------------------------------------

fn cmd_info(opts: &Options) -> Result<(), i32> {
    let path = required(&opts.patch_file, "patch")?;
    let patch = load_patch(path)?;
    let stats = patch.stats();

    println!("BPS patch:                    {}", path.display());
    println!("Patch size:                   {}", patch.encoded_len());
    println!("Source size:                  {}", patch.source_size);
    println!("Target size:                  {}", patch.target_size);
    println!("Metadata length:              {}", patch.metadata.len());
    if !patch.metadata.is_empty() {
        println!("Metadata:                     {}", patch.metadata);
    }
    println!("Source CRC32:                 {:08x}", patch.source_checksum);
    println!("Target CRC32:                 {:08x}", patch.target_checksum);
    println!("Patch CRC32:                  {:08x}", patch.patch_checksum);
    println!("Actions:                      {}", stats.actions());
    println!("  SourceRead:                 {}", stats.source_reads);
    println!("  TargetRead:                 {}", stats.target_reads);
    println!("  SourceCopy:                 {}", stats.source_copies);
    println!("  TargetCopy:                 {}", stats.target_copies);
    println!("Literal bytes:                {}", stats.literal_bytes);
    println!("Copied bytes:                 {}", stats.copied_bytes);

    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "info",
            "patch_size": patch.encoded_len(),
            "source_size": patch.source_size,
            "target_size": patch.target_size,
            "metadata": patch.metadata,
            "source_crc32": patch.source_checksum,
            "target_crc32": patch.target_checksum,
            "patch_crc32": patch.patch_checksum,
            "actions": stats.actions(),
            "source_reads": stats.source_reads,
            "target_reads": stats.target_reads,
            "source_copies": stats.source_copies,
            "target_copies": stats.target_copies,
            "literal_bytes": stats.literal_bytes,
            "copied_bytes": stats.copied_bytes,
        }));
    }

    Ok(())
}

fn cmd_actions(opts: &Options) -> Result<(), i32> {
    let path = required(&opts.patch_file, "patch")?;
    let patch = load_patch(path)?;

    println!("  Index     Offset  Action");
    let mut out_pos = 0u64;
    for (index, action) in patch.actions.iter().enumerate() {
        println!("{index:7} {out_pos:10}  {action}");
        out_pos += u64::from(action.length());
    }
    if out_pos != u64::from(patch.target_size) && !opts.quiet {
        eprintln!(
            "oxibps: warning: actions produce {out_pos} bytes, header says {}",
            patch.target_size
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn log_filter(opts: &Options) -> &'static str {
    if opts.quiet {
        return "error";
    }
    match opts.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(&opts)))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let result = match opts.command {
        Command::Create => cmd_create(&opts),
        Command::Apply => cmd_apply(&opts),
        Command::Validate => cmd_validate(&opts),
        Command::Info => cmd_info(&opts),
        Command::Actions => cmd_actions(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(result.err().unwrap_or(0));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_opts(args: &[&str]) -> Options {
        let argv: Vec<String> = std::iter::once("oxibps".to_string())
            .chain(args.iter().map(|s| s.to_string()))
            .collect();
        let cli = Cli::try_parse_from(argv).expect("cli parse failed");
        resolve_options(cli)
    }

    fn parse_fails(args: &[&str]) -> bool {
        let argv = std::iter::once("oxibps").chain(args.iter().copied());
        Cli::try_parse_from(argv).is_err()
    }

    #[test]
    fn create_subcommand_maps_correctly() {
        let opts = parse_opts(&[
            "create",
            "--source",
            "old.bin",
            "--target",
            "new.bin",
            "--mode",
            "linear",
            "--level",
            "9",
            "--metadata",
            "v1.1",
            "out.bps",
        ]);
        assert_eq!(opts.command, Command::Create);
        assert_eq!(opts.mode, DiffMode::Linear);
        assert_eq!(opts.level, 9);
        assert_eq!(opts.metadata, "v1.1");
        assert_eq!(opts.source_file, Some(PathBuf::from("old.bin")));
        assert_eq!(opts.target_file, Some(PathBuf::from("new.bin")));
        assert_eq!(opts.output_file, Some(PathBuf::from("out.bps")));
    }

    #[test]
    fn create_defaults() {
        let opts = parse_opts(&["create", "-s", "a", "-t", "b", "out"]);
        assert_eq!(opts.mode, DiffMode::Delta);
        assert_eq!(opts.level, DEFAULT_LEVEL);
        assert!(opts.metadata.is_empty());
    }

    #[test]
    fn apply_subcommand_maps_correctly() {
        let opts = parse_opts(&[
            "--quiet",
            "apply",
            "--source",
            "old.bin",
            "--no-verify-source",
            "fix.bps",
            "new.bin",
        ]);
        assert_eq!(opts.command, Command::Apply);
        assert!(!opts.verify_source);
        assert!(opts.quiet);
        assert_eq!(opts.patch_file, Some(PathBuf::from("fix.bps")));
        assert_eq!(opts.output_file, Some(PathBuf::from("new.bin")));

        let verified = parse_opts(&["apply", "-s", "old.bin", "fix.bps", "new.bin"]);
        assert!(verified.verify_source);
    }

    #[test]
    fn global_force_and_json_flags() {
        let opts = parse_opts(&["--force", "--json", "validate", "-s", "a", "p.bps"]);
        assert!(opts.force);
        assert!(opts.json_output);
        assert_eq!(opts.command, Command::Validate);
    }

    #[test]
    fn verbose_is_capped() {
        let opts = parse_opts(&["-v", "-v", "-v", "info", "p.bps"]);
        assert_eq!(opts.verbose, 2);
        assert_eq!(log_filter(&opts), "debug");
        assert_eq!(log_filter(&parse_opts(&["-q", "info", "p.bps"])), "error");
        assert_eq!(log_filter(&parse_opts(&["info", "p.bps"])), "warn");
    }

    #[test]
    fn print_commands_map() {
        assert_eq!(parse_opts(&["info", "p.bps"]).command, Command::Info);
        assert_eq!(parse_opts(&["actions", "p.bps"]).command, Command::Actions);
        assert_eq!(parse_opts(&["config"]).command, Command::Config);
    }

    #[test]
    fn invalid_arguments_rejected() {
        assert!(parse_fails(&["create", "-s", "a", "-t", "b", "--level", "10", "out"]));
        assert!(parse_fails(&["create", "-s", "a", "-t", "b", "--mode", "bsdiff", "out"]));
        assert!(parse_fails(&["create", "-t", "b", "out"]));
        assert!(parse_fails(&["-q", "-v", "config"]));
    }

    #[test]
    fn fuzz_entry_tolerates_garbage() {
        fuzz_try_parse_args(&["--nope".to_string()]);
        fuzz_try_parse_args(&["apply".to_string()]);
    }
}
