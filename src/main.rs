//! Purpose: `n3-native` CLI entry point; a reference host for the native library.
//! Role: Binary crate root; parses args, calls the C ABI through `host`, writes raw output bytes.
//! Invariants: Successful commands write exactly the library output bytes to stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr; stdout stays empty.
//! Invariants: Process exit code is derived from `to_exit_code`.
use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use namel3ss_native::abi::n3_status;
use namel3ss_native::host::{self, LibraryBuffer};
use namel3ss_native::{Error, ErrorKind, to_exit_code};
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;

const EMBED_CHECK_INPUT: &[u8] = b"embed-check";

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `n3-native --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    command_dispatch::dispatch_command(cli.command)
        .map_err(add_io_hint)
        .map_err(|err| (err, color_mode))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "n3-native",
    version,
    about = "Native acceleration library for namel3ss, driven from the command line",
    long_about = None,
    after_help = r#"EXAMPLES
  $ n3-native embed-check
  $ n3-native info
  $ n3-native scan app.ai
  $ cat notes.txt | n3-native normalize
  $ n3-native chunk-plan notes.txt --max-chars 400 --overlap 50
  $ n3-native exec-ir flow.json --config runtime.json

Every command calls the library through its C ABI and writes the raw output bytes
to stdout. Set RUST_LOG=debug to see one event per ABI call on stderr."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Hash the literal bytes `embed-check` and print the digest",
        long_about = r#"Reference embedding scenario: builds an input view over `embed-check`,
calls hash, writes the output bytes to stdout, then releases them.
Any non-OK status exits non-zero with nothing on stdout."#
    )]
    EmbedCheck,
    #[command(about = "Print the library info payload (version, ABI, capabilities)")]
    Info,
    #[command(
        about = "Tokenize namel3ss source into a JSON token list",
        after_help = r#"EXAMPLES
  $ n3-native scan app.ai
  $ n3-native scan - < app.ai"#
    )]
    Scan {
        #[arg(help = "Source file (default: stdin)", value_hint = ValueHint::FilePath)]
        input: Option<PathBuf>,
    },
    #[command(about = "Print the lowercase hex SHA-256 digest of the input bytes")]
    Hash {
        #[arg(help = "Input file (default: stdin)", value_hint = ValueHint::FilePath)]
        input: Option<PathBuf>,
    },
    #[command(about = "Normalize UTF-8 text (line endings, controls, blank lines)")]
    Normalize {
        #[arg(help = "Input file (default: stdin)", value_hint = ValueHint::FilePath)]
        input: Option<PathBuf>,
    },
    #[command(
        about = "Plan overlapping chunks over UTF-8 text",
        long_about = r#"Split text into chunks of at most --max-chars characters, each starting
--overlap characters before the previous chunk ended. Prints the json-v1 plan."#
    )]
    ChunkPlan {
        #[arg(help = "Input file (default: stdin)", value_hint = ValueHint::FilePath)]
        input: Option<PathBuf>,
        #[arg(
            long,
            env = "N3_CHUNK_MAX_CHARS",
            default_value_t = 800,
            help = "Maximum characters per chunk"
        )]
        max_chars: u32,
        #[arg(
            long,
            env = "N3_CHUNK_OVERLAP",
            default_value_t = 100,
            help = "Characters shared between neighbouring chunks (must be < --max-chars)"
        )]
        overlap: u32,
    },
    #[command(
        arg_required_else_help = true,
        about = "Execute a flow IR document and print the result envelope"
    )]
    ExecIr {
        #[arg(help = "IR JSON file (`-` for stdin)", value_hint = ValueHint::FilePath)]
        ir: PathBuf,
        #[arg(long, help = "Runtime config JSON file", value_hint = ValueHint::FilePath)]
        config: Option<PathBuf>,
    },
    #[command(about = "Generate shell completion scripts")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>, Error> {
    match path {
        None => read_stdin(),
        Some(path) if path == Path::new("-") => read_stdin(),
        Some(path) => fs::read(path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to read {}", path.display()))
                .with_hint("Check that the file exists and is readable.")
                .with_source(err)
        }),
    }
}

fn read_stdin() -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::new();
    io::stdin().lock().read_to_end(&mut bytes).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read stdin")
            .with_source(err)
    })?;
    Ok(bytes)
}

fn write_output(bytes: &[u8]) -> Result<(), Error> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(bytes)
        .and_then(|()| stdout.flush())
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write output")
                .with_source(err)
        })
}

fn emit_buffer(buffer: LibraryBuffer) -> Result<RunOutcome, Error> {
    write_output(buffer.as_bytes())?;
    Ok(RunOutcome::ok())
}

fn add_io_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Io || err.hint().is_some() {
        return err;
    }
    err.with_hint("I/O error. Check the path and that stdout is writable.")
}

/// Prefix of one stderr diagnostic line.
#[derive(Copy, Clone)]
enum Label {
    Error,
    Hint,
    Cause,
}

impl Label {
    fn render(self, use_color: bool) -> String {
        let (text, ansi) = match self {
            Label::Error => ("error:", "31"),
            Label::Hint => ("hint:", "33"),
            Label::Cause => ("caused by:", "33"),
        };
        if use_color {
            format!("\u{1b}[{ansi}m{text}\u{1b}[0m")
        } else {
            text.to_string()
        }
    }
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    let rendered = if is_tty {
        error_text(err, color_mode.use_color(is_tty))
    } else {
        serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
            r#"{"error":{"kind":"Internal","message":"json encode failed"}}"#.to_string()
        })
    };
    eprintln!("{rendered}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::NotImplemented => "operation not available in this build".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::State => "invalid state".to_string(),
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    inner.insert(
        "status".to_string(),
        json!(n3_status::from_kind(err.kind()).name()),
    );
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let line = |label: Label, body: &str| format!("{} {body}", label.render(use_color));
    let mut lines = vec![line(Label::Error, &error_message(err))];
    lines.extend(err.hint().map(|hint| line(Label::Hint, hint)));
    lines.extend(error_causes(err).iter().map(|cause| line(Label::Cause, cause.as_str())));
    lines.join("\n")
}

/// First meaningful line of clap's rendered error, without its `error:` prefix.
fn clap_error_summary(err: &clap::Error) -> String {
    err.to_string()
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.strip_prefix("error:").unwrap_or(line).trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}
