// colmatch CLI - mark cells holding equal values across two spreadsheets

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;

use colmatch_cli::exit_codes::{
    compare_exit_code, CompareErrorOutput, EXIT_ERROR, EXIT_OPEN, EXIT_SUCCESS, EXIT_USAGE,
};
use colmatch_cli::Bindings;
use colmatch_config::Settings;
use colmatch_engine::{compare, CompareError, CompareOptions, ComparisonRequest, MarkMode, MissingColumnPolicy, Rgb};
use colmatch_io::{highlighted_cells, XlsxOpener};

#[derive(Parser)]
#[command(name = "colmatch")]
#[command(about = "Mark cells that hold equal values across two spreadsheets")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare one column of A with one column of B and mark equal cells in place
    #[command(after_help = "\
Examples:
  colmatch compare orders.xlsx invoices.xlsx --col-a 0 --col-b 2
  colmatch compare a.xlsx b.xlsx --col-a 1 --col-b 1 --mark row-range
  colmatch compare a.xlsx b.xlsx --col-a 0 --col-b 0 --missing-column abort --json")]
    Compare {
        /// First document (always saved)
        file_a: PathBuf,

        /// Second document (saved only when marked)
        file_b: PathBuf,

        /// 0-based column in A
        #[arg(long, allow_negative_numbers = true)]
        col_a: i64,

        /// 0-based column in B
        #[arg(long, allow_negative_numbers = true)]
        col_b: i64,

        /// Working sheet [default: from settings, else Sheet1]
        #[arg(long)]
        sheet: Option<String>,

        /// Rows narrower than the column: skip or abort
        #[arg(long)]
        missing_column: Option<MissingColumnPolicy>,

        /// Where marks go: symmetric or row-range
        #[arg(long)]
        mark: Option<MarkMode>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List cells carrying the highlight fill
    Marks {
        file: PathBuf,

        #[arg(long)]
        sheet: Option<String>,

        /// Fill colour as #RRGGBB [default: from settings]
        #[arg(long)]
        fill: Option<Rgb>,

        #[arg(long)]
        json: bool,
    },

    /// Invoke a named operation with a JSON argument array
    #[command(after_help = "\
Examples:
  colmatch call excel_diff '[\"a.xlsx\", \"b.xlsx\", 0, 0]'
  colmatch call list_files '[\".\"]'")]
    Call {
        name: String,

        /// JSON array of arguments
        #[arg(default_value = "[]")]
        args: String,
    },

    /// Show effective settings
    Settings {
        /// Print only the settings file path
        #[arg(long)]
        path: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  colmatch-engine ", env!("CARGO_PKG_VERSION"),
    )
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: colmatch <command> [options]");
            eprintln!("       colmatch --help for more information");
            Ok(())
        }
        Some(Commands::Compare {
            file_a,
            file_b,
            col_a,
            col_b,
            sheet,
            missing_column,
            mark,
            json,
        }) => cmd_compare(file_a, file_b, col_a, col_b, sheet, missing_column, mark, json),
        Some(Commands::Marks { file, sheet, fill, json }) => cmd_marks(file, sheet, fill, json),
        Some(Commands::Call { name, args }) => cmd_call(name, args),
        Some(Commands::Settings { path }) => cmd_settings(path),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Create error from a comparison failure with its exit code.
    pub fn compare(err: &CompareError) -> Self {
        let hint = match err {
            CompareError::NegativeColumn { .. } => Some("columns are 0-based: A is 0".to_string()),
            CompareError::Open { .. } => Some("check the path and that the file is .xlsx".to_string()),
            CompareError::ReadRows { .. } => Some("use --sheet to choose the working sheet".to_string()),
            CompareError::ColumnNotFound { .. } => {
                Some("use --missing-column skip to ignore narrow rows".to_string())
            }
            _ => None,
        };
        Self { code: compare_exit_code(err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Settings → options, or a usage error naming the settings file.
fn load_options() -> Result<CompareOptions, CliError> {
    Settings::load().compare_options().map_err(|e| {
        CliError::usage(e).with_hint(format!("edit {}", Settings::config_path_display()))
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CliError::io(e.to_string()))?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", json).map_err(|e| CliError::io(e.to_string()))
}

// ============================================================================
// compare
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn cmd_compare(
    file_a: PathBuf,
    file_b: PathBuf,
    col_a: i64,
    col_b: i64,
    sheet: Option<String>,
    missing_column: Option<MissingColumnPolicy>,
    mark: Option<MarkMode>,
    json: bool,
) -> Result<(), CliError> {
    // Flags override settings; settings override defaults.
    let mut options = load_options()?;
    if let Some(sheet) = sheet {
        options.sheet = sheet;
    }
    if let Some(policy) = missing_column {
        options.missing_column = policy;
    }
    if let Some(mode) = mark {
        options.mark_mode = mode;
    }

    let request = ComparisonRequest::new(file_a, file_b, col_a, col_b);
    match compare(&request, &XlsxOpener, &options) {
        Ok(report) => {
            if json {
                print_json(&report)
            } else {
                println!("{}", report.status_line());
                Ok(())
            }
        }
        Err(e) => {
            if json {
                print_json(&CompareErrorOutput::from_compare_error(&e))?;
            }
            Err(CliError::compare(&e))
        }
    }
}

// ============================================================================
// marks
// ============================================================================

fn cmd_marks(file: PathBuf, sheet: Option<String>, fill: Option<Rgb>, json: bool) -> Result<(), CliError> {
    let options = load_options()?;
    let sheet = sheet.unwrap_or(options.sheet);
    let fill = fill.unwrap_or(options.style.fill);

    let cells = highlighted_cells(&file, &sheet, fill).map_err(|e| CliError {
        code: EXIT_OPEN,
        message: format!("failed to inspect {}: {}", file.display(), e),
        hint: None,
    })?;

    if json {
        return print_json(&cells);
    }
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for cell in cells {
        writeln!(handle, "{}", cell).map_err(|e| CliError::io(e.to_string()))?;
    }
    Ok(())
}

// ============================================================================
// call
// ============================================================================

fn cmd_call(name: String, args: String) -> Result<(), CliError> {
    let args: Value = serde_json::from_str(&args)
        .map_err(|e| CliError::usage(format!("arguments are not valid JSON: {}", e)))?;
    let Value::Array(args) = args else {
        return Err(CliError::usage("arguments must be a JSON array"));
    };

    let bindings = Bindings::new(load_options()?);
    let result = bindings.call(&name, &args).map_err(|e| {
        CliError::usage(e.to_string()).with_hint(format!("operations: {}", bindings.names().join(", ")))
    })?;

    let json = serde_json::to_string(&result).map_err(|e| CliError::io(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

// ============================================================================
// settings
// ============================================================================

fn cmd_settings(path: bool) -> Result<(), CliError> {
    if path {
        println!("{}", Settings::config_path_display());
        return Ok(());
    }
    print_json(&Settings::load())
}
