use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use gran_dt_equivalences::io::csv_write::CSV_MIME;
use gran_dt_equivalences::io::docx_write::DOCX_MIME;
use gran_dt_equivalences::mapping::{InclusionToggles, MappingOverrides};
use gran_dt_equivalences::model::DocumentHeader;
use gran_dt_equivalences::pipeline::{self, GenerateOptions, LoadedSheet, Source};
use gran_dt_equivalences::{Result, ToolError};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging(cli.verbose, cli.quiet) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
    if let Err(error) = run(cli) {
        if error.is_read_failure() {
            eprintln!("error: could not read the workbook, check the link. Detail: {error}");
        } else {
            eprintln!("error: {error}");
        }
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Inspect(args) => execute_inspect(args),
        Command::Generate(args) => execute_generate(args),
    }
}

fn execute_inspect(args: InspectArgs) -> Result<()> {
    let loaded = load(&args.source)?;
    let inspection = pipeline::inspect(&loaded, args.mapping.into())?;
    println!("{}", serde_json::to_string_pretty(&inspection)?);
    Ok(())
}

fn execute_generate(args: GenerateArgs) -> Result<()> {
    let loaded = load(&args.source)?;
    let options = GenerateOptions {
        overrides: args.mapping.into(),
        toggles: InclusionToggles {
            all: args.all,
            include: args.include,
            exclude: args.exclude,
        },
        header: DocumentHeader {
            student: args.student,
            id: args.id,
            program: args.program,
            term: args.term,
        },
    };
    let outputs = pipeline::render_selection(&loaded, options)?;
    let written = pipeline::write_outputs(&outputs, &args.out_dir)?;
    println!("Selected rows: {}", outputs.rows);
    println!("{} ({DOCX_MIME})", written.document.display());
    println!("{} ({CSV_MIME})", written.export.display());
    Ok(())
}

fn load(args: &SourceArgs) -> Result<LoadedSheet> {
    let source = match (&args.link, &args.file) {
        (Some(link), _) => Source::Link(link.clone()),
        (None, Some(path)) => Source::File(path.clone()),
        (None, None) => {
            return Err(ToolError::InvalidWorkbook(
                "pass a shared link with --link or a local file with --file".into(),
            ));
        }
    };
    pipeline::load_sheet(&source, args.sheet.as_deref())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Build an ITBA ↔ POLIMI equivalence proposal from a shared spreadsheet."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show sheets, columns, guessed mapping, and the working table as JSON.
    Inspect(InspectArgs),
    /// Render the selected rows into the DOCX proposal and the CSV export.
    Generate(GenerateArgs),
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Shared link to the workbook (a direct-download flag is added).
    #[arg(long, required_unless_present = "file", conflicts_with = "file")]
    link: Option<String>,

    /// Local workbook path.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Sheet to read. Defaults to the first sheet.
    #[arg(long)]
    sheet: Option<String>,
}

#[derive(clap::Args)]
struct MappingArgs {
    /// Column whose value decides the initial inclusion of each row.
    #[arg(long)]
    select_col: Option<String>,

    /// Ignore any guessed selection column; every row starts excluded.
    #[arg(long, conflicts_with = "select_col")]
    no_select_col: bool,

    /// Column holding the ITBA course code.
    #[arg(long)]
    itba_code: Option<String>,

    /// Column holding the ITBA course name.
    #[arg(long)]
    itba_name: Option<String>,

    /// Column holding the ITBA credits.
    #[arg(long)]
    itba_credits: Option<String>,

    /// Column holding the POLIMI course code.
    #[arg(long)]
    polimi_code: Option<String>,

    /// Column holding the POLIMI course name.
    #[arg(long)]
    polimi_name: Option<String>,

    /// Column holding the POLIMI ECTS.
    #[arg(long)]
    polimi_ects: Option<String>,
}

impl From<MappingArgs> for MappingOverrides {
    fn from(args: MappingArgs) -> Self {
        MappingOverrides {
            selection: args.select_col,
            no_selection: args.no_select_col,
            itba_code: args.itba_code,
            itba_name: args.itba_name,
            itba_credits: args.itba_credits,
            polimi_code: args.polimi_code,
            polimi_name: args.polimi_name,
            polimi_ects: args.polimi_ects,
        }
    }
}

#[derive(clap::Args)]
struct InspectArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    mapping: MappingArgs,
}

#[derive(clap::Args)]
struct GenerateArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    mapping: MappingArgs,

    /// Include every row before applying --include/--exclude.
    #[arg(long)]
    all: bool,

    /// Include the given 1-based data row (repeatable).
    #[arg(long, value_name = "ROW")]
    include: Vec<usize>,

    /// Exclude the given 1-based data row (repeatable).
    #[arg(long, value_name = "ROW")]
    exclude: Vec<usize>,

    /// Student name for the header.
    #[arg(long)]
    student: Option<String>,

    /// Student ID for the header.
    #[arg(long)]
    id: Option<String>,

    /// Degree program for the header.
    #[arg(long)]
    program: Option<String>,

    /// Exchange term for the header.
    #[arg(long)]
    term: Option<String>,

    /// Directory that receives the generated files.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}
