use clap::{Parser, ValueEnum};
use graphviz_rust::cmd::{CommandArg, Format};
use graphviz_rust::exec_dot;
use log::warn;
use oxigraph::io::RdfFormat;
use shacl_engine::{format_for_path, DiagnosticFormatter, ShaclEngine, Source, SourceMap};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser, Debug)]
struct CommonArgs {
    /// Path to the shapes file
    #[arg(short, long, value_name = "FILE")]
    shapes_file: PathBuf,

    /// Path to the data file
    #[arg(short, long, value_name = "FILE")]
    data_file: PathBuf,

    /// Maximum nesting depth for recursive shape references
    #[arg(long, value_name = "DEPTH")]
    max_depth: Option<usize>,
}

#[derive(Parser)]
struct GraphvizArgs {
    #[clap(flatten)]
    common: CommonArgs,
}

#[derive(Parser)]
struct PdfArgs {
    #[clap(flatten)]
    common: CommonArgs,

    /// Path to the output PDF file
    #[arg(short, long, value_name = "FILE")]
    output_file: PathBuf,
}

#[derive(ValueEnum, Clone, Debug, Default)]
enum ValidateOutputFormat {
    #[default]
    Turtle,
    Dump,
    RdfXml,
    NTriples,
    /// Source excerpts with the offending token underlined
    Diagnostics,
}

#[derive(Parser)]
struct ValidateArgs {
    #[clap(flatten)]
    common: CommonArgs,

    /// The output format for the validation report
    #[arg(long, value_enum, default_value_t = ValidateOutputFormat::Turtle)]
    format: ValidateOutputFormat,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Output the Graphviz DOT string of the shape graph
    Graphviz(GraphvizArgs),
    /// Generate a PDF of the shape graph using Graphviz
    Pdf(PdfArgs),
    /// Validate the data against the shapes
    Validate(ValidateArgs),
}

fn get_engine(common: &CommonArgs) -> Result<ShaclEngine, Box<dyn std::error::Error>> {
    let engine = ShaclEngine::from_sources(
        Source::File(common.shapes_file.clone()),
        Source::File(common.data_file.clone()),
    )
    .map_err(|e| format!("Error loading shapes or data: {}", e))?;
    Ok(match common.max_depth {
        Some(depth) => engine.with_max_depth(depth),
        None => engine,
    })
}

/// Token positions for the data file. Only N-Triples input carries them; other
/// formats fall back to plain messages.
fn source_map_for(path: &Path) -> SourceMap {
    let origin = path.display().to_string();
    if format_for_path(path) != RdfFormat::NTriples {
        warn!("Source positions are only recorded for N-Triples data; showing plain messages");
        return SourceMap::new().with_origin(origin);
    }
    match std::fs::read_to_string(path) {
        Ok(text) => SourceMap::from_ntriples(&text).with_origin(origin),
        Err(e) => {
            warn!("Could not re-read {} for diagnostics: {}", origin, e);
            SourceMap::new().with_origin(origin)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Graphviz(args) => {
            let engine = get_engine(&args.common)?;
            println!("{}", engine.to_graphviz());
        }
        Commands::Pdf(args) => {
            let engine = get_engine(&args.common)?;
            let dot_string = engine.to_graphviz();

            let output_file_path_str = args
                .output_file
                .to_str()
                .ok_or("Invalid output file path")?;
            let cmd_args = vec![
                CommandArg::Format(Format::Pdf),
                CommandArg::Output(output_file_path_str.to_string()),
            ];
            exec_dot(dot_string, cmd_args)
                .map_err(|e| format!("Graphviz execution error: {}", e))?;

            println!("PDF generated at: {}", args.output_file.display());
        }
        Commands::Validate(args) => {
            let engine = get_engine(&args.common)?;
            let report = engine.validate();

            match args.format {
                ValidateOutputFormat::Turtle => println!("{}", report.to_turtle()?),
                ValidateOutputFormat::Dump => report.dump(),
                ValidateOutputFormat::RdfXml => println!("{}", report.to_rdf(RdfFormat::RdfXml)?),
                ValidateOutputFormat::NTriples => {
                    println!("{}", report.to_rdf(RdfFormat::NTriples)?)
                }
                ValidateOutputFormat::Diagnostics => {
                    let sources = source_map_for(&args.common.data_file);
                    println!(
                        "{}",
                        DiagnosticFormatter::new(&sources).format_all(report.violations())
                    );
                }
            }
            if !report.conforms() {
                return Ok(ExitCode::from(1));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    env_logger::init();
    run(Cli::parse())
}
