use clap::Parser;
use std::path::{Path, PathBuf};

use tofgen::catalog::Catalog;
use tofgen::codegen::CodegenOptions;

#[derive(Debug, Clone, clap::ValueEnum)]
enum EmitStage {
    Sketch,
    Assembly,
    BuildInfo,
}

#[derive(Parser, Debug)]
#[command(
    name = "tofgen",
    version,
    about = "TOF400C block code generator — turns editor block programs into Arduino sketches"
)]
struct Cli {
    /// Block program (.json)
    source: PathBuf,

    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Dropdown option catalog (.json); built-in options when omitted
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Sketch)]
    emit: EmitStage,

    /// Omit the "Generated by" header comment
    #[arg(long)]
    no_header: bool,

    /// Treat warnings as errors
    #[arg(long)]
    strict: bool,

    /// Log generation steps to stderr
    #[arg(long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "tofgen=debug" } else { "warn" })
    });
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
}

fn write_output(path: Option<&Path>, text: &str) -> std::io::Result<()> {
    match path {
        Some(p) => std::fs::write(p, text),
        None => {
            use std::io::Write;
            std::io::stdout().write_all(text.as_bytes())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    tracing::debug!(source = %cli.source.display(), emit = ?cli.emit, "tofgen start");

    // ── Load option catalog ──
    let catalog = match &cli.catalog {
        Some(path) => match Catalog::load_json(path) {
            Ok(c) => {
                tracing::debug!(sets = c.len(), path = %path.display(), "loaded catalog");
                c
            }
            Err(e) => {
                eprintln!("tofgen: error: {}", e);
                std::process::exit(2);
            }
        },
        None => Catalog::builtin(),
    };

    // ── Read block program ──
    let source = match std::fs::read_to_string(&cli.source) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("tofgen: error: {}: {}", cli.source.display(), e);
            std::process::exit(2);
        }
    };

    // ── Generate ──
    let options = CodegenOptions {
        header: !cli.no_header,
    };
    let mut output = match tofgen::pipeline::generate(&source, &catalog, &options) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("tofgen: error: {}", e);
            std::process::exit(1);
        }
    };

    if cli.strict {
        output.deny_warnings();
    }
    for diag in &output.diagnostics {
        eprintln!("tofgen: {}", diag);
    }
    if output.has_errors() {
        eprintln!(
            "tofgen: error: {} diagnostic(s) with --strict",
            output.diagnostics.len()
        );
        std::process::exit(1);
    }

    let text = match cli.emit {
        EmitStage::Sketch => output.generated.sketch_source,
        EmitStage::Assembly => match serde_json::to_string_pretty(&output.assembly) {
            Ok(mut json) => {
                json.push('\n');
                json
            }
            Err(e) => {
                eprintln!("tofgen: error: {}", e);
                std::process::exit(1);
            }
        },
        EmitStage::BuildInfo => output.provenance.to_json(),
    };

    if let Err(e) = write_output(cli.output.as_deref(), &text) {
        let target = cli
            .output
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<stdout>".to_string());
        eprintln!("tofgen: error: {}: {}", target, e);
        std::process::exit(2);
    }
}
