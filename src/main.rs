use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use clio::ClioPath;
use colorized::{Color, Colors};
use tracing_subscriber::EnvFilter;

use adlbp::{options::Options, source::OsFs, target::Directory, Context};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root of the source tree
    #[clap(short, long, value_parser = clap::value_parser!(ClioPath).exists().is_dir(), default_value = ".")]
    source: ClioPath,

    /// Output directory
    #[clap(value_parser = clap::value_parser!(ClioPath).exists().is_dir())]
    output: ClioPath,

    /// Do not write reformatted source files
    #[clap(long)]
    no_adl: bool,

    /// Do not write component protocols
    #[clap(long)]
    no_bp: bool,

    /// Do not write the linking file
    #[clap(long)]
    no_archbp: bool,

    /// Exit with an error status when anything was reported
    #[clap(long)]
    strict: bool,

    /// More logging, repeat for more detail
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let options = Options {
        emit_adl: !args.no_adl,
        emit_bp: !args.no_bp,
        emit_archbp: !args.no_archbp,
        ..Default::default()
    };

    let mut target = Directory::new(args.output.path());
    let report = Context::new(&OsFs, args.source.path())
        .set_options(options)
        .add_tree()?
        .output(&mut target)?;

    let color = std::io::stderr().is_terminal();
    for diagnostic in &report.diagnostics {
        if diagnostic.has_excerpt() {
            eprintln!("{}", diagnostic.to_snippet(color));
        } else if color {
            eprintln!("{}: {}", "warning".color(Colors::YellowFg), diagnostic);
        } else {
            eprintln!("warning: {}", diagnostic);
        }
    }

    if args.strict && !report.is_clean() {
        eprintln!("{} diagnostic(s) reported", report.diagnostics.len());
        std::process::exit(1);
    }

    Ok(())
}
