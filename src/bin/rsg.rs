//! rsg CLI - Write an annotated repository tree to `repo-structure.md`.

use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use rsg::builder::Rsg;
use rsg::errors::{exit_code, RsgError};
use rsg::output::write_report;
use rsg::tree::Glyphs;

#[derive(Parser)]
#[command(name = "rsg")]
#[command(about = "Render a repository's structure with Python annotations")]
#[command(version)]
struct Cli {
    /// Root directory to scan
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Exclusion glob patterns, relative to the current directory
    #[arg(short = 'I', long = "ignore", value_delimiter = ',')]
    ignore: Vec<String>,

    /// Log progress and print the tree to stdout
    #[arg(short, long)]
    verbose: bool,

    /// Directory to write repo-structure.md into
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Render a plain tree without source annotations
    #[arg(long)]
    no_annotations: bool,

    /// Use ASCII connectors instead of box-drawing characters
    #[arg(long)]
    ascii: bool,

    /// Do not read .rsgignore from the root
    #[arg(long)]
    no_ignore_file: bool,

    /// Descend into symlinked directories (by default they are listed but not
    /// expanded)
    #[arg(long)]
    follow_symlinks: bool,

    /// Print a shell completion script and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

fn main() {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        generate(shell, &mut Cli::command(), "rsg", &mut std::io::stdout());
        return;
    }

    rsg::logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(exit_code(&e));
    }
}

fn run(cli: Cli) -> Result<(), RsgError> {
    let glyphs = if cli.ascii {
        Glyphs::ascii()
    } else {
        Glyphs::unicode()
    };

    tracing::info!(root = %cli.root.display(), patterns = cli.ignore.len(), "scanning");

    let tree = Rsg::new(&cli.root)
        .excludes(cli.ignore)
        .ignore_file(!cli.no_ignore_file)
        .annotate(!cli.no_annotations)
        .glyphs(glyphs)
        .follow_symlinks(cli.follow_symlinks)
        .render()?;

    if cli.verbose {
        print!("{tree}");
    }

    let path = write_report(&cli.output_dir, &tree)?;
    tracing::info!(path = %path.display(), "wrote report");
    Ok(())
}
