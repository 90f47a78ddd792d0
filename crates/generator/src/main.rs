//! Generator CLI
//!
//! Run with no arguments from the build tree to rewrite every generated
//! artefact in place.  `--check` validates the API table without writing.

use clap::Parser;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "guestfs-gen")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate the guest-image library API artefacts from the compiled-in table", long_about = None)]
struct Cli {
    /// Root of the build tree to write artefacts into
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Validate the API table and exit without writing anything
    #[arg(long)]
    check: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let model = apigen::api_model();

    let result = if cli.check {
        apigen::check(&model)
    } else {
        apigen::generate_all(&model, &cli.output_dir)
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
