//! Command-line front end for the tautomer engine.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tautogen::io::{SmilesFileSink, SmilesFileSource};
use tautogen::pipeline::{self, Settings};
use tracing_subscriber::EnvFilter;

// no `version` flag: its -V short would collide with the vector-bindings
// option
#[derive(Parser, Debug)]
#[command(author, about = "Enumerate and standardise molecular tautomers")]
struct Cli {
    /// Input molecule filename
    #[arg(short = 'I', long)]
    input_molecule_file: PathBuf,

    /// Output molecule filename
    #[arg(short = 'O', long)]
    output_molecule_file: PathBuf,

    /// File of SMIRKS transformations for standardisations
    #[arg(short = 'S', long, visible_alias = "standardize-smirks-file")]
    standardise_smirks_file: Option<PathBuf>,

    /// File of SMIRKS transformations for enumerations
    #[arg(short = 'E', long)]
    enumerate_smirks_file: Option<PathBuf>,

    /// Name of file of vector bindings
    #[arg(short = 'V', long)]
    vector_bindings_file: Option<PathBuf>,

    /// Postfix to molecule name before the tautomer number
    #[arg(long, default_value = "_")]
    name_postfix: String,

    /// Just put each molecule in its standard tautomer
    #[arg(long, visible_alias = "standardize-only")]
    standardise_only: bool,

    /// Limited enumeration: 1,3 shifts between heteroatoms only
    #[arg(long)]
    original_enumeration: bool,

    /// Extended enumeration, with full keto/enol tautomerisation
    #[arg(long)]
    extended_enumeration: bool,

    /// Enumerate protonation states for molecules
    #[arg(long)]
    enumerate_protonation: bool,

    /// Add the name postfix and tautomer number to each output name
    #[arg(long)]
    add_numbers_to_name: bool,

    /// Add the names of the applied rules to each output name
    #[arg(long)]
    add_smirks_to_name: bool,

    /// Just output the canonical tautomer of each molecule
    #[arg(long)]
    canonical_tautomer: bool,

    /// Write each input molecule before its tautomer set
    #[arg(long)]
    include_input_in_output: bool,

    /// Strip out all but the largest component before processing
    #[arg(long)]
    strip_salts: bool,

    /// Maximum number of tautomers per molecule
    #[arg(long, default_value_t = 256)]
    max_tautomers: usize,

    /// Number of worker threads; zero or less leaves that many cores free
    #[arg(long, default_value_t = 1)]
    num_threads: i32,

    /// Extra output saying what's been going on
    #[arg(short = 'W', long)]
    verbose: bool,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            standardise_only: self.standardise_only,
            original_enumeration: self.original_enumeration,
            extended_enumeration: self.extended_enumeration,
            enumerate_protonation: self.enumerate_protonation,
            canonical_tautomer: self.canonical_tautomer,
            include_input_in_output: self.include_input_in_output,
            strip_salts: self.strip_salts,
            add_numbers_to_name: self.add_numbers_to_name,
            add_smirks_to_name: self.add_smirks_to_name,
            name_postfix: self.name_postfix.clone(),
            max_tautomers: self.max_tautomers,
            standardise_file: self.standardise_smirks_file.clone(),
            enumerate_file: self.enumerate_smirks_file.clone(),
            bindings_file: self.vector_bindings_file.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // clap renders usage; the contract is exit status 1 on
            // argument errors
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), tautogen::EngineError> {
    let settings = cli.settings();
    settings.mode()?;
    let source = SmilesFileSource::open(&cli.input_molecule_file)?;
    let sink = SmilesFileSink::create(&cli.output_molecule_file)?;
    pipeline::run(&settings, &source, &sink, cli.num_threads)
}
