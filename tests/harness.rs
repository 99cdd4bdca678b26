//! Shared helpers for the integration suite.

use tautogen::io::{VecSink, VecSource};
use tautogen::pipeline::{self, Settings};
use tautogen::{perception, smiles, Molecule};

/// Parses and prepares a molecule the way the pipeline would.
pub fn prepared(input: &str, title: &str) -> Molecule {
    let mut mol = smiles::parse(input).unwrap_or_else(|e| panic!("bad test SMILES: {}", e));
    mol.set_title(title);
    perception::prepare(&mut mol).unwrap();
    mol
}

/// Canonical SMILES of a freshly parsed and prepared string.
pub fn canonical(input: &str) -> String {
    smiles::canonical_smiles(&prepared(input, ""))
}

/// Runs the full pipeline over one molecule with a single worker and
/// returns everything written to the sink.
pub fn run_pipeline(settings: &Settings, input: &str, title: &str) -> Vec<Molecule> {
    let source = VecSource::new(vec![{
        let mut mol = smiles::parse(input).unwrap();
        mol.set_title(title);
        mol
    }]);
    let sink = VecSink::new();
    pipeline::run(settings, &source, &sink, 1)
        .unwrap_or_else(|e| panic!("pipeline failed for '{}': {}", input, e));
    sink.into_molecules()
}

/// Canonical SMILES of every molecule in a batch, in batch order.
pub fn canonical_set(mols: &[Molecule]) -> Vec<String> {
    mols.iter().map(smiles::canonical_smiles).collect()
}
