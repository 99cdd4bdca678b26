#![doc = include_str!("../README.md")]

mod core;

pub mod engine;
pub mod io;
pub mod pattern;
pub mod perception;
pub mod pipeline;
pub mod rules;
pub mod smiles;

pub use crate::core::error::{EngineError, TooManyTautomers};
pub use crate::core::graph::{Atom, Bond, Molecule};
pub use crate::core::{BondDir, BondOrder, Element, Hybridization, Parity};

use crate::engine::{enumerate, standardise, EnumerateError, EnumerateOptions, StandardiseOptions};
use crate::rules::default;
use tracing::warn;

/// Standardises one molecule with the embedded default rules.
///
/// The molecule is prepared (chirality and aromaticity perception plus a
/// canonical round-trip) and then converged under the standardisation rule
/// set.
///
/// # Errors
///
/// Returns [`EngineError`] when the embedded rules fail to load or the
/// molecule cannot be normalized.
pub fn standardise_tautomer(mol: &Molecule) -> Result<Molecule, EngineError> {
    let mut prepared = mol.clone();
    perception::prepare(&mut prepared)?;
    let mut rules = default::standardise()?;
    let result = standardise(&prepared, &mut rules, StandardiseOptions::default())?;
    Ok(result.mol)
}

/// Standardises and then enumerates one molecule with the embedded
/// extended rule set.
///
/// On output-cap overflow the partial set is discarded and a clone of the
/// input is returned alone, with a warning.
///
/// # Errors
///
/// Returns [`EngineError`] for rule-loading or normalization failures.
pub fn enumerate_tautomers(mol: &Molecule) -> Result<Vec<Molecule>, EngineError> {
    let standardised = standardise_tautomer(mol)?;
    let mut rules = default::enumerate_extended()?;
    match enumerate(&standardised, &mut rules, EnumerateOptions::default()) {
        Ok(tauts) => Ok(tauts),
        Err(EnumerateError::OverLimit(e)) => {
            warn!(
                title = %e.title,
                "maximum number of tautomers generated, so none generated"
            );
            Ok(vec![mol.clone()])
        }
        Err(EnumerateError::Engine(e)) => Err(e),
    }
}

/// Returns the canonical tautomer: the first element of the sorted
/// enumeration.
///
/// # Errors
///
/// Returns [`EngineError`] for rule-loading or normalization failures.
pub fn canonical_tautomer(mol: &Molecule) -> Result<Molecule, EngineError> {
    let mut tauts = enumerate_tautomers(mol)?;
    // enumeration always returns at least the input
    Ok(tauts.swap_remove(0))
}

/// Enumerates tautomers of a SMILES string, returning canonical SMILES.
///
/// The canonical form of the input is first, followed by every other
/// distinct tautomer in the enumerator's sorted order.
///
/// # Errors
///
/// Returns [`EngineError::SmilesParse`] for malformed input and any
/// rule-loading failure.
///
/// # Examples
///
/// ```
/// let forms = tautogen::enumerate_tautomers_smiles("CCC(=O)C").unwrap();
/// assert!(forms.len() >= 2);
/// ```
pub fn enumerate_tautomers_smiles(input: &str) -> Result<Vec<String>, EngineError> {
    let mut mol = smiles::parse(input)?;
    perception::prepare(&mut mol)?;
    let mut out = vec![smiles::canonical_smiles(&mol)];
    for tautomer in enumerate_tautomers(&mol)? {
        let smi = smiles::canonical_smiles(&tautomer);
        if !out.contains(&smi) {
            out.push(smi);
        }
    }
    Ok(out)
}

/// Enumerates protonation states with the embedded protonation rules.
///
/// The molecule is standardised under the protonation rules first so
/// enumeration starts from one reference ionisation state. On output-cap
/// overflow the standardised molecule is returned alone, with a warning.
///
/// # Errors
///
/// Returns [`EngineError`] for rule-loading or normalization failures.
pub fn enumerate_ions(mol: &Molecule) -> Result<Vec<Molecule>, EngineError> {
    let mut prepared = mol.clone();
    perception::prepare(&mut prepared)?;
    let mut stand_rules = default::protonation_standardise()?;
    let standardised = standardise(&prepared, &mut stand_rules, StandardiseOptions::default())?;
    let mut enum_rules = default::protonation_enumerate()?;
    match enumerate(&standardised.mol, &mut enum_rules, EnumerateOptions::default()) {
        Ok(ions) => Ok(ions),
        Err(EnumerateError::OverLimit(e)) => {
            warn!(
                title = %e.title,
                "maximum number of ionisation states generated, so none generated"
            );
            Ok(vec![standardised.mol])
        }
        Err(EnumerateError::Engine(e)) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn enumerate_tautomers_smiles_lists_the_input_first() {
        let forms = enumerate_tautomers_smiles("CCC(=O)C").unwrap();
        let mut input = smiles::parse("CCC(=O)C").unwrap();
        perception::prepare(&mut input).unwrap();
        assert_eq!(forms[0], smiles::canonical_smiles(&input));
        assert!(forms.len() >= 2);
    }

    #[test]
    fn canonical_tautomer_is_reproducible() {
        let mol = smiles::parse("CCC(=O)C").unwrap();
        let first = smiles::canonical_smiles(&canonical_tautomer(&mol).unwrap());
        let second = smiles::canonical_smiles(&canonical_tautomer(&mol).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn enumerate_ions_visits_charged_and_neutral_forms() {
        let mol = smiles::parse("CC(=O)O").unwrap();
        let ions = enumerate_ions(&mol).unwrap();
        let smis: Vec<String> = ions.iter().map(smiles::canonical_smiles).collect();
        assert!(smis.iter().any(|s| s.contains("[O-]")));
    }
}
