//! Chemical perception: rings, aromaticity, Kekulé resolution, chirality,
//! valence bookkeeping, and radical detection.
//!
//! Perception runs in two situations: once over each freshly read input
//! molecule (via [`prepare`]) to pin down a canonical starting
//! representation, and again over every rewrite product, because a rule
//! application can create or destroy rings and aromatic systems.

pub mod aromaticity;
pub mod chirality;
pub mod kekulize;
pub mod radicals;
pub mod rings;
pub mod valence;

use crate::core::error::EngineError;
use crate::core::graph::Molecule;

/// Normalizes an input molecule in place.
///
/// Perceives tetrahedral centers, assigns aromatic flags, then round-trips
/// the molecule through its canonical SMILES and restores the title. The
/// round-trip forces a single starting representation for structures the
/// reader could have built in several equivalent ways, so subsequent rule
/// matching is deterministic. The operation is idempotent.
///
/// # Errors
///
/// Returns [`EngineError::SmilesParse`] if the canonical form fails to
/// re-parse, which indicates an internal inconsistency in the molecule.
pub fn prepare(mol: &mut Molecule) -> Result<(), EngineError> {
    chirality::perceive_chirality(mol);
    aromaticity::assign_aromaticity(mol);
    let title = mol.title().to_string();
    let smiles = crate::smiles::canonical_smiles(mol);
    *mol = crate::smiles::parse(&smiles)?;
    mol.set_title(title);
    Ok(())
}

/// Refreshes the derived structure of a rewrite product.
///
/// Aromatic systems are re-resolved from scratch: a rule that moves a
/// hydrogen across an aromatic ring leaves the stored Kekulé orders
/// inconsistent with the new hydrogen placement, so flagged bonds are reset
/// and solved again before aromaticity and chirality are recomputed.
///
/// # Errors
///
/// Returns a diagnostic when no Kekulé structure fits the rewritten
/// hydrogen counts, which marks the product as chemically unusable.
pub fn reperceive(mol: &mut Molecule) -> Result<(), String> {
    for bond in &mut mol.bonds {
        if bond.aromatic {
            bond.order = crate::core::BondOrder::Aromatic;
        }
    }
    kekulize::kekulize(mol)?;
    aromaticity::assign_aromaticity(mol);
    chirality::perceive_chirality(mol);
    Ok(())
}
