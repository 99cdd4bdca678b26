//! SMILES input and output: parsing, canonical ranking, and emission.
//!
//! [`parse`] yields a kekulized molecule ready for the engine;
//! [`canonical_smiles`] is the deduplication and ordering key used
//! throughout the crate.

pub mod canonical;
pub mod reader;
pub mod writer;

pub use writer::{canonical_smiles, write, WriteOptions};

use crate::core::error::EngineError;
use crate::core::graph::Molecule;
use crate::core::BondOrder;
use crate::perception::kekulize::kekulize;
use crate::perception::rings::{perceive_rings, ring_membership};

/// Parses a SMILES string into a kekulized molecule.
///
/// Aromatic bonds written outside any ring (a Daylight ambiguity for
/// elided bonds between lowercase atoms, as in an unbracketed biaryl
/// linkage) are demoted to single bonds before Kekulé resolution.
///
/// # Errors
///
/// Returns [`EngineError::SmilesParse`] when the text is malformed or no
/// valid Kekulé structure exists.
pub fn parse(input: &str) -> Result<Molecule, EngineError> {
    let mut mol = reader::read(input).map_err(|reason| EngineError::SmilesParse {
        input: input.to_string(),
        reason,
    })?;

    let rings = perceive_rings(&mol);
    let (atom_in_ring, bond_in_ring) = ring_membership(&mol, &rings);
    for (bond_id, bond) in mol.bonds.iter_mut().enumerate() {
        if bond.order == BondOrder::Aromatic && !bond_in_ring[bond_id] {
            bond.order = BondOrder::Single;
            bond.aromatic = false;
        }
    }
    for (atom_id, atom) in mol.atoms.iter_mut().enumerate() {
        if atom.aromatic && !atom_in_ring[atom_id] {
            atom.aromatic = false;
        }
    }

    kekulize(&mut mol).map_err(|reason| EngineError::SmilesParse {
        input: input.to_string(),
        reason,
    })?;
    Ok(mol)
}
