//! Stereochemistry repair after a rewrite.
//!
//! A rule that rewires the bonding around a chiral center invalidates its
//! recorded winding; a rule that leaves the center's electronic
//! environment untouched should preserve it. The environment is compared
//! through a set of cheap invariants — element, coordination, valence,
//! hybridization, hydrogen count — which catches the first case while
//! permitting the second. Bond stereo is deliberately left alone.

use crate::core::graph::Molecule;
use tracing::debug;

/// Clears tetrahedral parity from matched product atoms whose environment
/// changed relative to the source.
///
/// Atom indices are stable across a rewrite, so `matched_atoms` addresses
/// both molecules.
pub fn remove_altered_stereochem(
    source: &Molecule,
    product: &mut Molecule,
    matched_atoms: &[usize],
) {
    for &atom_id in matched_atoms {
        if source.atoms[atom_id].parity.is_none() || product.atoms[atom_id].parity.is_none() {
            continue;
        }
        if environment(source, atom_id) != environment(product, atom_id) {
            product.atoms[atom_id].parity = None;
            debug!(
                title = %source.title(),
                atom = atom_id,
                "stereo cleared on rewritten center"
            );
        }
    }
}

/// The invariants that must agree for a center's parity to survive.
fn environment(mol: &Molecule, atom_id: usize) -> (u8, u8, u8, u8, crate::core::Hybridization, u8) {
    (
        mol.atoms[atom_id].element.atomic_number(),
        mol.degree(atom_id),
        mol.heavy_degree(atom_id),
        mol.valence(atom_id),
        mol.hybridization(atom_id),
        mol.total_h(atom_id),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles;

    #[test]
    fn untouched_center_keeps_its_parity() {
        let source = smiles::parse("C[C@H](O)C(=O)O").unwrap();
        let mut product = source.clone();
        remove_altered_stereochem(&source, &mut product, &[1]);
        assert!(product.atoms[1].parity.is_some());
    }

    #[test]
    fn center_with_changed_hydrogen_count_is_cleared() {
        let source = smiles::parse("C[C@H](O)C(=O)O").unwrap();
        let mut product = source.clone();
        product.atoms[1].implicit_h = 0;
        remove_altered_stereochem(&source, &mut product, &[1]);
        assert!(product.atoms[1].parity.is_none());
    }

    #[test]
    fn unmatched_atoms_are_never_touched() {
        let source = smiles::parse("C[C@H](O)C(=O)O").unwrap();
        let mut product = source.clone();
        product.atoms[1].implicit_h = 0;
        remove_altered_stereochem(&source, &mut product, &[0, 3]);
        assert!(product.atoms[1].parity.is_some());
    }
}
