//! Tetrahedral-center perception.
//!
//! Parsed molecules may carry chiral markers on atoms that cannot actually
//! be stereocenters (wrong coordination, multiple hydrogens, unsaturated).
//! This pass clears those, so downstream canonical SMILES never emit
//! meaningless windings.

use crate::core::graph::Molecule;
use crate::core::BondOrder;

/// Clears tetrahedral parity from atoms that cannot be stereocenters.
///
/// An atom keeps its parity only when it has four distinct connections
/// (explicit neighbors plus at most one implicit hydrogen), all through
/// single bonds, outside any aromatic system.
pub fn perceive_chirality(mol: &mut Molecule) {
    let disqualify: Vec<usize> = (0..mol.atoms.len())
        .filter(|&atom_id| {
            if mol.atoms[atom_id].parity.is_none() {
                return false;
            }
            !can_be_stereocenter(mol, atom_id)
        })
        .collect();
    for atom_id in disqualify {
        mol.atoms[atom_id].parity = None;
    }
}

fn can_be_stereocenter(mol: &Molecule, atom_id: usize) -> bool {
    let atom = &mol.atoms[atom_id];
    if atom.aromatic || atom.implicit_h > 1 {
        return false;
    }
    if mol.degree(atom_id) != 4 {
        return false;
    }
    mol.neighbors(atom_id)
        .all(|(_, b)| mol.bonds[b].order == BondOrder::Single)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::reader::read;

    #[test]
    fn genuine_stereocenter_keeps_its_parity() {
        let mut mol = read("C[C@H](O)C(=O)O").unwrap();
        perceive_chirality(&mut mol);
        assert!(mol.atoms[1].parity.is_some());
    }

    #[test]
    fn trivalent_center_loses_its_parity() {
        let mut mol = read("C[C@H](O)C(=O)O").unwrap();
        // break the center's coordination down to three
        mol.atoms[1].implicit_h = 0;
        perceive_chirality(&mut mol);
        assert!(mol.atoms[1].parity.is_none());
    }

    #[test]
    fn unsaturated_center_loses_its_parity() {
        let mut mol = read("C[C@H](O)C(=O)O").unwrap();
        let bond = mol.bond_between(1, 2).unwrap();
        mol.bonds[bond].order = BondOrder::Double;
        mol.atoms[1].implicit_h = 0;
        perceive_chirality(&mut mol);
        assert!(mol.atoms[1].parity.is_none());
    }
}
