//! Free-radical detection by shell arithmetic.
//!
//! For a selected set of elements, an atom is classified as a radical when
//! no permitted electron-shell count reconciles its valence and formal
//! charge with a filled octet. The enumerator uses the count to discard
//! rewrite products that conjure open shells out of nothing.

use crate::core::graph::Molecule;
use crate::core::Element;

/// Permitted shell counts per element; hypervalent elements list several.
fn shell_counts(element: Element) -> Option<&'static [i16]> {
    match element {
        Element::C => Some(&[4]),
        Element::N => Some(&[5]),
        Element::O => Some(&[6]),
        Element::Si => Some(&[4]),
        Element::P => Some(&[5, 3]),
        Element::S => Some(&[6, 4, 2]),
        _ => None,
    }
}

/// Returns the indices of atoms classified as free radicals.
///
/// An atom of a covered element is a radical iff no permitted shell count
/// satisfies `shell + valence − formal_charge == 8`. Elements outside the
/// covered set are never flagged.
pub fn radical_atoms(mol: &Molecule) -> Vec<usize> {
    (0..mol.atoms.len())
        .filter(|&atom_id| {
            let atom = &mol.atoms[atom_id];
            let Some(shells) = shell_counts(atom.element) else {
                return false;
            };
            let valence = mol.valence(atom_id) as i16;
            let charge = atom.formal_charge as i16;
            !shells.iter().any(|&shell| shell + valence - charge == 8)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::reader::read;

    #[test]
    fn saturated_molecules_have_no_radicals() {
        for smiles in ["C", "CCO", "CC(=O)C", "N", "O=S(=O)(O)O"] {
            let mol = read(smiles).unwrap();
            assert!(radical_atoms(&mol).is_empty(), "{}", smiles);
        }
    }

    #[test]
    fn undercoordinated_carbon_is_a_radical() {
        // methyl radical: three hydrogens, no fourth bond
        let mol = read("[CH3]").unwrap();
        assert_eq!(radical_atoms(&mol), vec![0]);
    }

    #[test]
    fn charge_balances_the_shell() {
        // methyl anion carries its electrons as charge, not as a radical
        let mol = read("[CH3-]").unwrap();
        assert!(radical_atoms(&mol).is_empty());
        let mol = read("[NH4+]").unwrap();
        assert!(radical_atoms(&mol).is_empty());
    }

    #[test]
    fn hypervalent_sulfur_uses_alternate_shells() {
        for smiles in ["CS(C)=O", "CS(=O)(=O)C", "CSC"] {
            let mol = read(smiles).unwrap();
            assert!(radical_atoms(&mol).is_empty(), "{}", smiles);
        }
    }

    #[test]
    fn nitroxide_nitrogen_is_flagged() {
        let mol = read("CN([O])C").unwrap();
        let radicals = radical_atoms(&mol);
        assert_eq!(radicals.len(), 1);
    }

    #[test]
    fn uncovered_elements_are_never_flagged() {
        let mol = read("[Na+].[Cl-]").unwrap();
        assert!(radical_atoms(&mol).is_empty());
    }
}
