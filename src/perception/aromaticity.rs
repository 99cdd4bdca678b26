//! Aromaticity perception over a kekulized molecule, following the
//! Daylight electron-counting model.
//!
//! Flags are cleared and reassigned from scratch: each perceived ring is
//! tested against the 4n+2 rule using per-atom pi-electron contributions,
//! and qualifying rings have their atoms and bonds marked aromatic. The
//! pass iterates until no further ring qualifies so that fused systems
//! settle.

use super::rings::{perceive_rings, Ring};
use crate::core::graph::Molecule;
use crate::core::{BondOrder, Element};

/// Clears and reassigns aromatic flags on every atom and bond.
///
/// The molecule must be kekulized: transient `Aromatic` bond orders are not
/// interpreted by this pass.
pub fn assign_aromaticity(mol: &mut Molecule) {
    for atom in &mut mol.atoms {
        atom.aromatic = false;
    }
    for bond in &mut mol.bonds {
        bond.aromatic = false;
    }

    let rings = perceive_rings(mol);
    loop {
        let mut changed = false;
        for ring in &rings {
            if ring_is_flagged(mol, ring) {
                continue;
            }
            if ring_is_aromatic(mol, ring) {
                for &a in &ring.atoms {
                    mol.atoms[a].aromatic = true;
                }
                for &b in &ring.bonds {
                    mol.bonds[b].aromatic = true;
                }
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

fn ring_is_flagged(mol: &Molecule, ring: &Ring) -> bool {
    ring.bonds.iter().all(|&b| mol.bonds[b].aromatic)
}

/// Applies the 4n+2 test to one ring.
fn ring_is_aromatic(mol: &Molecule, ring: &Ring) -> bool {
    let mut pi_electrons = 0u32;
    for &atom_id in &ring.atoms {
        match pi_contribution(mol, ring, atom_id) {
            Some(e) => pi_electrons += e,
            None => return false,
        }
    }
    pi_electrons >= 2 && (pi_electrons - 2) % 4 == 0
}

/// Pi-electron contribution of one ring atom, or `None` when the atom
/// disqualifies the ring.
fn pi_contribution(mol: &Molecule, ring: &Ring, atom_id: usize) -> Option<u32> {
    let atom = &mol.atoms[atom_id];
    if !atom.element.can_be_aromatic() {
        return None;
    }

    let mut in_ring_double = false;
    let mut exocyclic_double = false;
    for (neighbor, bond_id) in mol.neighbors(atom_id) {
        match mol.bonds[bond_id].order {
            BondOrder::Triple => return None,
            BondOrder::Double => {
                if ring.atoms.contains(&neighbor) {
                    in_ring_double = true;
                } else {
                    exocyclic_double = true;
                }
            }
            _ => {}
        }
    }

    if in_ring_double {
        return Some(1);
    }
    if exocyclic_double {
        // a carbonyl-style carbon holds its pi bond outside the ring and
        // contributes nothing; heteroatoms fall back to a lone pair
        return match atom.element {
            Element::C => Some(0),
            _ => Some(2),
        };
    }
    // saturated ring position: only a lone pair or an empty orbital keeps
    // the ring in play
    match (atom.element, atom.formal_charge) {
        (Element::C, -1) => Some(2),
        (Element::C, 1) => Some(0),
        (Element::C, _) => None,
        (Element::B, 0) => Some(0),
        (Element::N | Element::P, _) => Some(2),
        (Element::O | Element::S | Element::Se, _) => Some(2),
        _ => None,
    }
}
