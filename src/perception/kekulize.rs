//! Kekulé resolution: turns aromatic bond orders into concrete
//! single/double assignments.
//!
//! Freshly parsed aromatic SMILES carries the transient `Aromatic` bond
//! order. This pass partitions those bonds into connected systems and runs
//! a backtracking solver per system so that every aromatic atom ends up
//! with exactly the number of double bonds its valence demands. The
//! aromatic flags on atoms and bonds are left in place; only the orders
//! change.

use super::valence::smallest_fitting_valence;
use crate::core::graph::Molecule;
use crate::core::BondOrder;
use std::collections::VecDeque;

/// Resolves every `Aromatic` bond order in the molecule.
///
/// # Errors
///
/// Returns a diagnostic when no alternating assignment satisfies the
/// valence constraints of some aromatic system.
pub fn kekulize(mol: &mut Molecule) -> Result<(), String> {
    let aromatic_bonds: Vec<usize> = (0..mol.bonds.len())
        .filter(|&b| mol.bonds[b].order == BondOrder::Aromatic)
        .collect();
    if aromatic_bonds.is_empty() {
        return Ok(());
    }

    let needs = double_bond_needs(mol, &aromatic_bonds);

    for system in find_aromatic_systems(mol, &aromatic_bonds) {
        let mut solver = KekuleSolver {
            mol,
            needs: &needs,
            bonds: &system,
            assignment: vec![None; system.len()],
        };
        if !solver.backtrack(0) {
            return Err("could not find a valid Kekulé structure for an aromatic system".to_string());
        }
        let orders: Vec<BondOrder> = solver
            .assignment
            .iter()
            .map(|o| o.unwrap_or(BondOrder::Single))
            .collect();
        for (&bond_id, order) in system.iter().zip(orders) {
            mol.bonds[bond_id].order = order;
        }
    }
    Ok(())
}

/// Computes how many double bonds each atom needs from its aromatic
/// system: the gap between its fitting valence target and the valence it
/// would have were every aromatic bond single.
fn double_bond_needs(mol: &Molecule, aromatic_bonds: &[usize]) -> Vec<u8> {
    let mut touched = vec![false; mol.atoms.len()];
    for &b in aromatic_bonds {
        touched[mol.bonds[b].atoms.0] = true;
        touched[mol.bonds[b].atoms.1] = true;
    }
    (0..mol.atoms.len())
        .map(|atom_id| {
            if !touched[atom_id] {
                return 0;
            }
            let all_single: u8 = mol
                .neighbors(atom_id)
                .map(|(_, b)| match mol.bonds[b].order {
                    BondOrder::Aromatic => 1,
                    order => order.valence(),
                })
                .sum::<u8>()
                + mol.atoms[atom_id].implicit_h;
            let atom = &mol.atoms[atom_id];
            let target = smallest_fitting_valence(atom.element, atom.formal_charge, all_single);
            target.saturating_sub(all_single).min(1)
        })
        .collect()
}

/// Groups aromatic bonds into connected systems for independent solving.
fn find_aromatic_systems(mol: &Molecule, aromatic_bonds: &[usize]) -> Vec<Vec<usize>> {
    let mut systems = Vec::new();
    let mut seen = vec![false; mol.bonds.len()];

    for &start in aromatic_bonds {
        if seen[start] {
            continue;
        }
        let mut system = Vec::new();
        let mut queue = VecDeque::new();
        seen[start] = true;
        queue.push_back(start);
        while let Some(bond_id) = queue.pop_front() {
            system.push(bond_id);
            let (u, v) = mol.bonds[bond_id].atoms;
            for atom_id in [u, v] {
                for (_, neighbor_bond) in mol.neighbors(atom_id) {
                    if mol.bonds[neighbor_bond].order == BondOrder::Aromatic
                        && !seen[neighbor_bond]
                    {
                        seen[neighbor_bond] = true;
                        queue.push_back(neighbor_bond);
                    }
                }
            }
        }
        systems.push(system);
    }
    systems
}

/// Backtracking assignment helper for one aromatic system.
struct KekuleSolver<'a> {
    mol: &'a Molecule,
    needs: &'a [u8],
    bonds: &'a [usize],
    assignment: Vec<Option<BondOrder>>,
}

impl<'a> KekuleSolver<'a> {
    fn backtrack(&mut self, k: usize) -> bool {
        if k == self.bonds.len() {
            return self.all_needs_met();
        }
        for order in [BondOrder::Double, BondOrder::Single] {
            self.assignment[k] = Some(order);
            if self.is_consistent(k) && self.backtrack(k + 1) {
                return true;
            }
        }
        self.assignment[k] = None;
        false
    }

    fn is_consistent(&self, k: usize) -> bool {
        let (u, v) = self.mol.bonds[self.bonds[k]].atoms;
        self.atom_feasible(u) && self.atom_feasible(v)
    }

    /// An atom stays feasible while its assigned doubles do not exceed its
    /// need and enough unassigned bonds remain to meet it.
    fn atom_feasible(&self, atom_id: usize) -> bool {
        let mut doubles = 0u8;
        let mut unassigned = 0u8;
        for (_, bond_id) in self.mol.neighbors(atom_id) {
            if let Some(pos) = self.bonds.iter().position(|&b| b == bond_id) {
                match self.assignment[pos] {
                    Some(BondOrder::Double) => doubles += 1,
                    Some(_) => {}
                    None => unassigned += 1,
                }
            }
        }
        let need = self.needs[atom_id];
        doubles <= need && doubles + unassigned >= need
    }

    fn all_needs_met(&self) -> bool {
        let mut atoms: Vec<usize> = Vec::new();
        for &bond_id in self.bonds {
            let (u, v) = self.mol.bonds[bond_id].atoms;
            atoms.push(u);
            atoms.push(v);
        }
        atoms.sort_unstable();
        atoms.dedup();
        atoms.into_iter().all(|atom_id| {
            let doubles = self
                .mol
                .neighbors(atom_id)
                .filter_map(|(_, b)| self.bonds.iter().position(|&x| x == b))
                .filter(|&pos| self.assignment[pos] == Some(BondOrder::Double))
                .count() as u8;
            doubles == self.needs[atom_id]
        })
    }
}
