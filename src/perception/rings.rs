//! Ring perception: a minimal cycle basis over the molecular graph.
//!
//! Candidate cycles are found by removing each bond and searching for the
//! shortest alternate path between its endpoints; a minimal basis is then
//! selected by Gaussian elimination over bond-membership bit vectors. The
//! aromaticity and Kekulé passes consume the resulting rings.

use crate::core::graph::Molecule;
use std::collections::VecDeque;

/// A ring as an ordered atom cycle with the bond indices along it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    /// Atom indices in cycle order.
    pub atoms: Vec<usize>,
    /// Bond indices along the cycle, `bonds[i]` joining `atoms[i]` to
    /// `atoms[(i + 1) % len]`.
    pub bonds: Vec<usize>,
}

impl Ring {
    /// Returns the ring size in atoms.
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Returns whether the ring is empty (never true for perceived rings).
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

/// Computes the smallest set of smallest rings of a molecule.
pub fn perceive_rings(mol: &Molecule) -> Vec<Ring> {
    let num_atoms = mol.atoms.len();
    let num_bonds = mol.bonds.len();
    if num_atoms == 0 || num_bonds == 0 {
        return Vec::new();
    }
    let num_components = mol.components().len();
    let cyclomatic = num_bonds as isize - num_atoms as isize + num_components as isize;
    if cyclomatic <= 0 {
        return Vec::new();
    }

    let mut candidates = enumerate_cycle_candidates(mol);
    candidates.sort_by_key(|c| c.atoms.len());
    select_minimal_cycle_basis(candidates, cyclomatic as usize, num_bonds)
}

/// Marks which atoms and bonds participate in any perceived ring.
pub fn ring_membership(mol: &Molecule, rings: &[Ring]) -> (Vec<bool>, Vec<bool>) {
    let mut atom_in_ring = vec![false; mol.atoms.len()];
    let mut bond_in_ring = vec![false; mol.bonds.len()];
    for ring in rings {
        for &a in &ring.atoms {
            atom_in_ring[a] = true;
        }
        for &b in &ring.bonds {
            bond_in_ring[b] = true;
        }
    }
    (atom_in_ring, bond_in_ring)
}

/// Enumerates simple cycles by removing each bond and searching for the
/// shortest alternate path between its endpoints.
fn enumerate_cycle_candidates(mol: &Molecule) -> Vec<Ring> {
    let mut candidates = Vec::new();
    for (skip_bond, bond) in mol.bonds.iter().enumerate() {
        let (from, to) = bond.atoms;
        if let Some(mut ring) = shortest_path_ring(mol, from, to, skip_bond) {
            ring.bonds.push(skip_bond);
            candidates.push(ring);
        }
    }
    candidates
}

/// BFS for the shortest path from `from` to `to` avoiding `skip_bond`,
/// returned as a partial ring (path atoms and path bonds).
fn shortest_path_ring(mol: &Molecule, from: usize, to: usize, skip_bond: usize) -> Option<Ring> {
    let mut visited = vec![false; mol.atoms.len()];
    let mut parent: Vec<Option<(usize, usize)>> = vec![None; mol.atoms.len()];
    let mut queue = VecDeque::new();
    visited[from] = true;
    queue.push_back(from);

    while let Some(atom_id) = queue.pop_front() {
        if atom_id == to {
            let mut atoms = vec![to];
            let mut bonds = Vec::new();
            let mut cursor = to;
            while let Some((prev, bond_id)) = parent[cursor] {
                atoms.push(prev);
                bonds.push(bond_id);
                cursor = prev;
            }
            atoms.reverse();
            bonds.reverse();
            return Some(Ring { atoms, bonds });
        }
        let mut neighbors: Vec<(usize, usize)> = mol.neighbors(atom_id).collect();
        neighbors.sort_unstable();
        for (neighbor, bond_id) in neighbors {
            if bond_id == skip_bond || visited[neighbor] {
                continue;
            }
            visited[neighbor] = true;
            parent[neighbor] = Some((atom_id, bond_id));
            queue.push_back(neighbor);
        }
    }
    None
}

/// Keeps up to `cyclomatic` independent cycles via Gaussian elimination
/// over bond bit vectors.
fn select_minimal_cycle_basis(
    candidates: Vec<Ring>,
    cyclomatic: usize,
    num_bonds: usize,
) -> Vec<Ring> {
    let mut selected = Vec::new();
    let mut basis: Vec<(Vec<u64>, usize)> = Vec::new();

    for ring in candidates {
        let mut bits = vec![0u64; num_bonds.div_ceil(64)];
        for &b in &ring.bonds {
            bits[b / 64] |= 1 << (b % 64);
        }
        for (basis_vec, pivot) in &basis {
            if bits[pivot / 64] & (1 << (pivot % 64)) != 0 {
                for (word, basis_word) in bits.iter_mut().zip(basis_vec) {
                    *word ^= basis_word;
                }
            }
        }
        if let Some(pivot) = leading_one(&bits) {
            basis.push((bits, pivot));
            basis.sort_by_key(|&(_, p)| p);
            selected.push(ring);
            if selected.len() == cyclomatic {
                break;
            }
        }
    }
    selected
}

fn leading_one(bits: &[u64]) -> Option<usize> {
    bits.iter()
        .enumerate()
        .find(|&(_, &word)| word != 0)
        .map(|(i, word)| i * 64 + word.trailing_zeros() as usize)
}
