//! SMILES emission with canonical atom ordering.
//!
//! The writer walks each connected component depth-first from its
//! lowest-ranked atom, visiting neighbors in rank order, so a given ranking
//! always yields the same string. Atom-map indices are suppressed unless
//! explicitly requested, matching the output contract: map indices are a
//! rule-matching concern and would poison the deduplication key.

use super::canonical::canonical_ranks;
use super::reader::permutation_is_odd;
use crate::core::graph::Molecule;
use crate::core::{BondDir, BondOrder, Element, Parity};
use crate::perception::valence::implicit_hydrogens;

/// Controls the SMILES emission flavor.
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    /// Emit tetrahedral parity and bond direction marks.
    pub stereo: bool,
    /// Emit atom-map indices. Off for all canonical output.
    pub maps: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            stereo: true,
            maps: false,
        }
    }
}

/// Writes the canonical isomeric SMILES for a molecule.
///
/// This is the engine's deduplication and sort key: two molecules are
/// considered the same species iff their canonical SMILES are byte-equal.
pub fn canonical_smiles(mol: &Molecule) -> String {
    write(mol, &WriteOptions::default())
}

/// Writes a SMILES string under the given options, using canonical atom
/// ordering.
pub fn write(mol: &Molecule, options: &WriteOptions) -> String {
    let ranks = canonical_ranks(mol);
    let mut emitter = Emitter {
        mol,
        ranks: &ranks,
        options,
        visited: vec![false; mol.atoms.len()],
        parent: vec![None; mol.atoms.len()],
        children: vec![Vec::new(); mol.atoms.len()],
        ring_bonds: Vec::new(),
        ring_at: vec![Vec::new(); mol.atoms.len()],
        out: String::new(),
    };
    emitter.run();
    emitter.out
}

/// One ring-closure bond discovered during traversal.
struct RingBond {
    opener: usize,
    closer: usize,
    bond_id: usize,
    digit: u16,
}

struct Emitter<'a> {
    mol: &'a Molecule,
    ranks: &'a [usize],
    options: &'a WriteOptions,
    visited: Vec<bool>,
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    ring_bonds: Vec<RingBond>,
    /// Ring-bond list indices touching each atom, in discovery order.
    ring_at: Vec<Vec<usize>>,
    out: String,
}

impl<'a> Emitter<'a> {
    fn run(&mut self) {
        let mut components = self.mol.components();
        components.sort_by_key(|atoms| {
            atoms
                .iter()
                .map(|&a| self.ranks[a])
                .min()
                .unwrap_or(usize::MAX)
        });
        let mut first = true;
        for component in components {
            let root = component
                .iter()
                .copied()
                .min_by_key(|&a| self.ranks[a])
                .unwrap();
            self.survey(root);
            self.assign_digits();
            if !first {
                self.out.push('.');
            }
            first = false;
            self.emit_atom(root);
        }
    }

    /// Depth-first classification of tree and ring bonds, neighbors in rank
    /// order.
    fn survey(&mut self, root: usize) {
        let mut stack = vec![root];
        self.visited[root] = true;
        while let Some(atom_id) = stack.pop() {
            let mut neighbors: Vec<(usize, usize)> = self.mol.neighbors(atom_id).collect();
            neighbors.sort_by_key(|&(n, _)| self.ranks[n]);
            for (neighbor, bond_id) in neighbors {
                if !self.visited[neighbor] {
                    self.visited[neighbor] = true;
                    self.parent[neighbor] = Some(atom_id);
                    self.children[atom_id].push(neighbor);
                    stack.push(neighbor);
                } else if self.parent[atom_id] != Some(neighbor)
                    && !self.ring_bonds.iter().any(|r| r.bond_id == bond_id)
                {
                    let index = self.ring_bonds.len();
                    self.ring_bonds.push(RingBond {
                        opener: neighbor,
                        closer: atom_id,
                        bond_id,
                        digit: 0,
                    });
                    self.ring_at[neighbor].push(index);
                    self.ring_at[atom_id].push(index);
                }
            }
        }
        // the stack-based walk visits children in reverse push order;
        // restore rank order for emission
        for child_list in &mut self.children {
            child_list.sort_by_key(|&c| self.ranks[c]);
        }
    }

    /// Gives every ring bond the smallest digit free over its span.
    fn assign_digits(&mut self) {
        let mut emission_order = Vec::new();
        self.emission_positions(&mut emission_order);
        let position: Vec<usize> = {
            let mut pos = vec![0; self.mol.atoms.len()];
            for (i, &a) in emission_order.iter().enumerate() {
                pos[a] = i;
            }
            pos
        };
        // the survey's visit order can differ from emission order, so the
        // "opener" is whichever endpoint the string reaches first
        let span_of = |r: &RingBond| {
            let (a, b) = (position[r.opener], position[r.closer]);
            (a.min(b), a.max(b))
        };
        let mut spans: Vec<usize> = (0..self.ring_bonds.len())
            .filter(|&i| self.ring_bonds[i].digit == 0)
            .collect();
        spans.sort_by_key(|&i| span_of(&self.ring_bonds[i]));
        let mut in_use: Vec<(u16, usize)> = Vec::new(); // (digit, frees at position)
        for index in spans {
            let (open_at, close_at) = span_of(&self.ring_bonds[index]);
            in_use.retain(|&(_, frees)| frees > open_at);
            let mut digit = 1u16;
            while in_use.iter().any(|&(d, _)| d == digit) {
                digit += 1;
            }
            in_use.push((digit, close_at));
            self.ring_bonds[index].digit = digit;
        }
    }

    fn emission_positions(&self, order: &mut Vec<usize>) {
        // emission order is a preorder walk over the established tree
        let roots: Vec<usize> = (0..self.mol.atoms.len())
            .filter(|&a| self.visited[a] && self.parent[a].is_none())
            .collect();
        for root in roots {
            let mut stack = vec![root];
            while let Some(atom_id) = stack.pop() {
                order.push(atom_id);
                for &child in self.children[atom_id].iter().rev() {
                    stack.push(child);
                }
            }
        }
    }

    /// Emits an atom, its ring digits, and its subtrees.
    fn emit_atom(&mut self, atom_id: usize) {
        self.atom_token(atom_id);

        for i in 0..self.ring_at[atom_id].len() {
            let index = self.ring_at[atom_id][i];
            let (digit, bond_id, is_opener) = {
                let r = &self.ring_bonds[index];
                (r.digit, r.bond_id, r.opener == atom_id)
            };
            // the closing end carries the bond symbol
            if !is_opener {
                self.bond_token(bond_id, atom_id);
            }
            if digit > 9 {
                self.out.push('%');
                self.out.push_str(&format!("{:02}", digit));
            } else {
                self.out.push_str(&digit.to_string());
            }
        }

        let children = self.children[atom_id].clone();
        for (i, &child) in children.iter().enumerate() {
            let last = i + 1 == children.len();
            if !last {
                self.out.push('(');
            }
            let bond_id = self.mol.bond_between(atom_id, child).unwrap();
            self.bond_token(bond_id, atom_id);
            self.emit_atom(child);
            if !last {
                self.out.push(')');
            }
        }
    }

    /// Writes the symbol for a bond leaving `from`.
    ///
    /// Aromatic bonds are always elided: their stored Kekulé order is an
    /// artifact of one particular resolution and must not leak into the
    /// canonical string.
    fn bond_token(&mut self, bond_id: usize, from: usize) {
        let bond = &self.mol.bonds[bond_id];
        if bond.aromatic {
            return;
        }
        match bond.order {
            BondOrder::Double => self.out.push('='),
            BondOrder::Triple => self.out.push('#'),
            BondOrder::Aromatic => {} // unresolved input, elided between lowercase atoms
            BondOrder::Single => {
                if let (true, Some(dir)) = (self.options.stereo, bond.dir) {
                    let oriented = if bond.atoms.0 == from {
                        dir
                    } else {
                        dir.reversed()
                    };
                    self.out.push(match oriented {
                        BondDir::Up => '/',
                        BondDir::Down => '\\',
                    });
                } else {
                    let (a, b) = bond.atoms;
                    // single bond joining two aromatic systems must be
                    // written explicitly or it would read back aromatic
                    if self.mol.atoms[a].aromatic && self.mol.atoms[b].aromatic {
                        self.out.push('-');
                    }
                }
            }
        }
    }

    /// Writes the atom itself, bracketed only when necessary.
    fn atom_token(&mut self, atom_id: usize) {
        let atom = &self.mol.atoms[atom_id];
        let lowercase = atom.aromatic && atom.element.can_be_aromatic();
        let parity = if self.options.stereo {
            self.emitted_parity(atom_id)
        } else {
            None
        };
        let show_map = self.options.maps && atom.map_idx > 0;

        let bond_sum: u8 = self
            .mol
            .neighbors(atom_id)
            .map(|(_, b)| {
                let bond = &self.mol.bonds[b];
                if bond.aromatic {
                    1
                } else {
                    bond.order.valence()
                }
            })
            .sum();
        let inferred = implicit_hydrogens(atom.element, bond_sum, lowercase);

        let needs_bracket = atom.element == Element::H
            || !atom.element.in_organic_subset()
            || atom.formal_charge != 0
            || parity.is_some()
            || show_map
            || atom.implicit_h != inferred;

        let symbol = if lowercase {
            atom.element.symbol().to_ascii_lowercase()
        } else {
            atom.element.symbol().to_string()
        };

        if !needs_bracket {
            self.out.push_str(&symbol);
            return;
        }

        self.out.push('[');
        self.out.push_str(&symbol);
        if let Some(p) = parity {
            self.out.push_str(match p {
                Parity::Anticlockwise => "@",
                Parity::Clockwise => "@@",
            });
        }
        match atom.implicit_h {
            0 => {}
            1 => self.out.push('H'),
            n => {
                self.out.push('H');
                self.out.push_str(&n.to_string());
            }
        }
        match atom.formal_charge {
            0 => {}
            1 => self.out.push('+'),
            -1 => self.out.push('-'),
            c if c > 0 => self.out.push_str(&format!("+{}", c)),
            c => self.out.push_str(&format!("-{}", -c)),
        }
        if show_map {
            self.out.push_str(&format!(":{}", atom.map_idx));
        }
        self.out.push(']');
    }

    /// Converts the stored reference-frame parity to the winding implied by
    /// this emission's neighbor order.
    fn emitted_parity(&self, atom_id: usize) -> Option<Parity> {
        let stored = self.mol.atoms[atom_id].parity?;
        let mut keys = Vec::with_capacity(4);
        if let Some(parent) = self.parent[atom_id] {
            keys.push(parent);
        }
        if self.mol.atoms[atom_id].implicit_h == 1 {
            keys.push(usize::MAX); // bracket H sits right after the parent
        }
        for &index in &self.ring_at[atom_id] {
            let r = &self.ring_bonds[index];
            let partner = if r.opener == atom_id {
                r.closer
            } else {
                r.opener
            };
            keys.push(partner);
        }
        for &child in &self.children[atom_id] {
            keys.push(child);
        }
        if keys.len() != 4 {
            return None;
        }
        Some(stored.permuted(permutation_is_odd(&keys)))
    }
}
