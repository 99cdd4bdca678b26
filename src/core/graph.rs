//! The mutable molecular graph rewritten by the transformation engine.
//!
//! A `Molecule` stores atoms and bonds with the annotations the rewrite
//! rules read and edit: formal charges, implicit-hydrogen counts, aromatic
//! flags, atom-map indices, and stereo descriptors. Hydrogens are
//! suppressed — explicit hydrogen atoms are permitted but the normal
//! representation keeps them as per-atom counts, which is the form the
//! hydrogen-shifting rules operate on.

use super::{BondDir, BondOrder, Element, Hybridization, Parity};

/// An atom in the molecular graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Atom {
    /// The chemical element of this atom.
    pub element: Element,
    /// The formal charge of this atom.
    pub formal_charge: i8,
    /// The number of implicit hydrogens attached to this atom.
    pub implicit_h: u8,
    /// Whether this atom carries an aromatic flag.
    pub aromatic: bool,
    /// The atom-map index from rule application; zero means unmapped.
    pub map_idx: u32,
    /// Tetrahedral parity in the reference neighbor frame, if specified.
    pub parity: Option<Parity>,
}

impl Atom {
    /// Creates a neutral, non-aromatic, unmapped atom with no hydrogens.
    pub fn new(element: Element) -> Self {
        Self {
            element,
            formal_charge: 0,
            implicit_h: 0,
            aromatic: false,
            map_idx: 0,
            parity: None,
        }
    }
}

/// A bond between two atoms in the molecular graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bond {
    /// Indices of the two atoms joined by this bond, in creation order.
    pub atoms: (usize, usize),
    /// The order of this bond.
    pub order: BondOrder,
    /// Whether this bond is part of an aromatic system.
    pub aromatic: bool,
    /// Cis/trans direction mark relative to `(begin, end)`, if specified.
    pub dir: Option<BondDir>,
}

impl Bond {
    /// Returns the atom on the other end of this bond from `atom_id`, or
    /// `None` when the bond does not touch `atom_id`.
    pub fn other(&self, atom_id: usize) -> Option<usize> {
        if self.atoms.0 == atom_id {
            Some(self.atoms.1)
        } else if self.atoms.1 == atom_id {
            Some(self.atoms.0)
        } else {
            None
        }
    }
}

/// A molecule as a titled, mutable graph of atoms and bonds.
///
/// # Examples
///
/// Building ethanol by hand:
///
/// ```
/// use tautogen::{BondOrder, Element, Molecule};
///
/// let mut mol = Molecule::new();
/// let c1 = mol.add_atom(Element::C);
/// let c2 = mol.add_atom(Element::C);
/// let o = mol.add_atom(Element::O);
/// mol.add_bond(c1, c2, BondOrder::Single).unwrap();
/// mol.add_bond(c2, o, BondOrder::Single).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Molecule {
    title: String,
    /// The atoms of the molecule, indexed densely from zero.
    pub atoms: Vec<Atom>,
    /// The bonds of the molecule.
    pub bonds: Vec<Bond>,
}

impl Molecule {
    /// Creates a new, empty, untitled molecule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the molecule's title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Replaces the molecule's title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Removes every atom and bond, keeping the title.
    pub fn clear(&mut self) {
        self.atoms.clear();
        self.bonds.clear();
    }

    /// Adds a new neutral atom and returns its index.
    pub fn add_atom(&mut self, element: Element) -> usize {
        self.atoms.push(Atom::new(element));
        self.atoms.len() - 1
    }

    /// Adds a new bond between two existing atoms.
    ///
    /// # Errors
    ///
    /// Returns an error if either index is out of bounds, the atoms are the
    /// same, or the atoms are already bonded.
    pub fn add_bond(
        &mut self,
        atom1: usize,
        atom2: usize,
        order: BondOrder,
    ) -> Result<usize, &'static str> {
        if atom1 >= self.atoms.len() || atom2 >= self.atoms.len() {
            return Err("cannot add bond: atom index is out of bounds");
        }
        if atom1 == atom2 {
            return Err("cannot add bond: an atom cannot bond to itself");
        }
        if self.bond_between(atom1, atom2).is_some() {
            return Err("cannot add bond: atoms are already bonded");
        }
        self.bonds.push(Bond {
            atoms: (atom1, atom2),
            order,
            aromatic: false,
            dir: None,
        });
        Ok(self.bonds.len() - 1)
    }

    /// Returns the index of the bond joining two atoms, if one exists.
    pub fn bond_between(&self, atom1: usize, atom2: usize) -> Option<usize> {
        self.bonds.iter().position(|b| {
            (b.atoms.0 == atom1 && b.atoms.1 == atom2) || (b.atoms.0 == atom2 && b.atoms.1 == atom1)
        })
    }

    /// Removes the bond joining two atoms. Returns whether a bond was
    /// removed.
    pub fn remove_bond(&mut self, atom1: usize, atom2: usize) -> bool {
        match self.bond_between(atom1, atom2) {
            Some(idx) => {
                self.bonds.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Iterates over the neighbors of an atom as `(neighbor index, bond
    /// index)` pairs, in bond creation order.
    pub fn neighbors(&self, atom_id: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.bonds
            .iter()
            .enumerate()
            .filter_map(move |(bond_id, bond)| bond.other(atom_id).map(|n| (n, bond_id)))
    }

    /// Returns the number of explicit connections plus implicit hydrogens.
    pub fn degree(&self, atom_id: usize) -> u8 {
        self.neighbors(atom_id).count() as u8 + self.atoms[atom_id].implicit_h
    }

    /// Returns the number of explicit non-hydrogen neighbors.
    pub fn heavy_degree(&self, atom_id: usize) -> u8 {
        self.neighbors(atom_id)
            .filter(|&(n, _)| self.atoms[n].element != Element::H)
            .count() as u8
    }

    /// Returns the valence: the sum of bond orders over explicit bonds plus
    /// the implicit-hydrogen count.
    pub fn valence(&self, atom_id: usize) -> u8 {
        let explicit: u8 = self
            .neighbors(atom_id)
            .map(|(_, b)| self.bonds[b].order.valence())
            .sum();
        explicit + self.atoms[atom_id].implicit_h
    }

    /// Returns the total hydrogen count: implicit plus explicit hydrogen
    /// neighbors.
    pub fn total_h(&self, atom_id: usize) -> u8 {
        let explicit = self
            .neighbors(atom_id)
            .filter(|&(n, _)| self.atoms[n].element == Element::H)
            .count() as u8;
        explicit + self.atoms[atom_id].implicit_h
    }

    /// Derives the hybridization of an atom from its bonding pattern.
    pub fn hybridization(&self, atom_id: usize) -> Hybridization {
        let mut doubles = 0;
        let mut triples = 0;
        for (_, bond_id) in self.neighbors(atom_id) {
            match self.bonds[bond_id].order {
                BondOrder::Double => doubles += 1,
                BondOrder::Triple => triples += 1,
                _ => {}
            }
        }
        if triples > 0 || doubles >= 2 {
            Hybridization::SP
        } else if doubles == 1 || self.atoms[atom_id].aromatic {
            Hybridization::SP2
        } else {
            Hybridization::SP3
        }
    }

    /// Groups atom indices into connected components, each sorted
    /// ascending.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut component_of = vec![usize::MAX; self.atoms.len()];
        let mut count = 0;
        for start in 0..self.atoms.len() {
            if component_of[start] != usize::MAX {
                continue;
            }
            let mut stack = vec![start];
            component_of[start] = count;
            while let Some(atom_id) = stack.pop() {
                for (neighbor, _) in self.neighbors(atom_id) {
                    if component_of[neighbor] == usize::MAX {
                        component_of[neighbor] = count;
                        stack.push(neighbor);
                    }
                }
            }
            count += 1;
        }
        let mut components = vec![Vec::new(); count];
        for (atom_id, &c) in component_of.iter().enumerate() {
            components[c].push(atom_id);
        }
        components
    }

    /// Returns a copy containing only the largest connected component,
    /// ranked by heavy-atom count with total atom count as tiebreak.
    ///
    /// Atom indices are remapped monotonically, so stored tetrahedral
    /// parities remain valid in the reduced graph.
    pub fn largest_fragment(&self) -> Molecule {
        let components = self.components();
        if components.len() <= 1 {
            return self.clone();
        }
        let keep = components
            .iter()
            .enumerate()
            .max_by_key(|(i, atoms)| {
                let heavy = atoms
                    .iter()
                    .filter(|&&a| self.atoms[a].element != Element::H)
                    .count();
                // earlier components win ties
                (heavy, atoms.len(), components.len() - i)
            })
            .map(|(_, atoms)| atoms.clone())
            .unwrap_or_default();

        let mut new_index = vec![usize::MAX; self.atoms.len()];
        let mut fragment = Molecule::new();
        fragment.set_title(self.title.clone());
        for &old in &keep {
            new_index[old] = fragment.atoms.len();
            fragment.atoms.push(self.atoms[old].clone());
        }
        for bond in &self.bonds {
            let (a, b) = bond.atoms;
            if new_index[a] != usize::MAX && new_index[b] != usize::MAX {
                let mut new_bond = bond.clone();
                new_bond.atoms = (new_index[a], new_index[b]);
                fragment.bonds.push(new_bond);
            }
        }
        fragment
    }

    /// Clears every atom-map index.
    pub fn clear_map_indices(&mut self) {
        for atom in &mut self.atoms {
            atom.map_idx = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ethanol() -> Molecule {
        let mut mol = Molecule::new();
        let c1 = mol.add_atom(Element::C);
        let c2 = mol.add_atom(Element::C);
        let o = mol.add_atom(Element::O);
        mol.atoms[c1].implicit_h = 3;
        mol.atoms[c2].implicit_h = 2;
        mol.atoms[o].implicit_h = 1;
        mol.add_bond(c1, c2, BondOrder::Single).unwrap();
        mol.add_bond(c2, o, BondOrder::Single).unwrap();
        mol
    }

    #[test]
    fn add_bond_rejects_out_of_bounds_and_self_bonds() {
        let mut mol = Molecule::new();
        let c = mol.add_atom(Element::C);
        assert!(mol.add_bond(c, 5, BondOrder::Single).is_err());
        assert!(mol.add_bond(c, c, BondOrder::Single).is_err());
    }

    #[test]
    fn add_bond_rejects_duplicate_bonds() {
        let mut mol = Molecule::new();
        let a = mol.add_atom(Element::C);
        let b = mol.add_atom(Element::C);
        mol.add_bond(a, b, BondOrder::Single).unwrap();
        assert!(mol.add_bond(b, a, BondOrder::Double).is_err());
    }

    #[test]
    fn degree_and_valence_count_implicit_hydrogens() {
        let mol = ethanol();
        assert_eq!(mol.degree(0), 4);
        assert_eq!(mol.heavy_degree(0), 1);
        assert_eq!(mol.valence(1), 4);
        assert_eq!(mol.total_h(2), 1);
    }

    #[test]
    fn hybridization_follows_bond_orders() {
        let mut mol = Molecule::new();
        let c1 = mol.add_atom(Element::C);
        let c2 = mol.add_atom(Element::C);
        let c3 = mol.add_atom(Element::C);
        mol.add_bond(c1, c2, BondOrder::Double).unwrap();
        mol.add_bond(c2, c3, BondOrder::Single).unwrap();
        assert_eq!(mol.hybridization(c1), Hybridization::SP2);
        assert_eq!(mol.hybridization(c3), Hybridization::SP3);
    }

    #[test]
    fn components_separates_disconnected_fragments() {
        let mut mol = ethanol();
        mol.add_atom(Element::Na);
        let components = mol.components();
        assert_eq!(components.len(), 2);
        assert_eq!(components[0], vec![0, 1, 2]);
        assert_eq!(components[1], vec![3]);
    }

    #[test]
    fn largest_fragment_drops_counter_ion() {
        let mut mol = ethanol();
        mol.set_title("ethanol sodium");
        let na = mol.add_atom(Element::Na);
        mol.atoms[na].formal_charge = 1;
        let fragment = mol.largest_fragment();
        assert_eq!(fragment.atoms.len(), 3);
        assert_eq!(fragment.bonds.len(), 2);
        assert_eq!(fragment.title(), "ethanol sodium");
    }

    #[test]
    fn largest_fragment_is_identity_for_connected_molecules() {
        let mol = ethanol();
        assert_eq!(mol.largest_fragment(), mol);
    }
}
