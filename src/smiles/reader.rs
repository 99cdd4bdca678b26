//! SMILES parser producing a raw molecular graph.
//!
//! The reader handles the organic subset, bracket atoms with charge,
//! hydrogen count, tetrahedral chirality and atom maps, branches, ring
//! closures (including `%nn`), disconnected components, and directional
//! bonds. Aromatic bonds come out carrying the transient `Aromatic` order;
//! callers are expected to run Kekulé resolution before using the graph.
//!
//! Tetrahedral markers are normalized at the end of the parse: the winding
//! written in the string (which is relative to the neighbor encounter
//! order) is converted to the reference frame stored on the atom, so the
//! parity survives later graph edits that do not touch the center.

use crate::core::graph::Molecule;
use crate::core::{BondDir, BondOrder, Element, Parity};
use crate::perception::valence::implicit_hydrogens;
use std::collections::HashMap;

/// Bond symbol as written, before resolution against atom aromaticity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BondSym {
    Elided,
    Single,
    Double,
    Triple,
    Aromatic,
    Up,
    Down,
}

/// A neighbor reference in encounter order, used to normalize chirality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StereoRef {
    Atom(usize),
    ImplicitH,
    /// Ring bond opened but not yet closed; patched to `Atom` on closure.
    PendingRing(u16),
}

struct RingOpening {
    atom: usize,
    sym: BondSym,
}

struct Reader<'a> {
    text: &'a [u8],
    pos: usize,
    mol: Molecule,
    prev: Option<usize>,
    stack: Vec<Option<usize>>,
    pending: BondSym,
    rings: HashMap<u16, RingOpening>,
    encounter: Vec<Vec<StereoRef>>,
    has_parent: Vec<bool>,
    chiral_mark: Vec<Option<Parity>>,
    bracketed: Vec<bool>,
}

/// Parses a SMILES string into a raw molecule.
///
/// # Errors
///
/// Returns a human-readable diagnostic naming the offending position when
/// the string is malformed.
pub fn read(input: &str) -> Result<Molecule, String> {
    if !input.is_ascii() {
        return Err("SMILES must be pure ASCII".to_string());
    }
    let mut reader = Reader {
        text: input.as_bytes(),
        pos: 0,
        mol: Molecule::new(),
        prev: None,
        stack: Vec::new(),
        pending: BondSym::Elided,
        rings: HashMap::new(),
        encounter: Vec::new(),
        has_parent: Vec::new(),
        chiral_mark: Vec::new(),
        bracketed: Vec::new(),
    };
    reader.run()?;
    Ok(reader.mol)
}

impl<'a> Reader<'a> {
    fn peek(&self) -> Option<u8> {
        self.text.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn fail(&self, message: &str) -> String {
        format!("{} at position {}", message, self.pos)
    }

    fn run(&mut self) -> Result<(), String> {
        while let Some(c) = self.peek() {
            match c {
                b'(' => {
                    self.bump();
                    if self.prev.is_none() {
                        return Err(self.fail("branch opened before any atom"));
                    }
                    self.stack.push(self.prev);
                }
                b')' => {
                    self.bump();
                    match self.stack.pop() {
                        Some(restored) => self.prev = restored,
                        None => return Err(self.fail("unmatched ')'")),
                    }
                }
                b'.' => {
                    self.bump();
                    if self.pending != BondSym::Elided {
                        return Err(self.fail("bond symbol before '.'"));
                    }
                    self.prev = None;
                }
                b'-' => {
                    self.bump();
                    self.set_pending(BondSym::Single)?;
                }
                b'=' => {
                    self.bump();
                    self.set_pending(BondSym::Double)?;
                }
                b'#' => {
                    self.bump();
                    self.set_pending(BondSym::Triple)?;
                }
                b':' => {
                    self.bump();
                    self.set_pending(BondSym::Aromatic)?;
                }
                b'/' => {
                    self.bump();
                    self.set_pending(BondSym::Up)?;
                }
                b'\\' => {
                    self.bump();
                    self.set_pending(BondSym::Down)?;
                }
                b'0'..=b'9' => {
                    let rnum = (self.bump().unwrap() - b'0') as u16;
                    self.ring_bond(rnum)?;
                }
                b'%' => {
                    self.bump();
                    let rnum = self.read_two_digit_rnum()?;
                    self.ring_bond(rnum)?;
                }
                b'[' => {
                    self.bump();
                    self.bracket_atom()?;
                }
                _ => {
                    self.organic_atom()?;
                }
            }
        }
        if !self.stack.is_empty() {
            return Err(self.fail("unmatched '('"));
        }
        if let Some(rnum) = self.rings.keys().next() {
            return Err(format!("ring bond {} never closed", rnum));
        }
        if self.pending != BondSym::Elided {
            return Err(self.fail("dangling bond symbol"));
        }
        self.assign_implicit_hydrogens();
        self.normalize_chirality()?;
        Ok(())
    }

    fn set_pending(&mut self, sym: BondSym) -> Result<(), String> {
        if self.pending != BondSym::Elided {
            return Err(self.fail("two bond symbols in a row"));
        }
        if self.prev.is_none() {
            return Err(self.fail("bond symbol before any atom"));
        }
        self.pending = sym;
        Ok(())
    }

    fn read_two_digit_rnum(&mut self) -> Result<u16, String> {
        let mut value = 0u16;
        for _ in 0..2 {
            match self.bump() {
                Some(d @ b'0'..=b'9') => value = value * 10 + (d - b'0') as u16,
                _ => return Err(self.fail("'%' must be followed by two digits")),
            }
        }
        Ok(value)
    }

    /// Adds an atom parsed from the organic subset (possibly aromatic).
    fn organic_atom(&mut self) -> Result<(), String> {
        let start = self.pos;
        let c = self.bump().ok_or_else(|| self.fail("unexpected end"))?;
        let (element, aromatic) = match c {
            b'B' => {
                if self.peek() == Some(b'r') {
                    self.bump();
                    (Element::Br, false)
                } else {
                    (Element::B, false)
                }
            }
            b'C' => {
                if self.peek() == Some(b'l') {
                    self.bump();
                    (Element::Cl, false)
                } else {
                    (Element::C, false)
                }
            }
            b'N' => (Element::N, false),
            b'O' => (Element::O, false),
            b'P' => (Element::P, false),
            b'S' => (Element::S, false),
            b'F' => (Element::F, false),
            b'I' => (Element::I, false),
            b'b' => (Element::B, true),
            b'c' => (Element::C, true),
            b'n' => (Element::N, true),
            b'o' => (Element::O, true),
            b'p' => (Element::P, true),
            b's' => (Element::S, true),
            other => {
                self.pos = start;
                return Err(self.fail(&format!("unexpected character '{}'", other as char)));
            }
        };
        self.push_atom(element, aromatic, false, 0, 0, 0, None)
    }

    /// Parses a bracket atom: `[symbol chiral? hcount? charge? map?]`.
    fn bracket_atom(&mut self) -> Result<(), String> {
        let (element, aromatic) = self.bracket_symbol()?;

        let mut parity = None;
        if self.peek() == Some(b'@') {
            self.bump();
            if self.peek() == Some(b'@') {
                self.bump();
                parity = Some(Parity::Clockwise);
            } else {
                parity = Some(Parity::Anticlockwise);
            }
        }

        let mut hcount = 0u8;
        if self.peek() == Some(b'H') {
            self.bump();
            hcount = 1;
            if let Some(d @ b'0'..=b'9') = self.peek() {
                self.bump();
                hcount = d - b'0';
            }
        }

        let mut charge = 0i8;
        match self.peek() {
            Some(b'+') => {
                self.bump();
                charge = 1;
                if self.peek() == Some(b'+') {
                    self.bump();
                    charge = 2;
                } else if let Some(d @ b'0'..=b'9') = self.peek() {
                    self.bump();
                    charge = (d - b'0') as i8;
                }
            }
            Some(b'-') => {
                self.bump();
                charge = -1;
                if self.peek() == Some(b'-') {
                    self.bump();
                    charge = -2;
                } else if let Some(d @ b'0'..=b'9') = self.peek() {
                    self.bump();
                    charge = -((d - b'0') as i8);
                }
            }
            _ => {}
        }

        let mut map_idx = 0u32;
        if self.peek() == Some(b':') {
            self.bump();
            let mut any = false;
            while let Some(d @ b'0'..=b'9') = self.peek() {
                self.bump();
                map_idx = map_idx * 10 + (d - b'0') as u32;
                any = true;
            }
            if !any {
                return Err(self.fail("':' in bracket must be followed by a map index"));
            }
        }

        if self.bump() != Some(b']') {
            return Err(self.fail("expected ']'"));
        }
        self.push_atom(element, aromatic, true, hcount, charge, map_idx, parity)
    }

    fn bracket_symbol(&mut self) -> Result<(Element, bool), String> {
        let c = self
            .bump()
            .ok_or_else(|| self.fail("unterminated bracket atom"))?;
        if c.is_ascii_digit() {
            return Err(self.fail("isotope specifications are not supported"));
        }
        if c.is_ascii_lowercase() {
            let element = match c {
                b'b' => Element::B,
                b'c' => Element::C,
                b'n' => Element::N,
                b'o' => Element::O,
                b'p' => Element::P,
                b's' => {
                    if self.peek() == Some(b'e') {
                        self.bump();
                        Element::Se
                    } else {
                        Element::S
                    }
                }
                _ => return Err(self.fail("unknown aromatic symbol")),
            };
            return Ok((element, true));
        }
        // two-letter symbols are upper+lower; try the pair first
        let mut symbol = (c as char).to_string();
        if let Some(lower) = self.peek().filter(|b| b.is_ascii_lowercase()) {
            let mut pair = symbol.clone();
            pair.push(lower as char);
            if pair.parse::<Element>().is_ok() {
                self.bump();
                symbol = pair;
            }
        }
        symbol
            .parse::<Element>()
            .map(|element| (element, false))
            .map_err(|e| self.fail(&e))
    }

    #[allow(clippy::too_many_arguments)]
    fn push_atom(
        &mut self,
        element: Element,
        aromatic: bool,
        bracketed: bool,
        hcount: u8,
        charge: i8,
        map_idx: u32,
        parity: Option<Parity>,
    ) -> Result<(), String> {
        let id = self.mol.add_atom(element);
        {
            let atom = &mut self.mol.atoms[id];
            atom.aromatic = aromatic;
            atom.implicit_h = hcount;
            atom.formal_charge = charge;
            atom.map_idx = map_idx;
        }
        self.encounter.push(Vec::new());
        self.chiral_mark.push(parity);
        self.bracketed.push(bracketed);
        self.has_parent.push(self.prev.is_some());

        if let Some(prev) = self.prev {
            let sym = std::mem::replace(&mut self.pending, BondSym::Elided);
            self.create_bond(prev, id, sym)?;
            self.encounter[prev].push(StereoRef::Atom(id));
            self.encounter[id].push(StereoRef::Atom(prev));
        } else if self.pending != BondSym::Elided {
            return Err(self.fail("bond symbol with no preceding atom"));
        }
        self.prev = Some(id);
        Ok(())
    }

    fn create_bond(&mut self, begin: usize, end: usize, sym: BondSym) -> Result<(), String> {
        let both_aromatic = self.mol.atoms[begin].aromatic && self.mol.atoms[end].aromatic;
        let (order, aromatic, dir) = match sym {
            BondSym::Elided if both_aromatic => (BondOrder::Aromatic, true, None),
            BondSym::Elided | BondSym::Single => (BondOrder::Single, false, None),
            BondSym::Double => (BondOrder::Double, false, None),
            BondSym::Triple => (BondOrder::Triple, false, None),
            BondSym::Aromatic => (BondOrder::Aromatic, true, None),
            BondSym::Up => (BondOrder::Single, false, Some(BondDir::Up)),
            BondSym::Down => (BondOrder::Single, false, Some(BondDir::Down)),
        };
        let bond_id = self
            .mol
            .add_bond(begin, end, order)
            .map_err(|e| self.fail(e))?;
        self.mol.bonds[bond_id].aromatic = aromatic;
        self.mol.bonds[bond_id].dir = dir;
        Ok(())
    }

    fn ring_bond(&mut self, rnum: u16) -> Result<(), String> {
        let current = match self.prev {
            Some(atom) => atom,
            None => return Err(self.fail("ring bond digit before any atom")),
        };
        let sym = std::mem::replace(&mut self.pending, BondSym::Elided);
        match self.rings.remove(&rnum) {
            None => {
                self.rings.insert(rnum, RingOpening { atom: current, sym });
                self.encounter[current].push(StereoRef::PendingRing(rnum));
            }
            Some(opening) => {
                if opening.atom == current {
                    return Err(self.fail("ring bond closed on the atom that opened it"));
                }
                let sym = reconcile_ring_syms(opening.sym, sym)
                    .ok_or_else(|| self.fail("conflicting ring bond symbols"))?;
                self.create_bond(opening.atom, current, sym)?;
                // patch the opener's placeholder now the partner is known
                for slot in &mut self.encounter[opening.atom] {
                    if *slot == StereoRef::PendingRing(rnum) {
                        *slot = StereoRef::Atom(current);
                        break;
                    }
                }
                self.encounter[current].push(StereoRef::Atom(opening.atom));
            }
        }
        Ok(())
    }

    /// Fills hydrogen counts on atoms written without brackets.
    fn assign_implicit_hydrogens(&mut self) {
        for atom_id in 0..self.mol.atoms.len() {
            if self.bracketed[atom_id] {
                continue;
            }
            let bond_sum: u8 = self
                .mol
                .neighbors(atom_id)
                .map(|(_, b)| self.mol.bonds[b].order.valence())
                .sum();
            let aromatic = self.mol.atoms[atom_id].aromatic;
            self.mol.atoms[atom_id].implicit_h =
                implicit_hydrogens(self.mol.atoms[atom_id].element, bond_sum, aromatic);
        }
    }

    /// Converts `@`/`@@` markers from encounter order to the reference
    /// neighbor frame. Markers on atoms that do not have four distinct
    /// neighbor slots are dropped.
    fn normalize_chirality(&mut self) -> Result<(), String> {
        for atom_id in 0..self.mol.atoms.len() {
            let Some(written) = self.chiral_mark[atom_id] else {
                continue;
            };
            let mut refs = self.encounter[atom_id].clone();
            if self.mol.atoms[atom_id].implicit_h == 1 && refs.len() == 3 {
                let slot = if self.has_parent[atom_id] { 1 } else { 0 };
                refs.insert(slot, StereoRef::ImplicitH);
            }
            if refs.len() != 4 {
                continue;
            }
            let keys: Vec<usize> = refs
                .iter()
                .map(|r| match r {
                    StereoRef::Atom(id) => *id,
                    StereoRef::ImplicitH => usize::MAX,
                    StereoRef::PendingRing(_) => usize::MAX - 1,
                })
                .collect();
            self.mol.atoms[atom_id].parity = Some(written.permuted(permutation_is_odd(&keys)));
        }
        Ok(())
    }
}

fn reconcile_ring_syms(open: BondSym, close: BondSym) -> Option<BondSym> {
    match (open, close) {
        (BondSym::Elided, other) | (other, BondSym::Elided) => Some(other),
        (a, b) if a == b => Some(a),
        _ => None,
    }
}

/// Returns whether sorting `keys` ascending requires an odd number of
/// transpositions.
pub(crate) fn permutation_is_odd(keys: &[usize]) -> bool {
    let mut inversions = 0;
    for i in 0..keys.len() {
        for j in (i + 1)..keys.len() {
            if keys[i] > keys[j] {
                inversions += 1;
            }
        }
    }
    inversions % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_linear_alkane_with_implicit_hydrogens() {
        let mol = read("CCO").unwrap();
        assert_eq!(mol.atoms.len(), 3);
        assert_eq!(mol.bonds.len(), 2);
        assert_eq!(mol.atoms[0].implicit_h, 3);
        assert_eq!(mol.atoms[1].implicit_h, 2);
        assert_eq!(mol.atoms[2].implicit_h, 1);
    }

    #[test]
    fn parses_branches_and_double_bonds() {
        let mol = read("CC(=O)C").unwrap();
        assert_eq!(mol.atoms.len(), 4);
        let carbonyl = mol.bond_between(1, 2).unwrap();
        assert_eq!(mol.bonds[carbonyl].order, BondOrder::Double);
        assert_eq!(mol.atoms[2].implicit_h, 0);
    }

    #[test]
    fn parses_aromatic_ring_with_ring_closure() {
        let mol = read("c1ccccc1").unwrap();
        assert_eq!(mol.atoms.len(), 6);
        assert_eq!(mol.bonds.len(), 6);
        assert!(mol.atoms.iter().all(|a| a.aromatic));
        assert!(mol.bonds.iter().all(|b| b.order == BondOrder::Aromatic));
        assert!(mol.atoms.iter().all(|a| a.implicit_h == 1));
    }

    #[test]
    fn parses_bracket_atom_fields() {
        let mol = read("[NH4+]").unwrap();
        assert_eq!(mol.atoms[0].element, Element::N);
        assert_eq!(mol.atoms[0].implicit_h, 4);
        assert_eq!(mol.atoms[0].formal_charge, 1);
    }

    #[test]
    fn parses_charge_digits_and_map_indices() {
        let mol = read("[O-:7]").unwrap();
        assert_eq!(mol.atoms[0].formal_charge, -1);
        assert_eq!(mol.atoms[0].map_idx, 7);

        let mol = read("[Ca+2]").unwrap();
        assert_eq!(mol.atoms[0].formal_charge, 2);
    }

    #[test]
    fn parses_disconnected_components() {
        let mol = read("[Na+].[Cl-]").unwrap();
        assert_eq!(mol.atoms.len(), 2);
        assert_eq!(mol.bonds.len(), 0);
    }

    #[test]
    fn parses_pyrrole_nitrogen_hydrogen() {
        let mol = read("c1cc[nH]c1").unwrap();
        let nitrogen = mol
            .atoms
            .iter()
            .position(|a| a.element == Element::N)
            .unwrap();
        assert_eq!(mol.atoms[nitrogen].implicit_h, 1);
    }

    #[test]
    fn parses_directional_bonds() {
        let mol = read("F/C=C/F").unwrap();
        let first = mol.bond_between(0, 1).unwrap();
        assert_eq!(mol.bonds[first].dir, Some(BondDir::Up));
        let double = mol.bond_between(1, 2).unwrap();
        assert_eq!(mol.bonds[double].order, BondOrder::Double);
    }

    #[test]
    fn normalizes_tetrahedral_parity_to_reference_frame() {
        // neighbors in encounter order: C(0), H, O(2), C(3); reference
        // order is 0, 2, 3, H — an even permutation, winding preserved
        let mol = read("C[C@H](O)C").unwrap();
        assert_eq!(mol.atoms[1].parity, Some(Parity::Anticlockwise));
    }

    #[test]
    fn drops_chiral_marker_without_four_neighbors() {
        let mol = read("C[C@H2]O").unwrap();
        assert_eq!(mol.atoms[1].parity, None);
    }

    #[test]
    fn rejects_unclosed_ring_and_branch() {
        assert!(read("C1CC").is_err());
        assert!(read("C(C").is_err());
        assert!(read("CC)").is_err());
    }

    #[test]
    fn rejects_conflicting_ring_bond_symbols() {
        assert!(read("C=1CCCCC#1").is_err());
    }

    #[test]
    fn rejects_isotopes_and_unknown_elements() {
        assert!(read("[13C]").is_err());
        assert!(read("[Xx]").is_err());
    }
}
