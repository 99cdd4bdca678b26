//! Backtracking subgraph matcher for compiled patterns.
//!
//! Heavy pattern atoms are matched injectively onto molecule atoms; each
//! candidate extension must satisfy the atom predicate and every bond
//! expression back to already-placed pattern atoms. Hydrogen query atoms
//! never consume molecule atoms: they claim implicit hydrogens on the
//! image of their heavy anchor, with multiplicity checked per anchor.

use super::parser::{AtomExpr, BondExpr, Pattern, PatternAtom};
use crate::core::graph::Molecule;
use crate::perception::rings::{perceive_rings, ring_membership};

/// One embedding of a pattern's heavy atoms into a molecule.
///
/// `images[i]` is the molecule atom matched by heavy pattern atom `i`
/// (indices follow the pattern's heavy-atom subsequence).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embedding {
    /// Molecule atom matched by each heavy pattern atom.
    pub images: Vec<usize>,
}

/// A pattern compiled against nothing in particular, ready to search any
/// molecule.
#[derive(Debug, Clone)]
pub struct Matcher {
    /// Indices of heavy (non-hydrogen-query) pattern atoms.
    heavy: Vec<usize>,
    /// For each heavy atom position k > 0: `(parent position, bond)`
    /// linking it to an earlier heavy atom.
    attach: Vec<Option<(usize, BondExpr)>>,
    /// Extra bonds among heavy atoms beyond the search tree.
    cross_bonds: Vec<(usize, usize, BondExpr)>,
    /// Hydrogen-query multiplicity per heavy atom position.
    h_demand: Vec<u8>,
    pattern: Pattern,
}

impl Matcher {
    /// Compiles a pattern into a search plan.
    ///
    /// # Errors
    ///
    /// Returns a diagnostic when the heavy-atom part of the pattern is
    /// disconnected or a hydrogen query has no heavy anchor.
    pub fn compile(pattern: Pattern) -> Result<Matcher, String> {
        let heavy: Vec<usize> = (0..pattern.atoms.len())
            .filter(|&i| !pattern.atoms[i].is_hydrogen)
            .collect();
        if heavy.is_empty() {
            return Err("pattern has no heavy atoms".to_string());
        }
        let heavy_pos: Vec<Option<usize>> = {
            let mut pos = vec![None; pattern.atoms.len()];
            for (k, &i) in heavy.iter().enumerate() {
                pos[i] = Some(k);
            }
            pos
        };

        let mut h_demand = vec![0u8; heavy.len()];
        for (i, atom) in pattern.atoms.iter().enumerate() {
            if !atom.is_hydrogen {
                continue;
            }
            let anchor = pattern
                .hydrogen_anchor(i)
                .and_then(|a| heavy_pos[a])
                .ok_or_else(|| "hydrogen query without a heavy anchor".to_string())?;
            h_demand[anchor] += 1;
        }

        // order the heavy atoms into a connected search tree
        let mut order = vec![0usize];
        let mut placed = vec![false; heavy.len()];
        placed[0] = true;
        let mut attach: Vec<Option<(usize, BondExpr)>> = vec![None; heavy.len()];
        while order.len() < heavy.len() {
            let mut extended = false;
            for &(a, b, bond) in &pattern.bonds {
                let (Some(pa), Some(pb)) = (heavy_pos[a], heavy_pos[b]) else {
                    continue;
                };
                let (from, to) = if placed[pa] && !placed[pb] {
                    (pa, pb)
                } else if placed[pb] && !placed[pa] {
                    (pb, pa)
                } else {
                    continue;
                };
                placed[to] = true;
                attach[to] = Some((from, bond));
                order.push(to);
                extended = true;
            }
            if !extended {
                return Err("pattern heavy atoms are disconnected".to_string());
            }
        }

        // remaining bonds become cross checks once both ends are placed
        let position_in_order: Vec<usize> = {
            let mut pos = vec![0; heavy.len()];
            for (rank, &k) in order.iter().enumerate() {
                pos[k] = rank;
            }
            pos
        };
        let mut cross_bonds = Vec::new();
        for &(a, b, bond) in &pattern.bonds {
            let (Some(pa), Some(pb)) = (heavy_pos[a], heavy_pos[b]) else {
                continue;
            };
            let (early, late) = if position_in_order[pa] < position_in_order[pb] {
                (pa, pb)
            } else {
                (pb, pa)
            };
            if attach[late] != Some((early, bond)) {
                cross_bonds.push((early, late, bond));
            }
        }

        // reindex the plan into search order
        let heavy_in_order: Vec<usize> = order.iter().map(|&k| heavy[k]).collect();
        let attach_in_order: Vec<Option<(usize, BondExpr)>> = order
            .iter()
            .map(|&k| attach[k].map(|(p, bond)| (position_in_order[p], bond)))
            .collect();
        let cross_in_order: Vec<(usize, usize, BondExpr)> = cross_bonds
            .iter()
            .map(|&(a, b, bond)| (position_in_order[a], position_in_order[b], bond))
            .collect();
        let h_in_order: Vec<u8> = order.iter().map(|&k| h_demand[k]).collect();

        Ok(Matcher {
            heavy: heavy_in_order,
            attach: attach_in_order,
            cross_bonds: cross_in_order,
            h_demand: h_in_order,
            pattern,
        })
    }

    /// Returns the pattern atom backing heavy position `k`.
    pub fn heavy_atom(&self, k: usize) -> &PatternAtom {
        &self.pattern.atoms[self.heavy[k]]
    }

    /// Returns the number of heavy pattern atoms.
    pub fn heavy_len(&self) -> usize {
        self.heavy.len()
    }

    /// Finds every embedding of the pattern in the molecule.
    pub fn find(&self, mol: &Molecule) -> Vec<Embedding> {
        let rings = perceive_rings(mol);
        let (atom_in_ring, _) = ring_membership(mol, &rings);
        let mut found = Vec::new();
        let mut images = vec![usize::MAX; self.heavy.len()];
        let mut used = vec![false; mol.atoms.len()];
        self.extend(mol, &atom_in_ring, 0, &mut images, &mut used, &mut found);
        found
    }

    fn extend(
        &self,
        mol: &Molecule,
        atom_in_ring: &[bool],
        depth: usize,
        images: &mut Vec<usize>,
        used: &mut Vec<bool>,
        found: &mut Vec<Embedding>,
    ) {
        if depth == self.heavy.len() {
            found.push(Embedding {
                images: images.clone(),
            });
            return;
        }
        let candidates: Vec<usize> = match self.attach[depth] {
            None => (0..mol.atoms.len()).collect(),
            Some((parent, _)) => mol.neighbors(images[parent]).map(|(n, _)| n).collect(),
        };
        for candidate in candidates {
            if used[candidate] {
                continue;
            }
            if !self.accepts(mol, atom_in_ring, depth, candidate, images) {
                continue;
            }
            images[depth] = candidate;
            used[candidate] = true;
            self.extend(mol, atom_in_ring, depth + 1, images, used, found);
            used[candidate] = false;
            images[depth] = usize::MAX;
        }
    }

    fn accepts(
        &self,
        mol: &Molecule,
        atom_in_ring: &[bool],
        depth: usize,
        candidate: usize,
        images: &[usize],
    ) -> bool {
        if !eval(&self.heavy_atom(depth).expr, mol, atom_in_ring, candidate) {
            return false;
        }
        if mol.atoms[candidate].implicit_h < self.h_demand[depth] {
            return false;
        }
        if let Some((parent, bond_expr)) = self.attach[depth] {
            match mol.bond_between(images[parent], candidate) {
                Some(b) => {
                    let bond = &mol.bonds[b];
                    if !bond_expr.matches(bond.order, bond.aromatic) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        for &(a, b, bond_expr) in &self.cross_bonds {
            if b != depth || a > depth {
                continue;
            }
            match mol.bond_between(images[a], candidate) {
                Some(bond_id) => {
                    let bond = &mol.bonds[bond_id];
                    if !bond_expr.matches(bond.order, bond.aromatic) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }
}

/// Evaluates an atom expression against one molecule atom.
fn eval(expr: &AtomExpr, mol: &Molecule, atom_in_ring: &[bool], atom_id: usize) -> bool {
    let atom = &mol.atoms[atom_id];
    match expr {
        AtomExpr::Any => true,
        AtomExpr::AnyAromatic => atom.aromatic,
        AtomExpr::AnyAliphatic => !atom.aromatic,
        AtomExpr::Element { element, aromatic } => {
            atom.element == *element && atom.aromatic == *aromatic
        }
        AtomExpr::AtomicNumber(n) => atom.element.atomic_number() == *n,
        AtomExpr::Charge(c) => atom.formal_charge == *c,
        AtomExpr::TotalH(n) => mol.total_h(atom_id) == *n,
        AtomExpr::Connections(n) => mol.degree(atom_id) == *n,
        AtomExpr::Degree(n) => mol.neighbors(atom_id).count() as u8 == *n,
        AtomExpr::InRing(wanted) => atom_in_ring[atom_id] == *wanted,
        AtomExpr::Not(inner) => !eval(inner, mol, atom_in_ring, atom_id),
        AtomExpr::And(terms) => terms.iter().all(|t| eval(t, mol, atom_in_ring, atom_id)),
        AtomExpr::Or(terms) => terms.iter().any(|t| eval(t, mol, atom_in_ring, atom_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles;

    fn matcher(smarts: &str) -> Matcher {
        Matcher::compile(Pattern::parse(smarts).unwrap()).unwrap()
    }

    #[test]
    fn matches_carbonyl_in_ketone() {
        let mol = smiles::parse("CC(=O)C").unwrap();
        let found = matcher("[C:1]=[O:2]").find(&mol);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].images, vec![1, 2]);
    }

    #[test]
    fn respects_bond_order_expressions() {
        let mol = smiles::parse("CCO").unwrap();
        assert!(matcher("C=O").find(&mol).is_empty());
        assert_eq!(matcher("C-O").find(&mol).len(), 1);
    }

    #[test]
    fn aromatic_primitives_only_match_aromatic_atoms() {
        let benzene = smiles::parse("c1ccccc1").unwrap();
        let cyclohexane = smiles::parse("C1CCCCC1").unwrap();
        let aromatic_pair = matcher("c:c");
        assert!(!aromatic_pair.find(&benzene).is_empty());
        assert!(aromatic_pair.find(&cyclohexane).is_empty());
    }

    #[test]
    fn hydrogen_queries_require_implicit_hydrogens() {
        let acetone = smiles::parse("CC(=O)C").unwrap();
        // the carbonyl carbon has no hydrogen to give
        assert!(matcher("[H:9][C:1]=[O:2]").find(&acetone).is_empty());
        // the methyl next door has three
        let alpha = matcher("[H:9][C:1][C:2]=[O:3]").find(&acetone);
        assert_eq!(alpha.len(), 2);
    }

    #[test]
    fn charge_and_h_count_primitives_filter() {
        let mol = smiles::parse("[NH4+]").unwrap();
        assert_eq!(matcher("[N;+;H4]").find(&mol).len(), 1);
        assert!(matcher("[N;!+]").find(&mol).is_empty());
    }

    #[test]
    fn ring_membership_primitive_filters() {
        let mol = smiles::parse("C1CCCCC1C").unwrap();
        assert_eq!(matcher("[C;R0]").find(&mol).len(), 1);
        assert_eq!(matcher("[C;R]").find(&mol).len(), 6);
    }

    #[test]
    fn injective_matching_never_reuses_an_atom() {
        let mol = smiles::parse("C=C").unwrap();
        // both orientations of the symmetric bond, but never C0=C0
        let found = matcher("[C:1]=[C:2]").find(&mol);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|e| e.images[0] != e.images[1]));
    }

    #[test]
    fn or_lists_widen_the_match() {
        let thione = smiles::parse("CC(=S)C").unwrap();
        let found = matcher("[C:1]=[O,S:2]").find(&thione);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn disconnected_heavy_patterns_are_rejected() {
        let pattern = Pattern::parse("C.O");
        // the SMARTS parser has no dot; this arrives as a parse error
        assert!(pattern.is_err());
    }
}
