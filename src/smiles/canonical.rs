//! Canonical atom ranking for deterministic SMILES output.
//!
//! The engine's equality oracle is byte-equality of canonical SMILES, so the
//! ranking must not depend on input atom order: the same structure reached
//! along two different rewrite paths has to serialize identically. Ranks are
//! computed by iterative invariant refinement; remaining ties are broken by
//! trying each member of the first tied class and keeping the labeling with
//! the lexicographically smallest graph signature.

use crate::core::graph::Molecule;
use crate::core::BondOrder;

/// Computes a canonical rank for every atom.
///
/// Ranks are a permutation of `0..n`: lower ranks serialize first. Two
/// molecules with identical graphs receive identical rankings regardless of
/// atom insertion order.
pub fn canonical_ranks(mol: &Molecule) -> Vec<usize> {
    let n = mol.atoms.len();
    if n == 0 {
        return Vec::new();
    }
    let mut ranks = initial_ranks(mol);
    refine(mol, &mut ranks);
    let labeling = complete(mol, ranks);
    debug_assert!(is_discrete(&labeling));
    labeling
}

/// Seeds ranks from atom-local invariants.
fn initial_ranks(mol: &Molecule) -> Vec<usize> {
    let invariants: Vec<(u8, bool, i8, u8, u8, u8)> = (0..mol.atoms.len())
        .map(|i| {
            let atom = &mol.atoms[i];
            (
                atom.element.atomic_number(),
                atom.aromatic,
                atom.formal_charge,
                mol.heavy_degree(i),
                mol.degree(i),
                atom.implicit_h,
            )
        })
        .collect();
    ranks_from_keys(&invariants)
}

/// Repeatedly extends each atom's rank with its sorted neighborhood until
/// the partition stops splitting.
fn refine(mol: &Molecule, ranks: &mut Vec<usize>) {
    loop {
        let keys: Vec<(usize, Vec<(u8, usize)>)> = (0..mol.atoms.len())
            .map(|i| {
                let mut neighborhood: Vec<(u8, usize)> = mol
                    .neighbors(i)
                    .map(|(n, b)| (bond_key(&mol.bonds[b]), ranks[n]))
                    .collect();
                neighborhood.sort_unstable();
                (ranks[i], neighborhood)
            })
            .collect();
        let next = ranks_from_keys(&keys);
        if next == *ranks {
            return;
        }
        *ranks = next;
    }
}

/// Resolves residual symmetry by splitting the first tied class every
/// possible way and keeping the smallest resulting signature.
fn complete(mol: &Molecule, ranks: Vec<usize>) -> Vec<usize> {
    let Some(tied_rank) = first_tied_rank(&ranks) else {
        return ranks;
    };
    let members: Vec<usize> = (0..ranks.len()).filter(|&i| ranks[i] == tied_rank).collect();

    let mut best: Option<(Vec<SignatureRow>, Vec<usize>)> = None;
    for &member in &members {
        let mut candidate = ranks.clone();
        for (i, rank) in candidate.iter_mut().enumerate() {
            if *rank >= tied_rank && i != member {
                *rank += 1;
            }
        }
        refine(mol, &mut candidate);
        let candidate = complete(mol, candidate);
        let sig = signature(mol, &candidate);
        match &best {
            Some((best_sig, _)) if *best_sig <= sig => {}
            _ => best = Some((sig, candidate)),
        }
    }
    best.map(|(_, ranks)| ranks).unwrap_or(ranks)
}

type SignatureRow = (u8, bool, i8, u8, Vec<(usize, u8)>);

/// Serializes the graph under a labeling for tie-break comparison.
fn signature(mol: &Molecule, ranks: &[usize]) -> Vec<SignatureRow> {
    let mut order: Vec<usize> = (0..mol.atoms.len()).collect();
    order.sort_unstable_by_key(|&i| ranks[i]);
    order
        .iter()
        .map(|&i| {
            let atom = &mol.atoms[i];
            let mut neighborhood: Vec<(usize, u8)> = mol
                .neighbors(i)
                .map(|(n, b)| (ranks[n], bond_key(&mol.bonds[b])))
                .collect();
            neighborhood.sort_unstable();
            (
                atom.element.atomic_number(),
                atom.aromatic,
                atom.formal_charge,
                atom.implicit_h,
                neighborhood,
            )
        })
        .collect()
}

fn first_tied_rank(ranks: &[usize]) -> Option<usize> {
    let mut counts = vec![0usize; ranks.len()];
    for &r in ranks {
        counts[r] += 1;
    }
    counts
        .iter()
        .enumerate()
        .find(|&(_, &c)| c > 1)
        .map(|(r, _)| r)
}

fn is_discrete(ranks: &[usize]) -> bool {
    first_tied_rank(ranks).is_none()
}

/// Maps arbitrary orderable keys onto dense ranks starting at zero.
fn ranks_from_keys<K: Ord + Clone>(keys: &[K]) -> Vec<usize> {
    let mut sorted: Vec<K> = keys.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    keys.iter()
        .map(|k| sorted.binary_search(k).unwrap_or(0))
        .collect()
}

/// Bond comparison key. Aromatic-flagged bonds compare equal regardless of
/// the Kekulé order they happen to carry, so alternative resolutions of the
/// same aromatic system rank identically.
fn bond_key(bond: &crate::core::graph::Bond) -> u8 {
    if bond.aromatic {
        return 4;
    }
    match bond.order {
        BondOrder::Single => 1,
        BondOrder::Double => 2,
        BondOrder::Triple => 3,
        BondOrder::Aromatic => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Element;
    use pretty_assertions::assert_eq;

    #[test]
    fn ranks_are_a_permutation() {
        let mol = crate::smiles::reader::read("CC(=O)N").unwrap();
        let mut ranks = canonical_ranks(&mol);
        ranks.sort_unstable();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
    }

    #[test]
    fn symmetric_benzene_resolves_to_discrete_ranks() {
        let mol = crate::smiles::reader::read("c1ccccc1").unwrap();
        let mut ranks = canonical_ranks(&mol);
        ranks.sort_unstable();
        assert_eq!(ranks, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn ranking_is_independent_of_atom_insertion_order() {
        // the same alcohol built in two different orders
        let mut forward = Molecule::new();
        let c1 = forward.add_atom(Element::C);
        let c2 = forward.add_atom(Element::C);
        let o = forward.add_atom(Element::O);
        forward.atoms[c1].implicit_h = 3;
        forward.atoms[c2].implicit_h = 2;
        forward.atoms[o].implicit_h = 1;
        forward.add_bond(c1, c2, BondOrder::Single).unwrap();
        forward.add_bond(c2, o, BondOrder::Single).unwrap();

        let mut backward = Molecule::new();
        let o = backward.add_atom(Element::O);
        let c2 = backward.add_atom(Element::C);
        let c1 = backward.add_atom(Element::C);
        backward.atoms[o].implicit_h = 1;
        backward.atoms[c2].implicit_h = 2;
        backward.atoms[c1].implicit_h = 3;
        backward.add_bond(o, c2, BondOrder::Single).unwrap();
        backward.add_bond(c2, c1, BondOrder::Single).unwrap();

        let fr = canonical_ranks(&forward);
        let br = canonical_ranks(&backward);
        // same structural role, same rank
        assert_eq!(fr[0], br[2]);
        assert_eq!(fr[1], br[1]);
        assert_eq!(fr[2], br[0]);
    }
}
