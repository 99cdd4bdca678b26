//! Rule appliers: compiled rewrite rules ready to run against molecules.
//!
//! The engine depends only on the [`RuleApplier`] capability — bind a
//! starting material, then drain a single-pass sequence of products. The
//! one concrete implementation compiles a SMIRKS-subset rule: a reactant
//! pattern, a product template, and the atom-map correspondence between
//! them, reduced at compile time to an edit script replayed against each
//! embedding.

use crate::core::graph::Molecule;
use crate::core::{BondOrder, Element};
use crate::pattern::parser::{AtomExpr, BondExpr};
use crate::pattern::{Embedding, Matcher, Pattern};
use std::collections::HashMap;

/// One rewrite product together with the molecule atoms the reactant
/// pattern matched, for downstream stereochemistry repair.
#[derive(Debug, Clone)]
pub struct Product {
    /// The rewritten molecule.
    pub mol: Molecule,
    /// Indices of the atoms the reactant pattern's heavy atoms matched.
    /// Atom indices are stable across the rewrite, so these address both
    /// the source and the product.
    pub matched_atoms: Vec<usize>,
}

/// The capability the engine sees: bind a source molecule, then iterate
/// its products. The sequence is single-pass; rebinding restarts it.
pub trait RuleApplier {
    /// Binds `mol` as starting material and returns the number of pattern
    /// matches. Zero means no products will follow.
    fn bind(&mut self, mol: &Molecule) -> usize;

    /// Yields the next product, or `None` when the matches are exhausted.
    fn next_product(&mut self) -> Option<Product>;

    /// Controls whether products carry the rule's atom-map indices.
    fn keep_map_indices(&mut self, keep: bool);
}

/// A compiled SMIRKS rule.
#[derive(Debug)]
pub struct SmirksApplier {
    matcher: Matcher,
    edits: EditScript,
    source: Option<Molecule>,
    embeddings: Vec<Embedding>,
    cursor: usize,
    keep_maps: bool,
}

impl SmirksApplier {
    /// Compiles a SMIRKS string of the form `reactant>>product`.
    ///
    /// # Errors
    ///
    /// Returns a diagnostic when either side fails to parse, the product
    /// template is not concrete, or the atom maps do not pair up.
    pub fn compile(smirks: &str) -> Result<SmirksApplier, String> {
        let (lhs_text, rhs_text) = smirks
            .split_once(">>")
            .ok_or_else(|| "a SMIRKS needs a '>>' separator".to_string())?;
        let lhs = Pattern::parse(lhs_text).map_err(|e| format!("reactant side: {}", e))?;
        let rhs = Pattern::parse(rhs_text).map_err(|e| format!("product side: {}", e))?;
        let edits = EditScript::build(&lhs, &rhs)?;
        let matcher = Matcher::compile(lhs)?;
        Ok(SmirksApplier {
            matcher,
            edits,
            source: None,
            embeddings: Vec::new(),
            cursor: 0,
            keep_maps: false,
        })
    }

    /// Replays the edit script against one embedding.
    fn apply(&self, source: &Molecule, embedding: &Embedding) -> Product {
        let mut mol = source.clone();
        let mut atom_of_map: HashMap<u32, usize> = HashMap::new();
        for k in 0..self.matcher.heavy_len() {
            let map = self.matcher.heavy_atom(k).map_idx;
            if map > 0 {
                atom_of_map.insert(map, embedding.images[k]);
            }
        }

        for spec in &self.edits.set_atoms {
            let atom_id = atom_of_map[&spec.map];
            if let Some(element) = spec.element {
                mol.atoms[atom_id].element = element;
            }
            if let Some(charge) = spec.charge {
                mol.atoms[atom_id].formal_charge = charge;
            }
            if let Some(hcount) = spec.hcount {
                mol.atoms[atom_id].implicit_h = hcount;
            }
        }

        let mut touched: Vec<usize> = Vec::new();
        for edit in &self.edits.bonds {
            let a = atom_of_map[&edit.a_map];
            let b = atom_of_map[&edit.b_map];
            match edit.action {
                BondAction::Keep => {}
                BondAction::Remove => {
                    mol.remove_bond(a, b);
                    touched.push(a);
                    touched.push(b);
                }
                BondAction::Set(order) => {
                    match mol.bond_between(a, b) {
                        Some(bond_id) => {
                            let bond = &mut mol.bonds[bond_id];
                            // an order-preserving set must not disturb
                            // stereo marks around the bond
                            if bond.order != order || bond.aromatic {
                                bond.order = order;
                                bond.aromatic = false;
                                bond.dir = None;
                                touched.push(a);
                                touched.push(b);
                            }
                        }
                        None => {
                            // cannot fail: endpoints exist, are distinct,
                            // and were just checked to be unbonded
                            mol.add_bond(a, b, order).unwrap();
                            touched.push(a);
                            touched.push(b);
                        }
                    }
                }
            }
        }

        // cis/trans marks referencing a rewritten bond are stale
        for bond in &mut mol.bonds {
            if bond.dir.is_some() && (touched.contains(&bond.atoms.0) || touched.contains(&bond.atoms.1)) {
                bond.dir = None;
            }
        }

        for &(map, delta) in &self.edits.h_deltas {
            let atom_id = atom_of_map[&map];
            let h = &mut mol.atoms[atom_id].implicit_h;
            *h = h.saturating_add_signed(delta);
        }

        if self.keep_maps {
            for (&map, &atom_id) in &atom_of_map {
                mol.atoms[atom_id].map_idx = map;
            }
        }

        Product {
            mol,
            matched_atoms: embedding.images.clone(),
        }
    }
}

impl RuleApplier for SmirksApplier {
    fn bind(&mut self, mol: &Molecule) -> usize {
        self.embeddings = self.matcher.find(mol);
        self.source = Some(mol.clone());
        self.cursor = 0;
        self.embeddings.len()
    }

    fn next_product(&mut self) -> Option<Product> {
        let source = self.source.as_ref()?;
        let embedding = self.embeddings.get(self.cursor)?;
        self.cursor += 1;
        Some(self.apply(source, embedding))
    }

    fn keep_map_indices(&mut self, keep: bool) {
        self.keep_maps = keep;
    }
}

/// What a rewrite does to one mapped atom.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AtomSpec {
    map: u32,
    element: Option<Element>,
    charge: Option<i8>,
    hcount: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BondAction {
    Set(BondOrder),
    Keep,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BondEdit {
    a_map: u32,
    b_map: u32,
    action: BondAction,
}

/// The compile-time reduction of a SMIRKS pair: per-atom property sets,
/// per-bond actions, and implicit-hydrogen movements.
#[derive(Debug, Clone, Default)]
struct EditScript {
    set_atoms: Vec<AtomSpec>,
    bonds: Vec<BondEdit>,
    h_deltas: Vec<(u32, i8)>,
}

impl EditScript {
    fn build(lhs: &Pattern, rhs: &Pattern) -> Result<EditScript, String> {
        let lhs_heavy = side_maps(lhs, "reactant")?;
        let rhs_heavy = side_maps(rhs, "product")?;
        let lhs_h = hydrogen_anchors(lhs, &lhs_heavy, "reactant")?;
        let rhs_h = hydrogen_anchors(rhs, &rhs_heavy, "product")?;

        for &map in rhs_heavy.keys() {
            if !lhs_heavy.contains_key(&map) {
                return Err(format!("product atom map {} has no reactant counterpart", map));
            }
        }
        for &map in lhs_heavy.keys() {
            if !rhs_heavy.contains_key(&map) {
                return Err(format!(
                    "reactant atom map {} is missing from the product; heavy-atom deletion is not supported",
                    map
                ));
            }
        }

        let mut set_atoms = Vec::new();
        for (&map, &rhs_idx) in &rhs_heavy {
            let spec = atom_spec(map, &rhs.atoms[rhs_idx].expr)?;
            set_atoms.push(spec);
        }
        set_atoms.sort_by_key(|s| s.map);

        // bond pairing by map pairs
        let lhs_bonds = mapped_bonds(lhs, &lhs_heavy);
        let rhs_bonds = mapped_bonds(rhs, &rhs_heavy);
        let mut bonds = Vec::new();
        for (&(a, b), &expr) in &rhs_bonds {
            let action = match expr {
                BondExpr::Aromatic | BondExpr::Any => BondAction::Keep,
                BondExpr::Single | BondExpr::SingleOrAromatic => BondAction::Set(BondOrder::Single),
                BondExpr::Double => BondAction::Set(BondOrder::Double),
                BondExpr::Triple => BondAction::Set(BondOrder::Triple),
            };
            bonds.push(BondEdit {
                a_map: a,
                b_map: b,
                action,
            });
        }
        for &(a, b) in lhs_bonds.keys() {
            if !rhs_bonds.contains_key(&(a, b)) {
                bonds.push(BondEdit {
                    a_map: a,
                    b_map: b,
                    action: BondAction::Remove,
                });
            }
        }
        bonds.sort_by_key(|e| (e.a_map, e.b_map));

        // hydrogen movement from the map pairing of [H] query atoms
        let mut h_deltas: HashMap<u32, i8> = HashMap::new();
        for (&h_map, &anchor) in &lhs_h {
            match rhs_h.get(&h_map) {
                Some(&rhs_anchor) if rhs_anchor == anchor => {}
                Some(&rhs_anchor) => {
                    *h_deltas.entry(anchor).or_default() -= 1;
                    *h_deltas.entry(rhs_anchor).or_default() += 1;
                }
                None => {
                    *h_deltas.entry(anchor).or_default() -= 1;
                }
            }
        }
        for (&h_map, &anchor) in &rhs_h {
            if !lhs_h.contains_key(&h_map) {
                *h_deltas.entry(anchor).or_default() += 1;
            }
        }
        let mut h_deltas: Vec<(u32, i8)> = h_deltas
            .into_iter()
            .filter(|&(_, delta)| delta != 0)
            .collect();
        h_deltas.sort_unstable();

        Ok(EditScript {
            set_atoms,
            bonds,
            h_deltas,
        })
    }
}

/// Collects heavy-atom maps for one side, rejecting duplicates and
/// unmapped product atoms.
fn side_maps(pattern: &Pattern, side: &str) -> Result<HashMap<u32, usize>, String> {
    let mut maps = HashMap::new();
    for (i, atom) in pattern.atoms.iter().enumerate() {
        if atom.is_hydrogen {
            continue;
        }
        if atom.map_idx == 0 {
            if side == "product" {
                return Err("every product heavy atom must carry a map index".to_string());
            }
            continue;
        }
        if maps.insert(atom.map_idx, i).is_some() {
            return Err(format!("duplicate atom map {} on the {} side", atom.map_idx, side));
        }
    }
    Ok(maps)
}

/// Pairs each hydrogen query with the map of its heavy anchor.
fn hydrogen_anchors(
    pattern: &Pattern,
    heavy: &HashMap<u32, usize>,
    side: &str,
) -> Result<HashMap<u32, u32>, String> {
    let mut anchors = HashMap::new();
    for (i, atom) in pattern.atoms.iter().enumerate() {
        if !atom.is_hydrogen {
            continue;
        }
        if atom.map_idx == 0 {
            return Err(format!("unmapped hydrogen query on the {} side", side));
        }
        let anchor_idx = pattern
            .hydrogen_anchor(i)
            .ok_or_else(|| format!("hydrogen query {} has no anchor", atom.map_idx))?;
        let anchor_map = pattern.atoms[anchor_idx].map_idx;
        if !heavy.contains_key(&anchor_map) {
            return Err(format!(
                "hydrogen query {} is anchored to an unmapped atom on the {} side",
                atom.map_idx, side
            ));
        }
        if anchors.insert(atom.map_idx, anchor_map).is_some() {
            return Err(format!("duplicate hydrogen map {} on the {} side", atom.map_idx, side));
        }
    }
    Ok(anchors)
}

/// Bonds between mapped heavy atoms, keyed by ordered map pair.
fn mapped_bonds(pattern: &Pattern, heavy: &HashMap<u32, usize>) -> HashMap<(u32, u32), BondExpr> {
    let index_to_map: HashMap<usize, u32> =
        heavy.iter().map(|(&map, &idx)| (idx, map)).collect();
    let mut out = HashMap::new();
    for &(a, b, expr) in &pattern.bonds {
        if let (Some(&ma), Some(&mb)) = (index_to_map.get(&a), index_to_map.get(&b)) {
            let key = if ma < mb { (ma, mb) } else { (mb, ma) };
            out.insert(key, expr);
        }
    }
    out
}

/// Reduces a product-template atom expression to concrete properties.
fn atom_spec(map: u32, expr: &AtomExpr) -> Result<AtomSpec, String> {
    let mut spec = AtomSpec {
        map,
        element: None,
        charge: None,
        hcount: None,
    };
    collect_spec(expr, &mut spec)?;
    // a concrete-element product atom without a written sign is neutral
    if spec.element.is_some() && spec.charge.is_none() {
        spec.charge = Some(0);
    }
    Ok(spec)
}

fn collect_spec(expr: &AtomExpr, spec: &mut AtomSpec) -> Result<(), String> {
    match expr {
        AtomExpr::Any => Ok(()),
        AtomExpr::Element { element, .. } => {
            spec.element = Some(*element);
            Ok(())
        }
        AtomExpr::Charge(c) => {
            spec.charge = Some(*c);
            Ok(())
        }
        AtomExpr::TotalH(n) => {
            spec.hcount = Some(*n);
            Ok(())
        }
        AtomExpr::And(terms) => {
            for term in terms {
                collect_spec(term, spec)?;
            }
            Ok(())
        }
        other => Err(format!(
            "product template atom map {} must be concrete, found {:?}",
            spec.map, other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles;

    fn products_of(smirks: &str, input: &str) -> Vec<String> {
        let mut applier = SmirksApplier::compile(smirks).unwrap();
        let mol = smiles::parse(input).unwrap();
        let count = applier.bind(&mol);
        let mut out = Vec::new();
        while let Some(product) = applier.next_product() {
            out.push(smiles::canonical_smiles(&product.mol));
        }
        assert_eq!(out.len(), count);
        out
    }

    #[test]
    fn keto_to_enol_moves_the_alpha_hydrogen() {
        let products = products_of(
            "[O:1]=[C:2][C:3][H:4]>>[H:4][O:1][C:2]=[C:3]",
            "CC(=O)C",
        );
        // both methyls are alpha positions; all products are the same enol
        assert!(!products.is_empty());
        let enol = smiles::canonical_smiles(&smiles::parse("CC(O)=C").unwrap());
        assert!(products.iter().all(|p| *p == enol));
    }

    #[test]
    fn enol_to_keto_is_the_reverse_rewrite() {
        let products = products_of(
            "[H:4][O:1][C:2]=[C:3]>>[O:1]=[C:2][C:3][H:4]",
            "CC(O)=C",
        );
        let keto = smiles::canonical_smiles(&smiles::parse("CC(C)=O").unwrap());
        assert!(products.contains(&keto));
    }

    #[test]
    fn deprotonation_sets_charge_and_drops_a_hydrogen() {
        let products = products_of("[O:1][H:2]>>[O-:1]", "CC(=O)O");
        let anion = smiles::canonical_smiles(&smiles::parse("CC(=O)[O-]").unwrap());
        assert_eq!(products, vec![anion]);
    }

    #[test]
    fn protonation_adds_a_hydrogen_and_a_charge() {
        let products = products_of("[N;X3;!+:1]>>[N+;H3:1]", "CN");
        let cation = smiles::canonical_smiles(&smiles::parse("C[NH3+]").unwrap());
        assert_eq!(products, vec![cation]);
    }

    #[test]
    fn bind_reports_zero_for_non_matching_molecules() {
        let mut applier =
            SmirksApplier::compile("[O:1]=[C:2][C:3][H:4]>>[H:4][O:1][C:2]=[C:3]").unwrap();
        let mol = smiles::parse("c1ccccc1").unwrap();
        assert_eq!(applier.bind(&mol), 0);
        assert!(applier.next_product().is_none());
    }

    #[test]
    fn map_indices_appear_only_when_kept() {
        let mut applier = SmirksApplier::compile("[O:1][H:2]>>[O-:1]").unwrap();
        let mol = smiles::parse("CO").unwrap();
        applier.keep_map_indices(true);
        applier.bind(&mol);
        let product = applier.next_product().unwrap();
        assert_eq!(product.mol.atoms[1].map_idx, 1);

        applier.keep_map_indices(false);
        applier.bind(&mol);
        let product = applier.next_product().unwrap();
        assert_eq!(product.mol.atoms[1].map_idx, 0);
    }

    #[test]
    fn compile_rejects_unbalanced_maps() {
        assert!(SmirksApplier::compile("[O:1]=[C:2]>>[O:1][C:3]").is_err());
        assert!(SmirksApplier::compile("[O:1]=[C:2]>>[O:1]").is_err());
        assert!(SmirksApplier::compile("no separator").is_err());
    }

    #[test]
    fn compile_rejects_vague_product_templates() {
        assert!(SmirksApplier::compile("[O:1]=[C:2]>>[O,S:1]=[C:2]").is_err());
    }
}
