//! The enumerator: collect every distinct product reachable under a rule
//! set.
//!
//! The closure is computed breadth-first by generation: each outer
//! iteration rewrites only the molecules added in the previous one, since
//! earlier generations have already contributed everything they can. A
//! canonical-SMILES set is the sole deduplication authority, products that
//! introduce free radicals are dropped, and exceeding the output cap
//! discards the whole set in favor of a recoverable error. The final order
//! is a stable sort by canonical SMILES, descending, so results are
//! reproducible regardless of rule traversal order.

use super::stereo::remove_altered_stereochem;
use super::EnumerateError;
use crate::core::error::TooManyTautomers;
use crate::core::graph::Molecule;
use crate::perception::{self, radicals::radical_atoms};
use crate::rules::{RuleApplier, RuleSet};
use crate::smiles;
use std::collections::HashSet;
use tracing::debug;

/// Knobs for one enumeration pass.
#[derive(Debug, Clone, Copy)]
pub struct EnumerateOptions {
    /// Output-size ceiling, input included.
    pub max_output: usize,
    /// Append each applied rule's name to the product title.
    pub add_rule_names: bool,
}

impl Default for EnumerateOptions {
    fn default() -> Self {
        Self {
            max_output: 256,
            add_rule_names: false,
        }
    }
}

/// Enumerates the closure of `input` under the rule set.
///
/// The returned set always contains a clone of the input, holds no two
/// molecules with the same canonical SMILES, and is sorted by canonical
/// SMILES in descending order.
///
/// # Errors
///
/// [`EnumerateError::OverLimit`] when the set would exceed
/// `options.max_output`; the partial set is discarded. Rule compilation
/// failures surface as [`EnumerateError::Engine`].
pub fn enumerate(
    input: &Molecule,
    rules: &mut RuleSet,
    options: EnumerateOptions,
) -> Result<Vec<Molecule>, EnumerateError> {
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(smiles::canonical_smiles(input));
    let mut results: Vec<Molecule> = vec![input.clone()];
    let input_radicals = radical_atoms(input).len();

    let mut frontier_start = 0;
    loop {
        let frontier_end = results.len();
        for i in frontier_start..frontier_end {
            let source = results[i].clone();
            for rule_idx in 0..rules.len() {
                let name = rules.rules[rule_idx].name.clone();
                let applier = rules.rules[rule_idx].applier()?;
                applier.keep_map_indices(false);
                applier.bind(&source);
                while let Some(product) = applier.next_product() {
                    let mut mol = product.mol;
                    if let Err(reason) = perception::reperceive(&mut mol) {
                        debug!(rule = %name, %reason, "discarding unperceivable product");
                        continue;
                    }
                    if radical_atoms(&mol).len() > input_radicals {
                        debug!(
                            title = %input.title(),
                            rule = %name,
                            product = %smiles::canonical_smiles(&mol),
                            "discarding radical-introducing product"
                        );
                        continue;
                    }
                    remove_altered_stereochem(&source, &mut mol, &product.matched_atoms);
                    let smi = smiles::canonical_smiles(&mol);
                    if !seen.insert(smi.clone()) {
                        continue;
                    }
                    debug!(
                        rule = %name,
                        product = %smi,
                        made_from = %smiles::canonical_smiles(&source),
                        "new product in enumerator"
                    );
                    if options.add_rule_names {
                        let title = format!("{} {}", mol.title(), name);
                        mol.set_title(title.trim().to_string());
                    }
                    results.push(mol);
                    if results.len() > options.max_output {
                        // it would take too long; discard everything
                        return Err(TooManyTautomers {
                            title: input.title().to_string(),
                        }
                        .into());
                    }
                }
            }
        }
        if frontier_end == results.len() {
            break;
        }
        frontier_start = frontier_end;
    }

    Ok(sort_by_canonical_smiles(results))
}

/// Stable descending sort by canonical SMILES, the engine's reproducible
/// output order.
pub fn sort_by_canonical_smiles(mols: Vec<Molecule>) -> Vec<Molecule> {
    let mut keyed: Vec<(String, Molecule)> = mols
        .into_iter()
        .map(|m| (smiles::canonical_smiles(&m), m))
        .collect();
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    keyed.into_iter().map(|(_, m)| m).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::default;
    use pretty_assertions::assert_eq;

    fn prepared(input: &str) -> Molecule {
        let mut mol = smiles::parse(input).unwrap();
        crate::perception::prepare(&mut mol).unwrap();
        mol
    }

    fn canonical_set(mols: &[Molecule]) -> Vec<String> {
        mols.iter().map(smiles::canonical_smiles).collect()
    }

    #[test]
    fn butanone_yields_keto_and_enol_forms() {
        let mut rules = default::enumerate_extended().unwrap();
        let results = enumerate(&prepared("CCC(=O)C"), &mut rules, EnumerateOptions::default())
            .unwrap();
        let smis = canonical_set(&results);
        assert!(smis.len() >= 2);
        let keto = smiles::canonical_smiles(&prepared("CCC(=O)C"));
        let enol = smiles::canonical_smiles(&prepared("CC=C(O)C"));
        assert!(smis.contains(&keto));
        assert!(smis.contains(&enol));
    }

    #[test]
    fn results_are_pairwise_distinct() {
        let mut rules = default::enumerate_extended().unwrap();
        let results = enumerate(&prepared("CCC(=O)C"), &mut rules, EnumerateOptions::default())
            .unwrap();
        let mut smis = canonical_set(&results);
        let len = smis.len();
        smis.sort();
        smis.dedup();
        assert_eq!(smis.len(), len);
    }

    #[test]
    fn results_are_sorted_descending() {
        let mut rules = default::enumerate_extended().unwrap();
        let results = enumerate(&prepared("CCC(=O)C"), &mut rules, EnumerateOptions::default())
            .unwrap();
        let smis = canonical_set(&results);
        let mut sorted = smis.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(smis, sorted);
    }

    #[test]
    fn enumeration_contains_the_input() {
        let mut rules = default::enumerate_original().unwrap();
        let input = prepared("CC(=O)N");
        let input_smi = smiles::canonical_smiles(&input);
        let results = enumerate(&input, &mut rules, EnumerateOptions::default()).unwrap();
        assert!(canonical_set(&results).contains(&input_smi));
    }

    #[test]
    fn exceeding_the_cap_is_a_recoverable_error() {
        let mut rules = default::enumerate_extended().unwrap();
        let input = prepared("CCC(=O)CC(=O)CC(=O)C");
        input_overflow_check(&input, &mut rules);
    }

    fn input_overflow_check(input: &Molecule, rules: &mut RuleSet) {
        let outcome = enumerate(
            input,
            rules,
            EnumerateOptions {
                max_output: 2,
                add_rule_names: false,
            },
        );
        match outcome {
            Err(EnumerateError::OverLimit(e)) => assert_eq!(e.title, input.title()),
            other => panic!("expected OverLimit, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn radical_introducing_rules_are_silently_suppressed() {
        // this rule strips a hydrogen without compensating, which leaves an
        // open shell on the carbon it fired on
        let mut rules = RuleSet::from_strings(
            "[C:1][H:2]>>[C:1]\tMAKE_RADICAL\n",
            "",
        )
        .unwrap();
        let results =
            enumerate(&prepared("CC"), &mut rules, EnumerateOptions::default()).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn radical_allowance_is_relative_to_the_input() {
        // an input that already carries a radical keeps enumerating
        let mut rules = default::enumerate_extended().unwrap();
        let input = prepared("CC(=O)[CH2]");
        let results = enumerate(&input, &mut rules, EnumerateOptions::default()).unwrap();
        assert!(!results.is_empty());
    }

    #[test]
    fn rule_names_are_appended_when_requested() {
        let mut rules = default::enumerate_extended().unwrap();
        let mut input = prepared("CC(=O)C");
        input.set_title("acetone");
        let results = enumerate(
            &input,
            &mut rules,
            EnumerateOptions {
                max_output: 256,
                add_rule_names: true,
            },
        )
        .unwrap();
        assert!(results
            .iter()
            .any(|m| m.title().contains("ENUM_KETO_ENOL")));
    }

    #[test]
    fn chiral_center_away_from_the_rewrite_keeps_its_stereo() {
        let mut rules = default::enumerate_extended().unwrap();
        // lactic acid: the rewrite hits the acid group, not the center
        let input = prepared("C[C@@H](O)C(=O)O");
        let results = enumerate(&input, &mut rules, EnumerateOptions::default()).unwrap();
        assert!(canonical_set(&results).iter().any(|s| s.contains('@')));
    }
}
