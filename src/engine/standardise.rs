//! The standardiser: converge each molecule to one reference tautomer.
//!
//! Every rule is applied until it stops matching, then the next rule runs;
//! the whole sweep repeats until a full pass adds nothing new. Each
//! intermediate canonical SMILES is remembered so a rule set that cycles
//! (A to B and back) is detected rather than looped forever: the sweep is
//! abandoned for that rule with a warning, and the last accepted product
//! stands. A well-formed rule set is convergent and never triggers this.

use crate::core::error::EngineError;
use crate::core::graph::Molecule;
use crate::perception;
use crate::rules::{RuleApplier, RuleSet};
use crate::smiles;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Knobs for one standardisation pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardiseOptions {
    /// Retain only the largest connected component of each product.
    pub strip_salts: bool,
    /// Append each applied rule's name to the product title.
    pub add_rule_names: bool,
}

/// A standardised molecule plus the cycle diagnostic.
#[derive(Debug, Clone)]
pub struct Standardised {
    /// The converged (or last accepted) product.
    pub mol: Molecule,
    /// Whether a rule cycle was detected and broken along the way.
    pub cycle_detected: bool,
}

/// Applies the rule set exhaustively and returns the fixed point.
///
/// # Errors
///
/// Returns [`EngineError::PatternCompile`] if a rule fails to compile on
/// first use.
pub fn standardise(
    input: &Molecule,
    rules: &mut RuleSet,
    options: StandardiseOptions,
) -> Result<Standardised, EngineError> {
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(smiles::canonical_smiles(input));
    let mut current = input.clone();
    let mut cycle_detected = false;

    loop {
        let before = seen.len();
        for rule_idx in 0..rules.len() {
            let name = rules.rules[rule_idx].name.clone();
            let applier = rules.rules[rule_idx].applier()?;
            applier.keep_map_indices(false);
            loop {
                if applier.bind(&current) == 0 {
                    break;
                }
                // bind returned nonzero, so a product exists
                let product = applier.next_product().unwrap();
                let mut mol = product.mol;
                if options.strip_salts {
                    mol = mol.largest_fragment();
                }
                if let Err(reason) = perception::reperceive(&mut mol) {
                    warn!(rule = %name, %reason, "discarding unperceivable product");
                    break;
                }
                let smi = smiles::canonical_smiles(&mol);
                if !seen.insert(smi.clone()) {
                    warn!(
                        title = %input.title(),
                        rule = %name,
                        "rule set cycles on this molecule; keeping the last product"
                    );
                    cycle_detected = true;
                    break;
                }
                debug!(rule = %name, product = %smi, "standardiser step");
                if options.add_rule_names {
                    let title = format!("{} {}", mol.title(), name);
                    mol.set_title(title.trim().to_string());
                }
                current = mol;
            }
        }
        if seen.len() == before {
            break;
        }
    }

    Ok(Standardised {
        mol: current,
        cycle_detected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::default;
    use pretty_assertions::assert_eq;

    fn canonical(input: &str) -> String {
        smiles::canonical_smiles(&smiles::parse(input).unwrap())
    }

    fn run(input: &str, rules: &mut RuleSet) -> Standardised {
        let mut mol = smiles::parse(input).unwrap();
        crate::perception::prepare(&mut mol).unwrap();
        standardise(&mol, rules, StandardiseOptions::default()).unwrap()
    }

    #[test]
    fn enol_converges_to_the_ketone() {
        let mut rules = default::standardise().unwrap();
        let result = run("CC(O)=CC", &mut rules);
        assert_eq!(smiles::canonical_smiles(&result.mol), canonical("CC(=O)CC"));
        assert!(!result.cycle_detected);
    }

    #[test]
    fn phenol_is_already_standard() {
        let mut rules = default::standardise().unwrap();
        let result = run("Oc1ccccc1", &mut rules);
        assert_eq!(smiles::canonical_smiles(&result.mol), canonical("Oc1ccccc1"));
    }

    #[test]
    fn standardisation_is_idempotent() {
        let mut rules = default::standardise().unwrap();
        let once = run("CC(O)=CC", &mut rules);
        let twice = standardise(&once.mol, &mut rules, StandardiseOptions::default()).unwrap();
        assert_eq!(
            smiles::canonical_smiles(&once.mol),
            smiles::canonical_smiles(&twice.mol)
        );
    }

    #[test]
    fn oscillating_rule_set_is_detected_and_broken() {
        let mut rules = RuleSet::from_strings(
            "[O:1]=[C:2][C:3][H:4]>>[H:4][O:1][C:2]=[C:3]\tFORWARD\n\
             [H:4][O:1][C:2]=[C:3]>>[O:1]=[C:2][C:3][H:4]\tBACKWARD\n",
            "",
        )
        .unwrap();
        let result = run("CC(=O)C", &mut rules);
        // terminates, flags the cycle, and still returns a product
        assert!(result.cycle_detected);
        assert!(!smiles::canonical_smiles(&result.mol).is_empty());
    }

    #[test]
    fn salt_stripping_keeps_the_largest_component() {
        let mut rules = default::standardise().unwrap();
        let mut mol = smiles::parse("CC(O)=CC.[Na+]").unwrap();
        crate::perception::prepare(&mut mol).unwrap();
        let result = standardise(
            &mol,
            &mut rules,
            StandardiseOptions {
                strip_salts: true,
                add_rule_names: false,
            },
        )
        .unwrap();
        assert_eq!(smiles::canonical_smiles(&result.mol), canonical("CC(=O)CC"));
    }

    #[test]
    fn rule_names_accumulate_in_the_title() {
        let mut rules = default::standardise().unwrap();
        let mut mol = smiles::parse("CC(O)=CC").unwrap();
        mol.set_title("probe");
        crate::perception::prepare(&mut mol).unwrap();
        let result = standardise(
            &mol,
            &mut rules,
            StandardiseOptions {
                strip_salts: false,
                add_rule_names: true,
            },
        )
        .unwrap();
        assert!(result.mol.title().contains("STAND_ENOL_TO_KETO"));
    }
}
