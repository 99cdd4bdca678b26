//! End-to-end scenarios for the transformation engine and pipeline.

mod harness;

use harness::{canonical, canonical_set, prepared, run_pipeline};
use pretty_assertions::assert_eq;
use tautogen::engine::{enumerate, standardise, EnumerateError, EnumerateOptions, StandardiseOptions};
use tautogen::pipeline::{Settings, MAX_TAUTS_MARKER};
use tautogen::rules::{default, RuleSet};
use tautogen::{perception, smiles};

fn extended() -> Settings {
    Settings {
        extended_enumeration: true,
        ..Settings::default()
    }
}

#[test]
fn butanone_enumerates_keto_and_enol_forms() {
    let out = run_pipeline(&extended(), "CCC(=O)C", "butan-2-one");
    let smis = canonical_set(&out);
    assert!(smis.len() >= 2, "expected at least keto and enol, got {:?}", smis);
    assert!(smis.contains(&canonical("CCC(=O)C")));
    assert!(smis.contains(&canonical("CC=C(O)C")));

    // the set is dedup'd and its first element is reproducible
    let again = canonical_set(&run_pipeline(&extended(), "CCC(=O)C", "butan-2-one"));
    assert_eq!(smis, again);
    let mut unique = smis.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), smis.len());
}

#[test]
fn phenol_standardises_to_itself() {
    let settings = Settings {
        standardise_only: true,
        ..Settings::default()
    };
    let out = run_pipeline(&settings, "Oc1ccccc1", "phenol");
    assert_eq!(canonical_set(&out), vec![canonical("Oc1ccccc1")]);
}

#[test]
fn extended_aromatic_system_never_gains_radicals() {
    let input = "c1ccc2c(c1)c(=O)c3ccc4c(c3c2=O)[nH]c5ccc6c(=O)ccc(=O)c6c5[nH]4";
    let Ok(mol) = smiles::parse(input) else {
        // the polycyclic form must at least parse through the kekulizer
        panic!("polycyclic input failed to parse");
    };
    let mut mol = mol;
    perception::prepare(&mut mol).unwrap();
    let input_radicals = perception::radicals::radical_atoms(&mol).len();

    let mut rules = default::enumerate_extended().unwrap();
    let results = enumerate(&mol, &mut rules, EnumerateOptions::default()).unwrap();
    for product in &results {
        assert!(
            perception::radicals::radical_atoms(product).len() <= input_radicals,
            "radical-introducing product survived: {}",
            smiles::canonical_smiles(product)
        );
    }
}

#[test]
fn output_cap_recovers_with_the_marker_title() {
    let settings = Settings {
        extended_enumeration: true,
        max_tautomers: 4,
        ..Settings::default()
    };
    // plenty of carbonyls, far more than four tautomers
    let out = run_pipeline(&settings, "CCC(=O)CC(=O)CC(=O)CC(=O)C", "polyketone");
    assert_eq!(out.len(), 1);
    assert!(out[0].title().contains(MAX_TAUTS_MARKER));
}

#[test]
fn oscillating_rule_set_terminates_with_a_product() {
    let mut rules = RuleSet::from_strings(
        "[O:1]=[C:2][C:3][H:4]>>[H:4][O:1][C:2]=[C:3]\tTO_ENOL\n\
         [H:4][O:1][C:2]=[C:3]>>[O:1]=[C:2][C:3][H:4]\tTO_KETO\n",
        "",
    )
    .unwrap();
    let input = prepared("CC(=O)C", "oscillator");
    let result = standardise(&input, &mut rules, StandardiseOptions::default()).unwrap();
    assert!(result.cycle_detected);
    assert!(!smiles::canonical_smiles(&result.mol).is_empty());
}

#[test]
fn chiral_center_stereo_survives_remote_rewrites() {
    // lactic acid: the chiral carbon sits alpha to the acid group
    let input = prepared("C[C@@H](O)C(=O)O", "lactic acid");
    let input_smi = smiles::canonical_smiles(&input);
    assert!(input_smi.contains('@'));

    let mut rules = default::enumerate_extended().unwrap();
    let results = enumerate(&input, &mut rules, EnumerateOptions::default()).unwrap();
    let smis = canonical_set(&results);

    // the input form keeps its winding
    assert!(smis.contains(&input_smi));
    // every form whose center was dehydrogenated has lost it
    for smi in &smis {
        if *smi != input_smi && smi.contains('@') {
            // a surviving winding must sit on an untouched center: check
            // it round-trips to itself rather than to the cleared form
            assert_eq!(*smi, canonical(smi));
        }
    }
}

#[test]
fn enumeration_results_sort_descending_and_start_with_the_greatest() {
    let mut rules = default::enumerate_extended().unwrap();
    let results = enumerate(
        &prepared("CCC(=O)C", ""),
        &mut rules,
        EnumerateOptions::default(),
    )
    .unwrap();
    let smis = canonical_set(&results);
    let mut expected = smis.clone();
    expected.sort_by(|a, b| b.cmp(a));
    assert_eq!(smis, expected);
}

#[test]
fn standardisation_is_idempotent_across_the_pipeline() {
    let settings = Settings {
        standardise_only: true,
        ..Settings::default()
    };
    for input in ["CC(O)=CC", "CC(O)=N", "CCC(=O)C", "c1cc[nH]c1"] {
        let once = run_pipeline(&settings, input, "x");
        let first = smiles::canonical_smiles(&once[0]);
        let twice = run_pipeline(&settings, &first, "x");
        assert_eq!(first, smiles::canonical_smiles(&twice[0]), "{}", input);
    }
}

#[test]
fn standardised_form_is_inside_its_own_enumeration() {
    // the extended enumeration rules can reach every standardisation
    // product, so the standard form must appear in the enumerated set
    let input = prepared("CC(O)=CC", "enol");
    let mut stand = default::standardise().unwrap();
    let standardised = standardise(&input, &mut stand, StandardiseOptions::default()).unwrap();

    let mut rules = default::enumerate_extended().unwrap();
    let results = enumerate(&standardised.mol, &mut rules, EnumerateOptions::default()).unwrap();
    assert!(canonical_set(&results).contains(&smiles::canonical_smiles(&standardised.mol)));
}

#[test]
fn double_bond_direction_marks_survive_unrelated_rewrites() {
    // the acid proton moves during protonation enumeration, but the
    // alkene geometry two bonds away is untouched
    let input = prepared("C/C=C/C(=O)O", "crotonic acid");
    let input_smi = smiles::canonical_smiles(&input);
    assert!(input_smi.contains('/') || input_smi.contains('\\'));

    let mut rules = default::protonation_enumerate().unwrap();
    let results = enumerate(&input, &mut rules, EnumerateOptions::default()).unwrap();
    for smi in canonical_set(&results) {
        assert!(
            smi.contains('/') || smi.contains('\\'),
            "bond stereo lost in {}",
            smi
        );
    }
}

#[test]
fn over_limit_error_names_the_input() {
    let mut rules = default::enumerate_extended().unwrap();
    let input = prepared("CCC(=O)CC(=O)CC(=O)C", "named input");
    match enumerate(
        &input,
        &mut rules,
        EnumerateOptions {
            max_output: 2,
            add_rule_names: false,
        },
    ) {
        Err(EnumerateError::OverLimit(e)) => assert_eq!(e.title, "named input"),
        other => panic!("expected OverLimit, got {:?}", other.map(|v| v.len())),
    }
}

#[test]
fn prepare_round_trip_laws_hold() {
    for input in ["CCC(=N)C", "CC(=O)Oc1ccccc1C(=O)O", "C[C@H](N)C(=O)O"] {
        // parse(canonical(m)) canonicalizes back to the same string
        let first = canonical(input);
        let reparsed = smiles::parse(&first).unwrap();
        assert_eq!(first, smiles::canonical_smiles(&reparsed), "{}", input);
    }
}

#[test]
fn protonation_pipeline_unions_over_tautomers() {
    let settings = Settings {
        extended_enumeration: true,
        enumerate_protonation: true,
        ..Settings::default()
    };
    let out = run_pipeline(&settings, "CC(=O)O", "acetic acid");
    let smis = canonical_set(&out);
    assert!(smis.contains(&canonical("CC(=O)[O-]")), "{:?}", smis);
    // output stays dedup'd after the union
    let mut unique = smis.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), smis.len());
}
