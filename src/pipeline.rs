//! Pipeline orchestration: configuration, per-molecule flow, and the
//! worker pool.
//!
//! An [`Orchestrator`] owns one set of rule objects and runs the full
//! prepare → standardise → enumerate → protonation flow for one molecule
//! at a time. Workers are plain OS threads, each with its own
//! orchestrator built from the same settings; they share only the locked
//! input and output streams, which is what makes the pool safe by
//! construction.

use crate::core::error::EngineError;
use crate::core::graph::Molecule;
use crate::engine::{
    enumerate, standardise, EnumerateError, EnumerateOptions, StandardiseOptions,
};
use crate::io::{MoleculeSink, MoleculeSource};
use crate::perception;
use crate::rules::{default, RuleSet};
use crate::smiles;
use std::path::PathBuf;
use std::thread;
use tracing::warn;

/// Title marker appended when enumeration overflowed and the standardised
/// molecule is emitted instead.
pub const MAX_TAUTS_MARKER: &str = "__MAX_TAUTS__";

/// The recognized pipeline options. Field defaults mirror the CLI
/// defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Stop after standardisation; emit one molecule per input.
    pub standardise_only: bool,
    /// Use the conservative embedded enumeration rule set.
    pub original_enumeration: bool,
    /// Use the extended embedded enumeration rule set.
    pub extended_enumeration: bool,
    /// Additionally run the protonation standardise/enumerate pair.
    pub enumerate_protonation: bool,
    /// Emit only the first element of the sorted tautomer set.
    pub canonical_tautomer: bool,
    /// Emit the prepared input molecule before each tautomer set.
    pub include_input_in_output: bool,
    /// Retain only the largest connected component during
    /// standardisation.
    pub strip_salts: bool,
    /// Append `<postfix><ordinal>` to each emitted title.
    pub add_numbers_to_name: bool,
    /// Append each applied rule's name to the product title.
    pub add_smirks_to_name: bool,
    /// Postfix before the ordinal when numbering names.
    pub name_postfix: String,
    /// Output-size ceiling per molecule.
    pub max_tautomers: usize,
    /// Standardisation rule file; embedded default when absent.
    pub standardise_file: Option<PathBuf>,
    /// Enumeration rule file; embedded default when absent.
    pub enumerate_file: Option<PathBuf>,
    /// Vector-binding file shared by rule files; embedded default when
    /// absent.
    pub bindings_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            standardise_only: false,
            original_enumeration: false,
            extended_enumeration: false,
            enumerate_protonation: false,
            canonical_tautomer: false,
            include_input_in_output: false,
            strip_salts: false,
            add_numbers_to_name: false,
            add_smirks_to_name: false,
            name_postfix: "_".to_string(),
            max_tautomers: 256,
            standardise_file: None,
            enumerate_file: None,
            bindings_file: None,
        }
    }
}

/// The validated shape of one pipeline run, derived from the boolean
/// options up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Standardise and emit one molecule per input.
    StandardiseOnly,
    /// Standardise, then enumerate tautomers.
    TautomersOnly,
    /// Standardise, then enumerate protonation states.
    ProtonationOnly,
    /// Standardise, enumerate tautomers, then re-enumerate each tautomer's
    /// protonation states.
    TautomersAndProtonation,
}

impl Settings {
    /// Derives the run mode, validating option conflicts.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] for mutually exclusive options.
    pub fn mode(&self) -> Result<Mode, EngineError> {
        if self.original_enumeration && self.extended_enumeration {
            return Err(EngineError::Config(
                "you can't have both original and extended enumerations".to_string(),
            ));
        }
        if self.include_input_in_output && self.canonical_tautomer {
            return Err(EngineError::Config(
                "you can't have both canonical tautomer and include input in output".to_string(),
            ));
        }
        // an explicit enumeration request overrides standardise_only
        let enumerating = self.original_enumeration
            || self.extended_enumeration
            || self.enumerate_file.is_some();
        let protonating = self.enumerate_protonation;
        Ok(match (enumerating, protonating) {
            (false, false) => Mode::StandardiseOnly,
            (true, false) => Mode::TautomersOnly,
            (false, true) => Mode::ProtonationOnly,
            (true, true) => Mode::TautomersAndProtonation,
        })
    }
}

/// Per-worker pipeline state: the settings plus one set of rule objects.
pub struct Orchestrator {
    settings: Settings,
    mode: Mode,
    taut_stand: RuleSet,
    taut_enum: RuleSet,
    prot_stand: RuleSet,
    prot_enum: RuleSet,
}

impl Orchestrator {
    /// Builds an orchestrator, loading rule files or embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] for conflicting options,
    /// [`EngineError::RuleFile`] for unreadable rule files, and
    /// [`EngineError::ConflictingBinding`] for bad binding tables.
    pub fn from_settings(settings: &Settings) -> Result<Orchestrator, EngineError> {
        let mode = settings.mode()?;
        let taut_stand = match &settings.standardise_file {
            Some(path) => RuleSet::from_files(path, settings.bindings_file.as_deref())?,
            None => default::standardise()?,
        };
        let taut_enum = match &settings.enumerate_file {
            Some(path) => RuleSet::from_files(path, settings.bindings_file.as_deref())?,
            None if settings.original_enumeration => default::enumerate_original()?,
            None => default::enumerate_extended()?,
        };
        Ok(Orchestrator {
            settings: settings.clone(),
            mode,
            taut_stand,
            taut_enum,
            prot_stand: default::protonation_standardise()?,
            prot_enum: default::protonation_enumerate()?,
        })
    }

    /// Runs the full per-molecule flow and returns the molecules to emit,
    /// in emission order.
    ///
    /// # Errors
    ///
    /// Only fatal failures surface here; the per-molecule output cap is
    /// recovered internally by falling back to the standardised molecule
    /// with the [`MAX_TAUTS_MARKER`] appended to its title.
    pub fn process(&mut self, input: &Molecule) -> Result<Vec<Molecule>, EngineError> {
        let mut prepared = input.clone();
        perception::prepare(&mut prepared)?;

        let standardised = standardise(
            &prepared,
            &mut self.taut_stand,
            StandardiseOptions {
                strip_salts: self.settings.strip_salts,
                add_rule_names: self.settings.add_smirks_to_name,
            },
        )?;
        let std_mol = standardised.mol;

        let mut out: Vec<Molecule> = Vec::new();
        if self.mode == Mode::StandardiseOnly {
            out.push(std_mol.clone());
        } else {
            if matches!(self.mode, Mode::TautomersOnly | Mode::TautomersAndProtonation) {
                let options = self.enumerate_options();
                match enumerate(&std_mol, &mut self.taut_enum, options) {
                    Ok(tauts) => out = tauts,
                    Err(EnumerateError::OverLimit(e)) => {
                        warn!(
                            title = %e.title,
                            "maximum number of tautomers generated, so none generated"
                        );
                        let mut fallback = std_mol.clone();
                        fallback.set_title(format!("{} {}", input.title(), MAX_TAUTS_MARKER));
                        out.push(fallback);
                    }
                    Err(EnumerateError::Engine(e)) => return Err(e),
                }
            }

            if matches!(self.mode, Mode::ProtonationOnly | Mode::TautomersAndProtonation) {
                out = self.protonate(&std_mol, out)?;
            }
        }

        let mut out = sort_and_uniquify(out);

        let mut emitted = Vec::new();
        if self.settings.include_input_in_output {
            emitted.push(prepared.clone());
        }
        if self.settings.canonical_tautomer {
            if out.is_empty() {
                // probably hit the output cap, fall back to the
                // standardised input
                out.push(std_mol.clone());
            }
            let mut first = out.swap_remove(0);
            if self.settings.add_numbers_to_name {
                first.set_title(format!(
                    "{}{}1",
                    first.title(),
                    self.settings.name_postfix
                ));
            }
            emitted.push(first);
        } else {
            for (i, mut mol) in out.into_iter().enumerate() {
                if self.settings.add_numbers_to_name {
                    mol.set_title(format!(
                        "{}{}{}",
                        mol.title(),
                        self.settings.name_postfix,
                        i + 1
                    ));
                }
                emitted.push(mol);
            }
        }
        Ok(emitted)
    }

    /// Runs the protonation stages: directly on the standardised molecule
    /// when tautomer enumeration produced nothing, otherwise once per
    /// tautomer, replacing the set with the union of results.
    fn protonate(
        &mut self,
        std_mol: &Molecule,
        tautomers: Vec<Molecule>,
    ) -> Result<Vec<Molecule>, EngineError> {
        let enumerate_options = self.enumerate_options();
        if tautomers.is_empty() {
            let prot_std = standardise(
                std_mol,
                &mut self.prot_stand,
                StandardiseOptions {
                    strip_salts: true,
                    add_rule_names: self.settings.add_smirks_to_name,
                },
            )?;
            return match enumerate(&prot_std.mol, &mut self.prot_enum, enumerate_options) {
                Ok(prots) => Ok(prots),
                Err(EnumerateError::OverLimit(_)) => {
                    warn!(
                        title = %std_mol.title(),
                        "maximum number of ionisation states generated, so none generated"
                    );
                    Ok(Vec::new())
                }
                Err(EnumerateError::Engine(e)) => Err(e),
            };
        }

        let mut prot_out = Vec::new();
        for (i, tautomer) in tautomers.iter().enumerate() {
            // salts were already stripped during tautomer standardisation
            let prot_std = standardise(
                tautomer,
                &mut self.prot_stand,
                StandardiseOptions {
                    strip_salts: false,
                    add_rule_names: self.settings.add_smirks_to_name,
                },
            )?;
            match enumerate(&prot_std.mol, &mut self.prot_enum, enumerate_options) {
                Ok(prots) => prot_out.extend(prots),
                Err(EnumerateError::OverLimit(_)) => {
                    warn!(
                        title = %std_mol.title(),
                        tautomer = i,
                        "maximum number of ionisation states generated, so none generated"
                    );
                }
                Err(EnumerateError::Engine(e)) => return Err(e),
            }
        }
        Ok(prot_out)
    }

    fn enumerate_options(&self) -> EnumerateOptions {
        EnumerateOptions {
            max_output: self.settings.max_tautomers,
            add_rule_names: self.settings.add_smirks_to_name,
        }
    }
}

/// Sorts molecules by canonical SMILES descending and drops adjacent
/// duplicates, keeping the first of each run.
pub fn sort_and_uniquify(mols: Vec<Molecule>) -> Vec<Molecule> {
    let mut keyed: Vec<(String, Molecule)> = mols
        .into_iter()
        .map(|m| (smiles::canonical_smiles(&m), m))
        .collect();
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    keyed.dedup_by(|a, b| a.0 == b.0);
    keyed.into_iter().map(|(_, m)| m).collect()
}

/// Resolves the worker count: a non-positive request leaves that many
/// cores free.
pub fn resolve_thread_count(requested: i32) -> usize {
    let available = thread::available_parallelism()
        .map(|n| n.get() as i32)
        .unwrap_or(1);
    let count = if requested <= 0 {
        available + requested
    } else {
        requested
    };
    count.max(1) as usize
}

/// Drains the source through a pool of workers, each owning an
/// orchestrator built from `settings`, and writes every emitted molecule
/// to the sink.
///
/// Output order across workers is unspecified; within one input molecule
/// the emission order is the orchestrator's deterministic order.
///
/// # Errors
///
/// The first fatal error from any worker is returned after the pool
/// drains.
pub fn run(
    settings: &Settings,
    source: &dyn MoleculeSource,
    sink: &dyn MoleculeSink,
    num_threads: i32,
) -> Result<(), EngineError> {
    settings.mode()?;
    let workers = resolve_thread_count(num_threads);

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(move || -> Result<(), EngineError> {
                    let mut orchestrator = Orchestrator::from_settings(settings)?;
                    while let Some(mol) = source.read_next()? {
                        for out in orchestrator.process(&mol)? {
                            sink.write(&out)?;
                        }
                    }
                    Ok(())
                })
            })
            .collect();
        let mut first_error = None;
        for handle in handles {
            if let Err(e) = handle.join().expect("worker thread panicked") {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{VecSink, VecSource};
    use pretty_assertions::assert_eq;

    fn parsed(input: &str, title: &str) -> Molecule {
        let mut mol = smiles::parse(input).unwrap();
        mol.set_title(title);
        mol
    }

    fn canonical(input: &str) -> String {
        smiles::canonical_smiles(&smiles::parse(input).unwrap())
    }

    #[test]
    fn mode_derivation_validates_conflicts() {
        let mut settings = Settings {
            original_enumeration: true,
            extended_enumeration: true,
            ..Settings::default()
        };
        assert!(settings.mode().is_err());

        settings.extended_enumeration = false;
        assert_eq!(settings.mode().unwrap(), Mode::TautomersOnly);

        let both = Settings {
            canonical_tautomer: true,
            include_input_in_output: true,
            ..Settings::default()
        };
        assert!(both.mode().is_err());
    }

    #[test]
    fn default_settings_standardise_only() {
        assert_eq!(Settings::default().mode().unwrap(), Mode::StandardiseOnly);
        let prot = Settings {
            enumerate_protonation: true,
            ..Settings::default()
        };
        assert_eq!(prot.mode().unwrap(), Mode::ProtonationOnly);
    }

    #[test]
    fn standardise_only_emits_one_molecule() {
        let mut orchestrator = Orchestrator::from_settings(&Settings::default()).unwrap();
        let out = orchestrator.process(&parsed("CC(O)=CC", "probe")).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(smiles::canonical_smiles(&out[0]), canonical("CC(=O)CC"));
        assert_eq!(out[0].title(), "probe");
    }

    #[test]
    fn enumeration_emits_the_sorted_set() {
        let settings = Settings {
            extended_enumeration: true,
            ..Settings::default()
        };
        let mut orchestrator = Orchestrator::from_settings(&settings).unwrap();
        let out = orchestrator.process(&parsed("CCC(=O)C", "butanone")).unwrap();
        assert!(out.len() >= 2);
        let smis: Vec<String> = out.iter().map(smiles::canonical_smiles).collect();
        let mut sorted = smis.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(smis, sorted);
    }

    #[test]
    fn canonical_tautomer_emits_exactly_one() {
        let settings = Settings {
            extended_enumeration: true,
            canonical_tautomer: true,
            add_numbers_to_name: true,
            ..Settings::default()
        };
        let mut orchestrator = Orchestrator::from_settings(&settings).unwrap();
        let out = orchestrator.process(&parsed("CCC(=O)C", "butanone")).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].title().ends_with("_1"));
    }

    #[test]
    fn include_input_prepends_the_prepared_molecule() {
        let settings = Settings {
            extended_enumeration: true,
            include_input_in_output: true,
            ..Settings::default()
        };
        let mut orchestrator = Orchestrator::from_settings(&settings).unwrap();
        let out = orchestrator.process(&parsed("CCC(=O)C", "butanone")).unwrap();
        assert_eq!(
            smiles::canonical_smiles(&out[0]),
            canonical("CCC(=O)C")
        );
        assert!(out.len() >= 3);
    }

    #[test]
    fn overflow_recovers_with_the_marker() {
        let settings = Settings {
            extended_enumeration: true,
            max_tautomers: 2,
            ..Settings::default()
        };
        let mut orchestrator = Orchestrator::from_settings(&settings).unwrap();
        let out = orchestrator
            .process(&parsed("CCC(=O)CC(=O)CC(=O)C", "triketone"))
            .unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].title().contains(MAX_TAUTS_MARKER));
    }

    #[test]
    fn numbering_appends_postfix_and_ordinal() {
        let settings = Settings {
            extended_enumeration: true,
            add_numbers_to_name: true,
            ..Settings::default()
        };
        let mut orchestrator = Orchestrator::from_settings(&settings).unwrap();
        let out = orchestrator.process(&parsed("CCC(=O)C", "butanone")).unwrap();
        for (i, mol) in out.iter().enumerate() {
            assert!(mol.title().ends_with(&format!("_{}", i + 1)));
        }
    }

    #[test]
    fn protonation_only_enumerates_ionisation_states() {
        let settings = Settings {
            enumerate_protonation: true,
            ..Settings::default()
        };
        let mut orchestrator = Orchestrator::from_settings(&settings).unwrap();
        let out = orchestrator.process(&parsed("CC(=O)O", "acetic acid")).unwrap();
        let smis: Vec<String> = out.iter().map(smiles::canonical_smiles).collect();
        assert!(smis.contains(&canonical("CC(=O)O")));
        assert!(smis.contains(&canonical("CC(=O)[O-]")));
    }

    #[test]
    fn worker_pool_drains_the_stream() {
        let settings = Settings::default();
        let source = VecSource::new(vec![
            parsed("CC(O)=CC", "a"),
            parsed("Oc1ccccc1", "b"),
            parsed("CC(=O)N", "c"),
        ]);
        let sink = VecSink::new();
        run(&settings, &source, &sink, 2).unwrap();
        let mut titles: Vec<String> = sink
            .into_molecules()
            .iter()
            .map(|m| m.title().to_string())
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn thread_count_resolution_never_drops_below_one() {
        assert_eq!(resolve_thread_count(3), 3);
        assert!(resolve_thread_count(0) >= 1);
        assert!(resolve_thread_count(-1000) >= 1);
    }
}
