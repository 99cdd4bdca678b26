//! Molecule stream I/O: line-oriented SMILES files behind thread-safe
//! read/write handles.
//!
//! Sources and sinks are shared by every worker in a pool, so both traits
//! take `&self` and implementations serialize access internally with one
//! lock per stream. Output SMILES are canonical with atom-map indices
//! suppressed; atom and bond stereo are emitted.

use crate::core::error::EngineError;
use crate::core::graph::Molecule;
use crate::smiles;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use tracing::warn;

/// A thread-safe stream of input molecules.
pub trait MoleculeSource: Send + Sync {
    /// Reads the next molecule, or `None` at end of stream.
    fn read_next(&self) -> Result<Option<Molecule>, EngineError>;
}

/// A thread-safe stream of output molecules.
pub trait MoleculeSink: Send + Sync {
    /// Writes one molecule.
    fn write(&self, mol: &Molecule) -> Result<(), EngineError>;
}

const SMILES_EXTENSIONS: &[&str] = &["smi", "ism", "can", "smiles"];

fn check_extension(path: &Path) -> Result<(), EngineError> {
    let recognized = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| SMILES_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    if recognized {
        Ok(())
    } else {
        Err(EngineError::Config(format!(
            "unrecognized molecule file extension on '{}' (expected one of {})",
            path.display(),
            SMILES_EXTENSIONS.join(", ")
        )))
    }
}

/// A SMILES file source: one molecule per line, `SMILES [title]`.
///
/// Unparseable records are skipped with a warning rather than aborting the
/// stream.
#[derive(Debug)]
pub struct SmilesFileSource {
    path: String,
    lines: Mutex<std::io::Lines<BufReader<File>>>,
}

impl SmilesFileSource {
    /// Opens a SMILES file, detecting the format by extension.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] for unrecognized extensions and
    /// [`EngineError::Stream`] when the file cannot be opened.
    pub fn open(path: &Path) -> Result<SmilesFileSource, EngineError> {
        check_extension(path)?;
        let file = File::open(path).map_err(|source| EngineError::Stream {
            path: path.display().to_string(),
            source,
        })?;
        Ok(SmilesFileSource {
            path: path.display().to_string(),
            lines: Mutex::new(BufReader::new(file).lines()),
        })
    }
}

impl MoleculeSource for SmilesFileSource {
    fn read_next(&self) -> Result<Option<Molecule>, EngineError> {
        let mut lines = self.lines.lock().unwrap();
        loop {
            let Some(line) = lines.next() else {
                return Ok(None);
            };
            let line = line.map_err(|source| EngineError::Stream {
                path: self.path.clone(),
                source,
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let (smi, title) = match trimmed.split_once(char::is_whitespace) {
                Some((smi, rest)) => (smi, rest.trim()),
                None => (trimmed, ""),
            };
            match smiles::parse(smi) {
                Ok(mut mol) => {
                    mol.set_title(title);
                    return Ok(Some(mol));
                }
                Err(e) => {
                    warn!(input = %smi, error = %e, "skipping unreadable molecule");
                }
            }
        }
    }
}

/// A SMILES file sink writing `SMILES [title]` lines.
pub struct SmilesFileSink {
    path: String,
    writer: Mutex<BufWriter<File>>,
}

impl SmilesFileSink {
    /// Creates or truncates a SMILES output file.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] for unrecognized extensions and
    /// [`EngineError::Stream`] when the file cannot be created.
    pub fn create(path: &Path) -> Result<SmilesFileSink, EngineError> {
        check_extension(path)?;
        let file = File::create(path).map_err(|source| EngineError::Stream {
            path: path.display().to_string(),
            source,
        })?;
        Ok(SmilesFileSink {
            path: path.display().to_string(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl MoleculeSink for SmilesFileSink {
    fn write(&self, mol: &Molecule) -> Result<(), EngineError> {
        let mut writer = self.writer.lock().unwrap();
        let smi = smiles::canonical_smiles(mol);
        let result = if mol.title().is_empty() {
            writeln!(writer, "{}", smi)
        } else {
            writeln!(writer, "{} {}", smi, mol.title())
        };
        result.map_err(|source| EngineError::Stream {
            path: self.path.clone(),
            source,
        })
    }
}

/// An in-memory source over pre-parsed molecules, used by tests and
/// library callers that already hold a batch.
pub struct VecSource {
    mols: Mutex<std::vec::IntoIter<Molecule>>,
}

impl VecSource {
    /// Wraps a batch of molecules as a source.
    pub fn new(mols: Vec<Molecule>) -> VecSource {
        VecSource {
            mols: Mutex::new(mols.into_iter()),
        }
    }
}

impl MoleculeSource for VecSource {
    fn read_next(&self) -> Result<Option<Molecule>, EngineError> {
        Ok(self.mols.lock().unwrap().next())
    }
}

/// An in-memory sink collecting written molecules, used by tests and
/// library callers.
#[derive(Default)]
pub struct VecSink {
    mols: Mutex<Vec<Molecule>>,
}

impl VecSink {
    /// Creates an empty collecting sink.
    pub fn new() -> VecSink {
        VecSink::default()
    }

    /// Consumes the sink and returns everything written to it.
    pub fn into_molecules(self) -> Vec<Molecule> {
        self.mols.into_inner().unwrap()
    }
}

impl MoleculeSink for VecSink {
    fn write(&self, mol: &Molecule) -> Result<(), EngineError> {
        self.mols.lock().unwrap().push(mol.clone());
        Ok(())
    }
}
