//! Rule definitions: loading, vector-binding expansion, and lazy
//! compilation into appliers.
//!
//! Rule files are plain text. Lines beginning with `#` (after trimming)
//! and blank lines are ignored; every other line is whitespace-tokenized.
//! A rule line is `<pattern> [<name>]`, with `Smk<ordinal>` generated when
//! the name is omitted. A vector-binding line is `<name> <definition>`.
//! Bindings are textual macros substituted into patterns before
//! compilation.

pub mod applier;
pub mod default;

pub use applier::{Product, RuleApplier, SmirksApplier};

use crate::core::error::EngineError;
use std::fs;
use std::path::Path;
use tracing::warn;

/// A named textual macro expanded inside rule patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorBinding {
    /// The `$`-prefixed name referenced from patterns.
    pub name: String,
    /// The replacement text.
    pub definition: String,
}

/// One rewrite rule: a name, the pattern as written, the pattern after
/// vector-binding expansion, and the lazily compiled applier.
pub struct Rule {
    /// Human-readable identifier, kept for audit trails and optional
    /// appending to product titles.
    pub name: String,
    /// The pattern text before vector-binding expansion.
    pub raw_pattern: String,
    /// The pattern text after expansion.
    pub expanded_pattern: String,
    applier: Option<SmirksApplier>,
}

impl Clone for Rule {
    /// Clones the rule text only. The applier carries per-call state and is
    /// rebuilt lazily in the clone, which is what makes per-worker cloning
    /// of rule sets cheap and thread-safe.
    fn clone(&self) -> Self {
        Rule {
            name: self.name.clone(),
            raw_pattern: self.raw_pattern.clone(),
            expanded_pattern: self.expanded_pattern.clone(),
            applier: None,
        }
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("raw_pattern", &self.raw_pattern)
            .field("expanded_pattern", &self.expanded_pattern)
            .field("compiled", &self.applier.is_some())
            .finish()
    }
}

impl Rule {
    /// Returns the compiled applier, building it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PatternCompile`] naming the rule and its
    /// expanded pattern when compilation fails.
    pub fn applier(&mut self) -> Result<&mut SmirksApplier, EngineError> {
        if self.applier.is_none() {
            let compiled =
                SmirksApplier::compile(&self.expanded_pattern).map_err(|reason| {
                    EngineError::PatternCompile {
                        rule: self.name.clone(),
                        expanded: self.expanded_pattern.clone(),
                        reason,
                    }
                })?;
            self.applier = Some(compiled);
        }
        Ok(self.applier.as_mut().unwrap())
    }
}

/// An ordered sequence of rules sharing one vector-binding table.
///
/// Order is semantically significant: standardisation applies rules in
/// listed order, and enumeration visits them in listed order per frontier
/// molecule.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    /// The rules, in file order.
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// Builds a rule set from rule text and vector-binding text.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ConflictingBinding`] when two bindings share
    /// a name with different definitions.
    pub fn from_strings(rules_text: &str, bindings_text: &str) -> Result<RuleSet, EngineError> {
        let bindings = read_bindings(bindings_text)?;
        let rules = read_rules(rules_text)
            .into_iter()
            .map(|(name, raw)| {
                let expanded = expand_bindings(&raw, &bindings);
                Rule {
                    name,
                    raw_pattern: raw,
                    expanded_pattern: expanded,
                    applier: None,
                }
            })
            .collect();
        Ok(RuleSet { rules })
    }

    /// Builds a rule set from a rule file and an optional vector-binding
    /// file.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RuleFile`] when either file cannot be read,
    /// or [`EngineError::ConflictingBinding`] on conflicting bindings.
    pub fn from_files(
        rules_path: &Path,
        bindings_path: Option<&Path>,
    ) -> Result<RuleSet, EngineError> {
        let rules_text = fs::read_to_string(rules_path).map_err(|source| EngineError::RuleFile {
            path: rules_path.display().to_string(),
            source,
        })?;
        let bindings_text = match bindings_path {
            Some(path) => fs::read_to_string(path).map_err(|source| EngineError::RuleFile {
                path: path.display().to_string(),
                source,
            })?,
            None => String::new(),
        };
        Self::from_strings(&rules_text, &bindings_text)
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns whether the set holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Parses rule lines into `(name, pattern)` pairs.
fn read_rules(text: &str) -> Vec<(String, String)> {
    let mut rules = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let Some(pattern) = tokens.next() else {
            continue;
        };
        let name = tokens
            .next()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Smk{}", rules.len() + 1));
        rules.push((name, pattern.to_string()));
    }
    rules
}

/// Parses vector-binding lines, sorts them by name, and resolves
/// duplicates: an identical redefinition warns and keeps one copy; a
/// conflicting redefinition is fatal.
fn read_bindings(text: &str) -> Result<Vec<VectorBinding>, EngineError> {
    let mut bindings = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let (Some(name), Some(definition)) = (tokens.next(), tokens.next()) else {
            continue;
        };
        bindings.push(VectorBinding {
            name: name.to_string(),
            definition: definition.to_string(),
        });
    }

    bindings.sort_by(|a, b| a.name.cmp(&b.name));
    let mut deduped: Vec<VectorBinding> = Vec::with_capacity(bindings.len());
    for binding in bindings {
        match deduped.last() {
            Some(last) if last.name == binding.name => {
                if last.definition == binding.definition {
                    warn!(
                        name = %binding.name,
                        definition = %binding.definition,
                        "duplicate definition for vector binding"
                    );
                } else {
                    return Err(EngineError::ConflictingBinding {
                        name: binding.name,
                        first: last.definition.clone(),
                        second: binding.definition,
                    });
                }
            }
            _ => deduped.push(binding),
        }
    }
    Ok(deduped)
}

/// Substitutes `$NAME` references in a pattern, longest name first so a
/// binding is never clobbered by a prefix of itself.
fn expand_bindings(pattern: &str, bindings: &[VectorBinding]) -> String {
    let mut by_length: Vec<&VectorBinding> = bindings.iter().collect();
    by_length.sort_by_key(|b| std::cmp::Reverse(b.name.len()));
    let mut expanded = pattern.to_string();
    for binding in by_length {
        expanded = expanded.replace(&binding.name, &binding.definition);
    }
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rule_lines_take_pattern_then_optional_name() {
        let rules = read_rules(
            "# a comment\n\
             [O:1][H:2]>>[O-:1]\tDEPROT\n\
             \n\
             [N:1]>>[N:1]\n",
        );
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].0, "DEPROT");
        assert_eq!(rules[1].0, "Smk2");
        assert_eq!(rules[1].1, "[N:1]>>[N:1]");
    }

    #[test]
    fn indented_comments_are_ignored() {
        let rules = read_rules("   # indented comment\n[O:1][H:2]>>[O-:1] A\n");
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn bindings_are_sorted_and_identical_duplicates_collapse() {
        let bindings = read_bindings(
            "$OS\tO,S\n\
             $CAR\tc,n\n\
             $OS\tO,S\n",
        )
        .unwrap();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].name, "$CAR");
        assert_eq!(bindings[1].name, "$OS");
    }

    #[test]
    fn conflicting_duplicate_bindings_are_fatal() {
        let err = read_bindings("$OS O,S\n$OS O,S,Se\n").unwrap_err();
        match err {
            EngineError::ConflictingBinding { name, .. } => assert_eq!(name, "$OS"),
            other => panic!("expected ConflictingBinding, got {:?}", other),
        }
    }

    #[test]
    fn expansion_prefers_longer_binding_names() {
        let bindings = vec![
            VectorBinding {
                name: "$CAR".to_string(),
                definition: "c,n".to_string(),
            },
            VectorBinding {
                name: "$CARX".to_string(),
                definition: "c,n,o".to_string(),
            },
        ];
        assert_eq!(expand_bindings("[$CARX:1]", &bindings), "[c,n,o:1]");
        assert_eq!(expand_bindings("[$CAR:1]", &bindings), "[c,n:1]");
    }

    #[test]
    fn rule_set_compiles_appliers_lazily_and_clones_fresh() {
        let mut set = RuleSet::from_strings(
            "[$OS:1]=[C:2][C:3][H:4]>>[H:4][*:1][C:2]=[C:3]\tKETO_ENOL\n",
            "$OS O,S\n",
        )
        .unwrap();
        assert_eq!(set.rules[0].expanded_pattern, "[O,S:1]=[C:2][C:3][H:4]>>[H:4][*:1][C:2]=[C:3]");
        set.rules[0].applier().unwrap();

        let clone = set.clone();
        assert!(clone.rules[0].applier.is_none());
    }

    #[test]
    fn pattern_compile_errors_name_the_rule() {
        let mut set =
            RuleSet::from_strings("[$MISSING:1]>>[*:1]\tBROKEN\n", "").unwrap();
        let err = set.rules[0].applier().unwrap_err();
        match err {
            EngineError::PatternCompile { rule, expanded, .. } => {
                assert_eq!(rule, "BROKEN");
                assert_eq!(expanded, "[$MISSING:1]>>[*:1]");
            }
            other => panic!("expected PatternCompile, got {:?}", other),
        }
    }
}
