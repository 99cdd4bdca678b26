//! Embedded default rule sets.
//!
//! Five rule tables and two vector-binding tables cover the stock
//! pipeline: tautomer standardisation, conservative ("original") and
//! extended tautomer enumeration, and the protonation standardise/enumerate
//! pair. The texts use the same lexical format as external rule files, so
//! users can start from these and extend them.

use super::RuleSet;
use crate::core::error::EngineError;

/// Vector bindings shared by the tautomer rule sets.
pub const TAUTOMER_BINDINGS: &str = "\
# atom classes shared by the tautomer rules
$OS\tO,S
$CAR\tc,n
";

/// Tautomer standardisation rules: push mobile hydrogens back onto
/// heteroatoms so every input converges to its carbonyl-like form.
pub const STANDARDISE_RULES: &str = "\
# enols and iminols back to their carbonyl forms
[H:4][O:1][C:2]=[C:3]>>[O:1]=[C:2][C:3][H:4]\tSTAND_ENOL_TO_KETO
[H:4][S:1][C:2]=[C:3]>>[S:1]=[C:2][C:3][H:4]\tSTAND_THIOENOL_TO_THIOKETO
[H:4][O:1][C:2]=[N:3]>>[O:1]=[C:2][N:3][H:4]\tSTAND_IMINOL_TO_AMIDE
[H:4][S:1][C:2]=[N:3]>>[S:1]=[C:2][N:3][H:4]\tSTAND_THIOIMINOL_TO_THIOAMIDE
# nitroso compounds with an alpha hydrogen prefer the oxime
[H:4][C:3][N:2]=[O:1]>>[H:4][O:1][N:2]=[C:3]\tSTAND_NITROSO_TO_OXIME
";

/// Conservative enumeration: 1,3 shifts between heteroatoms only.
pub const ENUMERATE_RULES_ORIGINAL: &str = "\
# amide/iminol pair
[H:4][O:1][C:2]=[N:3]>>[O:1]=[C:2][N:3][H:4]\tENUM_IMINOL_AMIDE
[H:4][N:1][C:2]=[O:3]>>[N:1]=[C:2][O:3][H:4]\tENUM_AMIDE_IMINOL
# thioamide pair
[H:4][S:1][C:2]=[N:3]>>[S:1]=[C:2][N:3][H:4]\tENUM_THIOIMINOL_THIOAMIDE
[H:4][N:1][C:2]=[S:3]>>[N:1]=[C:2][S:3][H:4]\tENUM_THIOAMIDE_THIOIMINOL
# amidine nitrogen swap
[H:4][N:1][C:2]=[N:3]>>[N:1]=[C:2][N:3][H:4]\tENUM_AMIDINE_SWAP
";

/// Extended enumeration: the conservative shifts plus carbon-hydrogen
/// activation (full keto/enol and imine/enamine) and azole ring shifts.
pub const ENUMERATE_RULES_EXTENDED: &str = "\
# amide/iminol pair
[H:4][O:1][C:2]=[N:3]>>[O:1]=[C:2][N:3][H:4]\tENUM_IMINOL_AMIDE
[H:4][N:1][C:2]=[O:3]>>[N:1]=[C:2][O:3][H:4]\tENUM_AMIDE_IMINOL
# thioamide pair
[H:4][S:1][C:2]=[N:3]>>[S:1]=[C:2][N:3][H:4]\tENUM_THIOIMINOL_THIOAMIDE
[H:4][N:1][C:2]=[S:3]>>[N:1]=[C:2][S:3][H:4]\tENUM_THIOAMIDE_THIOIMINOL
# amidine nitrogen swap
[H:4][N:1][C:2]=[N:3]>>[N:1]=[C:2][N:3][H:4]\tENUM_AMIDINE_SWAP
# keto/enol in both directions, oxygen and sulfur alike
[$OS:1]=[C:2][C:3][H:4]>>[H:4][*:1][C:2]=[C:3]\tENUM_KETO_ENOL
[H:4][$OS:1][C:2]=[C:3]>>[*:1]=[C:2][C:3][H:4]\tENUM_ENOL_KETO
# imine/enamine pair
[N:1]=[C:2][C:3][H:4]>>[H:4][N:1][C:2]=[C:3]\tENUM_IMINE_ENAMINE
[H:4][N:1][C:2]=[C:3]>>[N:1]=[C:2][C:3][H:4]\tENUM_ENAMINE_IMINE
# shift the pyrrole-type hydrogen across an azole ring
[H:6][n;X3;!+:1]:[$CAR:2]:[n;X2:3]>>[n:1]:[*:2]:[n:3][H:6]\tENUM_AZOLE_SWAP
";

/// Vector bindings for the protonation rule sets.
pub const PROTONATION_BINDINGS: &str = "\
# acid oxygens carry exactly one hydrogen and one heavy neighbor
$ACIDO\tO;X2
";

/// Protonation standardisation: neutralise charged acids and bases so
/// enumeration starts from one reference state.
pub const PROTONATION_STANDARDISE_RULES: &str = "\
[O-;X1:1]>>[O:1][H:2]\tPROT_STAND_PROTONATE_OXYANION
[S-;X1:1]>>[S:1][H:2]\tPROT_STAND_PROTONATE_THIOLATE
[H:2][N+:1]>>[N:1]\tPROT_STAND_DEPROTONATE_AMMONIUM
";

/// Protonation enumeration: visit the charged and neutral form of each
/// ionisable site.
pub const PROTONATION_ENUMERATE_RULES: &str = "\
# carboxylic and thiocarboxylic acids
[H:2][$ACIDO:1][C:3]=[O:4]>>[O-:1][C:3]=[O:4]\tPROT_ENUM_ACID_LOSS
[O-;X1:1][C:3]=[O:4]>>[H:2][O:1][C:3]=[O:4]\tPROT_ENUM_ACID_GAIN
# amine bases
[N;X3;!+:1]>>[N+:1][H:2]\tPROT_ENUM_BASE_GAIN
[H:2][N+;X4:1]>>[N:1]\tPROT_ENUM_BASE_LOSS
";

/// Loads the embedded tautomer standardisation rules.
pub fn standardise() -> Result<RuleSet, EngineError> {
    RuleSet::from_strings(STANDARDISE_RULES, TAUTOMER_BINDINGS)
}

/// Loads the embedded conservative enumeration rules.
pub fn enumerate_original() -> Result<RuleSet, EngineError> {
    RuleSet::from_strings(ENUMERATE_RULES_ORIGINAL, TAUTOMER_BINDINGS)
}

/// Loads the embedded extended enumeration rules.
pub fn enumerate_extended() -> Result<RuleSet, EngineError> {
    RuleSet::from_strings(ENUMERATE_RULES_EXTENDED, TAUTOMER_BINDINGS)
}

/// Loads the embedded protonation standardisation rules.
pub fn protonation_standardise() -> Result<RuleSet, EngineError> {
    RuleSet::from_strings(PROTONATION_STANDARDISE_RULES, PROTONATION_BINDINGS)
}

/// Loads the embedded protonation enumeration rules.
pub fn protonation_enumerate() -> Result<RuleSet, EngineError> {
    RuleSet::from_strings(PROTONATION_ENUMERATE_RULES, PROTONATION_BINDINGS)
}
