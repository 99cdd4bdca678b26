//! Core types and enumerations for chemical elements and molecular properties.
//!
//! This module defines the fundamental vocabulary used throughout the tautogen
//! library: the chemical elements the rule chemistry touches, bond orders,
//! hybridization states, and the stereo descriptors carried on atoms and
//! bonds. These types are the building blocks of the molecular graph that the
//! transformation engine rewrites.

use std::fmt;
use std::str::FromStr;

pub mod error;
pub mod graph;

/// Represents a chemical element with its atomic number.
///
/// The set is restricted to the elements that appear in tautomer and
/// protonation chemistry plus the common counter-ion elements seen in salt
/// forms. Elements can be parsed from their standard symbols and displayed
/// back as symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Element {
    /// Hydrogen (atomic number 1)
    H = 1,
    /// Boron (atomic number 5)
    B = 5,
    /// Carbon (atomic number 6)
    C,
    /// Nitrogen (atomic number 7)
    N,
    /// Oxygen (atomic number 8)
    O,
    /// Fluorine (atomic number 9)
    F,
    /// Sodium (atomic number 11)
    Na = 11,
    /// Magnesium (atomic number 12)
    Mg,
    /// Silicon (atomic number 14)
    Si = 14,
    /// Phosphorus (atomic number 15)
    P,
    /// Sulfur (atomic number 16)
    S,
    /// Chlorine (atomic number 17)
    Cl,
    /// Potassium (atomic number 19)
    K = 19,
    /// Calcium (atomic number 20)
    Ca,
    /// Selenium (atomic number 34)
    Se = 34,
    /// Bromine (atomic number 35)
    Br,
    /// Iodine (atomic number 53)
    I = 53,
}

impl Element {
    /// Returns the atomic number of this element.
    pub fn atomic_number(self) -> u8 {
        self as u8
    }

    /// Returns the standard atomic symbol of this element.
    pub fn symbol(self) -> &'static str {
        match self {
            Element::H => "H",
            Element::B => "B",
            Element::C => "C",
            Element::N => "N",
            Element::O => "O",
            Element::F => "F",
            Element::Na => "Na",
            Element::Mg => "Mg",
            Element::Si => "Si",
            Element::P => "P",
            Element::S => "S",
            Element::Cl => "Cl",
            Element::K => "K",
            Element::Ca => "Ca",
            Element::Se => "Se",
            Element::Br => "Br",
            Element::I => "I",
        }
    }

    /// Returns whether the element belongs to the SMILES organic subset and
    /// may therefore be written without brackets.
    pub fn in_organic_subset(self) -> bool {
        matches!(
            self,
            Element::B
                | Element::C
                | Element::N
                | Element::O
                | Element::F
                | Element::P
                | Element::S
                | Element::Cl
                | Element::Br
                | Element::I
        )
    }

    /// Returns whether the element may carry an aromatic flag under the
    /// aromaticity model used here.
    pub fn can_be_aromatic(self) -> bool {
        matches!(
            self,
            Element::B | Element::C | Element::N | Element::O | Element::P | Element::S | Element::Se
        )
    }

    /// Returns the normal valence targets for implicit-hydrogen assignment,
    /// lowest first. Hypervalent elements list each permitted shell.
    pub fn valence_targets(self) -> &'static [u8] {
        match self {
            Element::H => &[1],
            Element::B => &[3],
            Element::C | Element::Si => &[4],
            Element::N => &[3, 5],
            Element::O => &[2],
            Element::F | Element::Cl | Element::Br | Element::I => &[1],
            Element::P => &[3, 5],
            Element::S | Element::Se => &[2, 4, 6],
            Element::Na | Element::K => &[1],
            Element::Mg | Element::Ca => &[2],
        }
    }
}

impl FromStr for Element {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "H" => Ok(Element::H),
            "B" => Ok(Element::B),
            "C" => Ok(Element::C),
            "N" => Ok(Element::N),
            "O" => Ok(Element::O),
            "F" => Ok(Element::F),
            "Na" => Ok(Element::Na),
            "Mg" => Ok(Element::Mg),
            "Si" => Ok(Element::Si),
            "P" => Ok(Element::P),
            "S" => Ok(Element::S),
            "Cl" => Ok(Element::Cl),
            "K" => Ok(Element::K),
            "Ca" => Ok(Element::Ca),
            "Se" => Ok(Element::Se),
            "Br" => Ok(Element::Br),
            "I" => Ok(Element::I),
            _ => Err(format!("unknown element symbol: '{}'", s)),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Represents the order of a chemical bond.
///
/// Molecules are stored kekulized: after perception no bond carries the
/// `Aromatic` order, which exists only between parsing and Kekulé
/// resolution. Aromaticity is a flag on atoms and bonds instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BondOrder {
    /// A single bond.
    Single,
    /// A double bond.
    Double,
    /// A triple bond.
    Triple,
    /// An aromatic bond awaiting Kekulé resolution.
    Aromatic,
}

impl BondOrder {
    /// Returns the valence contribution of this bond order.
    ///
    /// Aromatic bonds contribute one; they only exist transiently before
    /// Kekulé resolution assigns concrete orders.
    pub fn valence(self) -> u8 {
        match self {
            BondOrder::Single => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Aromatic => 1,
        }
    }
}

/// The hybridization state of an atom, derived from its bonding pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hybridization {
    /// sp hybridization (one triple or two double bonds).
    SP,
    /// sp2 hybridization (one double bond or aromatic).
    SP2,
    /// sp3 hybridization (all single bonds).
    SP3,
}

impl fmt::Display for Hybridization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Hybridization::SP => "SP",
            Hybridization::SP2 => "SP2",
            Hybridization::SP3 => "SP3",
        };
        write!(f, "{}", s)
    }
}

/// Tetrahedral parity of a stereocenter.
///
/// The parity is stored relative to the atom's reference neighbor frame:
/// explicit neighbor indices in ascending order, with a virtual implicit
/// hydrogen (if one participates) ordered last. `Anticlockwise` corresponds
/// to `@` and `Clockwise` to `@@` when the neighbors are viewed in that
/// frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parity {
    /// Neighbors wind anticlockwise in the reference frame (`@`).
    Anticlockwise,
    /// Neighbors wind clockwise in the reference frame (`@@`).
    Clockwise,
}

impl Parity {
    /// Returns the opposite winding.
    pub fn flipped(self) -> Parity {
        match self {
            Parity::Anticlockwise => Parity::Clockwise,
            Parity::Clockwise => Parity::Anticlockwise,
        }
    }

    /// Flips the winding when `odd` is true.
    ///
    /// An odd permutation of the neighbor listing inverts the perceived
    /// winding; an even one preserves it.
    pub fn permuted(self, odd: bool) -> Parity {
        if odd { self.flipped() } else { self }
    }
}

/// Direction mark on a single bond adjacent to a double bond, encoding
/// cis/trans configuration.
///
/// The direction is stored relative to the bond's `(begin, end)` atom order:
/// `Up` means the bond rises from begin to end as `/` does in SMILES written
/// left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BondDir {
    /// Rising direction (`/`).
    Up,
    /// Falling direction (`\`).
    Down,
}

impl BondDir {
    /// Returns the direction as seen when traversing the bond end-to-begin.
    pub fn reversed(self) -> BondDir {
        match self {
            BondDir::Up => BondDir::Down,
            BondDir::Down => BondDir::Up,
        }
    }
}
