//! Parser for the SMARTS subset used by the rewrite rules.
//!
//! Supported atom primitives: organic-subset symbols (aromatic lowercase
//! included), `*`, `a`, `A`, `#n`, charge, `Hn` (total hydrogen count),
//! `Xn` (total connections), `Dn` (explicit connections), `R`/`R0` (ring
//! membership), and atom maps. Logical operators follow SMARTS precedence:
//! `!` binds tightest, then `&` (also implied by juxtaposition), then `,`,
//! then `;`. A leading `H` inside a bracket denotes the hydrogen element,
//! which is how the hydrogen-shifting rules address the proton they move.

use crate::core::{BondOrder, Element};
use std::collections::HashMap;

/// A predicate over one molecule atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomExpr {
    /// `*` — matches anything.
    Any,
    /// `a` — any aromatic atom.
    AnyAromatic,
    /// `A` — any aliphatic atom.
    AnyAliphatic,
    /// Element with a required aromaticity, e.g. `C` vs `c`.
    Element {
        /// The element to match.
        element: Element,
        /// Required aromatic flag.
        aromatic: bool,
    },
    /// `#n` — atomic number, any aromaticity.
    AtomicNumber(u8),
    /// Exact formal charge, e.g. `+`, `-2`.
    Charge(i8),
    /// `Hn` — total hydrogen count.
    TotalH(u8),
    /// `Xn` — total connections including implicit hydrogens.
    Connections(u8),
    /// `Dn` — explicit connections.
    Degree(u8),
    /// `R` / `R0` — ring membership.
    InRing(bool),
    /// `!expr`.
    Not(Box<AtomExpr>),
    /// `;`- or `&`-joined conjunction.
    And(Vec<AtomExpr>),
    /// `,`-joined disjunction.
    Or(Vec<AtomExpr>),
}

/// A predicate over one molecule bond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondExpr {
    /// Default bond: single or aromatic.
    SingleOrAromatic,
    /// `-`
    Single,
    /// `=`
    Double,
    /// `#`
    Triple,
    /// `:`
    Aromatic,
    /// `~`
    Any,
}

impl BondExpr {
    /// Returns whether a bond with the given kekulized order and aromatic
    /// flag satisfies this expression.
    pub fn matches(self, order: BondOrder, aromatic: bool) -> bool {
        match self {
            BondExpr::Any => true,
            BondExpr::Aromatic => aromatic,
            BondExpr::Single => order == BondOrder::Single && !aromatic,
            BondExpr::Double => order == BondOrder::Double && !aromatic,
            BondExpr::Triple => order == BondOrder::Triple && !aromatic,
            BondExpr::SingleOrAromatic => aromatic || order == BondOrder::Single,
        }
    }
}

/// One pattern atom: a predicate plus bookkeeping for maps and explicit
/// hydrogen queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternAtom {
    /// The predicate this atom must satisfy.
    pub expr: AtomExpr,
    /// Atom-map index; zero means unmapped.
    pub map_idx: u32,
    /// True for `[H]`-element query atoms, which bind implicit hydrogens
    /// of their heavy neighbor rather than graph atoms.
    pub is_hydrogen: bool,
}

/// A parsed pattern graph.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pattern {
    /// The pattern atoms, hydrogen queries included.
    pub atoms: Vec<PatternAtom>,
    /// Bonds as `(atom, atom, expression)` triples.
    pub bonds: Vec<(usize, usize, BondExpr)>,
}

impl Pattern {
    /// Parses a SMARTS pattern.
    ///
    /// # Errors
    ///
    /// Returns a diagnostic naming the offending position. An unexpanded
    /// `$name` reference is reported as an undefined vector binding.
    pub fn parse(text: &str) -> Result<Pattern, String> {
        let mut parser = PatternParser {
            text: text.as_bytes(),
            pos: 0,
            pattern: Pattern::default(),
            prev: None,
            stack: Vec::new(),
            pending: None,
            rings: HashMap::new(),
        };
        parser.run()?;
        Ok(parser.pattern)
    }

    /// Returns the index of the heavy neighbor of a hydrogen query atom.
    pub fn hydrogen_anchor(&self, h_idx: usize) -> Option<usize> {
        self.bonds.iter().find_map(|&(a, b, _)| {
            if a == h_idx {
                Some(b)
            } else if b == h_idx {
                Some(a)
            } else {
                None
            }
        })
    }
}

struct PatternParser<'a> {
    text: &'a [u8],
    pos: usize,
    pattern: Pattern,
    prev: Option<usize>,
    stack: Vec<Option<usize>>,
    pending: Option<BondExpr>,
    rings: HashMap<u16, (usize, Option<BondExpr>)>,
}

impl<'a> PatternParser<'a> {
    fn peek(&self) -> Option<u8> {
        self.text.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn fail(&self, message: &str) -> String {
        format!("{} at position {}", message, self.pos)
    }

    fn run(&mut self) -> Result<(), String> {
        while let Some(c) = self.peek() {
            match c {
                b'(' => {
                    self.bump();
                    if self.prev.is_none() {
                        return Err(self.fail("branch opened before any atom"));
                    }
                    self.stack.push(self.prev);
                }
                b')' => {
                    self.bump();
                    match self.stack.pop() {
                        Some(restored) => self.prev = restored,
                        None => return Err(self.fail("unmatched ')'")),
                    }
                }
                b'-' => {
                    self.bump();
                    self.set_pending(BondExpr::Single)?;
                }
                b'=' => {
                    self.bump();
                    self.set_pending(BondExpr::Double)?;
                }
                b'#' => {
                    self.bump();
                    self.set_pending(BondExpr::Triple)?;
                }
                b':' => {
                    self.bump();
                    self.set_pending(BondExpr::Aromatic)?;
                }
                b'~' => {
                    self.bump();
                    self.set_pending(BondExpr::Any)?;
                }
                b'/' | b'\\' => {
                    self.bump();
                    self.set_pending(BondExpr::Single)?;
                }
                b'0'..=b'9' => {
                    let rnum = (self.bump().unwrap() - b'0') as u16;
                    self.ring_bond(rnum)?;
                }
                b'%' => {
                    self.bump();
                    let mut rnum = 0u16;
                    for _ in 0..2 {
                        match self.bump() {
                            Some(d @ b'0'..=b'9') => rnum = rnum * 10 + (d - b'0') as u16,
                            _ => return Err(self.fail("'%' must be followed by two digits")),
                        }
                    }
                    self.ring_bond(rnum)?;
                }
                b'[' => {
                    self.bump();
                    let (expr, map_idx, is_hydrogen) = self.bracket_expr()?;
                    self.push_atom(expr, map_idx, is_hydrogen)?;
                }
                b'$' => {
                    let name: String = self.text[self.pos..]
                        .iter()
                        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'$' || **b == b'_')
                        .map(|&b| b as char)
                        .collect();
                    return Err(format!("undefined vector binding '{}'", name));
                }
                _ => {
                    let expr = self.organic_expr()?;
                    self.push_atom(expr, 0, false)?;
                }
            }
        }
        if !self.stack.is_empty() {
            return Err(self.fail("unmatched '('"));
        }
        if let Some(rnum) = self.rings.keys().next() {
            return Err(format!("ring bond {} never closed", rnum));
        }
        if self.pending.is_some() {
            return Err(self.fail("dangling bond symbol"));
        }
        if self.pattern.atoms.is_empty() {
            return Err("empty pattern".to_string());
        }
        Ok(())
    }

    fn set_pending(&mut self, expr: BondExpr) -> Result<(), String> {
        if self.pending.is_some() {
            return Err(self.fail("two bond symbols in a row"));
        }
        if self.prev.is_none() {
            return Err(self.fail("bond symbol before any atom"));
        }
        self.pending = Some(expr);
        Ok(())
    }

    fn push_atom(&mut self, expr: AtomExpr, map_idx: u32, is_hydrogen: bool) -> Result<(), String> {
        self.pattern.atoms.push(PatternAtom {
            expr,
            map_idx,
            is_hydrogen,
        });
        let id = self.pattern.atoms.len() - 1;
        if let Some(prev) = self.prev {
            let bond = self.pending.take().unwrap_or(BondExpr::SingleOrAromatic);
            self.pattern.bonds.push((prev, id, bond));
        } else if self.pending.is_some() {
            return Err(self.fail("bond symbol with no preceding atom"));
        }
        self.prev = Some(id);
        Ok(())
    }

    fn ring_bond(&mut self, rnum: u16) -> Result<(), String> {
        let current = self
            .prev
            .ok_or_else(|| self.fail("ring bond digit before any atom"))?;
        let pending = self.pending.take();
        match self.rings.remove(&rnum) {
            None => {
                self.rings.insert(rnum, (current, pending));
            }
            Some((opener, open_bond)) => {
                let bond = match (open_bond, pending) {
                    (None, other) | (other, None) => other.unwrap_or(BondExpr::SingleOrAromatic),
                    (Some(a), Some(b)) if a == b => a,
                    _ => return Err(self.fail("conflicting ring bond symbols")),
                };
                self.pattern.bonds.push((opener, current, bond));
            }
        }
        Ok(())
    }

    fn organic_expr(&mut self) -> Result<AtomExpr, String> {
        let c = self.bump().ok_or_else(|| self.fail("unexpected end"))?;
        let expr = match c {
            b'*' => AtomExpr::Any,
            b'a' => AtomExpr::AnyAromatic,
            b'A' => AtomExpr::AnyAliphatic,
            b'B' => {
                if self.peek() == Some(b'r') {
                    self.bump();
                    element(Element::Br, false)
                } else {
                    element(Element::B, false)
                }
            }
            b'C' => {
                if self.peek() == Some(b'l') {
                    self.bump();
                    element(Element::Cl, false)
                } else {
                    element(Element::C, false)
                }
            }
            b'N' => element(Element::N, false),
            b'O' => element(Element::O, false),
            b'P' => element(Element::P, false),
            b'S' => element(Element::S, false),
            b'F' => element(Element::F, false),
            b'I' => element(Element::I, false),
            b'b' => element(Element::B, true),
            b'c' => element(Element::C, true),
            b'n' => element(Element::N, true),
            b'o' => element(Element::O, true),
            b'p' => element(Element::P, true),
            b's' => element(Element::S, true),
            other => {
                self.pos -= 1;
                return Err(self.fail(&format!("unexpected character '{}'", other as char)));
            }
        };
        Ok(expr)
    }

    /// Parses a bracket expression up to and including `]`.
    fn bracket_expr(&mut self) -> Result<(AtomExpr, u32, bool), String> {
        // a bracket opening directly with H is the hydrogen element
        let is_hydrogen = self.peek() == Some(b'H');
        if is_hydrogen {
            self.bump();
            let map_idx = self.map_suffix()?;
            if self.bump() != Some(b']') {
                return Err(self.fail("expected ']' after hydrogen query"));
            }
            return Ok((
                element(Element::H, false),
                map_idx,
                true,
            ));
        }

        let expr = self.low_and_expr()?;
        let map_idx = self.map_suffix()?;
        if self.bump() != Some(b']') {
            return Err(self.fail("expected ']'"));
        }
        Ok((expr, map_idx, false))
    }

    fn map_suffix(&mut self) -> Result<u32, String> {
        if self.peek() != Some(b':') {
            return Ok(0);
        }
        self.bump();
        let mut value = 0u32;
        let mut any = false;
        while let Some(d @ b'0'..=b'9') = self.peek() {
            self.bump();
            value = value * 10 + (d - b'0') as u32;
            any = true;
        }
        if !any {
            return Err(self.fail("':' must be followed by a map index"));
        }
        Ok(value)
    }

    /// `;`-joined conjunction, the loosest operator.
    fn low_and_expr(&mut self) -> Result<AtomExpr, String> {
        let mut terms = vec![self.or_expr()?];
        while self.peek() == Some(b';') {
            self.bump();
            terms.push(self.or_expr()?);
        }
        Ok(flatten(terms, true))
    }

    /// `,`-joined disjunction.
    fn or_expr(&mut self) -> Result<AtomExpr, String> {
        let mut terms = vec![self.high_and_expr()?];
        while self.peek() == Some(b',') {
            self.bump();
            terms.push(self.high_and_expr()?);
        }
        Ok(flatten(terms, false))
    }

    /// `&`-joined (or juxtaposed) conjunction, the tightest binary
    /// operator.
    fn high_and_expr(&mut self) -> Result<AtomExpr, String> {
        let mut terms = vec![self.unary_expr()?];
        loop {
            match self.peek() {
                Some(b'&') => {
                    self.bump();
                    terms.push(self.unary_expr()?);
                }
                Some(c) if starts_primitive(c) => {
                    terms.push(self.unary_expr()?);
                }
                _ => break,
            }
        }
        Ok(flatten(terms, true))
    }

    fn unary_expr(&mut self) -> Result<AtomExpr, String> {
        if self.peek() == Some(b'!') {
            self.bump();
            return Ok(AtomExpr::Not(Box::new(self.unary_expr()?)));
        }
        self.primitive()
    }

    fn primitive(&mut self) -> Result<AtomExpr, String> {
        let c = self.bump().ok_or_else(|| self.fail("unterminated bracket"))?;
        let expr = match c {
            b'*' => AtomExpr::Any,
            b'a' => AtomExpr::AnyAromatic,
            b'A' => AtomExpr::AnyAliphatic,
            b'#' => AtomExpr::AtomicNumber(self.count(None)?),
            b'+' => {
                if self.peek() == Some(b'+') {
                    self.bump();
                    AtomExpr::Charge(2)
                } else {
                    AtomExpr::Charge(self.count(Some(1))? as i8)
                }
            }
            b'-' => {
                if self.peek() == Some(b'-') {
                    self.bump();
                    AtomExpr::Charge(-2)
                } else {
                    AtomExpr::Charge(-(self.count(Some(1))? as i8))
                }
            }
            b'H' => AtomExpr::TotalH(self.count(Some(1))?),
            b'X' => AtomExpr::Connections(self.count(Some(1))?),
            b'D' => AtomExpr::Degree(self.count(Some(1))?),
            b'R' => match self.peek() {
                Some(b'0') => {
                    self.bump();
                    AtomExpr::InRing(false)
                }
                Some(d @ b'1'..=b'9') => {
                    self.bump();
                    let _ = d;
                    AtomExpr::InRing(true)
                }
                _ => AtomExpr::InRing(true),
            },
            b'$' => {
                let name: String = self.text[self.pos - 1..]
                    .iter()
                    .take_while(|b| b.is_ascii_alphanumeric() || **b == b'$' || **b == b'_')
                    .map(|&b| b as char)
                    .collect();
                return Err(format!("undefined vector binding '{}'", name));
            }
            b'b' => element(Element::B, true),
            b'c' => element(Element::C, true),
            b'n' => element(Element::N, true),
            b'o' => element(Element::O, true),
            b'p' => element(Element::P, true),
            b's' => {
                if self.peek() == Some(b'e') {
                    self.bump();
                    element(Element::Se, true)
                } else {
                    element(Element::S, true)
                }
            }
            c if c.is_ascii_uppercase() => {
                let mut symbol = (c as char).to_string();
                if let Some(lower) = self.peek().filter(|b| b.is_ascii_lowercase()) {
                    let mut pair = symbol.clone();
                    pair.push(lower as char);
                    if pair.parse::<Element>().is_ok() {
                        self.bump();
                        symbol = pair;
                    }
                }
                let elem = symbol.parse::<Element>().map_err(|e| self.fail(&e))?;
                element(elem, false)
            }
            other => {
                self.pos -= 1;
                return Err(self.fail(&format!(
                    "unsupported SMARTS primitive '{}'",
                    other as char
                )));
            }
        };
        Ok(expr)
    }

    fn count(&mut self, default: Option<u8>) -> Result<u8, String> {
        let mut value = 0u8;
        let mut any = false;
        while let Some(d @ b'0'..=b'9') = self.peek() {
            self.bump();
            value = value * 10 + (d - b'0');
            any = true;
        }
        if any {
            Ok(value)
        } else {
            default.ok_or_else(|| self.fail("expected a number"))
        }
    }
}

fn element(element: Element, aromatic: bool) -> AtomExpr {
    AtomExpr::Element { element, aromatic }
}

fn flatten(mut terms: Vec<AtomExpr>, and: bool) -> AtomExpr {
    if terms.len() == 1 {
        terms.pop().unwrap()
    } else if and {
        AtomExpr::And(terms)
    } else {
        AtomExpr::Or(terms)
    }
}

fn starts_primitive(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'*' | b'#' | b'+' | b'-' | b'!' | b'$')
}
