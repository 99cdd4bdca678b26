//! SMARTS-subset patterns: expression trees and subgraph matching.

pub mod matcher;
pub mod parser;

pub use matcher::{Embedding, Matcher};
pub use parser::{AtomExpr, BondExpr, Pattern, PatternAtom};
