//! Valence bookkeeping: implicit-hydrogen inference and charge-adjusted
//! default valences.
//!
//! Two callers rely on these rules: the SMILES reader, which must infer the
//! hydrogen count of organic-subset atoms written without brackets, and the
//! rule applier, which recomputes hydrogen counts on atoms whose bonding a
//! rewrite changed.

use crate::core::Element;

/// Infers the implicit-hydrogen count of an atom written without brackets.
///
/// The lowest valence target at or above the current bond-order sum is
/// filled with hydrogens. Aromatic atoms reserve one slot for the ring pi
/// system, so an aromatic atom one short of its target gets no hydrogen.
///
/// # Arguments
///
/// * `element` - The element of the atom.
/// * `bond_order_sum` - Sum of explicit bond orders, counting aromatic
///   bonds as one each.
/// * `aromatic` - Whether the atom was written in aromatic (lowercase)
///   form.
pub fn implicit_hydrogens(element: Element, bond_order_sum: u8, aromatic: bool) -> u8 {
    let free = element
        .valence_targets()
        .iter()
        .find(|&&target| target >= bond_order_sum)
        .map_or(0, |&target| target - bond_order_sum);
    if aromatic {
        if free > 1 { free - 1 } else { 0 }
    } else {
        free
    }
}

/// Returns the default valence of an element adjusted for a formal charge.
///
/// Elements with lone pairs gain one bonding slot per positive charge;
/// carbon and boron lose one. Every element loses a slot per negative
/// charge.
pub fn default_valence(element: Element, formal_charge: i8) -> u8 {
    let base = element.valence_targets()[0];
    if formal_charge == 0 {
        return base;
    }
    let magnitude = formal_charge.unsigned_abs();
    if formal_charge > 0 && has_lone_pairs(element) {
        base + magnitude
    } else {
        base.saturating_sub(magnitude)
    }
}

/// Returns the smallest charge-adjusted valence target at or above
/// `bond_order_sum`, falling back to the default when every shell is
/// exceeded.
pub fn smallest_fitting_valence(element: Element, formal_charge: i8, bond_order_sum: u8) -> u8 {
    let shift = |target: u8| -> u8 {
        if formal_charge == 0 {
            target
        } else if formal_charge > 0 && has_lone_pairs(element) {
            target + formal_charge.unsigned_abs()
        } else {
            target.saturating_sub(formal_charge.unsigned_abs())
        }
    };
    element
        .valence_targets()
        .iter()
        .map(|&t| shift(t))
        .find(|&t| t >= bond_order_sum)
        .unwrap_or_else(|| default_valence(element, formal_charge))
}

fn has_lone_pairs(element: Element) -> bool {
    !matches!(element, Element::C | Element::B | Element::Si | Element::H)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_carbon_fills_to_four() {
        assert_eq!(implicit_hydrogens(Element::C, 1, false), 3);
        assert_eq!(implicit_hydrogens(Element::C, 4, false), 0);
    }

    #[test]
    fn aromatic_carbon_reserves_one_for_the_ring() {
        // benzene carbon: two ring bonds counted as one each
        assert_eq!(implicit_hydrogens(Element::C, 2, true), 1);
        // fusion carbon with three ring bonds
        assert_eq!(implicit_hydrogens(Element::C, 3, true), 0);
    }

    #[test]
    fn aromatic_nitrogen_in_pyridine_gets_no_hydrogen() {
        assert_eq!(implicit_hydrogens(Element::N, 2, true), 0);
    }

    #[test]
    fn sulfur_steps_up_to_the_next_shell() {
        assert_eq!(implicit_hydrogens(Element::S, 3, false), 1);
        assert_eq!(implicit_hydrogens(Element::S, 5, false), 1);
    }

    #[test]
    fn charged_defaults_follow_lone_pair_rule() {
        assert_eq!(default_valence(Element::N, 1), 4);
        assert_eq!(default_valence(Element::O, 1), 3);
        assert_eq!(default_valence(Element::O, -1), 1);
        assert_eq!(default_valence(Element::C, 1), 3);
        assert_eq!(default_valence(Element::C, -1), 3);
    }

    #[test]
    fn smallest_fitting_valence_respects_hypervalent_shells() {
        assert_eq!(smallest_fitting_valence(Element::S, 0, 5), 6);
        assert_eq!(smallest_fitting_valence(Element::S, 0, 2), 2);
        assert_eq!(smallest_fitting_valence(Element::N, 1, 4), 4);
    }
}
