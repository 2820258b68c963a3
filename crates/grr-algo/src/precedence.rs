//! Repair precedences derived from a restoration ordering.
//!
//! The ordering model decides which damaged line is repaired at which step;
//! the routing model only needs to know which repair site may not be
//! reached before which other one.

use std::collections::{BTreeSet, HashMap};

use grr_core::{ConstructionError, LineKey, SiteId};

/// Precedence pairs `(i, j)`: repair site `j` is not reached before `i`.
///
/// One pair per consecutive couple in `order`. Lines mapped to the same
/// repair site produce no pair, and repeated pairs are kept once in their
/// first position.
pub fn from_repair_order(
    order: &[LineKey],
    repair_site_of_line: &HashMap<LineKey, SiteId>,
) -> Result<Vec<(SiteId, SiteId)>, ConstructionError> {
    let sites = order
        .iter()
        .map(|key| {
            repair_site_of_line
                .get(key)
                .copied()
                .ok_or_else(|| ConstructionError::MissingParameter {
                    param: "repair_site_of_line",
                    index: key.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen = BTreeSet::new();
    Ok(sites
        .windows(2)
        .map(|w| (w[0], w[1]))
        .filter(|(i, j)| i != j)
        .filter(|pair| seen.insert(*pair))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use grr_core::BusId;

    fn key(a: usize, b: usize) -> LineKey {
        LineKey::new(BusId::new(a), BusId::new(b))
    }

    #[test]
    fn test_consecutive_pairs() {
        let map = HashMap::from([
            (key(1, 2), SiteId::new(10)),
            (key(2, 3), SiteId::new(11)),
            (key(3, 4), SiteId::new(12)),
        ]);
        let pairs = from_repair_order(&[key(2, 3), key(1, 2), key(3, 4)], &map).unwrap();
        assert_eq!(
            pairs,
            vec![(SiteId::new(11), SiteId::new(10)), (SiteId::new(10), SiteId::new(12))]
        );
    }

    #[test]
    fn test_same_site_and_repeats_collapse() {
        // Both directions of a branch are repaired at one site
        let map = HashMap::from([
            (key(1, 2), SiteId::new(10)),
            (key(2, 1), SiteId::new(10)),
            (key(2, 3), SiteId::new(11)),
            (key(3, 2), SiteId::new(11)),
        ]);
        let order = [key(1, 2), key(2, 1), key(2, 3), key(3, 2)];
        let pairs = from_repair_order(&order, &map).unwrap();
        assert_eq!(pairs, vec![(SiteId::new(10), SiteId::new(11))]);

        let order = [key(1, 2), key(2, 3), key(2, 1), key(3, 2), key(1, 2)];
        let pairs = from_repair_order(&order, &map).unwrap();
        assert_eq!(
            pairs,
            vec![(SiteId::new(10), SiteId::new(11)), (SiteId::new(11), SiteId::new(10))]
        );
    }

    #[test]
    fn test_unmapped_line_is_missing_parameter() {
        let map = HashMap::from([(key(1, 2), SiteId::new(10))]);
        let err = from_repair_order(&[key(1, 2), key(5, 6)], &map).unwrap_err();
        assert!(matches!(
            err,
            ConstructionError::MissingParameter { param: "repair_site_of_line", .. }
        ));
    }

    #[test]
    fn test_single_repair_has_no_pairs() {
        let map = HashMap::from([(key(1, 2), SiteId::new(10))]);
        assert!(from_repair_order(&[key(1, 2)], &map).unwrap().is_empty());
        assert!(from_repair_order(&[], &map).unwrap().is_empty());
    }
}
