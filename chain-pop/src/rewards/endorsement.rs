use std::collections::{btree_map, BTreeMap};

/// A proof of proof transaction endorsing an altchain block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PopEndorsement {
    miner: String,
    txid: String,
}

impl PopEndorsement {
    pub fn new<M: Into<String>, T: Into<String>>(miner: M, txid: T) -> Self {
        PopEndorsement {
            miner: miner.into(),
            txid: txid.into(),
        }
    }

    /// the payout address of the PoP miner
    pub fn miner(&self) -> &str {
        &self.miner
    }

    pub fn txid(&self) -> &str {
        &self.txid
    }
}

/// Endorsements of one altchain block, keyed by the VeriBlock height
/// containing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopEndorsements {
    by_height: BTreeMap<u32, Vec<PopEndorsement>>,
}

impl PopEndorsements {
    pub fn new() -> Self {
        PopEndorsements::default()
    }

    pub fn add(&mut self, veriblock_height: u32, endorsement: PopEndorsement) {
        self.by_height
            .entry(veriblock_height)
            .or_insert_with(Vec::new)
            .push(endorsement);
    }

    /// height of the earliest endorsement, the reference of the relative scores
    pub fn lowest_height(&self) -> Option<u32> {
        self.by_height.keys().next().copied()
    }

    /// endorsements grouped by height, in increasing height order
    pub fn iter(&self) -> Iter<'_> {
        Iter(self.by_height.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.by_height.values().all(Vec::is_empty)
    }

    /// total number of endorsements
    pub fn len(&self) -> usize {
        self.by_height.values().map(Vec::len).sum()
    }
}

pub struct Iter<'a>(btree_map::Iter<'a, u32, Vec<PopEndorsement>>);

impl<'a> Iterator for Iter<'a> {
    type Item = (u32, &'a [PopEndorsement]);

    fn next(&mut self) -> Option<Self::Item> {
        self.0
            .next()
            .map(|(height, endorsements)| (*height, endorsements.as_slice()))
    }
}

impl std::iter::FromIterator<(u32, PopEndorsement)> for PopEndorsements {
    fn from_iter<I: IntoIterator<Item = (u32, PopEndorsement)>>(iter: I) -> Self {
        let mut endorsements = PopEndorsements::new();
        for (height, endorsement) in iter {
            endorsements.add(height, endorsement);
        }
        endorsements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn grouped_by_height() {
        let endorsements: PopEndorsements = vec![
            (105, PopEndorsement::new("V1", "aa")),
            (100, PopEndorsement::new("V2", "bb")),
            (105, PopEndorsement::new("V3", "cc")),
        ]
        .into_iter()
        .collect();

        assert_eq!(endorsements.lowest_height(), Some(100));
        assert_eq!(endorsements.len(), 3);
        let heights: Vec<(u32, usize)> = endorsements
            .iter()
            .map(|(height, list)| (height, list.len()))
            .collect();
        assert_eq!(heights, vec![(100, 1), (105, 2)]);
        assert_eq!(endorsements.iter().nth(1).unwrap().1[1].miner(), "V3");
    }

    #[test]
    fn empty_endorsements() {
        let endorsements = PopEndorsements::new();
        assert!(endorsements.is_empty());
        assert_eq!(endorsements.lowest_height(), None);
        assert_eq!(endorsements.iter().count(), 0);
    }

    #[quickcheck]
    fn lowest_height_is_the_first_group(endorsements: PopEndorsements) -> bool {
        endorsements.lowest_height() == endorsements.iter().next().map(|(h, _)| h)
    }
}
