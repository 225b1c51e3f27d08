use crate::block::{BitcoinBlock, VeriBlockBlock};
use crate::change::{ChainIdentifier, Change, Operation};
use crate::key::{Sha256Hash, VBlakeHash, VeriBlockMerkleRoot, VBLAKE_HASH_LENGTH};
use crate::rewards::{PopEndorsement, PopEndorsements};
use crate::stored::{StoredBitcoinBlock, StoredVeriBlockBlock};
use crate::value::Value;
use num_bigint::BigUint;
use quickcheck::{Arbitrary, Gen};

fn arbitrary_bytes<G: Gen>(g: &mut G, len: usize) -> Vec<u8> {
    (0..len).map(|_| u8::arbitrary(g)).collect()
}

impl Arbitrary for VBlakeHash {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        let len = usize::arbitrary(g) % VBLAKE_HASH_LENGTH + 1;
        VBlakeHash::from_slice(&arbitrary_bytes(g, len)).unwrap()
    }
}

impl Arbitrary for Sha256Hash {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        Sha256Hash::hash(&arbitrary_bytes(g, 8))
    }
}

impl Arbitrary for Value {
    fn arbitrary<G: Gen>(gen: &mut G) -> Self {
        Value(u64::arbitrary(gen))
    }
}

impl Arbitrary for VeriBlockBlock {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        let full_hash = |g: &mut G| VBlakeHash::hash(&arbitrary_bytes(g, 8));
        let mut merkle_root = [0; 16];
        merkle_root.copy_from_slice(&arbitrary_bytes(g, 16));

        VeriBlockBlock::new(
            u32::arbitrary(g),
            u16::arbitrary(g),
            full_hash(g),
            full_hash(g),
            full_hash(g),
            VeriBlockMerkleRoot(merkle_root),
            u32::arbitrary(g),
            u32::arbitrary(g),
            u32::arbitrary(g),
        )
        .unwrap()
    }
}

impl Arbitrary for BitcoinBlock {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        BitcoinBlock::new(
            u32::arbitrary(g),
            Arbitrary::arbitrary(g),
            Arbitrary::arbitrary(g),
            u32::arbitrary(g),
            u32::arbitrary(g),
            u32::arbitrary(g),
        )
    }
}

impl Arbitrary for StoredVeriBlockBlock {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        let block_of_proof = if bool::arbitrary(g) {
            Arbitrary::arbitrary(g)
        } else {
            Sha256Hash::ZERO_HASH
        };
        StoredVeriBlockBlock::new(
            Arbitrary::arbitrary(g),
            BigUint::from(u64::arbitrary(g)) * BigUint::from(u64::arbitrary(g)),
            block_of_proof,
        )
    }
}

impl Arbitrary for StoredBitcoinBlock {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        StoredBitcoinBlock::new(
            Arbitrary::arbitrary(g),
            BigUint::from(u64::arbitrary(g)),
            u32::arbitrary(g),
        )
    }
}

impl Arbitrary for ChainIdentifier {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        if bool::arbitrary(g) {
            ChainIdentifier::VeriBlock
        } else {
            ChainIdentifier::Bitcoin
        }
    }
}

impl Arbitrary for Operation {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        match u8::arbitrary(g) % 3 {
            0 => Operation::AddBlock,
            1 => Operation::SetHead,
            _ => Operation::SetProof,
        }
    }
}

impl Arbitrary for Change {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        Change::new(
            Arbitrary::arbitrary(g),
            Arbitrary::arbitrary(g),
            Arbitrary::arbitrary(g),
            Arbitrary::arbitrary(g),
        )
    }
}

impl Arbitrary for PopEndorsement {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        let miner = format!("V{}", hex::encode(arbitrary_bytes(g, 4)));
        let txid = hex::encode(arbitrary_bytes(g, 32));
        PopEndorsement::new(miner, txid)
    }
}

/// up to a handful of endorsing heights, a few endorsements each
impl Arbitrary for PopEndorsements {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        let lowest = u32::arbitrary(g) % 1_000_000;
        let heights = usize::arbitrary(g) % 8;
        let mut endorsements = PopEndorsements::new();
        for _ in 0..heights {
            let height = lowest + u32::arbitrary(g) % 60;
            let count = usize::arbitrary(g) % 5 + 1;
            for _ in 0..count {
                endorsements.add(height, Arbitrary::arbitrary(g));
            }
        }
        endorsements
    }
}
