use super::*;
use crate::auditor::Auditor;
use crate::key::BlockIdentifier;
use crate::testing::builders::{BitcoinChainBuilder, VeriBlockChainBuilder};
use quickcheck_macros::quickcheck;

fn blockchain() -> MemoryVeriBlockBlockchain {
    VeriBlockBlockchain::new(
        NetworkParameters::testnet(),
        MemoryBlockStore::new(),
        MemoryBlockStore::new(),
    )
}

/// store a Bitcoin chain of `count` blocks from `start_height`, its tip
/// being the chain head
fn with_bitcoin_chain(
    blockchain: &mut MemoryVeriBlockBlockchain,
    start_height: u32,
    count: usize,
) -> Vec<StoredBitcoinBlock> {
    let blocks = BitcoinChainBuilder::new(start_height).chain(count);
    let store = blockchain.bitcoin_store_mut();
    for block in &blocks {
        store.put(block.clone()).unwrap();
    }
    store.set_chain_head(blocks.last().unwrap()).unwrap();
    blocks
}

fn operations(changes: &[Change]) -> Vec<Operation> {
    changes.iter().map(Change::operation).collect()
}

fn proof_of(blockchain: &MemoryVeriBlockBlockchain, block: &VeriBlockBlock) -> Sha256Hash {
    blockchain
        .get_stored(&block.hash())
        .unwrap()
        .unwrap()
        .block_of_proof
}

fn head_hash(blockchain: &MemoryVeriBlockBlockchain) -> Option<VBlakeHash> {
    blockchain.chain_head().unwrap().map(|head| head.hash())
}

#[test]
fn genesis_becomes_the_chain_head() {
    let mut blockchain = blockchain();
    let mut builder = VeriBlockChainBuilder::new();
    let genesis = builder.next();

    let changes = blockchain.add(genesis.clone()).unwrap();
    assert_eq!(
        operations(&changes),
        vec![Operation::AddBlock, Operation::SetHead]
    );
    assert!(changes[0].old_value().is_empty());
    assert_eq!(head_hash(&blockchain), Some(genesis.hash()));
}

#[test]
fn extending_the_head_moves_it() {
    let mut blockchain = blockchain();
    let mut builder = VeriBlockChainBuilder::new();
    blockchain.add(builder.next()).unwrap();
    let block = builder.next();

    let changes = blockchain.add(block.clone()).unwrap();
    assert_eq!(
        operations(&changes),
        vec![Operation::AddBlock, Operation::SetHead]
    );
    assert_eq!(blockchain.get(&block.hash()).unwrap(), Some(block.clone()));
    assert_eq!(head_hash(&blockchain), Some(block.hash()));

    let stored = blockchain.get_stored(&block.hash()).unwrap().unwrap();
    let genesis = blockchain.get_stored(block.previous_block()).unwrap().unwrap();
    assert_eq!(
        stored.work,
        &genesis.work + decode_compact_bits(block.difficulty()).unwrap()
    );
}

#[test]
fn duplicate_block_is_a_no_op() {
    let mut blockchain = blockchain();
    let mut builder = VeriBlockChainBuilder::new();
    blockchain.add_all(builder.chain(2)).unwrap();
    let size = blockchain.store().len();

    let changes = blockchain.add(builder.at(1).clone()).unwrap();
    assert!(changes.is_empty());
    assert_eq!(blockchain.store().len(), size);
    assert_eq!(head_hash(&blockchain), Some(builder.at(1).hash()));
}

#[test]
fn add_all_sorts_by_height() {
    let mut blockchain = blockchain();
    let mut builder = VeriBlockChainBuilder::new();
    let mut blocks = builder.chain(5);
    blocks.reverse();

    let changes = blockchain.add_all(blocks).unwrap();
    assert_eq!(changes.len(), 10);
    assert_eq!(head_hash(&blockchain), Some(builder.at(4).hash()));
}

#[test]
fn invalid_difficulty_is_rejected() {
    let mut blockchain = blockchain();
    let block = VeriBlockChainBuilder::new()
        .with_difficulty(0x0400_0000)
        .peek();
    assert!(matches!(
        blockchain.add(block),
        Err(Error::Validation(ValidationError::ZeroDifficulty(_)))
    ));
    assert!(blockchain.store().is_empty());
}

#[test]
fn unknown_previous_block_does_not_fit() {
    let mut blockchain = blockchain();
    let mut builder = VeriBlockChainBuilder::new();
    let blocks = builder.chain(5);
    blockchain.add_all(blocks[..3].to_vec()).unwrap();

    match blockchain.add(blocks[4].clone()) {
        Err(Error::Verification(VerificationError::BlockDoesNotFit { block, previous })) => {
            assert_eq!(block, blocks[4].hash());
            assert!(previous.probably_equals(&blocks[3].hash()));
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn unknown_keystone_is_rejected_with_enough_context() {
    let mut blockchain = blockchain();
    let mut builder = VeriBlockChainBuilder::new();
    blockchain.add_all(builder.chain(25)).unwrap();
    let next = builder.peek();
    let block = VeriBlockBlock::new(
        next.height(),
        next.version(),
        *next.previous_block(),
        VBlakeHash::hash(b"unknown keystone"),
        *next.second_previous_keystone(),
        *next.merkle_root(),
        next.timestamp(),
        next.difficulty(),
        next.nonce(),
    )
    .unwrap();

    assert!(matches!(
        blockchain.add(block),
        Err(Error::Verification(
            VerificationError::PreviousKeystoneNotFound { .. }
        ))
    ));
}

#[test]
fn unknown_second_keystone_is_rejected_with_enough_context() {
    let mut blockchain = blockchain();
    let mut builder = VeriBlockChainBuilder::new();
    blockchain.add_all(builder.chain(45)).unwrap();
    let next = builder.peek();
    let block = VeriBlockBlock::new(
        next.height(),
        next.version(),
        *next.previous_block(),
        *next.previous_keystone(),
        VBlakeHash::hash(b"unknown keystone"),
        *next.merkle_root(),
        next.timestamp(),
        next.difficulty(),
        next.nonce(),
    )
    .unwrap();

    assert!(matches!(
        blockchain.add(block),
        Err(Error::Verification(
            VerificationError::SecondPreviousKeystoneNotFound { .. }
        ))
    ));
}

#[test]
fn timestamp_before_the_median_is_rejected() {
    let mut blockchain = blockchain();
    let mut builder = VeriBlockChainBuilder::new();
    blockchain.add_all(builder.chain(25)).unwrap();
    // the 20 blocks before the new one are 5..=24, the median one is 14
    let median = builder.at(14).timestamp();

    let block = builder.peek_with_timestamp(median);
    assert!(matches!(
        blockchain.add(block),
        Err(Error::Verification(VerificationError::TimestampTooOld { .. }))
    ));
    let block = builder.peek_with_timestamp(median + 1);
    assert!(blockchain.add(block).is_ok());
}

#[test]
fn difficulty_must_follow_the_retarget() {
    let mut blockchain = blockchain();
    let mut builder = VeriBlockChainBuilder::new();
    blockchain.add_all(builder.chain(RETARGET_PERIOD)).unwrap();

    let wrong = builder.clone().with_difficulty(0x0406_0000).peek();
    assert!(matches!(
        blockchain.add(wrong),
        Err(Error::Verification(
            VerificationError::UnexpectedDifficulty {
                expected: 0x0405_f5e1,
                found: 0x0406_0000,
            }
        ))
    ));

    let changes = blockchain.add(builder.next()).unwrap();
    assert_eq!(changes.len(), 2);
}

#[test]
fn rewind_restores_the_previous_state() {
    let mut blockchain = blockchain();
    let mut builder = VeriBlockChainBuilder::new();
    let mut journal = Vec::new();
    for block in builder.chain(3) {
        journal.push(blockchain.add(block).unwrap());
    }

    blockchain.rewind(&journal[2]).unwrap();
    assert_eq!(head_hash(&blockchain), Some(builder.at(1).hash()));
    assert_eq!(blockchain.get(&builder.at(2).hash()).unwrap(), None);
    assert_eq!(blockchain.store().len(), 2);

    blockchain.rewind(&journal[1]).unwrap();
    blockchain.rewind(&journal[0]).unwrap();
    assert_eq!(head_hash(&blockchain), None);
    assert!(blockchain.store().is_empty());

    // the chain can be built again from scratch
    let changes = blockchain.add(builder.at(0).clone()).unwrap();
    assert_eq!(
        operations(&changes),
        vec![Operation::AddBlock, Operation::SetHead]
    );
}

#[test]
fn rewind_skips_other_chains() {
    let mut blockchain = blockchain();
    let mut builder = VeriBlockChainBuilder::new();
    blockchain.add(builder.next()).unwrap();
    let bitcoin = BitcoinChainBuilder::new(0).next();
    let change = Change::new(
        ChainIdentifier::Bitcoin,
        Operation::AddBlock,
        Vec::new(),
        chain_core::property::Serialize::serialize_as_vec(&bitcoin),
    );

    blockchain.rewind(&[change]).unwrap();
    assert_eq!(blockchain.store().len(), 1);
}

#[test]
fn competing_block_without_better_proof_stays_aside() {
    let mut blockchain = blockchain();
    let mut builder = VeriBlockChainBuilder::new();
    blockchain.add_all(builder.chain(2)).unwrap();
    let mut fork = builder.fork(1);
    let main = builder.next();
    let other = fork.next();

    blockchain.add(main.clone()).unwrap();
    let changes = blockchain.add(other.clone()).unwrap();
    assert_eq!(operations(&changes), vec![Operation::AddBlock]);
    assert_eq!(head_hash(&blockchain), Some(main.hash()));

    assert_eq!(blockchain.search_best_chain(&main.hash()).unwrap(), Some(main));
    assert_eq!(blockchain.search_best_chain(&other.hash()).unwrap(), None);
    assert!(blockchain
        .search_best_chain(&builder.at(1).hash().trim_to_previous_keystone_size())
        .unwrap()
        .is_some());
    assert_eq!(blockchain.get(&other.hash()).unwrap(), Some(other));
}

#[test]
fn fork_with_unknown_keystones_loses() {
    let mut blockchain = blockchain();
    let mut builder = VeriBlockChainBuilder::new();
    blockchain.add_all(builder.chain(25)).unwrap();
    let head = blockchain.chain_head().unwrap().unwrap();

    let mut stranger = VeriBlockChainBuilder::new().fork(7);
    stranger.chain(44);
    let candidate = stranger.next_stored();
    assert!(!blockchain.resolve_to_fork(&head, &candidate).unwrap());
}

/// Common chain up to height 19, then two competing keystones at 20.
/// The chain whose keystones were endorsed earlier on Bitcoin wins even
/// though it was submitted later.
#[test]
fn earlier_keystone_proofs_win_the_fork() {
    let mut blockchain = blockchain();
    let bitcoin = with_bitcoin_chain(&mut blockchain, 1000, 8);
    let mut builder = VeriBlockChainBuilder::new();
    blockchain.add_all(builder.chain(20)).unwrap();
    let genesis = builder.at(0).clone();
    let mut fork = builder.fork(1);

    let keystone_a = builder.next();
    let keystone_b = fork.next();
    blockchain.add(keystone_a.clone()).unwrap();
    let changes = blockchain.add(keystone_b.clone()).unwrap();
    assert_eq!(operations(&changes), vec![Operation::AddBlock]);
    assert_eq!(head_hash(&blockchain), Some(keystone_a.hash()));

    // endorsed 7 Bitcoin blocks after the competitor
    let block_a = builder.next();
    let changes = blockchain
        .add_with_proof(block_a.clone(), bitcoin[7].hash())
        .unwrap();
    assert_eq!(
        operations(&changes),
        vec![
            Operation::AddBlock,
            Operation::SetProof,
            Operation::SetProof,
            Operation::SetHead
        ]
    );
    assert_eq!(proof_of(&blockchain, &keystone_a), bitcoin[7].hash());
    assert_eq!(proof_of(&blockchain, &genesis), bitcoin[7].hash());

    // scores 100 + 100 against 100 + 40
    let block_b = fork.next();
    let changes = blockchain
        .add_with_proof(block_b.clone(), bitcoin[0].hash())
        .unwrap();
    assert_eq!(
        operations(&changes),
        vec![
            Operation::AddBlock,
            Operation::SetProof,
            Operation::SetProof,
            Operation::SetHead
        ]
    );
    assert_eq!(head_hash(&blockchain), Some(block_b.hash()));
    assert_eq!(proof_of(&blockchain, &keystone_b), bitcoin[0].hash());
    assert_eq!(proof_of(&blockchain, &genesis), bitcoin[0].hash());

    blockchain.rewind(&changes).unwrap();
    assert_eq!(head_hash(&blockchain), Some(block_a.hash()));
    assert_eq!(blockchain.get(&block_b.hash()).unwrap(), None);
    assert_eq!(proof_of(&blockchain, &keystone_b), Sha256Hash::ZERO_HASH);
    assert_eq!(proof_of(&blockchain, &genesis), bitcoin[7].hash());
}

#[test]
fn later_keystone_proofs_lose_the_fork() {
    let mut blockchain = blockchain();
    let bitcoin = with_bitcoin_chain(&mut blockchain, 1000, 8);
    let mut builder = VeriBlockChainBuilder::new();
    blockchain.add_all(builder.chain(20)).unwrap();
    let mut fork = builder.fork(1);

    blockchain.add(builder.next()).unwrap();
    blockchain.add(fork.next()).unwrap();
    let block_a = builder.next();
    blockchain
        .add_with_proof(block_a.clone(), bitcoin[0].hash())
        .unwrap();

    let changes = blockchain
        .add_with_proof(fork.next(), bitcoin[7].hash())
        .unwrap();
    // only the competing keystone gets proven, the common genesis keeps
    // its earlier proof
    assert_eq!(
        operations(&changes),
        vec![Operation::AddBlock, Operation::SetProof]
    );
    assert_eq!(head_hash(&blockchain), Some(block_a.hash()));
}

#[test]
fn set_block_of_proof_keeps_the_earliest() {
    let mut blockchain = blockchain();
    let bitcoin = with_bitcoin_chain(&mut blockchain, 500, 6);
    let mut builder = VeriBlockChainBuilder::new();
    blockchain.add_all(builder.chain(22)).unwrap();
    let block = builder.at(21).clone();

    let changes = blockchain
        .set_block_of_proof(&block, &bitcoin[3].hash())
        .unwrap();
    assert_eq!(
        operations(&changes),
        vec![Operation::SetProof, Operation::SetProof, Operation::SetProof]
    );
    assert_eq!(proof_of(&blockchain, &block), bitcoin[3].hash());
    assert_eq!(proof_of(&blockchain, builder.at(20)), bitcoin[3].hash());
    assert_eq!(proof_of(&blockchain, builder.at(0)), bitcoin[3].hash());

    let later = blockchain
        .set_block_of_proof(&block, &bitcoin[5].hash())
        .unwrap();
    assert!(later.is_empty());

    let unknown = blockchain
        .set_block_of_proof(&block, &Sha256Hash::hash(b"not a bitcoin block"))
        .unwrap();
    assert!(unknown.is_empty());

    let earlier = blockchain
        .set_block_of_proof(&block, &bitcoin[1].hash())
        .unwrap();
    assert_eq!(earlier.len(), 3);
    assert_eq!(proof_of(&blockchain, &block), bitcoin[1].hash());

    blockchain.rewind(&earlier).unwrap();
    assert_eq!(proof_of(&blockchain, &block), bitcoin[3].hash());
    blockchain.rewind(&changes).unwrap();
    assert_eq!(proof_of(&blockchain, &block), Sha256Hash::ZERO_HASH);
}

#[test]
fn zero_proof_changes_nothing() {
    let mut blockchain = blockchain();
    let mut builder = VeriBlockChainBuilder::new();
    blockchain.add_all(builder.chain(3)).unwrap();
    let changes = blockchain
        .set_block_of_proof(builder.at(2), &Sha256Hash::ZERO_HASH)
        .unwrap();
    assert!(changes.is_empty());
}

#[test]
fn temporary_blocks_stay_out_of_the_store() {
    let mut blockchain = blockchain();
    let mut builder = VeriBlockChainBuilder::new();
    blockchain.add_all(builder.chain(5)).unwrap();
    let temporary = builder.chain(2);

    blockchain.add_all_temporarily(temporary.clone()).unwrap();
    assert!(blockchain.has_temporary_modifications());
    assert_eq!(blockchain.store().len(), 5);
    assert_eq!(
        blockchain.get(&temporary[0].hash()).unwrap(),
        Some(temporary[0].clone())
    );
    assert_eq!(head_hash(&blockchain), Some(builder.at(4).hash()));
    assert!(blockchain
        .search_best_chain(&temporary[1].hash())
        .unwrap()
        .is_some());
    assert!(blockchain
        .search_best_chain(&builder.at(2).hash())
        .unwrap()
        .is_some());

    blockchain.clear_temporary_modifications();
    assert!(!blockchain.has_temporary_modifications());
    assert_eq!(blockchain.get(&temporary[0].hash()).unwrap(), None);
    assert_eq!(
        blockchain.search_best_chain(&temporary[1].hash()).unwrap(),
        None
    );
}

#[test]
fn temporary_origin_block() {
    let mut blockchain = blockchain();
    let mut builder = VeriBlockChainBuilder::new();
    let genesis = builder.next();
    let block = builder.next();

    blockchain.add_temporarily(genesis.clone()).unwrap();
    blockchain.add_temporarily(block.clone()).unwrap();
    assert!(blockchain.store().is_empty());
    assert_eq!(
        blockchain.search_best_chain(&genesis.hash()).unwrap(),
        Some(genesis)
    );
    let stored = blockchain.get_stored(&block.hash()).unwrap().unwrap();
    assert_eq!(
        stored.work,
        decode_compact_bits(block.difficulty()).unwrap() * BigUint::from(2u32)
    );
}

#[test]
fn persistent_mutations_are_refused_while_speculating() {
    let mut blockchain = blockchain();
    let mut builder = VeriBlockChainBuilder::new();
    let changes = blockchain.add_all(builder.chain(3)).unwrap();
    blockchain.add_temporarily(builder.next()).unwrap();

    assert!(matches!(
        blockchain.add(builder.next()),
        Err(Error::Precondition(_))
    ));
    assert!(matches!(
        blockchain.add_all(Vec::new()),
        Err(Error::Precondition(_))
    ));
    assert!(matches!(
        blockchain.set_block_of_proof(builder.at(1), &Sha256Hash::hash(b"proof")),
        Err(Error::Precondition(_))
    ));
    assert!(matches!(
        blockchain.rewind(&changes),
        Err(Error::Precondition(_))
    ));

    blockchain.clear_temporary_modifications();
    assert!(blockchain.add(builder.at(3).clone()).is_ok());
}

#[test]
fn temporary_proofs_are_dropped_with_the_overlay() {
    let mut blockchain = blockchain();
    let bitcoin = with_bitcoin_chain(&mut blockchain, 0, 3);
    let mut builder = VeriBlockChainBuilder::new();
    blockchain.add_all(builder.chain(22)).unwrap();
    let block = builder.at(21).clone();

    blockchain
        .set_block_of_proof_temporarily(&block, &bitcoin[1].hash())
        .unwrap();
    assert!(blockchain.has_temporary_modifications());
    assert_eq!(proof_of(&blockchain, &block), bitcoin[1].hash());
    assert_eq!(proof_of(&blockchain, builder.at(20)), bitcoin[1].hash());
    assert_eq!(
        blockchain
            .store()
            .get(&block.hash())
            .unwrap()
            .unwrap()
            .block_of_proof,
        Sha256Hash::ZERO_HASH
    );

    blockchain.clear_temporary_modifications();
    assert_eq!(proof_of(&blockchain, &block), Sha256Hash::ZERO_HASH);
}

#[test]
fn audited_changes_rewind_an_altchain_block() {
    let mut blockchain = blockchain();
    let bitcoin = with_bitcoin_chain(&mut blockchain, 100, 2);
    let mut builder = VeriBlockChainBuilder::new();
    let mut auditor = Auditor::new();
    let first = BlockIdentifier::wrap(b"altchain block 1").unwrap();
    let second = BlockIdentifier::wrap(b"altchain block 2").unwrap();

    auditor.record(first, blockchain.add_all(builder.chain(21)).unwrap());
    let context = builder.chain(2);
    let mut changes = blockchain.add_all(context.clone()).unwrap();
    changes.extend(
        blockchain
            .set_block_of_proof(&context[1], &bitcoin[0].hash())
            .unwrap(),
    );
    auditor.record(second, changes);
    assert_eq!(auditor.changes(&first).len(), 42);
    assert!(auditor.changes(&second)[0].sequence > auditor.changes(&first)[41].sequence);

    let changes = auditor.take(&second);
    blockchain.rewind(&changes).unwrap();
    assert!(!auditor.contains(&second));
    assert_eq!(head_hash(&blockchain), Some(builder.at(20).hash()));
    assert_eq!(proof_of(&blockchain, builder.at(20)), Sha256Hash::ZERO_HASH);
    assert_eq!(blockchain.store().len(), 21);
}

#[quickcheck]
fn chain_work_grows_along_the_chain(length: u8) -> bool {
    let length = usize::from(length % 40) + 1;
    let mut blockchain = blockchain();
    let mut builder = VeriBlockChainBuilder::new();
    blockchain.add_all(builder.chain(length)).unwrap();

    let head = blockchain.chain_head().unwrap().unwrap();
    let chain = blockchain.store().get_chain(&head.hash(), length).unwrap();
    chain.len() == length && chain.windows(2).all(|pair| pair[0].work > pair[1].work)
}
