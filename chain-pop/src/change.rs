//! Journal of the mutations applied to the block stores.
//!
//! Every mutating call of the blockchain returns the list of `Change`s it
//! applied. Each change carries the serialized values before and after
//! the mutation so it can be undone by `rewind`.

use crate::stored::StoredVeriBlockBlock;
use chain_core::mempack::{ReadBuf, ReadError, Readable, WriteBuf};
use chain_core::property::{self, Serialize as _};
use std::fmt;

pub const VERIBLOCK_HEADER_MAGIC: [u8; 3] = *b"VBK";
pub const BITCOIN_HEADER_MAGIC: [u8; 3] = *b"BTC";

/// The chain a change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainIdentifier {
    VeriBlock,
    Bitcoin,
}

impl ChainIdentifier {
    pub fn magic(self) -> [u8; 3] {
        match self {
            ChainIdentifier::VeriBlock => VERIBLOCK_HEADER_MAGIC,
            ChainIdentifier::Bitcoin => BITCOIN_HEADER_MAGIC,
        }
    }

    pub fn from_magic(magic: [u8; 3]) -> Option<Self> {
        match magic {
            VERIBLOCK_HEADER_MAGIC => Some(ChainIdentifier::VeriBlock),
            BITCOIN_HEADER_MAGIC => Some(ChainIdentifier::Bitcoin),
            _ => None,
        }
    }
}

impl fmt::Display for ChainIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let magic = self.magic();
        write!(f, "{}", String::from_utf8_lossy(&magic))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    AddBlock,
    SetHead,
    SetProof,
}

impl Operation {
    pub fn as_u8(self) -> u8 {
        match self {
            Operation::AddBlock => 1,
            Operation::SetHead => 2,
            Operation::SetProof => 3,
        }
    }

    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Operation::AddBlock),
            2 => Some(Operation::SetHead),
            3 => Some(Operation::SetProof),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    chain: ChainIdentifier,
    operation: Operation,
    old_value: Vec<u8>,
    new_value: Vec<u8>,
}

impl Change {
    pub fn new(
        chain: ChainIdentifier,
        operation: Operation,
        old_value: Vec<u8>,
        new_value: Vec<u8>,
    ) -> Self {
        Change {
            chain,
            operation,
            old_value,
            new_value,
        }
    }

    /// a block added where nothing was stored before
    pub fn add_veriblock_block(added: &StoredVeriBlockBlock) -> Self {
        Change::new(
            ChainIdentifier::VeriBlock,
            Operation::AddBlock,
            Vec::new(),
            added.serialize_as_vec(),
        )
    }

    pub fn set_veriblock_head(prior: &StoredVeriBlockBlock, head: &StoredVeriBlockBlock) -> Self {
        Change::new(
            ChainIdentifier::VeriBlock,
            Operation::SetHead,
            prior.serialize_as_vec(),
            head.serialize_as_vec(),
        )
    }

    pub fn set_veriblock_proof(
        prior: &StoredVeriBlockBlock,
        proven: &StoredVeriBlockBlock,
    ) -> Self {
        Change::new(
            ChainIdentifier::VeriBlock,
            Operation::SetProof,
            prior.serialize_as_vec(),
            proven.serialize_as_vec(),
        )
    }

    pub fn chain(&self) -> ChainIdentifier {
        self.chain
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// serialized value before the change, empty if there was none
    pub fn old_value(&self) -> &[u8] {
        &self.old_value
    }

    pub fn new_value(&self) -> &[u8] {
        &self.new_value
    }
}

impl property::Serialize for Change {
    fn serialize(&self, buf: &mut WriteBuf) {
        buf.put_bytes(&self.chain.magic());
        buf.put_u8(self.operation.as_u8());
        buf.put_u32(self.old_value.len() as u32);
        buf.put_bytes(&self.old_value);
        buf.put_u32(self.new_value.len() as u32);
        buf.put_bytes(&self.new_value);
    }
}

impl Readable for Change {
    fn read<'a>(buf: &mut ReadBuf<'a>) -> Result<Self, ReadError> {
        let magic = <[u8; 3]>::read(buf)?;
        let chain = ChainIdentifier::from_magic(magic).ok_or_else(|| {
            ReadError::StructureInvalid(format!("unknown chain {}", hex::encode(magic)))
        })?;
        let tag = buf.get_u8()?;
        let operation = Operation::from_u8(tag).ok_or(ReadError::UnknownTag(tag as u32))?;
        let old_len = buf.get_u32()? as usize;
        let old_value = buf.get_slice(old_len)?.to_vec();
        let new_len = buf.get_u32()? as usize;
        let new_value = buf.get_slice(new_len)?.to_vec();
        Ok(Change::new(chain, operation, old_value, new_value))
    }
}
