//! In-memory packing of the chain values.
//!
//! Every integer is written big endian. Variable length byte strings are
//! prefixed by their length on one byte, which is plenty for hashes and
//! chain work.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("not enough bytes, {0} left but {1} demanded")]
    NotEnoughBytes(usize, usize),
    #[error("{0} bytes left unconsumed")]
    UnconsumedData(usize),
    #[error("invalid structure: {0}")]
    StructureInvalid(String),
    #[error("unknown tag {0}")]
    UnknownTag(u32),
}

/// Growable buffer the values are serialized into.
#[derive(Debug, Default, Clone)]
pub struct WriteBuf(Vec<u8>);

macro_rules! put_be {
    ($($name: ident: $ty: ty),+) => {
        $(
        pub fn $name(&mut self, v: $ty) {
            self.put_bytes(&v.to_be_bytes())
        }
        )+
    };
}

impl WriteBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes)
    }

    put_be! { put_u8: u8, put_u16: u16, put_u32: u32, put_u64: u64 }

    /// one length byte followed by `bytes`
    ///
    /// # Panics
    ///
    /// if `bytes` is longer than 255 bytes
    pub fn put_sized_bytes(&mut self, bytes: &[u8]) {
        assert!(bytes.len() <= u8::MAX as usize);
        self.put_u8(bytes.len() as u8);
        self.put_bytes(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<WriteBuf> for Vec<u8> {
    fn from(buf: WriteBuf) -> Self {
        buf.0
    }
}

impl AsRef<[u8]> for WriteBuf {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Cursor over serialized bytes.
pub struct ReadBuf<'a> {
    data: &'a [u8],
    position: usize,
}

macro_rules! get_be {
    ($($name: ident: $ty: ty),+) => {
        $(
        pub fn $name(&mut self) -> Result<$ty, ReadError> {
            self.get_array().map(<$ty>::from_be_bytes)
        }
        )+
    };
}

impl<'a> ReadBuf<'a> {
    pub fn from(data: &'a [u8]) -> Self {
        ReadBuf { data, position: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn is_end(&self) -> bool {
        self.remaining() == 0
    }

    /// fail if any byte is left to read
    pub fn expect_end(&mut self) -> Result<(), ReadError> {
        match self.remaining() {
            0 => Ok(()),
            left => Err(ReadError::UnconsumedData(left)),
        }
    }

    pub fn get_slice(&mut self, size: usize) -> Result<&'a [u8], ReadError> {
        if self.remaining() < size {
            return Err(ReadError::NotEnoughBytes(self.remaining(), size));
        }
        let slice = &self.data[self.position..self.position + size];
        self.position += size;
        Ok(slice)
    }

    /// a slice written by `WriteBuf::put_sized_bytes`
    pub fn get_sized_slice(&mut self) -> Result<&'a [u8], ReadError> {
        let size = self.get_u8()?;
        self.get_slice(size as usize)
    }

    pub fn get_array<const N: usize>(&mut self) -> Result<[u8; N], ReadError> {
        let mut array = [0; N];
        array.copy_from_slice(self.get_slice(N)?);
        Ok(array)
    }

    get_be! { get_u8: u8, get_u16: u16, get_u32: u32, get_u64: u64 }
}

pub trait Readable: Sized {
    fn read<'a>(buf: &mut ReadBuf<'a>) -> Result<Self, ReadError>;
}

impl Readable for u8 {
    fn read<'a>(buf: &mut ReadBuf<'a>) -> Result<Self, ReadError> {
        buf.get_u8()
    }
}

impl Readable for u32 {
    fn read<'a>(buf: &mut ReadBuf<'a>) -> Result<Self, ReadError> {
        buf.get_u32()
    }
}

impl<const N: usize> Readable for [u8; N] {
    fn read<'a>(buf: &mut ReadBuf<'a>) -> Result<Self, ReadError> {
        buf.get_array()
    }
}
