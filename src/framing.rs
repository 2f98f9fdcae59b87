//! Tape block framing.
//!
//! A tape file is a sequence of variable length blocks, each framed by a 4 byte
//! little-endian length header before the block and an identical footer after it.
//!
//! * The header's most significant bit marks a block as corrupt. The remaining bits
//!   are still the block length.
//! * A header with a zero length, ignoring the corrupt bit, is re-read once. Two
//!   consecutive zero length headers mark the end of the data, as does a header that
//!   cannot be fully read.
//! * A footer that does not match its header is reported but otherwise ignored.
//! * A block shorter than its header indicates a truncated file and also ends the
//!   data.
use std::io::{ErrorKind, Read};

use tracing::{debug, trace, warn};

use crate::Result;

const CORRUPT_BIT: u32 = 0x8000_0000;
const LENGTH_MASK: u32 = 0x7fff_ffff;
/// Largest buffer reserved for a block before its data is read.
const MAX_PREALLOC: usize = 1 << 20;

/// A decoded block length header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Raw header value.
    pub raw: u32,
    /// Number of block bytes following the header.
    pub length: usize,
    /// Set if the header marks the block as corrupt.
    pub corrupt: bool,
}

impl Header {
    #[must_use]
    pub fn new(raw: u32) -> Self {
        Header {
            raw,
            length: (raw & LENGTH_MASK) as usize,
            corrupt: raw & CORRUPT_BIT != 0,
        }
    }
}

/// A block read from a tape stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub data: Vec<u8>,
    /// The header marked this block as corrupt.
    pub corrupt: bool,
    /// The footer length agreed with the header length.
    pub footer_matches: bool,
    /// Stream offset of the first data byte.
    pub offset: usize,
}

/// Reads framed blocks from a tape byte stream.
pub struct FrameScanner<R>
where
    R: Read,
{
    reader: R,
    offset: usize,
    done: bool,
}

impl<R> FrameScanner<R>
where
    R: Read,
{
    pub fn new(reader: R) -> Self {
        FrameScanner {
            reader,
            offset: 0,
            done: false,
        }
    }

    /// Number of bytes consumed from the stream.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Read up to 4 bytes as a little-endian u32, returning `Ok(None)` if fewer than 4
    /// bytes were available.
    fn read_u32(&mut self) -> Result<Option<u32>> {
        let mut buf = [0u8; 4];
        match self.reader.read_exact(&mut buf) {
            Ok(()) => {
                self.offset += buf.len();
                Ok(Some(u32::from_le_bytes(buf)))
            }
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Read the next block length header, returning `Ok(None)` at the end of the data.
    ///
    /// # Errors
    /// Any I/O error other than [ErrorKind::UnexpectedEof].
    pub fn header(&mut self) -> Result<Option<Header>> {
        let Some(raw) = self.read_u32()? else {
            trace!(offset = self.offset, "short header read, end of stream");
            return Ok(None);
        };
        let mut header = Header::new(raw);
        if header.length == 0 {
            header = match self.read_u32()?.map(Header::new) {
                Some(header) if header.length != 0 => header,
                _ => {
                    trace!(offset = self.offset, "double zero header, end of stream");
                    return Ok(None);
                }
            };
        }
        Ok(Some(header))
    }

    /// Read the block described by `header` and its footer. Returns `Ok(None)` if the
    /// stream ends before the block is complete.
    ///
    /// # Errors
    /// Any I/O error other than [ErrorKind::UnexpectedEof].
    pub fn block(&mut self, header: &Header) -> Result<Option<Block>> {
        let offset = self.offset;
        let mut data = Vec::with_capacity(header.length.min(MAX_PREALLOC));
        let num_read = (&mut self.reader)
            .take(header.length as u64)
            .read_to_end(&mut data)?;
        self.offset += num_read;
        if num_read < header.length {
            warn!(
                offset,
                expected = header.length,
                actual = num_read,
                "truncated block, discarding"
            );
            return Ok(None);
        }

        let footer_matches = match self.read_u32()? {
            Some(footer) => {
                let footer = Header::new(footer);
                if footer.length != header.length {
                    warn!(
                        offset,
                        header = header.length,
                        footer = footer.length,
                        "block header and footer do not match"
                    );
                }
                footer.length == header.length
            }
            None => {
                warn!(offset, "block footer missing");
                false
            }
        };

        Ok(Some(Block {
            data,
            corrupt: header.corrupt,
            footer_matches,
            offset,
        }))
    }

    /// Read the next block, returning `Ok(None)` at the end of the data.
    ///
    /// # Errors
    /// Any I/O error other than [ErrorKind::UnexpectedEof].
    pub fn next_block(&mut self) -> Result<Option<Block>> {
        if self.done {
            return Ok(None);
        }
        let block = match self.header()? {
            Some(header) => self.block(&header)?,
            None => None,
        };
        match &block {
            Some(block) => debug!(
                offset = block.offset,
                len = block.data.len(),
                corrupt = block.corrupt,
                "read block"
            ),
            None => self.done = true,
        }
        Ok(block)
    }
}

impl<R> IntoIterator for FrameScanner<R>
where
    R: Read,
{
    type Item = Result<Block>;
    type IntoIter = BlockIter<R>;

    fn into_iter(self) -> Self::IntoIter {
        BlockIter { scanner: self }
    }
}

/// Iterates over the blocks of a [FrameScanner], including corrupt blocks.
///
/// ## Errors
/// The iterator ends at the end of the data. Any other error is passed on, after
/// which the iterator ends.
pub struct BlockIter<R>
where
    R: Read,
{
    scanner: FrameScanner<R>,
}

impl<R> Iterator for BlockIter<R>
where
    R: Read,
{
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.scanner.next_block() {
            Ok(Some(block)) => Some(Ok(block)),
            Ok(None) => None,
            Err(err) => {
                self.scanner.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Creates an iterator over the framed blocks in `reader`.
///
/// For more control over the iteration process see [FrameScanner].
pub fn read_blocks<R>(reader: R) -> impl Iterator<Item = Result<Block>>
where
    R: Read,
{
    FrameScanner::new(reader).into_iter()
}
