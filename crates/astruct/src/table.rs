//! Length-prefixed tables of records embedded in a larger buffer.

use std::ops::Range;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::{
    errors::TableError,
    layout::{Endian, StructLayout},
    record::{RecordMut, RecordRef},
};

/// The count header in front of the entries. Header words use the byte
/// order of the entry layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableHeader {
    /// One `u32` entry count.
    Single,
    /// A `u32` capacity followed by a `u32` entry count; the two must agree.
    #[default]
    Double,
}

impl TableHeader {
    /// Header size in bytes.
    pub fn size(&self) -> usize {
        match self {
            TableHeader::Single => 4,
            TableHeader::Double => 8,
        }
    }
}

fn read_u32(endian: Endian, bytes: &[u8]) -> u32 {
    match endian {
        Endian::Little => LittleEndian::read_u32(bytes),
        Endian::Big => BigEndian::read_u32(bytes),
    }
}

/// Validates the header at `offset` and returns the byte range of the
/// entries and the entry count.
fn locate(
    layout: &StructLayout,
    buf: &[u8],
    offset: usize,
    header: TableHeader,
) -> Result<(Range<usize>, usize), TableError> {
    if layout.size() == 0 {
        return Err(TableError::ZeroSizedRecord(layout.name().to_string()));
    }

    let available = buf.len().saturating_sub(offset);
    let truncated = |needed| TableError::Truncated {
        offset,
        needed,
        available,
    };
    if available < header.size() {
        return Err(truncated(header.size()));
    }

    let words = &buf[offset..offset + header.size()];
    let count = match header {
        TableHeader::Single => read_u32(layout.endian(), words),
        TableHeader::Double => {
            let capacity = read_u32(layout.endian(), &words[..4]);
            let count = read_u32(layout.endian(), &words[4..]);
            if capacity != count {
                return Err(TableError::CapacityMismatch { capacity, count });
            }
            count
        }
    };

    let count = count as usize;
    let needed = count
        .checked_mul(layout.size())
        .and_then(|entries| entries.checked_add(header.size()))
        .unwrap_or(usize::MAX);
    if available < needed {
        return Err(truncated(needed));
    }

    let start = offset + header.size();
    Ok((start..offset + needed, count))
}

/// A read-only counted table.
#[derive(Debug, Clone, Copy)]
pub struct CountedTable<'a> {
    layout: &'a StructLayout,
    entries: &'a [u8],
    count: usize,
}

impl<'a> CountedTable<'a> {
    pub fn parse(
        layout: &'a StructLayout,
        buf: &'a [u8],
        offset: usize,
        header: TableHeader,
    ) -> Result<Self, TableError> {
        let (range, count) = locate(layout, buf, offset, header)?;
        Ok(CountedTable {
            layout,
            entries: &buf[range],
            count,
        })
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn get(&self, index: usize) -> Option<RecordRef<'a>> {
        let size = self.layout.size();
        let start = index.checked_mul(size)?;
        let bytes = self.entries.get(start..start.checked_add(size)?)?;
        Some(RecordRef::from_exact(self.layout, bytes))
    }

    pub fn iter(&self) -> impl Iterator<Item = RecordRef<'a>> + 'a {
        let layout = self.layout;
        self.entries
            .chunks_exact(layout.size())
            .map(move |bytes| RecordRef::from_exact(layout, bytes))
    }

    /// The first entry matching `predicate`.
    pub fn find(&self, mut predicate: impl FnMut(&RecordRef<'a>) -> bool) -> Option<RecordRef<'a>> {
        self.iter().find(|record| predicate(record))
    }
}

/// A counted table whose entries can be written in place.
#[derive(Debug)]
pub struct CountedTableMut<'a> {
    layout: &'a StructLayout,
    entries: &'a mut [u8],
    count: usize,
}

impl<'a> CountedTableMut<'a> {
    pub fn parse(
        layout: &'a StructLayout,
        buf: &'a mut [u8],
        offset: usize,
        header: TableHeader,
    ) -> Result<Self, TableError> {
        let (range, count) = locate(layout, buf, offset, header)?;
        Ok(CountedTableMut {
            layout,
            entries: &mut buf[range],
            count,
        })
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn as_table(&self) -> CountedTable<'_> {
        CountedTable {
            layout: self.layout,
            entries: &*self.entries,
            count: self.count,
        }
    }

    pub fn get(&self, index: usize) -> Option<RecordRef<'_>> {
        self.as_table().get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<RecordMut<'_>> {
        let size = self.layout.size();
        let start = index.checked_mul(size)?;
        let bytes = self.entries.get_mut(start..start.checked_add(size)?)?;
        Some(RecordMut::from_exact(self.layout, bytes))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = RecordMut<'_>> + '_ {
        let layout = self.layout;
        self.entries
            .chunks_exact_mut(layout.size())
            .map(move |bytes| RecordMut::from_exact(layout, bytes))
    }
}
