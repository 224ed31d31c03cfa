use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::reader::Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    /// Uninterpreted filler, one byte per element.
    Opaque,
}

impl ScalarKind {
    pub const fn width(self) -> usize {
        match self {
            Self::U8 | Self::I8 | Self::Opaque => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: ScalarKind,
    pub count: usize,
}

impl Field {
    pub const fn scalar(name: &'static str, kind: ScalarKind) -> Self {
        Self {
            name,
            kind,
            count: 1,
        }
    }

    pub const fn array(name: &'static str, kind: ScalarKind, count: usize) -> Self {
        Self { name, kind, count }
    }

    pub const fn opaque(name: &'static str, len: usize) -> Self {
        Self {
            name,
            kind: ScalarKind::Opaque,
            count: len,
        }
    }

    pub const fn width(&self) -> usize {
        self.kind.width() * self.count
    }
}

/// Field order, widths and byte order of one on-disk record kind.
#[derive(Debug)]
pub struct RecordLayout {
    pub name: &'static str,
    pub endian: Endian,
    pub fields: &'static [Field],
}

impl RecordLayout {
    pub const fn size(&self) -> usize {
        let mut total = 0;
        let mut i = 0;
        while i < self.fields.len() {
            total += self.fields[i].width();
            i += 1;
        }
        total
    }

    /// Byte offset of `name` from the start of the record.
    pub fn offset_of(&self, name: &str) -> Result<usize> {
        let mut offset = 0;
        for field in self.fields {
            if field.name == name {
                return Ok(offset);
            }
            offset += field.width();
        }
        Err(CoreError::invariant(format!(
            "{} layout has no field named {name}",
            self.name
        )))
    }
}

/// A record kind whose in-memory form is built from its catalog layout.
pub trait Record: Sized {
    const LAYOUT: &'static RecordLayout;

    fn from_fields(fields: &mut FieldCursor<'_>) -> Result<Self>;
}

/// Walks a record's raw bytes field by field, in catalog order.
///
/// Every accessor names the field it expects; a name, kind or count that
/// disagrees with the catalog is reported rather than silently misread.
pub struct FieldCursor<'a> {
    layout: &'static RecordLayout,
    bytes: &'a [u8],
    index: usize,
    pos: usize,
}

impl<'a> FieldCursor<'a> {
    pub fn new(layout: &'static RecordLayout, bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() != layout.size() {
            return Err(CoreError::invariant(format!(
                "{} record needs {} bytes, got {}",
                layout.name,
                layout.size(),
                bytes.len()
            )));
        }
        Ok(Self {
            layout,
            bytes,
            index: 0,
            pos: 0,
        })
    }

    fn next_field(&mut self, name: &str, kind: ScalarKind, count: usize) -> Result<&'a [u8]> {
        let Some(field) = self.layout.fields.get(self.index) else {
            return Err(CoreError::invariant(format!(
                "{} layout ended before field {name}",
                self.layout.name
            )));
        };
        if field.name != name || field.kind != kind || field.count != count {
            return Err(CoreError::invariant(format!(
                "{} layout mismatch at field #{}: catalog has {} {:?}x{}, decoder asked for {name} {kind:?}x{count}",
                self.layout.name, self.index, field.name, field.kind, field.count
            )));
        }

        let width = field.width();
        let bytes = &self.bytes[self.pos..self.pos + width];
        self.index += 1;
        self.pos += width;
        Ok(bytes)
    }

    fn decode<T: Scalar>(&self, bytes: &[u8]) -> T {
        match self.layout.endian {
            Endian::Little => T::from_le(bytes),
            Endian::Big => T::from_be(bytes),
        }
    }

    pub fn scalar<T: Scalar>(&mut self, name: &str) -> Result<T> {
        let bytes = self.next_field(name, T::KIND, 1)?;
        Ok(self.decode(bytes))
    }

    pub fn array<T: Scalar, const N: usize>(&mut self, name: &str) -> Result<[T; N]> {
        let bytes = self.next_field(name, T::KIND, N)?;
        let width = T::KIND.width();
        Ok(std::array::from_fn(|i| {
            self.decode(&bytes[i * width..(i + 1) * width])
        }))
    }

    pub fn opaque<const N: usize>(&mut self, name: &str) -> Result<[u8; N]> {
        let bytes = self.next_field(name, ScalarKind::Opaque, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Ensure every catalog field was consumed.
    pub fn finish(self) -> Result<()> {
        if self.index != self.layout.fields.len() {
            return Err(CoreError::invariant(format!(
                "{} decoder stopped after {} of {} fields",
                self.layout.name,
                self.index,
                self.layout.fields.len()
            )));
        }
        Ok(())
    }
}
