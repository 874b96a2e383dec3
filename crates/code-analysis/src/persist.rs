//! Save and load page annotation.
//!
//! Layout, little endian:
//!
//! ```text
//! "CADB" | version: u16 | page_count: u32
//! per page: name_len: u16 | name | body_len: u32 | body (JSON)
//! ```
//!
//! Pages are written in the order the caller gives. Loading checks the
//! count and each page name against the caller's order, decodes every page
//! and only then touches the store, so a bad buffer changes nothing.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::item::{CodeEntry, CommentBlock, DataInfo, Label};
use crate::page::{PAGE_SIZE, Page, PageId};
use crate::state::CodeAnalysisState;

pub const MAGIC: &[u8; 4] = b"CADB";
pub const VERSION: u16 = 1;

/// Sparse JSON form of a page. Default data records are left out.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PageBody {
    labels: Vec<(u16, Label)>,
    code: Vec<(u16, CodeEntry)>,
    data: Vec<(u16, DataInfo)>,
    comments: Vec<(u16, CommentBlock)>,
    last_writer: Vec<u16>,
}

impl PageBody {
    fn of(page: &Page) -> Self {
        let default_data = DataInfo::default();
        let offsets = 0..PAGE_SIZE as u16;
        Self {
            labels: page.labels().map(|(o, l)| (o as u16, l.clone())).collect(),
            code: offsets
                .clone()
                .filter_map(|o| page.code_entry(o as usize).map(|c| (o, c.clone())))
                .collect(),
            data: offsets
                .clone()
                .filter(|&o| *page.data(o as usize) != default_data)
                .map(|o| (o, page.data(o as usize).clone()))
                .collect(),
            comments: offsets
                .filter_map(|o| page.comment_block(o as usize).map(|c| (o, c.clone())))
                .collect(),
            last_writer: page.last_writer.clone(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.last_writer.len() != PAGE_SIZE {
            return Err(AnalysisError::Truncated("last writer table"));
        }
        let offsets = self
            .labels
            .iter()
            .map(|(o, _)| *o)
            .chain(self.code.iter().map(|(o, _)| *o))
            .chain(self.data.iter().map(|(o, _)| *o))
            .chain(self.comments.iter().map(|(o, _)| *o));
        for offset in offsets {
            if usize::from(offset) >= PAGE_SIZE {
                return Err(AnalysisError::OffsetOutOfRange(offset));
            }
        }
        Ok(())
    }

    fn apply(self, page: &mut Page) {
        page.reset();
        for (offset, label) in self.labels {
            page.labels[usize::from(offset)] = Some(label);
        }
        for (offset, code) in self.code {
            page.code[usize::from(offset)] = Some(code);
        }
        for (offset, data) in self.data {
            page.data[usize::from(offset)] = data;
        }
        for (offset, block) in self.comments {
            page.comments[usize::from(offset)] = Some(block);
        }
        page.last_writer = self.last_writer;
    }
}

/// Cursor over a byte buffer that reports what it was reading when it ran
/// out.
struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8]> {
        if self.bytes.len() < len {
            return Err(AnalysisError::Truncated(what));
        }
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        Ok(head)
    }

    fn u16(&mut self, what: &'static str) -> Result<u16> {
        let b = self.take(2, what)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self, what: &'static str) -> Result<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

impl Page {
    /// Append this page's body, length-prefixed.
    pub fn write_to_buffer(&self, out: &mut Vec<u8>) -> Result<()> {
        let body = serde_json::to_vec(&PageBody::of(self))?;
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(&body);
        Ok(())
    }

    /// Replace this page's annotation with a body written by
    /// `write_to_buffer`. Returns the bytes consumed. On error the page is
    /// unchanged.
    pub fn read_from_buffer(&mut self, bytes: &[u8]) -> Result<usize> {
        let mut reader = Reader { bytes };
        let body = read_body(&mut reader)?;
        body.apply(self);
        Ok(bytes.len() - reader.bytes.len())
    }
}

fn read_body(reader: &mut Reader<'_>) -> Result<PageBody> {
    let len = reader.u32("page body length")? as usize;
    let body: PageBody = serde_json::from_slice(reader.take(len, "page body")?)?;
    body.validate()?;
    Ok(body)
}

impl CodeAnalysisState {
    /// Serialize the given pages in order.
    pub fn write_pages(&self, ids: &[PageId]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&(ids.len() as u32).to_le_bytes());
        for &id in ids {
            let name = self.page_name(id).unwrap_or_default();
            out.extend_from_slice(&(name.len() as u16).to_le_bytes());
            out.extend_from_slice(name.as_bytes());
            match self.page(id) {
                Some(page) => page.write_to_buffer(&mut out)?,
                None => Page::new(0).write_to_buffer(&mut out)?,
            }
        }
        Ok(out)
    }

    /// Load pages written by `write_pages` with the same page order.
    ///
    /// On success label names are rebuilt and the store is dirty. On error
    /// nothing changes.
    pub fn read_pages(&mut self, ids: &[PageId], bytes: &[u8]) -> Result<()> {
        let mut reader = Reader { bytes };
        if reader.take(4, "magic")? != MAGIC {
            return Err(AnalysisError::BadMagic);
        }
        let version = reader.u16("version")?;
        if version != VERSION {
            return Err(AnalysisError::UnsupportedVersion(version));
        }
        let count = reader.u32("page count")? as usize;
        if count != ids.len() {
            return Err(AnalysisError::PageCountMismatch {
                expected: ids.len(),
                found: count,
            });
        }

        let mut bodies = Vec::with_capacity(count);
        for (index, &id) in ids.iter().enumerate() {
            let name_len = usize::from(reader.u16("page name length")?);
            let name = std::str::from_utf8(reader.take(name_len, "page name")?)
                .map_err(|_| AnalysisError::InvalidName)?;
            let expected = self.page_name(id).unwrap_or_default();
            if name != expected {
                return Err(AnalysisError::PageNameMismatch {
                    index,
                    expected: expected.to_string(),
                    found: name.to_string(),
                });
            }
            bodies.push((id, read_body(&mut reader)?));
        }

        for (id, body) in bodies {
            if let Some(page) = self.page_mut(id) {
                body.apply(page);
            }
        }
        self.rebuild_label_names();
        self.generate_global_info();
        self.set_dirty();
        debug!("loaded {count} analysis pages");
        Ok(())
    }
}
