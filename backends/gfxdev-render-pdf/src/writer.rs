//! Low-level PDF file assembly: numbered objects, streams, xref table

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use gfxdev_core::{ExportError, Result};

/// Deflate `data` for a `/FlateDecode` stream
pub fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| ExportError::EncodingFailed(format!("deflate failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| ExportError::EncodingFailed(format!("deflate failed: {e}")).into())
}

/// Serializes objects in order and remembers where each one starts
#[derive(Debug)]
pub struct PdfWriter {
    out: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    pub fn new() -> Self {
        let mut out = Vec::new();
        // Binary marker line tells transfer tools the file is not text
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            out,
            offsets: Vec::new(),
        }
    }

    /// Number the next object will get
    pub fn next_id(&self) -> usize {
        self.offsets.len() + 1
    }

    /// Write a dictionary (or any other direct value) as the next object
    pub fn object(&mut self, body: &str) -> usize {
        let id = self.begin();
        self.out.extend_from_slice(body.as_bytes());
        self.out.extend_from_slice(b"\nendobj\n");
        id
    }

    /// Write a stream object; `/Length` is added to `dict_entries`
    pub fn stream(&mut self, dict_entries: &str, data: &[u8]) -> usize {
        let id = self.begin();
        let sep = if dict_entries.is_empty() { "" } else { " " };
        let _ = write!(
            self.out,
            "<< {dict_entries}{sep}/Length {} >>\nstream\n",
            data.len()
        );
        self.out.extend_from_slice(data);
        self.out.extend_from_slice(b"\nendstream\nendobj\n");
        id
    }

    fn begin(&mut self) -> usize {
        self.offsets.push(self.out.len());
        let id = self.offsets.len();
        let _ = writeln!(self.out, "{id} 0 obj");
        id
    }

    /// Append the cross-reference table and trailer
    pub fn finish(mut self, root: usize) -> Vec<u8> {
        let xref = self.out.len();
        let _ = write!(
            self.out,
            "xref\n0 {}\n0000000000 65535 f \n",
            self.offsets.len() + 1
        );
        for offset in &self.offsets {
            let _ = writeln!(self.out, "{offset:010} 00000 n ");
        }
        let _ = write!(
            self.out,
            "trailer\n<< /Size {} /Root {root} 0 R >>\nstartxref\n{xref}\n%%EOF\n",
            self.offsets.len() + 1
        );
        self.out
    }
}
