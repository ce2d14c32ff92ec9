//! Streaming TSV reader and writer over gzip files.
//!
//! Neither side ever holds more than one line in memory, so multi-gigabyte
//! snapshots stream through with a constant footprint.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::rc::Rc;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use super::cast::NULL_SENTINEL;
use super::types::{TsvError, TsvResult};

/// Chunk size for [`count_records`].
const MIB: usize = 1024 * 1024;

/// Open a gzip-compressed file for buffered line reading.
///
/// # Errors
///
/// Returns an error if the file cannot be opened.
pub fn open_gz_reader(path: &Path) -> TsvResult<BufReader<GzDecoder<File>>> {
    let file = File::open(path)?;
    Ok(BufReader::with_capacity(MIB, GzDecoder::new(file)))
}

/// Create (or truncate) a gzip-compressed file for writing.
///
/// # Errors
///
/// Returns an error if the file or its parent directory cannot be created.
pub fn create_gz_writer(path: &Path) -> TsvResult<GzEncoder<BufWriter<File>>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    Ok(GzEncoder::new(BufWriter::new(file), Compression::default()))
}

/// Count lines in a stream, reading it in 1 MiB chunks.
///
/// The count includes the header line and a final line without a trailing
/// newline. Lines are never materialised.
///
/// # Errors
///
/// Returns an error if the stream cannot be read.
pub fn count_records<R: Read>(mut stream: R) -> TsvResult<u64> {
    let mut buf = vec![0u8; MIB];
    let mut lines = 0u64;
    let mut last = b'\n';
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        lines += memchr::memchr_iter(b'\n', &buf[..n]).count() as u64;
        last = buf[n - 1];
    }
    if last != b'\n' {
        lines += 1;
    }
    Ok(lines)
}

/// One data line of a TSV file, addressable by header name.
#[derive(Debug, Clone)]
pub struct TsvRow {
    headers: Rc<[String]>,
    values: Vec<Option<String>>,
    line: usize,
}

impl TsvRow {
    /// Value of the named column; `None` for absent values and unknown columns.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|h| h == column)
            .and_then(|i| self.value(i))
    }

    /// Value at a header position.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    /// 1-based line number in the file (the header is line 1).
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// The row re-joined with tabs, absent values as the null sentinel.
    #[must_use]
    pub fn raw(&self) -> String {
        self.values
            .iter()
            .map(|v| v.as_deref().unwrap_or(NULL_SENTINEL))
            .collect::<Vec<_>>()
            .join("\t")
    }
}

/// Lazy reader yielding one [`TsvRow`] per data line.
///
/// The first line is consumed as the header when the reader is created.
/// The reader is single-pass; reopen the file to iterate again.
pub struct TsvReader<R> {
    inner: R,
    headers: Rc<[String]>,
    buf: String,
    line: usize,
}

impl<R: BufRead> TsvReader<R> {
    /// Read the header line and prepare to stream rows.
    ///
    /// # Errors
    ///
    /// Returns `TsvError::EmptyFile` if the stream has no header line.
    pub fn new(mut inner: R, name: &str) -> TsvResult<Self> {
        let mut buf = String::new();
        if inner.read_line(&mut buf)? == 0 {
            return Err(TsvError::EmptyFile(name.to_string()));
        }
        let headers: Rc<[String]> = trim_line(&buf)
            .split('\t')
            .map(|h| h.trim().to_string())
            .collect();
        buf.clear();
        Ok(Self {
            inner,
            headers,
            buf,
            line: 1,
        })
    }

    /// Header names in file order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Position of a header name.
    #[must_use]
    pub fn position(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }
}

impl<R: BufRead> Iterator for TsvReader<R> {
    type Item = TsvResult<TsvRow>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.inner.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line += 1;
            let line = trim_line(&self.buf);
            if line.is_empty() {
                continue;
            }
            let mut values: Vec<Option<String>> = line.split('\t').map(parse_field).collect();
            values.resize(self.headers.len().max(values.len()), None);
            return Some(Ok(TsvRow {
                headers: Rc::clone(&self.headers),
                values,
                line: self.line,
            }));
        }
    }
}

fn trim_line(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

fn parse_field(field: &str) -> Option<String> {
    let field = field.trim();
    if field.is_empty() || field == NULL_SENTINEL {
        None
    } else {
        Some(field.to_string())
    }
}

/// Line writer emitting tab-joined rows.
pub struct TsvWriter<W: Write> {
    inner: W,
    line: String,
}

impl<W: Write> TsvWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            line: String::new(),
        }
    }

    /// Write the header line.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying writer fails.
    pub fn write_header<S: AsRef<str>>(&mut self, columns: &[S]) -> TsvResult<()> {
        self.write_row(columns.iter().map(|c| Some(c.as_ref())))
    }

    /// Write one row; `None` values become the null sentinel.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying writer fails.
    pub fn write_row<I, S>(&mut self, values: I) -> TsvResult<()>
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        self.line.clear();
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                self.line.push('\t');
            }
            match value {
                Some(v) => self.line.push_str(v.as_ref()),
                None => self.line.push_str(NULL_SENTINEL),
            }
        }
        self.line.push('\n');
        self.inner.write_all(self.line.as_bytes())?;
        Ok(())
    }

    /// Flush and hand back the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    pub fn into_inner(mut self) -> TsvResult<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}
