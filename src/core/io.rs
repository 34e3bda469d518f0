//! I/O abstraction layer
//!
//! Opens MAF files as seekable line sources. Plain files are read through a
//! buffer or a memory map; gzip and bzip2 files are decompressed up front so
//! the source can still be rewound for validation.

use memmap2::Mmap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

/// Default buffer size for BufReader (128KB)
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// Threshold for using memory mapping (100MB)
pub const MMAP_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Compression format of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Plain text (uncompressed)
    Plain,
    /// Gzip or bgzip compressed (.gz)
    Gzip,
    /// Bzip2 compressed (.bz2)
    Bzip2,
}

/// Detect compression format from file path and/or content
pub fn detect_compression(path: &Path) -> io::Result<CompressionFormat> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    // First check by extension
    if extension == "gz" {
        return Ok(CompressionFormat::Gzip);
    }
    if extension == "bz2" {
        return Ok(CompressionFormat::Bzip2);
    }

    // Then check by magic bytes
    let mut file = File::open(path)?;
    let mut magic = [0u8; 3];
    let bytes_read = file.read(&mut magic)?;

    if bytes_read >= 2 && magic[0] == 0x1f && magic[1] == 0x8b {
        return Ok(CompressionFormat::Gzip);
    }
    // BZ2 magic: "BZh" (0x42 0x5a 0x68)
    if bytes_read >= 3 && magic[0] == 0x42 && magic[1] == 0x5a && magic[2] == 0x68 {
        return Ok(CompressionFormat::Bzip2);
    }

    Ok(CompressionFormat::Plain)
}

/// Seekable reader over a MAF file, whatever its on-disk encoding
#[derive(Debug)]
pub enum SmartReader {
    /// Buffered reader for plain files below the mapping threshold
    Buffered(BufReader<File>),
    /// Memory-mapped reader for large plain files
    Mapped(MappedReader),
    /// Fully decompressed contents of a gzip/bzip2 file
    Decompressed(Cursor<Vec<u8>>),
}

/// Memory-mapped file reader
#[derive(Debug)]
pub struct MappedReader {
    mmap: Mmap,
    position: usize,
}

impl MappedReader {
    /// Create a new memory-mapped reader
    pub fn new(file: &File) -> io::Result<Self> {
        // SAFETY: We assume the file won't be modified while mapped
        let mmap = unsafe { Mmap::map(file)? };
        Ok(Self { mmap, position: 0 })
    }
}

impl Read for MappedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = &self.mmap[self.position..];
        let to_read = std::cmp::min(buf.len(), remaining.len());
        buf[..to_read].copy_from_slice(&remaining[..to_read]);
        self.position += to_read;
        Ok(to_read)
    }
}

impl BufRead for MappedReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        Ok(&self.mmap[self.position..])
    }

    fn consume(&mut self, amt: usize) {
        self.position = std::cmp::min(self.position + amt, self.mmap.len());
    }
}

impl Seek for MappedReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.mmap.len() as i64;
        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => len + offset,
            SeekFrom::Current(offset) => self.position as i64 + offset,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative position",
            ));
        }
        self.position = std::cmp::min(target, len) as usize;
        Ok(self.position as u64)
    }
}

impl SmartReader {
    /// Open a MAF file, decompressing it if needed
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        match detect_compression(path)? {
            CompressionFormat::Gzip => {
                let mut data = Vec::new();
                flate2::read::MultiGzDecoder::new(File::open(path)?).read_to_end(&mut data)?;
                Ok(SmartReader::Decompressed(Cursor::new(data)))
            }
            CompressionFormat::Bzip2 => {
                let mut data = Vec::new();
                bzip2::read::BzDecoder::new(File::open(path)?).read_to_end(&mut data)?;
                Ok(SmartReader::Decompressed(Cursor::new(data)))
            }
            CompressionFormat::Plain => {
                let file = File::open(path)?;
                if file.metadata()?.len() >= MMAP_THRESHOLD {
                    Ok(SmartReader::Mapped(MappedReader::new(&file)?))
                } else {
                    Ok(SmartReader::Buffered(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file)))
                }
            }
        }
    }

    /// Check if using memory mapping
    pub fn is_mapped(&self) -> bool {
        matches!(self, SmartReader::Mapped(_))
    }
}

impl Read for SmartReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SmartReader::Buffered(reader) => reader.read(buf),
            SmartReader::Mapped(reader) => reader.read(buf),
            SmartReader::Decompressed(reader) => reader.read(buf),
        }
    }
}

impl BufRead for SmartReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            SmartReader::Buffered(reader) => reader.fill_buf(),
            SmartReader::Mapped(reader) => reader.fill_buf(),
            SmartReader::Decompressed(reader) => reader.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            SmartReader::Buffered(reader) => reader.consume(amt),
            SmartReader::Mapped(reader) => reader.consume(amt),
            SmartReader::Decompressed(reader) => reader.consume(amt),
        }
    }
}

impl Seek for SmartReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            SmartReader::Buffered(reader) => reader.seek(pos),
            SmartReader::Mapped(reader) => reader.seek(pos),
            SmartReader::Decompressed(reader) => reader.seek(pos),
        }
    }
}

/// Line iterator that reuses a buffer to avoid allocations
#[derive(Debug)]
pub struct LineIterator<R: BufRead> {
    reader: R,
    buffer: String,
    line_number: usize,
    line_ending: &'static str,
}

impl<R: BufRead> LineIterator<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: String::with_capacity(1024),
            line_number: 0,
            line_ending: "",
        }
    }

    /// Read the next line into the internal buffer
    /// Returns None at EOF, Some(Ok(&str)) on success, Some(Err) on error
    pub fn next_line(&mut self) -> Option<io::Result<&str>> {
        self.buffer.clear();
        self.line_ending = "";
        match self.reader.read_line(&mut self.buffer) {
            Ok(0) => None, // EOF
            Ok(_) => {
                self.line_number += 1;
                // Remove trailing newline
                if self.buffer.ends_with('\n') {
                    self.buffer.pop();
                    self.line_ending = "\n";
                    if self.buffer.ends_with('\r') {
                        self.buffer.pop();
                        self.line_ending = "\r\n";
                    }
                }
                Some(Ok(&self.buffer))
            }
            Err(e) => Some(Err(e)),
        }
    }

    /// 1-based number of the line last returned by `next_line` (0 before any read)
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Terminator stripped from the last line: `"\n"`, `"\r\n"`, or `""` at EOF
    pub fn line_ending(&self) -> &'static str {
        self.line_ending
    }
}

impl<R: BufRead + Seek> LineIterator<R> {
    /// Move back to the first byte of the source
    pub fn rewind(&mut self) -> io::Result<()> {
        self.reader.seek(SeekFrom::Start(0))?;
        self.buffer.clear();
        self.line_number = 0;
        self.line_ending = "";
        Ok(())
    }
}
