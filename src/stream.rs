//! Byte-stream providers for genotype files
//!
//! Data files are either plain text or BGZF-compressed text. Both are exposed
//! through the [`ByteStream`] trait: a buffered reader with a seekable `u64`
//! position. For plain files the position is a byte offset, for BGZF files it
//! is a virtual offset (compressed block offset << 16 | offset within block).
//! The index stores whichever position the provider reports, so offsets are
//! only meaningful for the provider that produced them.
//!
//! The provider is chosen once when a file is opened by sniffing its first
//! bytes ([`Format::sniff`]), and the set of providers available at runtime is
//! described by a [`Capabilities`] object resolved once and passed around.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use auto_impl::auto_impl;
use log::debug;

use crate::error::{Error, ReadError, Result};

/// Environment variable disabling BGZF support at runtime
pub const DISABLE_BGZF_ENV: &str = "GENOSEEK_DISABLE_BGZF";

/// gzip magic bytes (ID1, ID2, CM=deflate)
const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

/// gzip FLG.FEXTRA bit
const GZIP_FEXTRA: u8 = 1 << 2;

/// Number of leading bytes needed to recognize a BGZF block
const SNIFF_LEN: usize = 18;

/// A buffered, seekable source of record lines
#[auto_impl(&mut, Box)]
pub trait ByteStream: BufRead + Send {
    /// Repositions the stream to a position previously reported by [`ByteStream::position`]
    fn seek_to(&mut self, pos: u64) -> io::Result<()>;

    /// Returns the position of the next byte to be read
    fn position(&mut self) -> io::Result<u64>;
}

/// A plain text file
pub struct PlainStream {
    inner: BufReader<File>,
}
impl PlainStream {
    #[must_use]
    pub fn new(file: File) -> Self {
        Self {
            inner: BufReader::new(file),
        }
    }
}
impl Read for PlainStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}
impl BufRead for PlainStream {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }
    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
    }
}
impl ByteStream for PlainStream {
    fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }
    fn position(&mut self) -> io::Result<u64> {
        self.inner.stream_position()
    }
}

/// A BGZF-compressed file addressed by virtual offsets
#[cfg(feature = "bgzf")]
pub struct BgzfStream {
    inner: noodles_bgzf::Reader<File>,
}
#[cfg(feature = "bgzf")]
impl BgzfStream {
    #[must_use]
    pub fn new(file: File) -> Self {
        Self {
            inner: noodles_bgzf::Reader::new(file),
        }
    }
}
#[cfg(feature = "bgzf")]
impl Read for BgzfStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}
#[cfg(feature = "bgzf")]
impl BufRead for BgzfStream {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }
    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
    }
}
#[cfg(feature = "bgzf")]
impl ByteStream for BgzfStream {
    fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        self.inner
            .seek(noodles_bgzf::VirtualPosition::from(pos))
            .map(|_| ())
    }
    fn position(&mut self) -> io::Result<u64> {
        Ok(u64::from(self.inner.virtual_position()))
    }
}

/// The set of optional stream providers available at runtime
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    bgzf: bool,
}
impl Capabilities {
    /// Resolves the available providers from the compiled features and the environment
    #[must_use]
    pub fn detect() -> Self {
        // Check for environment override
        if std::env::var_os(DISABLE_BGZF_ENV).is_some() {
            return Self { bgzf: false };
        }
        Self {
            bgzf: cfg!(feature = "bgzf"),
        }
    }

    /// Only plain text files are readable
    #[must_use]
    pub fn plain_only() -> Self {
        Self { bgzf: false }
    }

    #[must_use]
    pub fn has_bgzf(&self) -> bool {
        self.bgzf
    }
}
impl Default for Capabilities {
    fn default() -> Self {
        Self::detect()
    }
}

/// Container format of a data file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Plain,
    Bgzf,
    /// gzip without the BGZF block structure (not seekable)
    Gzip,
}
impl Format {
    /// Identifies the container format from the leading bytes of a file
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.len() < GZIP_MAGIC.len() || bytes[..3] != GZIP_MAGIC {
            return Self::Plain;
        }
        // BGZF: FEXTRA set, and a `BC` subfield right after XLEN
        let is_bgzf = bytes.len() >= SNIFF_LEN
            && bytes[3] & GZIP_FEXTRA != 0
            && bytes[12] == b'B'
            && bytes[13] == b'C';
        if is_bgzf {
            Self::Bgzf
        } else {
            Self::Gzip
        }
    }

    /// Reads the leading bytes of the file at `path` and identifies its format
    pub fn detect<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut buf = Vec::with_capacity(SNIFF_LEN);
        file.by_ref().take(SNIFF_LEN as u64).read_to_end(&mut buf)?;
        Ok(Self::sniff(&buf))
    }
}

/// Opens the stream provider matching the format of the file at `path`
///
/// Fails with [`Error::MissingCapability`] if the file is BGZF-compressed and the
/// capability is not available.
pub fn open_stream<P: AsRef<Path>>(path: P, caps: Capabilities) -> Result<Box<dyn ByteStream>> {
    let path = path.as_ref();
    let format = Format::detect(path)?;
    debug!("{}: detected {format:?} container", path.display());
    let file = File::open(path)?;
    match format {
        Format::Plain => Ok(Box::new(PlainStream::new(file))),
        Format::Gzip => Err(ReadError::UnsupportedCompression(path.to_path_buf()).into()),
        Format::Bgzf => open_bgzf(file, caps),
    }
}

#[cfg(feature = "bgzf")]
fn open_bgzf(file: File, caps: Capabilities) -> Result<Box<dyn ByteStream>> {
    if !caps.has_bgzf() {
        return Err(Error::MissingCapability("BGZF"));
    }
    Ok(Box::new(BgzfStream::new(file)))
}

#[cfg(not(feature = "bgzf"))]
fn open_bgzf(_file: File, _caps: Capabilities) -> Result<Box<dyn ByteStream>> {
    Err(Error::MissingCapability("BGZF"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn plain_file(content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    // ==================== Format Tests ====================

    #[test]
    fn test_sniff_plain() {
        assert_eq!(Format::sniff(b"1 rs1 100 A G 1 0 0\n"), Format::Plain);
        assert_eq!(Format::sniff(b""), Format::Plain);
        assert_eq!(Format::sniff(&[0x1f]), Format::Plain);
    }

    #[test]
    fn test_sniff_gzip_without_bgzf_block() {
        let header = [0x1f, 0x8b, 0x08, 0x00, 0, 0, 0, 0, 0, 0xff, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(Format::sniff(&header), Format::Gzip);
    }

    #[test]
    fn test_sniff_bgzf() {
        // standard BGZF block header: FEXTRA, XLEN=6, `BC`, SLEN=2, BSIZE
        let header = [
            0x1f, 0x8b, 0x08, 0x04, 0, 0, 0, 0, 0, 0xff, 0x06, 0x00, b'B', b'C', 0x02, 0x00, 0x1b,
            0x00,
        ];
        assert_eq!(Format::sniff(&header), Format::Bgzf);
    }

    // ==================== Capabilities Tests ====================

    #[test]
    fn test_plain_only_capabilities() {
        assert!(!Capabilities::plain_only().has_bgzf());
    }

    // ==================== PlainStream Tests ====================

    #[test]
    fn test_plain_stream_positions() {
        let file = plain_file(b"first line\nsecond\n");
        let mut stream = open_stream(file.path(), Capabilities::plain_only()).unwrap();

        let mut line = String::new();
        assert_eq!(stream.position().unwrap(), 0);
        stream.read_line(&mut line).unwrap();
        assert_eq!(stream.position().unwrap(), 11);

        stream.seek_to(11).unwrap();
        line.clear();
        stream.read_line(&mut line).unwrap();
        assert_eq!(line, "second\n");

        stream.seek_to(0).unwrap();
        line.clear();
        stream.read_line(&mut line).unwrap();
        assert_eq!(line, "first line\n");
    }

    #[test]
    fn test_gzip_is_rejected() {
        let file = plain_file(&[0x1f, 0x8b, 0x08, 0x00, 0, 0, 0, 0, 0, 0xff, 0, 0]);
        let err = open_stream(file.path(), Capabilities::detect())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::ReadError(ReadError::UnsupportedCompression(_))
        ));
    }

    // ==================== BgzfStream Tests ====================

    #[cfg(feature = "bgzf")]
    fn bgzf_file(content: &[u8]) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut writer = noodles_bgzf::Writer::new(file.reopen().unwrap());
        writer.write_all(content).unwrap();
        // dropping the writer flushes the last block and the EOF marker
        drop(writer);
        file
    }

    #[cfg(feature = "bgzf")]
    #[test]
    fn test_bgzf_without_capability() {
        let file = bgzf_file(b"1 rs1 100 A G 1 0 0\n");
        let err = open_stream(file.path(), Capabilities::plain_only())
            .err()
            .unwrap();
        assert!(matches!(err, Error::MissingCapability("BGZF")));
    }

    #[cfg(feature = "bgzf")]
    #[test]
    fn test_bgzf_stream_seek() {
        let file = bgzf_file(b"first line\nsecond\n");
        let caps = Capabilities { bgzf: true };
        let mut stream = open_stream(file.path(), caps).unwrap();

        let mut line = String::new();
        stream.read_line(&mut line).unwrap();
        let second = stream.position().unwrap();

        line.clear();
        stream.read_line(&mut line).unwrap();
        assert_eq!(line, "second\n");

        stream.seek_to(second).unwrap();
        line.clear();
        stream.read_line(&mut line).unwrap();
        assert_eq!(line, "second\n");
    }

    #[cfg(feature = "bgzf")]
    #[test]
    fn test_bgzf_seek_across_blocks() {
        // ~240 KiB of text, several 64 KiB blocks
        let content: String = (0..20_000).map(|i| format!("line{i:07}\n")).collect();
        let file = bgzf_file(content.as_bytes());
        let caps = Capabilities { bgzf: true };
        let mut stream = open_stream(file.path(), caps).unwrap();

        let mut positions = Vec::new();
        let mut line = String::new();
        loop {
            let pos = stream.position().unwrap();
            line.clear();
            if stream.read_line(&mut line).unwrap() == 0 {
                break;
            }
            positions.push(pos);
        }
        assert_eq!(positions.len(), 20_000);
        // compressed block offset of the last line
        assert!(positions[19_999] >> 16 > 0);

        for i in [19_999, 0, 12_345, 5_000, 19_998] {
            stream.seek_to(positions[i]).unwrap();
            line.clear();
            stream.read_line(&mut line).unwrap();
            assert_eq!(line, format!("line{i:07}\n"));
        }
    }
}
