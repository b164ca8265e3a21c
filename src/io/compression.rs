//! Transparent compression for flow files.
//!
//! Readers detect the codec from the file extension first and fall back to
//! the magic bytes at the head of the stream; writers go by extension only.
//! Each codec sits behind its own cargo feature. With a codec's feature
//! disabled, files using it are read and written as plain bytes.

use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Codecs known to the flow I/O layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Gzip,
    Zstd,
    Bzip2,
    Xz,
}

impl Codec {
    const ALL: [Codec; 4] = [Self::Gzip, Self::Zstd, Self::Bzip2, Self::Xz];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Zstd => "zstd",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
        }
    }

    fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Gzip => &[".gz", ".gzip"],
            Self::Zstd => &[".zst", ".zstd"],
            Self::Bzip2 => &[".bz2", ".bzip2"],
            Self::Xz => &[".xz"],
        }
    }

    fn magic(self) -> &'static [u8] {
        match self {
            Self::Gzip => &[0x1f, 0x8b],
            Self::Zstd => &[0x28, 0xb5, 0x2f, 0xfd],
            Self::Bzip2 => &[0x42, 0x5a, 0x68],
            Self::Xz => &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00],
        }
    }

    fn enabled(self) -> bool {
        match self {
            Self::Gzip => cfg!(feature = "compression-gzip"),
            Self::Zstd => cfg!(feature = "compression-zstd"),
            Self::Bzip2 => cfg!(feature = "compression-bzip2"),
            Self::Xz => cfg!(feature = "compression-xz"),
        }
    }

    /// Codec implied by the file name, if its feature is enabled.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let name = path.as_ref().to_string_lossy().to_lowercase();
        Self::ALL
            .into_iter()
            .filter(|c| c.enabled())
            .find(|c| c.extensions().iter().any(|ext| name.ends_with(ext)))
    }

    fn from_magic(head: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .filter(|c| c.enabled())
            .find(|c| head.starts_with(c.magic()))
    }

    #[allow(unused_variables, unreachable_code)]
    fn wrap_reader(self, reader: Box<dyn Read>) -> io::Result<Box<dyn Read>> {
        Ok(match self {
            #[cfg(feature = "compression-gzip")]
            Self::Gzip => Box::new(flate2::read::MultiGzDecoder::new(reader)),
            #[cfg(feature = "compression-zstd")]
            Self::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
            #[cfg(feature = "compression-bzip2")]
            Self::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(reader)),
            #[cfg(feature = "compression-xz")]
            Self::Xz => Box::new(xz2::read::XzDecoder::new_multi_decoder(reader)),
            #[allow(unreachable_patterns)]
            _ => reader,
        })
    }

    #[allow(unused_variables, unreachable_code)]
    fn wrap_writer(self, writer: Box<dyn Write>) -> io::Result<Box<dyn Write>> {
        Ok(match self {
            #[cfg(feature = "compression-gzip")]
            Self::Gzip => Box::new(flate2::write::GzEncoder::new(
                writer,
                flate2::Compression::default(),
            )),
            #[cfg(feature = "compression-zstd")]
            Self::Zstd => Box::new(zstd::stream::write::Encoder::new(writer, 3)?.auto_finish()),
            #[cfg(feature = "compression-bzip2")]
            Self::Bzip2 => Box::new(bzip2::write::BzEncoder::new(
                writer,
                bzip2::Compression::default(),
            )),
            #[cfg(feature = "compression-xz")]
            Self::Xz => Box::new(xz2::write::XzEncoder::new(writer, 6)),
            #[allow(unreachable_patterns)]
            _ => writer,
        })
    }
}

/// Wrap `reader` with the decompressor implied by `path_hint` or by the
/// stream's magic bytes. Uncompressed input comes back buffered.
pub fn decompressing_reader<R: Read + 'static>(
    reader: R,
    path_hint: impl AsRef<Path>,
) -> io::Result<Box<dyn Read>> {
    if let Some(codec) = Codec::from_path(&path_hint) {
        return codec.wrap_reader(Box::new(reader));
    }
    let mut buffered = BufReader::new(reader);
    let codec = Codec::from_magic(buffered.fill_buf()?);
    match codec {
        Some(codec) => codec.wrap_reader(Box::new(buffered)),
        None => Ok(Box::new(buffered)),
    }
}

/// Wrap `writer` with the compressor implied by `path_hint`, buffered.
pub fn compressing_writer<W: Write + 'static>(
    writer: W,
    path_hint: impl AsRef<Path>,
) -> io::Result<Box<dyn Write>> {
    let buffered: Box<dyn Write> = Box::new(BufWriter::new(writer));
    match Codec::from_path(path_hint) {
        Some(codec) => codec.wrap_writer(buffered),
        None => Ok(buffered),
    }
}
