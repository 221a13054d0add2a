//! Binary PPM (`P6`, 8-bit) reader and writer.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::RgbImage;
use crate::errors::{Result, VqError};

const MAGIC: &str = "P6";
const MAX_VALUE: usize = 255;

impl RgbImage {
    /// Parses a `P6` stream. Comments (`#` to end of line) are allowed in the
    /// header; the max value must be 255.
    pub fn read_ppm<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;

        let mut cursor = HeaderCursor { buf: &buf, pos: 0 };
        let magic = cursor.token()?;
        if magic != MAGIC.as_bytes() {
            return Err(VqError::format(format!(
                "expected PPM magic `{MAGIC}`, found `{}`",
                String::from_utf8_lossy(magic)
            )));
        }
        let width = cursor.number("width")?;
        let height = cursor.number("height")?;
        let max_value = cursor.number("max value")?;
        if max_value != MAX_VALUE {
            return Err(VqError::format(format!(
                "only 8-bit PPM is supported, max value is {max_value}"
            )));
        }
        // exactly one whitespace byte separates the header from the samples
        cursor.pos += 1;

        let needed = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(3))
            .ok_or_else(|| VqError::format("PPM dimensions overflow"))?;
        let end = cursor
            .pos
            .checked_add(needed)
            .ok_or_else(|| VqError::format("PPM dimensions overflow"))?;
        let data = buf.get(cursor.pos..end).ok_or_else(|| {
            VqError::format(format!(
                "PPM payload truncated: need {needed} bytes, have {}",
                buf.len().saturating_sub(cursor.pos)
            ))
        })?;

        let pixels = data.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        RgbImage::new(width, height, pixels).map_err(|e| VqError::format(e.to_string()))
    }

    pub fn write_ppm<W: Write>(&self, mut writer: W) -> Result<()> {
        write!(writer, "{MAGIC}\n{} {}\n{MAX_VALUE}\n", self.width, self.height)?;
        let bytes: Vec<u8> = self.pixels.iter().flatten().copied().collect();
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    pub fn open_ppm(path: impl AsRef<Path>) -> Result<Self> {
        Self::read_ppm(BufReader::new(File::open(path)?))
    }

    pub fn save_ppm(&self, path: impl AsRef<Path>) -> Result<()> {
        self.write_ppm(BufWriter::new(File::create(path)?))
    }
}

struct HeaderCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> HeaderCursor<'a> {
    fn skip_blank(&mut self) {
        while let Some(&b) = self.buf.get(self.pos) {
            if b == b'#' {
                while self.buf.get(self.pos).is_some_and(|&c| c != b'\n') {
                    self.pos += 1;
                }
            } else if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn token(&mut self) -> Result<&'a [u8]> {
        self.skip_blank();
        let start = self.pos;
        while self.buf.get(self.pos).is_some_and(|b| !b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(VqError::format("PPM header ended early"));
        }
        Ok(&self.buf[start..self.pos])
    }

    fn number(&mut self, what: &str) -> Result<usize> {
        let tok = self.token()?;
        std::str::from_utf8(tok)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| VqError::format(format!("PPM {what} is not a number")))
    }
}
