//! Read-only summary of one compression run.

use core::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

const KIB: usize = 1024;
const MIB: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressionReport {
    /// Mean squared error per channel sample, original pixel space.
    pub distortion: f64,
    pub bits_per_pixel: f64,
    pub uncompressed_size: usize,
    pub compressed_size: usize,
    #[serde(rename = "compression_time_secs", serialize_with = "as_secs")]
    pub compression_time: Duration,
}

fn as_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl CompressionReport {
    /// Compressed over uncompressed size.
    #[inline]
    pub fn ratio(&self) -> f64 {
        if self.uncompressed_size == 0 {
            return 0.0;
        }
        self.compressed_size as f64 / self.uncompressed_size as f64
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// `512b`, `2,5Kb`, `3,2Mb`: whole units, then the remainder in the next
/// smaller unit.
pub fn pretty_bytes(bytes: usize) -> String {
    if bytes < KIB {
        format!("{bytes}b")
    } else if bytes < MIB {
        format!("{},{}Kb", bytes / KIB, bytes % KIB)
    } else {
        format!("{},{}Mb", bytes / MIB, (bytes % MIB) / KIB)
    }
}

impl fmt::Display for CompressionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Compression report:")?;
        writeln!(f, "Distortion        = {:.10}", self.distortion)?;
        writeln!(f, "Bits per pixel    = {:.10}", self.bits_per_pixel)?;
        writeln!(f, "Uncompressed size = {}", pretty_bytes(self.uncompressed_size))?;
        writeln!(f, "Compressed size   = {}", pretty_bytes(self.compressed_size))?;
        writeln!(f, "Compression ratio = {:.3}", self.ratio())?;
        write!(f, "Compression time  = {:.3}s", self.compression_time.as_secs_f64())
    }
}
