//! Pixel ↔ working-space transforms.
//!
//! The chosen space is fixed for one compression run and its id is written
//! into the compressed artifact.


use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::VqError;
use crate::vector::Scalar;

/// One 8-bit RGB sample.
pub type Rgb = [u8; 3];

const CIE_SCALE: Scalar = 0.17697;

const CIE_FORWARD: [[Scalar; 3]; 3] = [
    [0.490, 0.310, 0.200],
    [0.17697, 0.81240, 0.01063],
    [0.0, 0.01, 0.99],
];

// Approximate inverse of CIE_FORWARD / CIE_SCALE.
const CIE_INVERSE: [[Scalar; 3]; 3] = [
    [0.418, -0.15866, -0.082835],
    [-0.091169, 0.25243, 0.015708],
    [0.0009209, -0.0025498, 0.17860],
];

// ------------------------------------------------------------------
// 1. Color space tag
// ------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorSpace {
    /// Raw channel values.
    Identity,
    /// `(c + 128) / 255`, better conditioned for the quantizers.
    #[default]
    Scaled,
    /// CIE 1931 style matrix transform; lossy on the way back.
    Cie1931,
}

impl ColorSpace {
    pub const ALL: [ColorSpace; 3] = [Self::Identity, Self::Scaled, Self::Cie1931];

    /// Stable id stored in compressed files.
    #[inline(always)]
    pub fn id(self) -> u8 {
        match self {
            Self::Identity => 0,
            Self::Scaled => 1,
            Self::Cie1931 => 2,
        }
    }

    #[inline]
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|cs| cs.id() == id)
    }

    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Scaled => "scaled",
            Self::Cie1931 => "cie1931",
        }
    }

    /// Pixel → working-space vector.
    #[inline]
    pub fn forward(self, px: Rgb) -> [Scalar; 3] {
        let c = px.map(Scalar::from);
        match self {
            Self::Identity => c,
            Self::Scaled => c.map(|x| (x + 128.0) / 255.0),
            Self::Cie1931 => mat_mul(&CIE_FORWARD, c).map(|x| x / CIE_SCALE),
        }
    }

    /// Working-space vector → pixel, rounded to nearest and clamped to 0..=255.
    #[inline]
    pub fn inverse(self, v: [Scalar; 3]) -> Rgb {
        let c = match self {
            Self::Identity => v,
            Self::Scaled => v.map(|x| x * 255.0 - 128.0),
            Self::Cie1931 => mat_mul(&CIE_INVERSE, v),
        };
        c.map(to_channel)
    }
}

#[inline(always)]
fn mat_mul(m: &[[Scalar; 3]; 3], v: [Scalar; 3]) -> [Scalar; 3] {
    m.map(|row| row[0] * v[0] + row[1] * v[1] + row[2] * v[2])
}

#[inline(always)]
fn to_channel(x: Scalar) -> u8 {
    // `as` saturates, NaN maps to 0
    x.round().clamp(0.0, 255.0) as u8
}

// ------------------------------------------------------------------
// 2. Parsing & display
// ------------------------------------------------------------------
impl FromStr for ColorSpace {
    type Err = VqError;

    /// Accepts the names used in config files or the numeric ids.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "identity" | "normal" | "rgb" => Ok(Self::Identity),
            "1" | "scaled" => Ok(Self::Scaled),
            "2" | "cie1931" | "cie" => Ok(Self::Cie1931),
            other => Err(VqError::InvalidConfig(format!("unknown color space `{other}`"))),
        }
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
