//! Pipeline scenarios and persisted-format validation.

use super::*;
use crate::color::{ColorSpace, Rgb};
use crate::config::CompressionConfig;
use crate::errors::VqErrorCode;
use crate::image::RgbImage;
use crate::quantizer::{CancelToken, QuantizerKind};

const PALETTE: [Rgb; 4] = [[10, 20, 30], [60, 90, 120], [120, 150, 200], [200, 220, 250]];

fn config(kind: QuantizerKind, color: ColorSpace, block: (usize, usize), bits: u32) -> CompressionConfig {
    CompressionConfig::builder()
        .quantizer(kind)
        .color_space(color)
        .block_size(block.0, block.1)
        .bits(bits)
        .build()
        .unwrap()
}

fn four_color_image() -> RgbImage {
    RgbImage::from_fn(8, 8, |x, y| PALETTE[(x + y * 8) % 4]).unwrap()
}

fn gradient(width: usize, height: usize) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        [(x * 37 % 256) as u8, (y * 53 % 256) as u8, ((x + y) * 19 % 256) as u8]
    })
    .unwrap()
}

/// Header `1 0 2 2 1 1 1`: two 1x1 codewords, a 2x1 image.
fn valid_bytes() -> Vec<u8> {
    let mut bytes = b"1 0 2 2 1 1 1\n".to_vec();
    bytes.extend_from_slice(&[1, 2, 3, 4, 5, 6]);
    bytes.extend_from_slice(&[0, 1]);
    bytes
}

// ------------------------------------------------------------------
// Scenarios
// ------------------------------------------------------------------

#[test]
fn single_codeword_decodes_to_mean_color() {
    let image = RgbImage::from_fn(4, 4, |x, y| {
        [(x * 10 + y) as u8, (50 + y * 20) as u8, (200 - x * 30) as u8]
    })
    .unwrap();
    let mut mean = [0f64; 3];
    for px in image.pixels() {
        for c in 0..3 {
            mean[c] += f64::from(px[c]) / 16.0;
        }
    }

    let cfg = config(QuantizerKind::Lbg, ColorSpace::Identity, (1, 1), 0);
    let (compressed, _) = compress(&image, &cfg).unwrap();
    assert_eq!(compressed.codebook().len(), 1);
    let decoded = decompress(&compressed).unwrap();
    for px in decoded.pixels() {
        for c in 0..3 {
            assert!((f64::from(px[c]) - mean[c]).abs() <= 0.5 + 1e-3, "{px:?} vs {mean:?}");
        }
    }
}

#[test]
fn enough_codewords_is_lossless() {
    let image = four_color_image();
    for kind in [QuantizerKind::MedianCut, QuantizerKind::LbgMedianCut] {
        for color in [ColorSpace::Identity, ColorSpace::Scaled] {
            let (compressed, report) = compress(&image, &config(kind, color, (1, 1), 2)).unwrap();
            assert_eq!(decompress(&compressed).unwrap(), image, "{kind} / {color}");
            assert_eq!(report.distortion, 0.0);
        }
    }
}

#[test]
fn lbg_is_lossless_on_two_colors() {
    let image = RgbImage::from_fn(4, 4, |x, y| PALETTE[3 * ((x + y) % 2)]).unwrap();
    for bits in [1, 3] {
        let (compressed, report) =
            compress(&image, &config(QuantizerKind::Lbg, ColorSpace::Identity, (1, 1), bits)).unwrap();
        assert_eq!(compressed.codebook().len(), 1 << bits);
        assert_eq!(decompress(&compressed).unwrap(), image);
        assert_eq!(report.distortion, 0.0);
    }
}

#[test]
fn cie_round_trip_stays_close() {
    let image = four_color_image();
    let cfg = config(QuantizerKind::MedianCut, ColorSpace::Cie1931, (1, 1), 2);
    let (_, report) = compress(&image, &cfg).unwrap();
    assert!(report.distortion <= 1.0, "distortion {}", report.distortion);
}

#[test]
fn partial_edge_blocks_keep_image_shape() {
    let image = gradient(7, 5);
    let cfg = config(QuantizerKind::LbgMedianCut, ColorSpace::Scaled, (3, 2), 3);
    let (compressed, _) = compress(&image, &cfg).unwrap();
    assert_eq!(compressed.assignment().len(), 3 * 3);
    let decoded = decompress(&compressed).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (7, 5));
}

#[test]
fn report_matches_artifact() {
    let image = gradient(16, 16);
    let (compressed, report) =
        compress(&image, &config(QuantizerKind::Lbg, ColorSpace::Scaled, (2, 2), 4)).unwrap();
    assert_eq!(report.uncompressed_size, 16 * 16 * 3);
    assert_eq!(report.compressed_size, compressed.size_in_bytes());
    assert_eq!(report.bits_per_pixel, compressed.size_in_bits() as f64 / 256.0);
    let decoded = decompress(&compressed).unwrap();
    assert_eq!(report.distortion, image.mse(&decoded).unwrap());
}

#[test]
fn invalid_or_cancelled_runs_fail() {
    let image = gradient(8, 8);
    let mut cfg = CompressionConfig::default();
    cfg.block_width = 0;
    assert_eq!(compress(&image, &cfg).unwrap_err().code(), VqErrorCode::InvalidConfig);

    let token = CancelToken::new();
    token.cancel();
    let cfg = CompressionConfig::builder().bits(2).cancel(token).build().unwrap();
    assert_eq!(compress(&image, &cfg).unwrap_err().code(), VqErrorCode::Cancelled);
}

#[test]
fn single_block_image_is_a_precondition_error() {
    let image = gradient(2, 2);
    let cfg = config(QuantizerKind::Lbg, ColorSpace::Identity, (2, 2), 1);
    assert_eq!(compress(&image, &cfg).unwrap_err().code(), VqErrorCode::Precondition);
}

// ------------------------------------------------------------------
// Size accounting
// ------------------------------------------------------------------

#[test]
fn bits_for_rounds_up() {
    assert_eq!(bits_for(1), 0);
    assert_eq!(bits_for(2), 1);
    assert_eq!(bits_for(3), 2);
    assert_eq!(bits_for(4), 2);
    assert_eq!(bits_for(5), 3);
    assert_eq!(bits_for(1024), 10);
}

#[test]
fn size_formula_aligns_to_bytes() {
    let codebook = vec![vec![0u8; 12]; 4];
    let img = CompressedImage::new(ColorSpace::Identity, 6, 6, (2, 2), codebook, vec![0; 9]).unwrap();
    // 2 bits * 9 indices + 2*2 pixels * 4 codewords * 24 bits = 402
    assert_eq!(img.size_in_bits(), 408);
    assert_eq!(img.size_in_bytes(), 51);
}

#[test]
fn constructor_checks_consistency() {
    let cb = || vec![vec![0u8; 3]; 2];
    let code = |r: crate::Result<CompressedImage>| r.unwrap_err().code();
    assert_eq!(
        code(CompressedImage::new(ColorSpace::Identity, 2, 1, (1, 1), cb(), vec![0])),
        VqErrorCode::Precondition
    );
    assert_eq!(
        code(CompressedImage::new(ColorSpace::Identity, 2, 1, (1, 1), cb(), vec![0, 2])),
        VqErrorCode::Precondition
    );
    assert_eq!(
        code(CompressedImage::new(ColorSpace::Identity, 2, 1, (1, 1), vec![vec![0u8; 4]], vec![0, 0])),
        VqErrorCode::Precondition
    );
    assert_eq!(
        code(CompressedImage::new(ColorSpace::Identity, 2, 1, (1, 1), Vec::new(), vec![0, 0])),
        VqErrorCode::Precondition
    );
}

// ------------------------------------------------------------------
// Persisted format
// ------------------------------------------------------------------

#[test]
fn persisted_round_trip_decodes_identically() {
    let image = gradient(6, 5);
    let cfg = config(QuantizerKind::LbgMedianCut, ColorSpace::Scaled, (2, 2), 3);
    let (compressed, _) = compress(&image, &cfg).unwrap();

    let mut buf = Vec::new();
    compressed.write_to(&mut buf).unwrap();
    let loaded = CompressedImage::read_from(buf.as_slice()).unwrap();

    assert_eq!(loaded.color_space(), ColorSpace::Scaled);
    assert_eq!(loaded.assignment(), compressed.assignment());
    assert_eq!(decompress(&loaded).unwrap(), decompress(&compressed).unwrap());
}

#[test]
fn short_codebook_is_padded_on_disk() {
    let image = RgbImage::new(3, 1, vec![[1, 2, 3], [40, 50, 60], [200, 100, 0]]).unwrap();
    let cfg = config(QuantizerKind::MedianCut, ColorSpace::Identity, (1, 1), 2);
    let (compressed, _) = compress(&image, &cfg).unwrap();
    assert_eq!(compressed.codebook().len(), 3);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("three.quant");
    compressed.save(&path).unwrap();
    let loaded = CompressedImage::load(&path).unwrap();
    assert_eq!(loaded.codebook().len(), 4);
    assert_eq!(loaded.codebook()[3], vec![0, 0, 0]);
    assert_eq!(decompress(&loaded).unwrap(), image);
}

#[test]
fn hand_written_artifact_decodes() {
    let loaded = CompressedImage::read_from(valid_bytes().as_slice()).unwrap();
    let image = decompress(&loaded).unwrap();
    assert_eq!(image.pixels(), &[[1, 2, 3], [4, 5, 6]]);

    let mut out = Vec::new();
    loaded.write_to(&mut out).unwrap();
    assert_eq!(out, valid_bytes());
}

#[test]
fn malformed_artifacts_are_rejected() {
    let body = |header: &[u8], tail: &[u8]| {
        let mut v = header.to_vec();
        v.extend_from_slice(tail);
        v
    };
    let cases: Vec<(&str, Vec<u8>)> = vec![
        ("empty", Vec::new()),
        ("no newline", vec![b'1'; 300]),
        ("six fields", body(b"1 0 2 2 1 1\n", &[1, 2, 3, 4, 5, 6, 0, 1])),
        ("not a number", body(b"1 0 two 2 1 1 1\n", &[1, 2, 3, 4, 5, 6, 0, 1])),
        ("unknown color space", body(b"1 9 2 2 1 1 1\n", &[1, 2, 3, 4, 5, 6, 0, 1])),
        ("count mismatch", body(b"1 0 3 2 1 1 1\n", &[1, 2, 3, 4, 5, 6, 0, 1, 1])),
        ("zero width", body(b"1 0 2 0 1 1 1\n", &[1, 2, 3, 4, 5, 6, 0, 1])),
        ("truncated codebook", body(b"1 0 2 2 1 1 1\n", &[1, 2, 3, 4])),
        ("truncated indices", body(b"1 0 2 2 1 1 1\n", &[1, 2, 3, 4, 5, 6, 0])),
        ("index out of range", body(b"1 0 2 2 1 1 1\n", &[1, 2, 3, 4, 5, 6, 0, 2])),
    ];
    for (name, bytes) in cases {
        let err = CompressedImage::read_from(bytes.as_slice()).unwrap_err();
        assert_eq!(err.code(), VqErrorCode::UnsupportedFormat, "{name}: {err}");
    }
}

#[test]
fn oversized_headers_are_rejected_before_allocating() {
    let cases: [(&str, &[u8]); 5] = [
        ("image area overflows", b"0 0 1 8589934592 8589934592 1 1\n\0\0\0"),
        ("block size overflows", b"0 0 1 1 1 4294967296 4294967296\n"),
        ("block dim overflows", b"0 0 1 1 1 18446744073709551615 1\n"),
        ("raster above the limit", b"0 0 1000000000000 1000000000000 1 1 1\n\0\0\0"),
        ("huge block, short payload", b"0 0 1 1 1 100000 100000\n\0\0\0"),
    ];
    for (name, bytes) in cases {
        let err = CompressedImage::read_from(bytes).unwrap_err();
        assert_eq!(err.code(), VqErrorCode::UnsupportedFormat, "{name}: {err}");
    }
}

#[test]
fn largest_announced_raster_is_still_bounded() {
    let side = 1usize << 14;
    assert_eq!(side * side, format::MAX_PIXELS);
    let header = format!("0 0 1 {} 1 1 1\n", format::MAX_PIXELS + 1);
    let err = CompressedImage::read_from(header.as_bytes()).unwrap_err();
    assert_eq!(err.code(), VqErrorCode::UnsupportedFormat);
}

#[test]
fn constructor_rejects_overflowing_blocks() {
    let err = CompressedImage::new(ColorSpace::Identity, 1, 1, (usize::MAX, 2), vec![vec![0; 3]], vec![0])
        .unwrap_err();
    assert_eq!(err.code(), VqErrorCode::Precondition);
}

#[test]
fn wide_indices_are_not_implemented() {
    let err = CompressedImage::read_from(&b"25 0 2 2 1 1 1\n"[..]).unwrap_err();
    assert_eq!(err.code(), VqErrorCode::NotImplemented);
}

// ------------------------------------------------------------------
// Report
// ------------------------------------------------------------------

#[test]
fn pretty_bytes_units() {
    assert_eq!(pretty_bytes(512), "512b");
    assert_eq!(pretty_bytes(2 * 1024 + 5), "2,5Kb");
    assert_eq!(pretty_bytes(3 * 1024 * 1024 + 2048), "3,2Mb");
}

#[test]
fn report_renders_text_and_json() {
    let report = CompressionReport {
        distortion: 1.5,
        bits_per_pixel: 2.0,
        uncompressed_size: 4096,
        compressed_size: 1024,
        compression_time: std::time::Duration::from_millis(1250),
    };
    let text = report.to_string();
    assert!(text.starts_with("Compression report:"));
    assert!(text.contains("Distortion        = 1.5000000000"));
    assert!(text.contains("Uncompressed size = 4,0Kb"));
    assert!(text.contains("Compression ratio = 0.250"));
    assert!(text.ends_with("Compression time  = 1.250s"));

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["compressed_size"], 1024);
    assert_eq!(json["compression_time_secs"], 1.25);
}
