//! Cache fingerprints.
//!
//! A fingerprint names a thumbnail on disk:
//!
//! ```text
//! {md5(source)}_{md5(canonical(history + save entry))}.{format}
//! ```
//!
//! The history is encoded with an explicit, order-preserving byte layout
//! rather than any serializer's output, so names stay stable across
//! releases and platforms:
//!
//! - record count as `u64` little-endian
//! - per record: the operation name, then its fields in declaration order
//! - a final `save` record: driver, format, quality
//!
//! Strings are a `u64` LE byte length followed by UTF-8 bytes; integers are
//! widened to 64-bit LE; booleans and quality are one byte; an optional
//! value is a presence byte followed by the value; colors are four bytes.

use std::fmt;

use crate::color::Color;
use crate::format::OutputFormat;
use crate::operation::Operation;

/// The `(driver, format, quality)` entry appended to the history when a
/// chain is fingerprinted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveEntry {
    /// Backend identifier, see [`ImageBackend::driver`](crate::ImageBackend::driver).
    pub driver: String,
    /// Output encoding.
    pub format: OutputFormat,
    /// Encoder quality, 1..=100.
    pub quality: u8,
}

/// Content address of one rendered thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    source: String,
    history: String,
    format: OutputFormat,
}

impl Fingerprint {
    /// Fingerprint a chain of operations against `source`.
    #[must_use]
    pub fn compute(source: &str, history: &[Operation], save: &SaveEntry) -> Self {
        Self {
            source: source_digest(source),
            history: hex(md5::compute(canonical_history(history, save))),
            format: save.format,
        }
    }

    /// Hex digest of the source path or URL.
    #[must_use]
    pub fn source_digest(&self) -> &str {
        &self.source
    }

    /// Hex digest of the canonical history.
    #[must_use]
    pub fn history_digest(&self) -> &str {
        &self.history
    }

    /// Cache file name: `{source}_{history}.{ext}`.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}.{}", self.source, self.history, self.format)
    }
}

fn hex(digest: md5::Digest) -> String {
    format!("{digest:x}")
}

/// Hex md5 digest of a source path or URL.
///
/// Every thumbnail of a source shares this digest as its file name prefix.
#[must_use]
pub fn source_digest(source: &str) -> String {
    hex(md5::compute(source.as_bytes()))
}

/// Canonical byte encoding of a history plus its save entry.
#[must_use]
pub fn canonical_history(history: &[Operation], save: &SaveEntry) -> Vec<u8> {
    let mut enc = CanonicalEncoder::default();
    enc.write_len(history.len() + 1);
    for op in history {
        enc.write_operation(op);
    }
    enc.write_str("save");
    enc.write_str(&save.driver);
    enc.write_str(save.format.as_str());
    enc.write_u8(save.quality);
    enc.bytes
}

#[derive(Default)]
struct CanonicalEncoder {
    bytes: Vec<u8>,
}

impl CanonicalEncoder {
    fn write_u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    fn write_u64(&mut self, v: u64) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    fn write_i64(&mut self, v: i64) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    fn write_len(&mut self, len: usize) {
        self.write_u64(len as u64);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_str(&mut self, s: &str) {
        self.write_len(s.len());
        self.bytes.extend_from_slice(s.as_bytes());
    }

    fn write_opt_i32(&mut self, v: Option<i32>) {
        match v {
            Some(v) => {
                self.write_u8(1);
                self.write_i64(i64::from(v));
            }
            None => self.write_u8(0),
        }
    }

    fn write_color(&mut self, c: Color) {
        self.bytes.extend_from_slice(&c.0);
    }

    fn write_operation(&mut self, op: &Operation) {
        self.write_str(op.name());
        match *op {
            Operation::Crop {
                width,
                height,
                x,
                y,
            } => {
                self.write_u64(u64::from(width));
                self.write_u64(u64::from(height));
                self.write_u64(u64::from(x));
                self.write_u64(u64::from(y));
            }
            Operation::Fit {
                width,
                height,
                position,
                upsize,
            } => {
                self.write_u64(u64::from(width));
                self.write_u64(u64::from(height));
                self.write_str(position.as_str());
                self.write_bool(upsize);
            }
            Operation::Resize {
                width,
                height,
                aspect_ratio,
                upsize,
            } => {
                self.write_u64(u64::from(width));
                self.write_u64(u64::from(height));
                self.write_bool(aspect_ratio);
                self.write_bool(upsize);
            }
            Operation::ResizeCanvas {
                width,
                height,
                anchor,
                relative,
                bgcolor,
            } => {
                self.write_opt_i32(width);
                self.write_opt_i32(height);
                self.write_str(anchor.as_str());
                self.write_bool(relative);
                self.write_color(bgcolor);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operation::{CanvasOptions, CropOptions, FitOptions, ResizeOptions};

    fn save(format: OutputFormat, quality: u8) -> SaveEntry {
        SaveEntry {
            driver: "image/lanczos3".to_owned(),
            format,
            quality,
        }
    }

    fn crop(w: u32) -> Operation {
        Operation::crop(w, None, CropOptions::default()).unwrap()
    }

    fn resize(w: u32) -> Operation {
        Operation::resize(w, None, ResizeOptions::default()).unwrap()
    }

    #[test]
    fn source_digest_is_plain_md5_hex() {
        assert_eq!(source_digest(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(source_digest("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn canonical_layout_is_pinned() {
        let bytes = canonical_history(&[crop(200)], &save(OutputFormat::Png, 90));
        let mut expected = Vec::new();
        expected.extend_from_slice(&2u64.to_le_bytes());
        expected.extend_from_slice(&4u64.to_le_bytes());
        expected.extend_from_slice(b"crop");
        for v in [200u64, 200, 0, 0] {
            expected.extend_from_slice(&v.to_le_bytes());
        }
        expected.extend_from_slice(&4u64.to_le_bytes());
        expected.extend_from_slice(b"save");
        expected.extend_from_slice(&14u64.to_le_bytes());
        expected.extend_from_slice(b"image/lanczos3");
        expected.extend_from_slice(&3u64.to_le_bytes());
        expected.extend_from_slice(b"png");
        expected.push(90);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn file_name_shape() {
        let fp = Fingerprint::compute("/img/a.png", &[crop(200)], &save(OutputFormat::Jpg, 90));
        let name = fp.file_name();
        let (stem, ext) = name.rsplit_once('.').unwrap();
        assert_eq!(ext, "jpg");
        let (src, hist) = stem.split_once('_').unwrap();
        assert_eq!(src, source_digest("/img/a.png"));
        assert_eq!(hist.len(), 32);
        assert!(hist.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let history = [crop(200), resize(100)];
        let a = Fingerprint::compute("/img/a.png", &history, &save(OutputFormat::Png, 90));
        let b = Fingerprint::compute("/img/a.png", &history, &save(OutputFormat::Png, 90));
        assert_eq!(a, b);
        assert_eq!(a.file_name(), b.file_name());
    }

    #[test]
    fn order_changes_fingerprint() {
        let s = save(OutputFormat::Png, 90);
        let a = Fingerprint::compute("/img/a.png", &[crop(200), resize(100)], &s);
        let b = Fingerprint::compute("/img/a.png", &[resize(100), crop(200)], &s);
        assert_ne!(a.history_digest(), b.history_digest());
        assert_eq!(a.source_digest(), b.source_digest());
    }

    #[test]
    fn every_input_participates() {
        let base_history = [crop(200)];
        let base = Fingerprint::compute("/img/a.png", &base_history, &save(OutputFormat::Png, 90));

        let variants = [
            Fingerprint::compute("/img/b.png", &base_history, &save(OutputFormat::Png, 90)),
            Fingerprint::compute("/img/a.png", &[crop(201)], &save(OutputFormat::Png, 90)),
            Fingerprint::compute("/img/a.png", &base_history, &save(OutputFormat::Webp, 90)),
            Fingerprint::compute("/img/a.png", &base_history, &save(OutputFormat::Png, 80)),
            Fingerprint::compute(
                "/img/a.png",
                &base_history,
                &SaveEntry {
                    driver: "image/nearest".to_owned(),
                    format: OutputFormat::Png,
                    quality: 90,
                },
            ),
            Fingerprint::compute(
                "/img/a.png",
                &[Operation::crop(200, None, CropOptions { x: 1, y: 0 }).unwrap()],
                &save(OutputFormat::Png, 90),
            ),
        ];
        for v in &variants {
            assert_ne!(base.file_name(), v.file_name());
        }
    }

    #[test]
    fn options_participate() {
        let s = save(OutputFormat::Png, 90);
        let a = Operation::fit(Some(10), None, FitOptions::default()).unwrap();
        let b = Operation::fit(
            Some(10),
            None,
            FitOptions {
                upsize: false,
                ..FitOptions::default()
            },
        )
        .unwrap();
        assert_ne!(
            Fingerprint::compute("s", &[a], &s),
            Fingerprint::compute("s", &[b], &s)
        );

        let c = Operation::resize_canvas(Some(10), None, CanvasOptions::default()).unwrap();
        let d = Operation::resize_canvas(
            Some(10),
            None,
            CanvasOptions {
                bgcolor: Color::TRANSPARENT,
                ..CanvasOptions::default()
            },
        )
        .unwrap();
        assert_ne!(
            Fingerprint::compute("s", &[c], &s),
            Fingerprint::compute("s", &[d], &s)
        );
    }

    #[test]
    fn absent_and_given_canvas_width_differ() {
        let s = save(OutputFormat::Png, 90);
        let keep = Operation::resize_canvas(None, Some(200), CanvasOptions::default()).unwrap();
        let explicit =
            Operation::resize_canvas(Some(200), Some(200), CanvasOptions::default()).unwrap();
        assert_ne!(
            Fingerprint::compute("s", &[keep], &s),
            Fingerprint::compute("s", &[explicit], &s)
        );
    }
}
