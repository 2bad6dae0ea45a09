//! PBM "plain" (P1) decoding and encoding.
//!
//! Only the ASCII variant of the Netpbm bitmap format is handled: the `P1`
//! magic, `#` comments running to end of line, whitespace-separated width
//! and height, then `width * height` raster characters. Whitespace between
//! raster characters is optional; authoring tools such as GIMP pack whole
//! rows into single lines like `0110`.

use log::debug;

use crate::bitmap::Bitmap;
use crate::error::FormatError;

/// Magic token opening every plain PBM file.
pub const MAGIC: &str = "P1";

/// Parse plain PBM text into a [`Bitmap`].
///
/// Pure function: no side effects, and the result keeps no reference to
/// the input. All failure modes are [`FormatError`]s raised before any
/// hardware is involved.
pub fn decode(text: &str) -> Result<Bitmap, FormatError> {
    let mut cursor = Cursor::new(text);

    let magic = cursor.token().ok_or(FormatError::TruncatedHeader)?;
    if magic != MAGIC {
        return Err(FormatError::BadMagic {
            found: magic.to_string(),
        });
    }

    let width = cursor.dimension()?;
    let height = cursor.dimension()?;
    if width == 0 || height == 0 {
        return Err(FormatError::ZeroDimension { width, height });
    }

    let expected = width as usize * height as usize;
    let mut bits = Vec::with_capacity(expected);
    while bits.len() < expected {
        match cursor.bit_char() {
            Some('0') => bits.push(false),
            Some('1') => bits.push(true),
            Some(found) => {
                return Err(FormatError::InvalidBit {
                    found,
                    index: bits.len(),
                })
            }
            None => {
                return Err(FormatError::BitCount {
                    expected,
                    found: bits.len(),
                })
            }
        }
    }

    // Anything left in the raster means the header lied about the size.
    let mut total = expected;
    while let Some(c) = cursor.bit_char() {
        match c {
            '0' | '1' => total += 1,
            found => return Err(FormatError::InvalidBit { found, index: total }),
        }
    }
    if total != expected {
        return Err(FormatError::BitCount {
            expected,
            found: total,
        });
    }

    let bitmap = Bitmap::from_bits(width, height, bits)?;
    debug!(
        "decoded {}x{} PBM, {} dots set",
        bitmap.width(),
        bitmap.height(),
        bitmap.dot_count()
    );
    Ok(bitmap)
}

/// Encode a bitmap back to plain PBM text.
///
/// Emits one space-separated raster row per line. `decode` reproduces the
/// exact bit matrix, which the round-trip tests rely on.
pub fn encode(bitmap: &Bitmap) -> String {
    let mut out = String::new();
    out.push_str(MAGIC);
    out.push('\n');
    out.push_str(&format!("{} {}\n", bitmap.width(), bitmap.height()));
    for row in bitmap.rows() {
        let line: Vec<&str> = row.iter().map(|b| if *b { "1" } else { "0" }).collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    out
}

/// Scanner over PBM text that hides whitespace and comments.
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Cursor { rest: src }
    }

    fn skip_filler(&mut self) {
        loop {
            self.rest = self.rest.trim_start();
            if let Some(comment) = self.rest.strip_prefix('#') {
                self.rest = match comment.find('\n') {
                    Some(pos) => &comment[pos + 1..],
                    None => "",
                };
            } else {
                return;
            }
        }
    }

    /// Next whitespace- or comment-delimited token.
    fn token(&mut self) -> Option<&'a str> {
        self.skip_filler();
        if self.rest.is_empty() {
            return None;
        }
        let end = self
            .rest
            .find(|c: char| c.is_whitespace() || c == '#')
            .unwrap_or(self.rest.len());
        let (token, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(token)
    }

    /// Next single raster character.
    fn bit_char(&mut self) -> Option<char> {
        self.skip_filler();
        let mut chars = self.rest.chars();
        let c = chars.next()?;
        self.rest = chars.as_str();
        Some(c)
    }

    fn dimension(&mut self) -> Result<u32, FormatError> {
        let token = self.token().ok_or(FormatError::TruncatedHeader)?;
        token.parse::<u32>().map_err(|_| FormatError::InvalidDimension {
            token: token.to_string(),
        })
    }
}
