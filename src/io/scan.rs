//! Line-oriented tokenizer for the inversion engine's text grammar.
//!
//! The engine's report files are loosely-delimited, comment-annotated
//! streams. The lexical shapes we care about:
//!
//! ```text
//! # Layered model 1: value=0.766           model header
//! # 2 Rayleigh dispersion mode(s)          wave header
//! # CPU Time = 125 ms                      ignored annotation
//! # Mode 0                                 mode header
//! 0.1 0.0034                               coordinate pair (freq slowness)
//! 2.5 200.0 100.0 2000.0                   layer quad (tk vp vs rh)
//! 7                                        bare count line
//! ```
//!
//! Each classifier returns `Option` and demands an exact token count and
//! keyword sequence, so a match can never bleed into a neighboring
//! record. Numeric tokens accept scientific notation but reject the
//! `inf`/`nan`/hex spellings `str::parse::<f64>` would otherwise allow.

use crate::domain::WaveType;

/// Parsed `# Layered model <id>: value=<misfit>` header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelHeader {
    pub identifier: usize,
    pub misfit: f64,
}

/// Parsed `# <K> {Rayleigh|Love} dispersion mode(s)` header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveHeader {
    pub count: usize,
    pub wave: WaveType,
}

/// Strict float token: optional sign, digits with at most one decimal
/// point, optional signed exponent. At least one mantissa digit required.
pub fn float_token(tok: &str) -> Option<f64> {
    let bytes = tok.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }
    let mut mantissa_digits = 0;
    let mut seen_dot = false;
    while i < bytes.len() {
        match bytes[i] {
            b'0'..=b'9' => mantissa_digits += 1,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        i += 1;
    }
    if mantissa_digits == 0 {
        return None;
    }
    if i < bytes.len() {
        if !matches!(bytes[i], b'e' | b'E') {
            return None;
        }
        i += 1;
        if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start || i != bytes.len() {
            return None;
        }
    }
    tok.parse().ok()
}

/// A data line holding exactly two float tokens.
pub fn parse_pair(line: &str) -> Option<(f64, f64)> {
    let line = line.trim();
    if line.starts_with('#') {
        return None;
    }
    let mut tokens = line.split_whitespace();
    let a = float_token(tokens.next()?)?;
    let b = float_token(tokens.next()?)?;
    if tokens.next().is_some() {
        return None;
    }
    Some((a, b))
}

/// A data line holding exactly four float tokens.
pub fn parse_quad(line: &str) -> Option<[f64; 4]> {
    let line = line.trim();
    if line.starts_with('#') {
        return None;
    }
    let mut tokens = line.split_whitespace();
    let mut out = [0.0; 4];
    for slot in &mut out {
        *slot = float_token(tokens.next()?)?;
    }
    if tokens.next().is_some() {
        return None;
    }
    Some(out)
}

/// A bare non-negative integer line (layer counts).
pub fn parse_count(line: &str) -> Option<usize> {
    let line = line.trim();
    if line.is_empty() || !line.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    line.parse().ok()
}

/// The comment payload of a line, if it is a comment line.
fn comment_body(line: &str) -> Option<&str> {
    line.trim().strip_prefix('#').map(str::trim)
}

/// `# Layered model <id>: value=<misfit>`
pub fn parse_model_header(line: &str) -> Option<ModelHeader> {
    let body = comment_body(line)?;
    let rest = body.strip_prefix("Layered model")?.trim_start();
    let (id_part, value_part) = rest.split_once(':')?;
    let identifier = id_part.trim().parse().ok()?;
    let misfit = float_token(value_part.trim().strip_prefix("value=")?)?;
    Some(ModelHeader { identifier, misfit })
}

/// `# <K> {Rayleigh|Love} dispersion mode(s)`
pub fn parse_wave_header(line: &str) -> Option<WaveHeader> {
    let body = comment_body(line)?;
    let mut tokens = body.split_whitespace();
    let count = tokens.next()?.parse().ok()?;
    let wave = match tokens.next()? {
        "Rayleigh" => WaveType::Rayleigh,
        "Love" => WaveType::Love,
        _ => return None,
    };
    if tokens.next()? != "dispersion" {
        return None;
    }
    if !matches!(tokens.next()?, "mode(s)" | "modes" | "mode") {
        return None;
    }
    if tokens.next().is_some() {
        return None;
    }
    Some(WaveHeader { count, wave })
}

/// `# Mode <k>`
pub fn parse_mode_header(line: &str) -> Option<usize> {
    let body = comment_body(line)?;
    let rest = body.strip_prefix("Mode")?.trim();
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}
