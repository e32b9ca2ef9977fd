// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Staging uploaded images on disk
//!
//! An upload lives in the upload directory only as long as its
//! `StagedUpload` value. Dropping the value removes the file, so every exit
//! path of a request (success, error, panic unwind) cleans up.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Name used when the client filename sanitizes to nothing
const FALLBACK_FILENAME: &str = "upload";

/// Make a client-supplied filename safe to use inside the upload directory
///
/// Path separators become spaces, accented Latin letters lose their accent,
/// other non-ASCII characters are dropped, whitespace runs collapse to `_`,
/// anything outside `[A-Za-z0-9_.-]` is removed and leading/trailing
/// `.`/`_` are stripped.
pub fn sanitize_filename(name: &str) -> String {
    let ascii: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .filter_map(fold_to_ascii)
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// ASCII form of a character, if it has one
///
/// Covers the Latin-1 letters whose compatibility decomposition is a base
/// letter plus combining marks, and the superscript digits and ordinals.
/// Letters with no decomposition (`æ`, `ø`, `ß`, `ð`, `þ`) have no ASCII form.
fn fold_to_ascii(c: char) -> Option<char> {
    if c.is_ascii() {
        return Some(c);
    }
    let folded = match c {
        'À'..='Å' => 'A',
        'Ç' => 'C',
        'È'..='Ë' => 'E',
        'Ì'..='Ï' => 'I',
        'Ñ' => 'N',
        'Ò'..='Ö' => 'O',
        'Ù'..='Ü' => 'U',
        'Ý' => 'Y',
        'à'..='å' | 'ª' => 'a',
        'ç' => 'c',
        'è'..='ë' => 'e',
        'ì'..='ï' => 'i',
        'ñ' => 'n',
        'ò'..='ö' | 'º' => 'o',
        'ù'..='ü' => 'u',
        'ý' | 'ÿ' => 'y',
        '¹' => '1',
        '²' => '2',
        '³' => '3',
        _ => return None,
    };
    Some(folded)
}

/// An uploaded image written to the upload directory
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
}

impl StagedUpload {
    /// Write `bytes` to a uniquely named file in `dir`
    ///
    /// The file name carries the sanitized client filename plus a random
    /// component, so concurrent uploads sharing a name never collide.
    /// `dir` is created if it does not exist.
    pub fn write(dir: &Path, filename: Option<&str>, bytes: &[u8]) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;

        let safe_name = sanitize_filename(filename.unwrap_or(FALLBACK_FILENAME));
        let (stem, extension) = match safe_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
                (stem.to_string(), format!(".{}", ext))
            }
            _ => (safe_name.clone(), String::new()),
        };

        let mut file = tempfile::Builder::new()
            .prefix(&format!("{}-", stem))
            .suffix(&extension)
            .tempfile_in(dir)
            .with_context(|| format!("Failed to create upload file in {}", dir.display()))?;

        file.write_all(bytes).context("Failed to write upload")?;
        file.flush().context("Failed to flush upload")?;

        debug!("Staged {} bytes at {}", bytes.len(), file.path().display());

        Ok(Self { file })
    }

    /// Location of the staged file
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
