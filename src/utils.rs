use std::fs::{self, DirBuilder};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use rustc_hash::FxHashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // ASCII word characters only: accented letters split words apart.
    static ref WORD: Regex = Regex::new(r"(?-u:\b\w+\b)").expect("word pattern is valid");
}

/// Creates a directory if it doesn't exist
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    DirBuilder::new()
        .recursive(true)
        .create(path)?;
    Ok(())
}

/// Lower-cased word tokens in order of appearance, duplicates kept.
pub fn tokenize(text: &str) -> Vec<String> {
    let text = text.nfc().collect::<String>().to_lowercase();
    WORD.find_iter(&text)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn word_set(text: &str) -> FxHashSet<String> {
    tokenize(text).into_iter().collect()
}

/// Word-set Jaccard similarity: |A ∩ B| / |A ∪ B|, or 0 when both are empty.
pub fn jaccard_similarity(a: &str, b: &str) -> f32 {
    jaccard_of_sets(&word_set(a), &word_set(b))
}

pub fn jaccard_of_sets(a: &FxHashSet<String>, b: &FxHashSet<String>) -> f32 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;

    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

/// Collects every `.json` file under a directory recursively, sorted by path
/// so the load order is stable across platforms.
pub fn find_question_files(dir_path: impl AsRef<Path>) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_json_files(dir_path.as_ref(), &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_json_files(dir_path: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir_path)? {
        let entry = entry?;
        let path = entry.path();

        // Symlinked directories are not followed, so link cycles cannot recurse.
        if entry.file_type()?.is_dir() {
            collect_json_files(&path, files)?;
        } else if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }

    Ok(())
}
