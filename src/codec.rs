//! Character dictionary used to map class indices to text and back.
//!
//! Two JSON files describe the vocabulary. `char_dict.json` maps a Unicode
//! ordinal to its character, `ord_map.json` maps a class index to an ordinal:
//!
//! ```json
//! {"97": "a", "98": "b"}
//! {"0": "97", "1": "98"}
//! ```
//!
//! A plain-text labels file, one character per line, can be used instead.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use tracing::{debug, info};

use crate::error::{read_file, OcrError, Result};

/// Placeholder produced for the CTC blank and for unmapped classes.
pub const BLANK: char = ' ';

#[serde_as]
#[derive(Deserialize)]
#[serde(transparent)]
struct CharDict(#[serde_as(as = "HashMap<DisplayFromStr, _>")] HashMap<u32, char>);

#[serde_as]
#[derive(Deserialize)]
#[serde(transparent)]
struct OrdMap(#[serde_as(as = "HashMap<DisplayFromStr, DisplayFromStr>")] HashMap<usize, u32>);

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let content = read_file("dictionary", path)?;
    serde_json::from_str(&content).map_err(|source| OcrError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Read-only index <-> character table.
#[derive(Debug, Clone)]
pub struct CharCodec {
    index_to_char: HashMap<usize, char>,
}

impl CharCodec {
    pub fn from_json(char_dict_path: &Path, ord_map_path: &Path) -> Result<Self> {
        let CharDict(chars) = read_json(char_dict_path)?;
        let OrdMap(ords) = read_json(ord_map_path)?;

        let mut index_to_char = HashMap::with_capacity(ords.len());
        for (index, ord) in ords {
            match chars.get(&ord).copied().or_else(|| char::from_u32(ord)) {
                Some(c) => {
                    index_to_char.insert(index, c);
                }
                None => debug!("class {} maps to invalid ordinal {}", index, ord),
            }
        }
        let codec = Self::from_map(index_to_char);
        info!(
            "Loaded {} classes from {} and {}",
            codec.len(),
            char_dict_path.display(),
            ord_map_path.display()
        );
        Ok(codec)
    }

    /// One label per line, the line number is the class index.
    pub fn from_labels(path: &Path) -> Result<Self> {
        let content = read_file("labels file", path)?;
        let index_to_char = content
            .lines()
            .enumerate()
            .filter_map(|(i, line)| line.chars().next().map(|c| (i, c)))
            .collect();
        Ok(Self::from_map(index_to_char))
    }

    pub fn from_map(index_to_char: HashMap<usize, char>) -> Self {
        CharCodec { index_to_char }
    }

    pub fn len(&self) -> usize {
        self.index_to_char.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_to_char.is_empty()
    }

    pub fn char_of(&self, index: usize) -> char {
        self.index_to_char.get(&index).copied().unwrap_or(BLANK)
    }

    /// Maps every index, unknown ones become [`BLANK`].
    pub fn index_to_chars(&self, indices: &[usize]) -> Vec<char> {
        indices.iter().map(|&i| self.char_of(i)).collect()
    }

}
