use std::{collections::BTreeMap, path::Path};

use tokenizers::Tokenizer;

/// Index reserved for padding; tokens that resolve to it are unknown words
pub const PAD_INDEX: u32 = 0;

/// Turns source text into integer sequences with a pre-fit word-level vocabulary
#[derive(Clone)]
pub struct SequenceTokenizer {
    tokenizer: Tokenizer,
    word_index: BTreeMap<String, usize>,
}

impl SequenceTokenizer {
    /// Load a serialized `tokenizers` tokenizer (`tokenizer.json`)
    pub fn from_file(path: &Path) -> Result<Self, TokenizerError> {
        let tokenizer = Tokenizer::from_file(path).map_err(|e| TokenizerError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::new(tokenizer)
    }

    /// Wrap an already constructed tokenizer
    pub fn new(tokenizer: Tokenizer) -> Result<Self, TokenizerError> {
        let word_index: BTreeMap<String, usize> = tokenizer
            .get_vocab(false)
            .into_iter()
            .filter(|(_, index)| *index != PAD_INDEX)
            .map(|(word, index)| (word, index as usize))
            .collect();

        if word_index.is_empty() {
            return Err(TokenizerError::EmptyVocabulary);
        }

        Ok(Self {
            tokenizer,
            word_index,
        })
    }

    /// Vocabulary words mapped to their non-zero indices
    pub fn word_index(&self) -> &BTreeMap<String, usize> {
        &self.word_index
    }

    /// The number of vocabulary words, excluding the reserved index 0
    pub fn vocab_size(&self) -> usize {
        self.word_index.len()
    }

    /// Encode each text into token indices, skipping words outside the vocabulary
    pub fn texts_to_sequences(&self, texts: &[String]) -> Result<Vec<Vec<u32>>, TokenizerError> {
        texts
            .iter()
            .map(|text| {
                let encoding = self
                    .tokenizer
                    .encode(text.as_str(), false)
                    .map_err(|e| TokenizerError::Encode(e.to_string()))?;

                Ok(encoding
                    .get_ids()
                    .iter()
                    .copied()
                    .filter(|id| *id != PAD_INDEX)
                    .collect())
            })
            .collect()
    }
}

/// Tokenizer Error
#[derive(thiserror::Error, Debug)]
pub enum TokenizerError {
    /// The tokenizer file could not be loaded
    #[error("unable to load tokenizer from {path}: {reason}")]
    Load {
        /// The tokenizer file
        path: String,
        /// Why loading failed
        reason: String,
    },

    /// The vocabulary holds nothing but the padding index
    #[error("the tokenizer vocabulary is empty")]
    EmptyVocabulary,

    /// A text could not be encoded
    #[error("unable to encode text: {0}")]
    Encode(String),
}
