use std::{collections::BTreeMap, io::BufRead};

use burn::tensor::{backend::Backend, Data, ElementConversion, Shape, Tensor};

/// Dense lookup table from vocabulary index to pretrained word vector.
///
/// Row 0 is reserved for padding and unknown words and is always zero.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddingMatrix {
    rows: usize,
    dim: usize,
    values: Vec<f32>,
}

impl EmbeddingMatrix {
    /// An all-zero matrix with `rows` rows of `dim` components
    pub fn zeros(rows: usize, dim: usize) -> Self {
        Self {
            rows,
            dim,
            values: vec![0.0; rows * dim],
        }
    }

    /// The number of rows (vocabulary size + 1)
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// The embedding dimension
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The vector stored for a vocabulary index
    pub fn row(&self, index: usize) -> &[f32] {
        &self.values[index * self.dim..(index + 1) * self.dim]
    }

    fn set_row(&mut self, index: usize, vector: &[f32]) {
        self.values[index * self.dim..(index + 1) * self.dim].copy_from_slice(vector);
    }

    /// Convert into a `[rows, dim]` weight tensor
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        let values: Vec<B::FloatElem> = self.values.iter().map(|value| value.elem()).collect();

        Tensor::from_data(Data::new(values, Shape::new([self.rows, self.dim])), device)
    }
}

/// Map a word-vector resource onto the vocabulary.
///
/// The resource holds one `word c1 c2 ... cD` entry per line; blank lines and a leading
/// `count dim` header are skipped. The reader is consumed and dropped before returning.
/// Vocabulary words without a vector keep an all-zero row.
pub fn load_embedding_matrix<R: BufRead>(
    reader: R,
    word_index: &BTreeMap<String, usize>,
    dim: usize,
) -> Result<EmbeddingMatrix, EmbeddingError> {
    let vocab_size = word_index.len();

    if let Some((word, &index)) = word_index
        .iter()
        .find(|(_, index)| **index == 0 || **index > vocab_size)
    {
        return Err(EmbeddingError::Index {
            word: word.clone(),
            index,
            vocab_size,
        });
    }

    let mut matrix = EmbeddingMatrix::zeros(vocab_size + 1, dim);
    let mut found = 0;

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = number + 1;

        if line.trim().is_empty() {
            continue;
        }

        let mut parts = line.split_whitespace();
        let word = parts.next().unwrap_or_default();
        let components = parts.collect::<Vec<_>>();

        if line_number == 1 && is_header(word, &components) {
            continue;
        }

        if components.len() != dim {
            return Err(EmbeddingError::Dimension {
                line: line_number,
                expected: dim,
                found: components.len(),
            });
        }

        let vector = components
            .iter()
            .map(|component| component.parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| EmbeddingError::Parse {
                line: line_number,
                source,
            })?;

        found += 1;

        if let Some(&index) = word_index.get(word) {
            matrix.set_row(index, &vector);
        }
    }

    log::info!("Found {} word vectors.", found);

    Ok(matrix)
}

fn is_header(first: &str, rest: &[&str]) -> bool {
    rest.len() == 1 && first.parse::<usize>().is_ok() && rest[0].parse::<usize>().is_ok()
}

/// Embedding Error
#[derive(thiserror::Error, Debug)]
pub enum EmbeddingError {
    /// The resource could not be read
    #[error("unable to read word vectors: {0}")]
    Io(#[from] std::io::Error),

    /// A vector component is not a number
    #[error("invalid vector component on line {line}: {source}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// The parse failure
        source: std::num::ParseFloatError,
    },

    /// A vector has the wrong number of components
    #[error("expected {expected} vector components on line {line}, found {found}")]
    Dimension {
        /// 1-based line number
        line: usize,
        /// The configured embedding dimension
        expected: usize,
        /// Components present on the line
        found: usize,
    },

    /// A vocabulary index falls outside 1..=vocab_size
    #[error("vocabulary word {word:?} has index {index}, outside 1..={vocab_size}")]
    Index {
        /// The offending word
        word: String,
        /// Its index
        index: usize,
        /// The vocabulary size
        vocab_size: usize,
    },
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    use burn::backend::NdArray;
    use pretty_assertions::assert_eq;

    fn word_index() -> BTreeMap<String, usize> {
        [("int", 1), ("char", 2), ("memcpy", 3)]
            .into_iter()
            .map(|(word, index)| (word.to_string(), index))
            .collect()
    }

    #[test]
    fn copies_vectors_into_vocabulary_rows() -> anyhow::Result<()> {
        let vectors = "3 2\nint 0.5 -1.0\n\n   \nmemcpy 2 3\nunused 9 9\n";

        let matrix = load_embedding_matrix(Cursor::new(vectors), &word_index(), 2)?;

        assert_eq!(matrix.rows(), 4);
        assert_eq!(matrix.row(0), &[0.0, 0.0]);
        assert_eq!(matrix.row(1), &[0.5, -1.0]);
        assert_eq!(matrix.row(2), &[0.0, 0.0]);
        assert_eq!(matrix.row(3), &[2.0, 3.0]);

        Ok(())
    }

    #[test]
    fn malformed_components_fail_fast() {
        let result = load_embedding_matrix(Cursor::new("int 0.5 abc\n"), &word_index(), 2);
        assert!(matches!(result, Err(EmbeddingError::Parse { line: 1, .. })));

        let result = load_embedding_matrix(Cursor::new("int 0.5 1\nchar 1\n"), &word_index(), 2);
        assert!(matches!(
            result,
            Err(EmbeddingError::Dimension {
                line: 2,
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn rejects_indices_outside_vocabulary() {
        let mut index = word_index();
        index.insert("len".to_string(), 9);

        let result = load_embedding_matrix(Cursor::new(""), &index, 2);

        assert!(matches!(result, Err(EmbeddingError::Index { index: 9, .. })));
    }

    #[test]
    fn converts_to_weight_tensor() -> anyhow::Result<()> {
        let matrix = load_embedding_matrix(Cursor::new("char 1 2\n"), &word_index(), 2)?;

        let tensor = matrix.to_tensor::<NdArray>(&Default::default());

        assert_eq!(tensor.dims(), [4, 2]);
        assert_eq!(
            tensor.into_data().convert::<f32>().value,
            vec![0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 0.0, 0.0]
        );

        Ok(())
    }
}
