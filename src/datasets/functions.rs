use std::path::Path;

use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::utils::files::list_files;

/// Label of a non-vulnerable function
pub const NON_VULNERABLE: usize = 0;

/// Label of a vulnerable function
pub const VULNERABLE: usize = 1;

/// A single source function and its identifier
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, new)]
pub struct Function {
    /// Identifier of the function (the file name)
    pub id: String,

    /// The raw source text
    pub text: String,
}

/// Functions whose identifier references a CVE are vulnerable
pub fn label_from_id(id: &str) -> usize {
    if id.to_ascii_lowercase().contains("cve") {
        VULNERABLE
    } else {
        NON_VULNERABLE
    }
}

/// Source functions loaded from a directory tree, one function per file
#[derive(Clone, Debug)]
pub struct Dataset {
    functions: Vec<Function>,
}

impl Dataset {
    /// Load every file with one of the given extensions below `data_dir`
    pub async fn load(data_dir: &Path, extensions: &[String]) -> anyhow::Result<Self> {
        if !data_dir.is_dir() {
            return Err(anyhow!(
                "Dataset directory {} does not exist",
                data_dir.display()
            ));
        }

        let mut functions = Vec::new();

        for path in list_files(data_dir, extensions).await? {
            let bytes = tokio::fs::read(&path).await?;

            let id = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            functions.push(Function::new(id, decode_latin1(&bytes)));
        }

        let dataset = Self { functions };

        if dataset.is_empty() {
            return Err(anyhow!(
                "No source files with extensions {:?} found in {}",
                extensions,
                data_dir.display()
            ));
        }

        log::info!(
            "The length of the loaded data list is: {} ({})",
            dataset.len(),
            data_dir.display()
        );

        Ok(dataset)
    }

    /// Returns the number of functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether the dataset holds no functions
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Split into parallel lists of identifiers and texts
    pub fn into_parts(self) -> (Vec<String>, Vec<String>) {
        self.functions
            .into_iter()
            .map(|function| (function.id, function.text))
            .unzip()
    }
}

/// Source files are read as latin-1: every byte maps to the code point of the same value
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| char::from(byte)).collect()
}
