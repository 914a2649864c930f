//! Tokenizer selection.
//!
//! The heuristic tokenizer is always available. A vocabulary-exact one
//! backed by a `tokenizer.json` file needs the `hf-tokenizer` feature.

use parley_config::{TokenizerConfig, TokenizerKind};
use parley_core::tokenizer::{HeuristicTokenizer, Tokenizer};
use std::sync::Arc;

/// Build the tokenizer named by the config. An unavailable tokenizer is a
/// configuration error.
pub fn from_config(config: &TokenizerConfig) -> parley_core::Result<Arc<dyn Tokenizer>> {
    match config.kind {
        TokenizerKind::Heuristic => Ok(Arc::new(HeuristicTokenizer)),
        TokenizerKind::Huggingface => {
            let path = config.path.as_deref().ok_or_else(|| {
                parley_core::Error::config("tokenizer.path is required for the huggingface tokenizer")
            })?;
            huggingface(path)
        }
    }
}

#[cfg(feature = "hf-tokenizer")]
fn huggingface(path: &std::path::Path) -> parley_core::Result<Arc<dyn Tokenizer>> {
    Ok(Arc::new(hf::HfTokenizer::from_file(path)?))
}

#[cfg(not(feature = "hf-tokenizer"))]
fn huggingface(_path: &std::path::Path) -> parley_core::Result<Arc<dyn Tokenizer>> {
    Err(parley_core::Error::config(
        "the huggingface tokenizer requires building with the `hf-tokenizer` feature",
    ))
}

#[cfg(feature = "hf-tokenizer")]
pub mod hf {
    use parley_core::tokenizer::Tokenizer;
    use std::path::Path;

    /// Counts tokens with a HuggingFace `tokenizer.json` vocabulary.
    pub struct HfTokenizer {
        inner: tokenizers::Tokenizer,
    }

    impl HfTokenizer {
        pub fn from_file(path: &Path) -> parley_core::Result<Self> {
            let inner = tokenizers::Tokenizer::from_file(path).map_err(|e| {
                parley_core::Error::config(format!(
                    "failed to load tokenizer from {}: {e}",
                    path.display()
                ))
            })?;
            tracing::info!(path = %path.display(), "Loaded tokenizer vocabulary");
            Ok(Self { inner })
        }
    }

    impl Tokenizer for HfTokenizer {
        fn name(&self) -> &str {
            "huggingface"
        }

        fn count(&self, text: &str) -> usize {
            match self.inner.encode(text, false) {
                Ok(encoding) => encoding.len(),
                Err(e) => {
                    tracing::warn!(error = %e, "Tokenizer failed, using byte estimate");
                    text.len().div_ceil(4)
                }
            }
        }
    }
}
