use std::fmt;

use anyhow::{Context, Result};
use tiktoken_rs::{CoreBPE, cl100k_base};
use tracing::warn;

pub const DEFAULT_MODEL_NAME: &str = "text-embedding-3-small";

/// Ceiling used for models the table does not know.
pub const FALLBACK_MAX_TOKENS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Cl100k,
    Estimate,
}

struct ModelSpec {
    name: &'static str,
    encoding: Encoding,
    max_tokens: usize,
}

const KNOWN_MODELS: &[ModelSpec] = &[
    ModelSpec {
        name: "text-embedding-3-small",
        encoding: Encoding::Cl100k,
        max_tokens: 8191,
    },
    ModelSpec {
        name: "text-embedding-3-large",
        encoding: Encoding::Cl100k,
        max_tokens: 8191,
    },
    ModelSpec {
        name: "text-embedding-ada-002",
        encoding: Encoding::Cl100k,
        max_tokens: 8191,
    },
    ModelSpec {
        name: "sentence-transformers/all-MiniLM-L6-v2",
        encoding: Encoding::Estimate,
        max_tokens: 256,
    },
    ModelSpec {
        name: "intfloat/multilingual-e5-large",
        encoding: Encoding::Estimate,
        max_tokens: 512,
    },
    ModelSpec {
        name: "bkai-foundation-models/vietnamese-bi-encoder",
        encoding: Encoding::Estimate,
        max_tokens: 256,
    },
];

enum Backend {
    Bpe(CoreBPE),
    Estimate,
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Bpe(_) => f.write_str("Bpe(cl100k_base)"),
            Backend::Estimate => f.write_str("Estimate"),
        }
    }
}

/// Token counting for one embedding model.
///
/// Holds no mutable state, so a single instance can be shared across worker
/// threads that segment different documents.
#[derive(Debug)]
pub struct TokenCounter {
    model_name: String,
    max_tokens: usize,
    backend: Backend,
}

impl TokenCounter {
    pub fn for_model(model_name: &str) -> Result<Self> {
        let trimmed = model_name.trim();
        let resolved = if trimmed.is_empty() {
            DEFAULT_MODEL_NAME
        } else {
            trimmed
        };

        let Some(spec) = KNOWN_MODELS.iter().find(|spec| spec.name == resolved) else {
            warn!(
                model = %resolved,
                max_tokens = FALLBACK_MAX_TOKENS,
                "unknown embedding model; estimating token counts from characters"
            );
            return Ok(Self::estimating(resolved, FALLBACK_MAX_TOKENS));
        };

        match spec.encoding {
            Encoding::Cl100k => {
                let bpe = cl100k_base().context("failed to load cl100k_base tokenizer")?;
                Ok(Self {
                    model_name: spec.name.to_string(),
                    max_tokens: spec.max_tokens,
                    backend: Backend::Bpe(bpe),
                })
            }
            Encoding::Estimate => Ok(Self::estimating(spec.name, spec.max_tokens)),
        }
    }

    pub fn estimating(model_name: &str, max_tokens: usize) -> Self {
        Self {
            model_name: model_name.to_string(),
            max_tokens,
            backend: Backend::Estimate,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn is_estimate(&self) -> bool {
        matches!(self.backend, Backend::Estimate)
    }

    pub fn count(&self, text: &str) -> usize {
        match &self.backend {
            Backend::Bpe(bpe) => bpe.encode_with_special_tokens(text).len(),
            Backend::Estimate => estimate_tokens(text),
        }
    }
}

/// Roughly four characters per token.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}
