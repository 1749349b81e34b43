pub mod ingest;
pub mod outline;
pub mod segment;
pub mod status;
pub mod validate;

use anyhow::Result;
use legalseg::util::read_text_file;
use legalseg::{SourceMetadata, TokenCounter};

use crate::cli::DocumentArgs;
use crate::model::TokenizerInfo;

pub(crate) fn load_document(args: &DocumentArgs) -> Result<(String, SourceMetadata)> {
    let text = read_text_file(&args.input)?;
    let source = SourceMetadata {
        title: args.title.clone(),
        year: args.year.clone(),
        doc_id: args.doc_id.clone(),
        ..SourceMetadata::from_path(&args.input)
    };
    Ok((text, source))
}

pub(crate) fn tokenizer_info(counter: &TokenCounter) -> TokenizerInfo {
    TokenizerInfo {
        model_name: counter.model_name().to_string(),
        max_tokens: counter.max_tokens(),
        backend: if counter.is_estimate() {
            "char_estimate".to_string()
        } else {
            "cl100k_base".to_string()
        },
    }
}
