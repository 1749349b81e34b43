use std::collections::BTreeMap;

use anyhow::Result;
use legalseg::util::read_text_file;
use legalseg::{PatternTable, StructureParser};
use tracing::{info, warn};

use crate::cli::OutlineArgs;

pub fn run(args: OutlineArgs) -> Result<()> {
    let text = read_text_file(&args.input)?;
    let table = PatternTable::for_document_type(args.doc_type)?;
    let parsed = StructureParser::new(&table).parse(&text, &BTreeMap::new());

    print!("{}", parsed.tree.outline());
    for (kind, count) in &parsed.counts {
        println!("{}: {}", kind.label_vi(), count);
    }

    for warning in &parsed.warnings {
        warn!(warning = %warning, "parser warning");
    }
    info!(
        input = %args.input.display(),
        doc_type = %args.doc_type,
        lines = parsed.line_count,
        nodes = parsed.tree.len() - 1,
        "outline complete"
    );

    Ok(())
}
