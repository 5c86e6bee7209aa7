use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ParseArgs;
use crate::model::ParseResult;
use crate::sheet::SheetParser;
use crate::util::read_input_text;

pub fn run(args: ParseArgs) -> Result<()> {
    let html = read_input_text(&args.input)?;
    let parsed = SheetParser::new()?.parse(&html);

    info!(
        input = %args.input.display(),
        extraction = parsed.extraction.as_str(),
        sections = parsed.sections.len(),
        pairs = parsed.pair_count(),
        "parsed response sheet"
    );

    let mut out = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut out, &parsed)
            .context("failed to serialize parse json output")?;
        writeln!(out)?;
    } else {
        write_text(&mut out, &parsed)?;
    }
    out.flush()?;

    Ok(())
}

fn write_text(out: &mut impl Write, parsed: &ParseResult) -> Result<()> {
    writeln!(out, "Extraction: {}", parsed.extraction.as_str())?;

    let mut number = 0usize;
    for section in parsed.sections.iter().chain(parsed.implicit.iter()) {
        writeln!(out, "[{}] {} pairs", section.name, section.pairs.len())?;
        for pair in &section.pairs {
            number += 1;
            writeln!(
                out,
                "\t{number}.\tchosen={}\tcorrect={}",
                pair.chosen, pair.correct_answer
            )?;
        }
    }

    if number == 0 {
        writeln!(out, "No answer pairs detected.")?;
    }

    Ok(())
}
