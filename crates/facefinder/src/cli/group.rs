//! The `facefinder group` command.

use anyhow::Context;
use clap::Args;
use facefinder_core::{
    group_faces, read_records, Config, FaceEmbedding, OutputFormat, OutputWriter, PersonGroup,
};
use std::path::{Path, PathBuf};

/// Arguments for the `group` command.
#[derive(Args, Debug)]
pub struct GroupArgs {
    /// Embeddings written by `facefinder embed` (JSON or JSONL)
    pub input: PathBuf,

    /// Distance below which two faces count as the same person
    /// (defaults to matching.identical_threshold)
    #[arg(short, long)]
    pub threshold: Option<f32>,
}

/// Execute the group command.
pub fn execute(args: GroupArgs, config: Config) -> anyhow::Result<()> {
    let threshold = args
        .threshold
        .unwrap_or(config.matching.identical_threshold);

    let records = load_embeddings(&args.input)?;
    tracing::info!(
        "Grouping {} faces from {:?} (threshold {})",
        records.len(),
        args.input,
        threshold
    );

    let persons = group_faces(&records, threshold)
        .with_context(|| format!("Failed to group faces from {:?}", args.input))?;

    let mut writer = OutputWriter::new(std::io::stdout().lock(), OutputFormat::Json, true);
    writer.write_all(&persons)?;
    writer.flush()?;

    print_summary(&persons, records.len());
    Ok(())
}

fn load_embeddings(path: &Path) -> anyhow::Result<Vec<FaceEmbedding>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read embeddings from {path:?}"))?;
    read_records(&content).with_context(|| format!("Failed to parse embeddings in {path:?}"))
}

fn print_summary(persons: &[PersonGroup], faces: usize) {
    eprintln!();
    eprintln!("  Faces:   {faces}");
    eprintln!("  Persons: {}", persons.len());
    if let Some(largest) = persons.first() {
        eprintln!("  Largest: {} faces (person {})", largest.len(), largest.person);
    }
}
