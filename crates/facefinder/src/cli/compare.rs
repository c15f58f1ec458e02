//! The `facefinder compare` command.

use anyhow::Context;
use clap::Args;
use facefinder_core::math::{cosine_similarity, euclidean_distance};
use facefinder_core::{Config, FaceClassifier, FaceComparison, OutputFormat, OutputWriter};
use std::path::PathBuf;

use super::embed::load_face;

/// Arguments for the `compare` command.
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// First face image
    pub first: PathBuf,

    /// Second face image
    pub second: PathBuf,

    /// Distance below which the faces count as the same person
    /// (defaults to matching.identical_threshold)
    #[arg(short, long)]
    pub threshold: Option<f32>,

    /// Use 8-bit quantized model input
    #[arg(long)]
    pub quantized: bool,
}

/// Execute the compare command.
pub fn execute(args: CompareArgs, mut config: Config) -> anyhow::Result<()> {
    let threshold = args
        .threshold
        .unwrap_or(config.matching.identical_threshold);
    if !threshold.is_finite() || threshold < 0.0 {
        anyhow::bail!("--threshold must be a finite value >= 0");
    }
    if args.quantized {
        config.model.quantized = true;
    }

    let mut classifier =
        FaceClassifier::from_config(&config.model).context("Failed to load face model")?;
    let side = classifier.input_size();

    let first = load_face(&args.first, side, None)?;
    let second = load_face(&args.second, side, None)?;

    let a = classifier
        .recognize(&first.bitmap)
        .with_context(|| format!("Failed to embed {:?}", args.first))?;
    let b = classifier
        .recognize(&second.bitmap)
        .with_context(|| format!("Failed to embed {:?}", args.second))?;
    classifier.close();

    let comparison = compare(args.first, args.second, &a, &b, threshold)?;
    tracing::debug!(
        distance = comparison.distance,
        same_person = comparison.same_person,
        "Compared faces"
    );

    let mut writer = OutputWriter::new(std::io::stdout().lock(), OutputFormat::Json, true);
    writer.write(&comparison)?;
    writer.flush()?;
    Ok(())
}

fn compare(
    first: PathBuf,
    second: PathBuf,
    a: &[f32],
    b: &[f32],
    threshold: f32,
) -> anyhow::Result<FaceComparison> {
    let distance = euclidean_distance(a, b).with_context(|| {
        format!(
            "Embedding lengths differ ({} vs {})",
            a.len(),
            b.len()
        )
    })?;
    let cosine = cosine_similarity(a, b).unwrap_or(0.0);
    Ok(FaceComparison::new(first, second, distance, cosine, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_identical_embeddings() {
        let e = [0.6, 0.8];
        let result = compare("a.jpg".into(), "b.jpg".into(), &e, &e, 1.0).unwrap();
        assert_eq!(result.distance, 0.0);
        assert!((result.cosine_similarity - 1.0).abs() < 1e-6);
        assert!(result.same_person);
    }

    #[test]
    fn test_compare_distant_embeddings() {
        let result =
            compare("a.jpg".into(), "b.jpg".into(), &[1.0, 0.0], &[-1.0, 0.0], 1.0).unwrap();
        assert_eq!(result.distance, 2.0);
        assert!(!result.same_person);
    }

    #[test]
    fn test_compare_rejects_length_mismatch() {
        let err = compare("a.jpg".into(), "b.jpg".into(), &[1.0], &[1.0, 2.0], 1.0).unwrap_err();
        assert!(err.to_string().contains("lengths differ"));
    }
}
