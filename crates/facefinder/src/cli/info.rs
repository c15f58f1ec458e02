//! The `facefinder info` command.

use anyhow::Context;
use clap::Args;
use facefinder_core::{Config, FaceClassifier};

/// Arguments for the `info` command.
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Print every label instead of a count
    #[arg(long)]
    pub labels: bool,
}

/// Load the configured model and print what the session was built with.
pub fn execute(args: InfoArgs, config: Config) -> anyhow::Result<()> {
    let resource_dir = config.model.resource_dir();
    let mut classifier = FaceClassifier::from_config(&config.model).with_context(|| {
        format!(
            "Failed to load face model from {}\n\n  Hint: Place {} and {} in that directory.",
            resource_dir.display(),
            config.model.model_path,
            config.model.label_path
        )
    })?;

    let options = classifier.options();
    println!("FaceFinder v{}", facefinder_core::VERSION);
    println!();
    println!("  Resources:       {}", resource_dir.display());
    println!("  Model:           {}", config.model.model_path);
    println!(
        "  Input:           {0}x{0}x3 ({1})",
        options.input_size,
        options.precision()
    );
    println!("  Embedding width: {}", options.embedding_width);
    println!("  Threads:         {}", options.num_threads);
    println!("  Byte order:      {}", options.byte_order.name());
    println!("  Normalize:       {}", options.normalize);
    println!("  Labels:          {}", classifier.labels().len());

    if args.labels {
        for (index, label) in classifier.labels().iter().enumerate() {
            println!("    {index:>4}  {label}");
        }
    }

    classifier.close();
    Ok(())
}
