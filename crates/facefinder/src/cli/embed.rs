//! The `facefinder embed` command for extracting face embeddings.

use anyhow::Context;
use clap::{Args, ValueEnum};
use facefinder_core::output::OutputFormat as CoreOutputFormat;
use facefinder_core::{
    Bitmap, Config, ExtractionStats, FaceClassifier, FaceEmbedding, FaceRect, OutputWriter,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Image extensions picked up during directory discovery.
const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "gif", "tif", "tiff"];

/// Arguments for the `embed` command.
#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Face image or directory of face images
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (defaults to output.format from config)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Faces per backend invocation
    #[arg(short, long, default_value = "1")]
    pub batch_size: usize,

    /// Face region to crop before resizing, as X,Y,WIDTH,HEIGHT
    #[arg(long, value_parser = parse_face_rect)]
    pub face: Option<FaceRect>,

    /// Override model.input_size
    #[arg(long)]
    pub input_size: Option<u32>,

    /// Use 8-bit quantized model input
    #[arg(long)]
    pub quantized: bool,

    /// L2-normalize embeddings
    #[arg(long)]
    pub normalize: bool,

    /// Override model.num_threads
    #[arg(long)]
    pub threads: Option<usize>,
}

/// Supported output formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON object or array
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// A decoded face ready for the classifier.
pub(crate) struct LoadedFace {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub bitmap: Bitmap,
}

/// Execute the embed command.
pub fn execute(args: EmbedArgs, mut config: Config) -> anyhow::Result<()> {
    if !args.input.exists() {
        anyhow::bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            args.input
        );
    }
    if args.batch_size == 0 {
        anyhow::bail!("--batch-size must be at least 1");
    }

    apply_overrides(&args, &mut config);

    let files = discover(&args.input);
    if files.is_empty() {
        tracing::warn!("No supported image files found at {:?}", args.input);
        return Ok(());
    }
    tracing::info!("Found {} image(s) to embed", files.len());

    let mut classifier = FaceClassifier::from_config(&config.model).with_context(|| {
        format!(
            "Failed to load face model from {}",
            config.model.resource_dir().display()
        )
    })?;

    let format = args
        .format
        .map(CoreOutputFormat::from)
        .unwrap_or_else(|| CoreOutputFormat::from_config(&config.output));
    let pretty = args.pretty || config.output.pretty;
    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut writer = OutputWriter::new(sink, format, pretty);

    let single = args.input.is_file();
    let progress = if single {
        indicatif::ProgressBar::hidden()
    } else {
        create_progress_bar(files.len() as u64)
    };

    let mut stats = ExtractionStats::default();
    let mut results = Vec::new();
    let start_time = Instant::now();

    for chunk in files.chunks(args.batch_size) {
        let faces = load_chunk(chunk, classifier.input_size(), args.face, &mut stats);

        for record in embed_chunk(&mut classifier, faces, args.face, &mut stats) {
            if format.is_streaming() {
                writer.write(&record)?;
            } else {
                results.push(record);
            }
        }

        progress.inc(chunk.len() as u64);
        let elapsed = start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let processed = stats.succeeded + stats.failed;
            progress.set_message(format!("{:.1} faces/sec", processed as f64 / elapsed));
        }
    }

    if !format.is_streaming() {
        match results.as_slice() {
            [only] if single => writer.write(only)?,
            _ => writer.write_all(&results)?,
        }
    }
    writer.flush()?;
    classifier.close();

    stats.finish(start_time.elapsed().as_secs_f64());
    progress.finish_and_clear();

    if let Some(path) = &args.output {
        tracing::info!("Output written to {:?}", path);
    }
    if !single {
        print_summary(&stats);
    }
    if stats.succeeded == 0 {
        anyhow::bail!("No faces could be embedded ({} failed)", stats.failed);
    }

    Ok(())
}

fn apply_overrides(args: &EmbedArgs, config: &mut Config) {
    if let Some(side) = args.input_size {
        config.model.input_size = side;
    }
    if let Some(threads) = args.threads {
        config.model.num_threads = threads;
    }
    if args.quantized {
        config.model.quantized = true;
    }
    if args.normalize {
        config.model.normalize = true;
    }
}

/// Decode every file in the chunk, counting failures.
fn load_chunk(
    chunk: &[PathBuf],
    side: u32,
    face: Option<FaceRect>,
    stats: &mut ExtractionStats,
) -> Vec<LoadedFace> {
    chunk
        .iter()
        .filter_map(|path| match load_face(path, side, face) {
            Ok(loaded) => Some(loaded),
            Err(e) => {
                stats.failed += 1;
                tracing::error!("Failed: {:?} - {e:#}", path);
                None
            }
        })
        .collect()
}

/// Embed one chunk of decoded faces. A single face goes through the
/// per-image path; larger chunks share one backend invocation.
fn embed_chunk(
    classifier: &mut FaceClassifier,
    faces: Vec<LoadedFace>,
    face: Option<FaceRect>,
    stats: &mut ExtractionStats,
) -> Vec<FaceEmbedding> {
    let embeddings: Vec<Option<Vec<f32>>> = match faces.as_slice() {
        [] => return vec![],
        [one] => vec![classifier.recognize(&one.bitmap).ok()],
        many => {
            let bitmaps: Vec<Bitmap> = many.iter().map(|f| f.bitmap.clone()).collect();
            match classifier.recognize_batch(&bitmaps) {
                Ok(rows) => rows.into_iter().map(Some).collect(),
                Err(_) => vec![None; many.len()],
            }
        }
    };

    let input_size = classifier.input_size();
    faces
        .into_iter()
        .zip(embeddings)
        .filter_map(|(loaded, embedding)| match embedding {
            Some(embedding) => {
                stats.succeeded += 1;
                Some(to_record(loaded, face, input_size, embedding))
            }
            None => {
                stats.failed += 1;
                tracing::error!("Failed: {:?} - embedding extraction failed", loaded.path);
                None
            }
        })
        .collect()
}

fn to_record(
    loaded: LoadedFace,
    face: Option<FaceRect>,
    input_size: u32,
    embedding: Vec<f32>,
) -> FaceEmbedding {
    let file_name = loaded
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    FaceEmbedding {
        file_path: loaded.path,
        file_name,
        width: loaded.width,
        height: loaded.height,
        face,
        input_size,
        embedding,
    }
}

/// Decode an image and turn it (or the given face region) into a
/// `side × side` bitmap.
pub(crate) fn load_face(
    path: &Path,
    side: u32,
    face: Option<FaceRect>,
) -> anyhow::Result<LoadedFace> {
    let image = image::open(path).with_context(|| format!("Failed to decode {:?}", path))?;
    let bitmap = match face {
        Some(rect) => Bitmap::crop_resized(&image, rect, side)
            .with_context(|| format!("Face region {rect:?} lies outside {:?}", path))?,
        None => Bitmap::from_image_resized(&image, side),
    };
    Ok(LoadedFace {
        path: path.to_path_buf(),
        width: image.width(),
        height: image.height(),
        bitmap,
    })
}

/// Find supported images at a path, recursing into directories.
/// Results are sorted for deterministic output.
pub(crate) fn discover(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return if is_supported(path) {
            vec![path.to_path_buf()]
        } else {
            vec![]
        };
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_supported(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn parse_face_rect(s: &str) -> Result<FaceRect, String> {
    let parts: Vec<u32> = s
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid face region {s:?}: {e}"))?;
    match parts.as_slice() {
        &[x, y, width, height] if width > 0 && height > 0 => Ok(FaceRect {
            x,
            y,
            width,
            height,
        }),
        &[_, _, _, _] => Err("face region width and height must be > 0".to_string()),
        _ => Err(format!("expected X,Y,WIDTH,HEIGHT, got {s:?}")),
    }
}

fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .map(|style| style.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

fn print_summary(stats: &ExtractionStats) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", stats.succeeded);
    if stats.failed > 0 {
        eprintln!("    Failed:       {:>8}", stats.failed);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", stats.succeeded + stats.failed);
    eprintln!("    Duration:     {:>7.1}s", stats.total_seconds);
    eprintln!("    Rate:         {:>7.1} faces/sec", stats.images_per_second);
    eprintln!("  ====================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("b.JPG"), b"x").unwrap();
        std::fs::write(dir.path().join("a.png"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(nested.join("c.webp"), b"x").unwrap();

        let files = discover(dir.path());
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "b.JPG", "c.webp"]);
    }

    #[test]
    fn test_discover_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("face.jpeg");
        let text = dir.path().join("face.txt");
        std::fs::write(&image, b"x").unwrap();
        std::fs::write(&text, b"x").unwrap();

        assert_eq!(discover(&image), vec![image.clone()]);
        assert!(discover(&text).is_empty());
    }

    #[test]
    fn test_parse_face_rect() {
        assert_eq!(
            parse_face_rect("10, 20,100,120").unwrap(),
            FaceRect {
                x: 10,
                y: 20,
                width: 100,
                height: 120
            }
        );
        assert!(parse_face_rect("10,20,0,5").is_err());
        assert!(parse_face_rect("1,2,3").is_err());
        assert!(parse_face_rect("a,b,c,d").is_err());
    }

    #[test]
    fn test_load_face_resizes_to_side() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.png");
        image::RgbImage::from_pixel(40, 30, image::Rgb([200, 10, 10]))
            .save(&path)
            .unwrap();

        let loaded = load_face(&path, 16, None).unwrap();
        assert_eq!((loaded.width, loaded.height), (40, 30));
        assert_eq!(loaded.bitmap.width(), 16);
        assert_eq!(loaded.bitmap.height(), 16);

        let rect = FaceRect {
            x: 35,
            y: 0,
            width: 10,
            height: 10,
        };
        let cropped = load_face(&path, 8, Some(rect)).unwrap();
        assert_eq!(cropped.bitmap.width(), 8);
    }

    #[test]
    fn test_load_face_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(load_face(&path, 16, None).is_err());
    }

    #[test]
    fn test_overrides_apply_to_model_config() {
        let args = EmbedArgs {
            input: PathBuf::from("faces"),
            output: None,
            format: None,
            pretty: false,
            batch_size: 4,
            face: None,
            input_size: Some(160),
            quantized: true,
            normalize: false,
            threads: Some(2),
        };
        let mut config = Config::default();
        apply_overrides(&args, &mut config);
        assert_eq!(config.model.input_size, 160);
        assert!(config.model.quantized);
        assert_eq!(config.model.num_threads, 2);
        assert!(!config.model.normalize);
    }
}
