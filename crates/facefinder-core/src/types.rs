//! Record types written by the command line tools.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::bitmap::FaceRect;

/// The embedding extracted from one image file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceEmbedding {
    /// Path to the source image
    pub file_path: PathBuf,

    /// File name without directory
    pub file_name: String,

    /// Source image width in pixels
    pub width: u32,

    /// Source image height in pixels
    pub height: u32,

    /// Face region the embedding was taken from; the whole image when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face: Option<FaceRect>,

    /// Model input side the face was resized to
    pub input_size: u32,

    /// Embedding vector
    pub embedding: Vec<f32>,
}

impl FaceEmbedding {
    /// Number of embedding dimensions.
    pub fn dimensions(&self) -> usize {
        self.embedding.len()
    }
}

/// Result of comparing two face embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceComparison {
    pub first: PathBuf,
    pub second: PathBuf,

    /// Euclidean distance between the two embeddings
    pub distance: f32,

    /// Cosine similarity in `[-1, 1]`
    pub cosine_similarity: f32,

    /// Distance threshold the verdict was made against
    pub threshold: f32,

    /// True when `distance < threshold`
    pub same_person: bool,
}

impl FaceComparison {
    /// Build a comparison, deciding `same_person` from the threshold.
    pub fn new(
        first: PathBuf,
        second: PathBuf,
        distance: f32,
        cosine_similarity: f32,
        threshold: f32,
    ) -> Self {
        Self {
            first,
            second,
            distance,
            cosine_similarity,
            threshold,
            same_person: distance < threshold,
        }
    }
}

/// Statistics for a batch extraction run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExtractionStats {
    /// Images embedded successfully
    pub succeeded: usize,

    /// Images that failed to decode or embed
    pub failed: usize,

    /// Images per second
    pub images_per_second: f64,

    /// Total run time in seconds
    pub total_seconds: f64,
}

impl ExtractionStats {
    /// Record the elapsed time and derive the rate from it.
    pub fn finish(&mut self, elapsed_seconds: f64) {
        self.total_seconds = elapsed_seconds;
        self.images_per_second = if elapsed_seconds > 0.0 {
            (self.succeeded + self.failed) as f64 / elapsed_seconds
        } else {
            0.0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_embedding() -> FaceEmbedding {
        FaceEmbedding {
            file_path: PathBuf::from("/faces/alice.jpg"),
            file_name: "alice.jpg".to_string(),
            width: 640,
            height: 480,
            face: None,
            input_size: 112,
            embedding: vec![0.1, 0.2, 0.3],
        }
    }

    #[test]
    fn test_embedding_skips_missing_face() {
        let json = serde_json::to_string(&sample_embedding()).unwrap();
        assert!(!json.contains("\"face\""));
        assert!(json.contains("\"file_name\":\"alice.jpg\""));

        let parsed: FaceEmbedding = serde_json::from_str(&json).unwrap();
        assert!(parsed.face.is_none());
        assert_eq!(parsed.dimensions(), 3);
    }

    #[test]
    fn test_embedding_with_face_rect() {
        let mut record = sample_embedding();
        record.face = Some(FaceRect {
            x: 10,
            y: 20,
            width: 100,
            height: 120,
        });
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"face\":{\"x\":10,\"y\":20,\"width\":100,\"height\":120}"));
    }

    #[test]
    fn test_comparison_threshold_is_strict() {
        let a = PathBuf::from("a.jpg");
        let b = PathBuf::from("b.jpg");
        assert!(FaceComparison::new(a.clone(), b.clone(), 0.4, 0.9, 1.0).same_person);
        assert!(!FaceComparison::new(a.clone(), b.clone(), 1.0, 0.5, 1.0).same_person);
        assert!(!FaceComparison::new(a, b, 1.7, -0.2, 1.0).same_person);
    }

    #[test]
    fn test_stats_rate() {
        let mut stats = ExtractionStats {
            succeeded: 8,
            failed: 2,
            ..Default::default()
        };
        stats.finish(2.0);
        assert_eq!(stats.images_per_second, 5.0);

        let mut empty = ExtractionStats::default();
        empty.finish(0.0);
        assert_eq!(empty.images_per_second, 0.0);
    }
}
