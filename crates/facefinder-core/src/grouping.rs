//! Grouping of face embeddings into persons.
//!
//! Two faces are identical when their Euclidean distance is strictly below
//! the threshold (`[matching] identical_threshold`). A person is a connected
//! set of identical faces: a face joins a group when it is identical to any
//! face already in it, so chains of close faces end up together even when
//! their endpoints are far apart.
//!
//! Persons are numbered by size, largest first. Groups of equal size keep the
//! order of their first face in the input.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::GroupingError;
use crate::math::euclidean_distance;
use crate::types::FaceEmbedding;

/// One person found by [`group_faces`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonGroup {
    /// Person index, `0` is the largest group
    pub person: usize,

    /// Indices of the member faces in the input, ascending
    pub faces: Vec<usize>,

    /// Source files of the member faces, in the same order as `faces`
    pub files: Vec<PathBuf>,
}

impl PersonGroup {
    /// Number of faces assigned to this person.
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

/// Group embedding records into persons.
///
/// Every record must have the same number of dimensions.
pub fn group_faces(
    records: &[FaceEmbedding],
    threshold: f32,
) -> Result<Vec<PersonGroup>, GroupingError> {
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(GroupingError::InvalidThreshold(threshold));
    }

    if let Some(first) = records.first() {
        let expected = first.dimensions();
        if let Some((index, record)) = records
            .iter()
            .enumerate()
            .find(|(_, r)| r.dimensions() != expected)
        {
            return Err(GroupingError::DimensionMismatch {
                index,
                file: record.file_name.clone(),
                expected,
                actual: record.dimensions(),
            });
        }
    }

    let vectors: Vec<&[f32]> = records.iter().map(|r| r.embedding.as_slice()).collect();
    let clusters = cluster(&vectors, threshold);

    let persons: Vec<PersonGroup> = clusters
        .into_iter()
        .enumerate()
        .map(|(person, faces)| PersonGroup {
            person,
            files: faces
                .iter()
                .map(|&i| records[i].file_path.clone())
                .collect(),
            faces,
        })
        .collect();

    tracing::debug!(
        "Grouped {} faces into {} persons (threshold {})",
        records.len(),
        persons.len(),
        threshold
    );

    Ok(persons)
}

/// Connected components of the "distance below threshold" graph, largest
/// first. Member indices are ascending within each component.
fn cluster(vectors: &[&[f32]], threshold: f32) -> Vec<Vec<usize>> {
    let mut assigned = vec![false; vectors.len()];
    let mut clusters = Vec::new();

    for start in 0..vectors.len() {
        if assigned[start] {
            continue;
        }
        assigned[start] = true;

        let mut members = vec![start];
        let mut frontier = vec![start];
        while let Some(current) = frontier.pop() {
            for candidate in 0..vectors.len() {
                if assigned[candidate] {
                    continue;
                }
                let identical = euclidean_distance(vectors[current], vectors[candidate])
                    .is_some_and(|d| d < threshold);
                if identical {
                    assigned[candidate] = true;
                    members.push(candidate);
                    frontier.push(candidate);
                }
            }
        }

        members.sort_unstable();
        clusters.push(members);
    }

    // Stable, so equal sizes keep first-seen order.
    clusters.sort_by(|a, b| b.len().cmp(&a.len()));
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, embedding: Vec<f32>) -> FaceEmbedding {
        FaceEmbedding {
            file_path: PathBuf::from(format!("/faces/{name}")),
            file_name: name.to_string(),
            width: 112,
            height: 112,
            face: None,
            input_size: 112,
            embedding,
        }
    }

    #[test]
    fn test_identical_faces_share_a_person() {
        let records = vec![
            record("a1.jpg", vec![0.0, 0.0]),
            record("b1.jpg", vec![5.0, 5.0]),
            record("a2.jpg", vec![0.3, 0.1]),
            record("b2.jpg", vec![5.2, 4.9]),
            record("a3.jpg", vec![0.1, 0.4]),
        ];

        let persons = group_faces(&records, 1.0).unwrap();
        assert_eq!(persons.len(), 2);
        assert_eq!(persons[0].person, 0);
        assert_eq!(persons[0].faces, vec![0, 2, 4]);
        assert_eq!(persons[1].person, 1);
        assert_eq!(persons[1].faces, vec![1, 3]);
        assert_eq!(
            persons[1].files,
            vec![PathBuf::from("/faces/b1.jpg"), PathBuf::from("/faces/b2.jpg")]
        );
    }

    #[test]
    fn test_distant_faces_are_separate_persons() {
        let records = vec![
            record("a.jpg", vec![0.0, 0.0]),
            record("b.jpg", vec![3.0, 0.0]),
            record("c.jpg", vec![0.0, 3.0]),
        ];

        let persons = group_faces(&records, 1.0).unwrap();
        assert_eq!(persons.len(), 3);
        assert!(persons.iter().all(|p| p.len() == 1));
        // Equal sizes keep input order.
        let firsts: Vec<usize> = persons.iter().map(|p| p.faces[0]).collect();
        assert_eq!(firsts, vec![0, 1, 2]);
    }

    #[test]
    fn test_chain_joins_through_any_member() {
        // a and c are 1.6 apart, but b is within 0.8 of both.
        let records = vec![
            record("a.jpg", vec![0.0]),
            record("c.jpg", vec![1.6]),
            record("far.jpg", vec![10.0]),
            record("b.jpg", vec![0.8]),
        ];

        let persons = group_faces(&records, 1.0).unwrap();
        assert_eq!(persons.len(), 2);
        assert_eq!(persons[0].faces, vec![0, 1, 3]);
        assert_eq!(persons[1].faces, vec![2]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let records = vec![record("a.jpg", vec![0.0]), record("b.jpg", vec![1.0])];

        assert_eq!(group_faces(&records, 1.0).unwrap().len(), 2);
        assert_eq!(group_faces(&records, 1.01).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_input_has_no_persons() {
        assert!(group_faces(&[], 1.0).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_mixed_dimensions() {
        let records = vec![
            record("a.jpg", vec![0.0, 0.0]),
            record("b.jpg", vec![0.0, 0.0, 0.0]),
        ];

        let err = group_faces(&records, 1.0).unwrap_err();
        assert!(matches!(
            err,
            GroupingError::DimensionMismatch {
                index: 1,
                expected: 2,
                actual: 3,
                ..
            }
        ));
        assert!(err.to_string().contains("b.jpg"));
    }

    #[test]
    fn test_rejects_invalid_threshold() {
        let records = vec![record("a.jpg", vec![0.0])];
        assert!(group_faces(&records, 0.0).is_err());
        assert!(group_faces(&records, -1.0).is_err());
        assert!(group_faces(&records, f32::NAN).is_err());
    }
}
