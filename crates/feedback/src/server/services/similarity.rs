/// Calculate cosine similarity between two embeddings
///
/// Vectors of different length or with zero magnitude are treated as
/// unrelated.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
  if a.len() != b.len() {
    return 0.0;
  }

  let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
  let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
  let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

  if magnitude_a == 0.0 || magnitude_b == 0.0 {
    0.0
  } else {
    dot_product / (magnitude_a * magnitude_b)
  }
}

/// Convert a cosine distance as reported by vector stores into a similarity
pub fn cosine_distance_to_similarity(distance: f32) -> f32 {
  1.0 - distance
}
