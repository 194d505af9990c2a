//! Correlation of tokens, confidences and boxes, and confidence filtering.

use serde::{Deserialize, Serialize};
use tessmark_engine::BoundingBox;
use tracing::trace;

use crate::models::Rect;

/// Lengths of the three per-word sequences returned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    pub tokens: usize,
    pub confidences: usize,
    pub boxes: usize,
}

impl Alignment {
    pub fn new(tokens: usize, confidences: usize, boxes: usize) -> Self {
        Self { tokens, confidences, boxes }
    }

    /// Whether all three sequences have the same length.
    pub fn is_aligned(&self) -> bool {
        self.tokens == self.confidences && self.confidences == self.boxes
    }

    /// Number of complete `(token, confidence, box)` triples.
    pub fn paired(&self) -> usize {
        self.tokens.min(self.confidences).min(self.boxes)
    }
}

/// A word that met the confidence threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizedWord {
    /// Position in engine word order.
    pub index: usize,
    /// Token text.
    pub text: String,
    /// Engine confidence (0 - 100).
    pub confidence: i32,
    /// Box as reported by the engine.
    pub engine_box: Rect,
    /// Box in bitmap coordinates, where the highlight is drawn.
    pub highlight: Rect,
}

/// Split engine text into word tokens, dropping empty ones.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Convert an engine box into bitmap coordinates.
///
/// The engine counts rows from the first row it was given, which is the last
/// row of the bitmap, so the vertical position is mirrored:
/// `y' = height - y - h`.
pub fn to_bitmap_rect(bbox: &BoundingBox, image_height: u32) -> Rect {
    let height = i32::try_from(image_height).unwrap_or(i32::MAX);
    Rect {
        x: bbox.x,
        y: height.saturating_sub(bbox.y).saturating_sub(bbox.height),
        width: bbox.width,
        height: bbox.height,
    }
}

/// Zip tokens, confidences and boxes by position and keep the words whose
/// confidence is at least `minimum_confidence`.
///
/// Only complete triples are considered; extra entries in the longer
/// sequences are ignored.
pub fn filter_words<S: AsRef<str>>(
    tokens: &[S],
    confidences: &[i32],
    boxes: &[BoundingBox],
    minimum_confidence: i32,
    image_height: u32,
) -> Vec<RecognizedWord> {
    tokens
        .iter()
        .zip(confidences)
        .zip(boxes)
        .enumerate()
        .filter_map(|(index, ((token, &confidence), bbox))| {
            let token = token.as_ref();
            trace!("{} -> {}", token, confidence);

            if confidence < minimum_confidence {
                return None;
            }

            Some(RecognizedWord {
                index,
                text: token.to_string(),
                confidence,
                engine_box: Rect::new(bbox.x, bbox.y, bbox.width, bbox.height),
                highlight: to_bitmap_rect(bbox, image_height),
            })
        })
        .collect()
}

/// Join accepted words, each followed by a single space.
pub fn compose_text(words: &[RecognizedWord]) -> String {
    let mut text = String::new();
    for word in words {
        text.push_str(&word.text);
        text.push(' ');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bbox(x: i32, y: i32, width: i32, height: i32) -> BoundingBox {
        BoundingBox { x, y, width, height, refcount: 1 }
    }

    #[test]
    fn test_threshold_filtering() {
        let tokens = ["Hello", "World", "Foo"];
        let confidences = [80, 40, 61];
        let boxes = [bbox(0, 0, 10, 10), bbox(20, 0, 10, 10), bbox(40, 0, 10, 10)];

        let words = filter_words(&tokens, &confidences, &boxes, 60, 100);

        assert_eq!(compose_text(&words), "Hello Foo ");
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].index, 0);
        assert_eq!(words[1].index, 2);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let words = filter_words(&["edge"], &[60], &[bbox(0, 0, 1, 1)], 60, 10);
        assert_eq!(words.len(), 1);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let tokens = ["a", "b"];
        let boxes = [bbox(0, 0, 1, 1), bbox(0, 0, 1, 1)];
        assert_eq!(filter_words(&tokens, &[50, 90], &boxes, 0, 10).len(), 2);
        assert_eq!(filter_words(&tokens, &[50, 90], &boxes, 95, 10).len(), 0);
    }

    #[test]
    fn test_coordinate_conversion() {
        let rect = to_bitmap_rect(&bbox(10, 5, 20, 8), 100);
        assert_eq!(rect, Rect::new(10, 87, 20, 8));
    }

    #[test]
    fn test_shortest_sequence_bounds_pairing() {
        let tokens = ["one", "two", "three", "four"];
        let confidences = [90, 90];
        let boxes = [bbox(0, 0, 1, 1), bbox(0, 0, 1, 1), bbox(0, 0, 1, 1)];

        let words = filter_words(&tokens, &confidences, &boxes, 60, 10);
        assert_eq!(compose_text(&words), "one two ");

        let alignment = Alignment::new(tokens.len(), confidences.len(), boxes.len());
        assert!(!alignment.is_aligned());
        assert_eq!(alignment.paired(), 2);
    }

    #[test]
    fn test_tokenize_discards_empty_tokens() {
        assert_eq!(tokenize("  Hello\n\nWorld  \tFoo\n"), vec!["Hello", "World", "Foo"]);
        assert!(tokenize("\n \n").is_empty());
    }
}
