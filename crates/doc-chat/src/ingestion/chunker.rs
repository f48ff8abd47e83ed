//! Recursive boundary-aware text chunking
//!
//! Text is split at the largest boundary that occurs in it (paragraph,
//! sentence, whitespace, then single characters). Pieces that fit are merged
//! into chunks of at most `chunk_size` characters, each new chunk re-opening
//! with the trailing pieces of the previous one up to `overlap` characters.
//! Pieces that are too large are split again at the next boundary level.

use std::collections::VecDeque;

use unicode_segmentation::UnicodeSegmentation;

/// Boundary levels, largest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Paragraph,
    Sentence,
    Whitespace,
    Char,
}

impl Boundary {
    fn next(self) -> Option<Self> {
        match self {
            Self::Paragraph => Some(Self::Sentence),
            Self::Sentence => Some(Self::Whitespace),
            Self::Whitespace => Some(Self::Char),
            Self::Char => None,
        }
    }

    /// Split keeping each delimiter attached to the piece it ends
    fn split(self, text: &str) -> Vec<&str> {
        match self {
            Self::Paragraph => text.split_inclusive("\n\n").collect(),
            Self::Sentence => text.split_sentence_bounds().collect(),
            Self::Whitespace => text.split_inclusive(char::is_whitespace).collect(),
            Self::Char => text
                .char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect(),
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker
    ///
    /// Callers validate `overlap < chunk_size` through configuration; the
    /// values are clamped here so chunking always terminates.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Chunk size in characters
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap in characters
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split text into ordered, trimmed, non-empty chunks
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        self.split_recursive(text, Boundary::Paragraph, &mut chunks);
        chunks
    }

    fn split_recursive(&self, text: &str, level: Boundary, out: &mut Vec<String>) {
        // Use the largest boundary that actually occurs in this text
        let mut level = level;
        let mut pieces = level.split(text);
        while pieces.len() <= 1 {
            match level.next() {
                Some(next) => {
                    level = next;
                    pieces = level.split(text);
                }
                None => break,
            }
        }

        let mut fitting: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                self.merge(&fitting, out);
                fitting.clear();
            }

            match level.next() {
                Some(next) => self.split_recursive(piece, next, out),
                None => push_trimmed(piece, out),
            }
        }

        if !fitting.is_empty() {
            self.merge(&fitting, out);
        }
    }

    /// Greedily merge pieces into chunks, carrying the overlap window forward
    fn merge(&self, pieces: &[&str], out: &mut Vec<String>) {
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                push_trimmed(&window.iter().copied().collect::<String>(), out);

                while total > self.overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        if !window.is_empty() {
            push_trimmed(&window.iter().copied().collect::<String>(), out);
        }
    }
}

fn push_trimmed(chunk: &str, out: &mut Vec<String>) {
    let trimmed = chunk.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}
