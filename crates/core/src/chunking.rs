use crate::models::{Chunk, ChunkingConfig};

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split on `separator`, each piece keeping its trailing separator so that
/// concatenating the pieces reproduces the input exactly. An empty separator
/// splits between characters.
fn split_keep_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }

    let mut pieces = Vec::new();
    let mut rest = text;
    while let Some(position) = rest.find(separator) {
        let end = position + separator.len();
        pieces.push(rest[..end].to_string());
        rest = &rest[end..];
    }
    if !rest.is_empty() {
        pieces.push(rest.to_string());
    }

    pieces
}

fn split_recursive(text: &str, max_chars: usize, separators: &[String]) -> Vec<String> {
    if char_len(text) <= max_chars {
        return vec![text.to_string()];
    }

    let Some((separator, finer)) = separators.split_first() else {
        // No separator left to split on: one oversized piece.
        return vec![text.to_string()];
    };

    if !separator.is_empty() && !text.contains(separator.as_str()) {
        return split_recursive(text, max_chars, finer);
    }

    let mut pieces = Vec::new();
    for piece in split_keep_separator(text, separator) {
        if char_len(&piece) <= max_chars {
            pieces.push(piece);
        } else {
            pieces.extend(split_recursive(&piece, max_chars, finer));
        }
    }

    pieces
}

fn merge_pieces(pieces: Vec<String>, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: Vec<String> = Vec::new();
    let mut window_len = 0usize;

    for piece in pieces {
        let piece_len = char_len(&piece);

        if !window.is_empty() && window_len + piece_len > max_chars {
            chunks.push(window.concat());

            if overlap_chars == 0 {
                window.clear();
                window_len = 0;
            } else {
                while !window.is_empty()
                    && (window_len > overlap_chars || window_len + piece_len > max_chars)
                {
                    let dropped = window.remove(0);
                    window_len -= char_len(&dropped);
                }
            }
        }

        window_len += piece_len;
        window.push(piece);
    }

    if !window.is_empty() {
        chunks.push(window.concat());
    }

    chunks
}

/// Split `text` into chunks by trying each separator in order, coarsest
/// first, re-splitting oversized pieces with the finer separators and
/// greedily merging adjacent small pieces back up to `max_chars`. With
/// `overlap_chars == 0`, concatenating the chunks in `source_order`
/// reconstructs the input exactly.
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    if text.is_empty() {
        return Vec::new();
    }

    let max_chars = config.max_chars.max(1);
    let pieces = split_recursive(text, max_chars, &config.separators);

    merge_pieces(pieces, max_chars, config.overlap_chars)
        .into_iter()
        .enumerate()
        .map(|(source_order, text)| Chunk { source_order, text })
        .collect()
}
