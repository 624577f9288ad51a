use crate::error::ConfigError;
use crate::models::{IngestionOptions, TextChunk};

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::InvalidChunking(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(ConfigError::InvalidChunking(format!(
                "overlap {chunk_overlap} must be smaller than chunk size {chunk_size}"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }
}

impl TryFrom<&IngestionOptions> for ChunkingConfig {
    type Error = ConfigError;

    fn try_from(value: &IngestionOptions) -> Result<Self, Self::Error> {
        Self::new(value.chunk_size, value.chunk_overlap)
    }
}

pub fn split_text_into_chunks(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<TextChunk>, ConfigError> {
    let config = ChunkingConfig::new(chunk_size, chunk_overlap)?;
    Ok(chunk_with_config(text, config))
}

pub fn chunk_with_config(text: &str, config: ChunkingConfig) -> Vec<TextChunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total {
        let mut end = (start + config.chunk_size).min(total);

        if end < total {
            end = start + break_point(&chars[start..end], config.chunk_overlap);
        }

        let piece: String = chars[start..end].iter().collect();
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            chunks.push(TextChunk {
                text: trimmed.to_string(),
                index: chunks.len(),
                start_offset: start,
                end_offset: end,
            });
        }

        if end >= total {
            break;
        }

        // break_point never returns less than overlap + 1, the max only
        // guards the invariant.
        start = end.saturating_sub(config.chunk_overlap).max(start + 1);
    }

    chunks
}

fn break_point(window: &[char], overlap: usize) -> usize {
    let usable = |position: Option<usize>| position.filter(|found| *found >= overlap);

    usable(window.iter().rposition(|c| *c == '\n'))
        .or_else(|| usable(window.iter().rposition(|c| *c == ' ')))
        .map(|found| found + 1)
        .unwrap_or(window.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(total_chars: usize) -> String {
        "abcdefghi ".repeat(total_chars / 10)
    }

    fn slice(text: &str, chunk: &TextChunk) -> String {
        text.chars()
            .skip(chunk.start_offset)
            .take(chunk.end_offset - chunk.start_offset)
            .collect()
    }

    #[test]
    fn empty_and_whitespace_input_yields_nothing() {
        assert!(split_text_into_chunks("", 10, 2).unwrap().is_empty());
        assert!(split_text_into_chunks(" \n\t  ", 10, 2).unwrap().is_empty());
    }

    #[test]
    fn overlap_not_smaller_than_size_is_rejected() {
        assert!(split_text_into_chunks("text", 10, 10).is_err());
        assert!(split_text_into_chunks("text", 10, 12).is_err());
        assert!(split_text_into_chunks("text", 0, 0).is_err());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = split_text_into_chunks("  hello vault  ", 100, 20).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello vault");
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[0].end_offset, 15);
    }

    #[test]
    fn default_sizes_split_2400_chars_into_three_overlapping_chunks() {
        let text = words(2_400);
        let chunks = split_text_into_chunks(&text, 1_000, 200).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[0].end_offset, 1_000);
        assert_eq!(chunks[1].start_offset, 800);
        assert_eq!(chunks[1].end_offset, 1_800);
        assert_eq!(chunks[2].start_offset, 1_600);
        assert_eq!(chunks[2].end_offset, 2_400);
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end_offset - pair[1].start_offset, 200);
        }
    }

    #[test]
    fn prefers_newline_over_space_when_past_the_overlap() {
        let text = "first line here\nsecond line continues on and on";
        let chunks = split_text_into_chunks(text, 24, 4).unwrap();
        assert_eq!(chunks[0].text, "first line here");
        assert_eq!(chunks[0].end_offset, 16);
        assert_eq!(chunks[1].start_offset, 12);
    }

    #[test]
    fn hard_cut_when_no_boundary_after_overlap() {
        let text = "x".repeat(25);
        let chunks = split_text_into_chunks(&text, 10, 3).unwrap();
        let spans: Vec<_> = chunks
            .iter()
            .map(|chunk| (chunk.start_offset, chunk.end_offset))
            .collect();
        assert_eq!(spans, vec![(0, 10), (7, 17), (14, 24), (21, 25)]);
    }

    #[test]
    fn chunks_are_ordered_bounded_and_cover_the_text() {
        let text = "Pump XY-500 maintenance.\nCheck the seals every month.\n\n\
                    Replace filters when pressure drops below 2 bar. \
                    Serial numbers are stamped on the housing plate near the inlet."
            .repeat(7);
        let total = text.chars().count();
        let chunks = split_text_into_chunks(&text, 120, 30).unwrap();

        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks.last().unwrap().end_offset, total);

        for (position, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, position);
            assert!(chunk.start_offset < chunk.end_offset);
            assert!(chunk.end_offset <= total);
            assert!(chunk.text.chars().count() <= 120);
            assert_eq!(chunk.text, slice(&text, chunk).trim());
        }

        for pair in chunks.windows(2) {
            assert!(pair[1].start_offset > pair[0].start_offset);
            assert!(pair[1].start_offset <= pair[0].end_offset);
        }

        let mut rebuilt = String::new();
        let mut covered = 0;
        for chunk in &chunks {
            let fresh: String = text
                .chars()
                .skip(covered.max(chunk.start_offset))
                .take(chunk.end_offset.saturating_sub(covered.max(chunk.start_offset)))
                .collect();
            rebuilt.push_str(&fresh);
            covered = chunk.end_offset;
        }
        let strip = |value: &str| value.split_whitespace().collect::<String>();
        assert_eq!(strip(&rebuilt), strip(&text));
    }

    #[test]
    fn chunking_is_deterministic() {
        let text = words(3_333);
        let first = split_text_into_chunks(&text, 500, 50).unwrap();
        let second = split_text_into_chunks(&text, 500, 50).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn multibyte_text_is_split_on_characters() {
        let text = "é".repeat(30);
        let chunks = split_text_into_chunks(&text, 10, 2).unwrap();
        assert!(chunks.iter().all(|chunk| chunk.text.chars().count() <= 10));
        assert_eq!(chunks.last().unwrap().end_offset, 30);
    }
}
