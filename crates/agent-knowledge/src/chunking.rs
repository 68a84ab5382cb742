//! Overlapping word-window chunking.

/// Window width and overlap, in words
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkConfig {
    pub size: usize,
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size: 800,
            overlap: 150,
        }
    }
}

impl ChunkConfig {
    /// Words between the starts of consecutive windows
    pub const fn step(&self) -> usize {
        let step = self.size.saturating_sub(self.overlap);
        if step == 0 { 1 } else { step }
    }
}

/// Split `text` on whitespace and emit windows of `size` words starting at
/// every multiple of `step` below the word count. Windows near the end may be
/// shorter than `size`.
pub fn chunk_text(text: &str, config: &ChunkConfig) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let size = config.size.max(1);
    let step = config.step();

    let mut chunks = Vec::with_capacity(words.len().div_ceil(step));
    let mut start = 0;
    while start < words.len() {
        let end = (start + size).min(words.len());
        chunks.push(words[start..end].join(" "));
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn empty_and_whitespace_yield_nothing() {
        assert!(chunk_text("", &ChunkConfig::default()).is_empty());
        assert!(chunk_text(" \n\t ", &ChunkConfig::default()).is_empty());
    }

    #[test]
    fn short_text_is_one_window() {
        let chunks = chunk_text("alpha   beta\n\ngamma", &ChunkConfig::default());
        assert_eq!(chunks, vec!["alpha beta gamma"]);
    }

    #[test]
    fn window_count_follows_stride() {
        let config = ChunkConfig::default();
        for (n, expected) in [(650, 1), (651, 2), (700, 2), (800, 2), (1450, 3), (2000, 4)] {
            assert_eq!(chunk_text(&numbered(n), &config).len(), expected, "n = {n}");
        }
    }

    #[test]
    fn tail_words_land_in_a_window() {
        let config = ChunkConfig::default();
        let chunks = chunk_text(&numbered(800), &config);
        assert_eq!(chunks[0].split(' ').count(), 800);
        assert_eq!(chunks[1].split(' ').count(), 150);
        assert!(chunks[1].ends_with("w799"));
    }

    #[test]
    fn stride_prefixes_rebuild_the_text() {
        let config = ChunkConfig { size: 5, overlap: 2 };
        let text = numbered(12);
        let chunks = chunk_text(&text, &config);

        assert_eq!(chunks.len(), 4);
        let mut rebuilt: Vec<String> = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let words: Vec<&str> = chunk.split(' ').collect();
            let take = if i + 1 == chunks.len() { words.len() } else { config.step() };
            rebuilt.extend(words[..take].iter().map(|w| (*w).to_string()));
        }
        assert_eq!(rebuilt.join(" "), text);
    }

    #[test]
    fn overlap_at_least_size_still_advances() {
        let config = ChunkConfig { size: 2, overlap: 5 };
        assert_eq!(config.step(), 1);
        assert_eq!(chunk_text("a b c", &config), vec!["a b", "b c", "c"]);
    }
}
