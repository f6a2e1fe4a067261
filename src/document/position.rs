// src/document/position.rs
// Maps byte offsets into a document to 1-based (line, column) pairs.
// Columns count characters, not bytes, so non-ASCII text lines up with editors.

pub struct LineIndex<'a> {
    text: &'a str,
    /// Byte offset at which each line starts
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        LineIndex { text, starts }
    }

    pub fn position(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.text.len());
        // partition_point gives the number of line starts <= offset
        let line = self.starts.partition_point(|&start| start <= offset).max(1);
        let start = self.starts[line - 1];
        let column = self
            .text
            .get(start..offset)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(offset - start);
        (line, column + 1)
    }
}
