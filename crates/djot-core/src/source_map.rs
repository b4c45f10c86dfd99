use crate::span::Span;

/// Zero-based line/column position.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// Translates byte offsets into line/column positions for warnings.
#[derive(Clone, Debug)]
pub struct SourceMap {
    source_len: usize,
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (idx, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(idx + 1);
            }
        }
        Self {
            source_len: source.len(),
            line_starts,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.source_len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index.saturating_sub(1),
        };
        let line_start = self.line_starts[line];
        Position {
            line,
            // Byte offset from line start; columns are byte columns.
            column: offset.saturating_sub(line_start),
        }
    }

    pub fn range(&self, span: Span) -> Range {
        Range {
            start: self.position(span.start),
            end: self.position(span.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Position, SourceMap};
    use crate::span::Span;

    #[test]
    fn positions_are_line_based() {
        let source = "ab\nc\n";
        let map = SourceMap::new(source);

        assert_eq!(map.line_count(), 3);
        assert_eq!(map.position(0), Position { line: 0, column: 0 });
        assert_eq!(map.position(1), Position { line: 0, column: 1 });
        assert_eq!(map.position(3), Position { line: 1, column: 0 });
        assert_eq!(map.position(5), Position { line: 2, column: 0 });

        let range = map.range(Span::new(0, 4));
        assert_eq!(range.start.line, 0);
        assert_eq!(range.end.line, 1);
    }

    #[test]
    fn offsets_past_the_end_clamp() {
        let map = SourceMap::new("x");
        assert_eq!(map.position(99), Position { line: 0, column: 1 });
    }
}
