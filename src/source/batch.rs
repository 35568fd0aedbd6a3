use crate::nem12::record::split_line;

/// A contiguous, 1-indexed range of lines from the source file.
///
/// `lines()[i]` is the text of line `start_line() + i`. Batches are not
/// modified after they are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    start_line: usize,
    end_line: usize,
    lines: Vec<String>,
}

impl Batch {
    pub fn start_line(&self) -> usize {
        self.start_line
    }

    pub fn end_line(&self) -> usize {
        self.end_line
    }

    /// Raw text of each line, in file order
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Comma-split fields of each line
    pub fn raw_lines(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.lines.iter().map(|line| split_line(line))
    }
}

/// Accumulates consecutive lines into the next batch.
#[derive(Debug, Default)]
pub struct BatchBuilder {
    start_line: Option<usize>,
    end_line: usize,
    lines: Vec<String>,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line. Line numbers must be consecutive.
    pub fn push(&mut self, line_number: usize, text: String) {
        debug_assert!(
            self.start_line.is_none() || line_number == self.end_line + 1,
            "line {} does not follow line {}",
            line_number,
            self.end_line
        );

        self.start_line.get_or_insert(line_number);
        self.end_line = line_number;
        self.lines.push(text);
    }

    /// Complete the current batch and start an empty one.
    /// Returns None if no lines were pushed since the last take.
    pub fn take(&mut self) -> Option<Batch> {
        let start_line = self.start_line.take()?;
        Some(Batch {
            start_line,
            end_line: self.end_line,
            lines: std::mem::take(&mut self.lines),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_empty_builder() {
        let mut builder = BatchBuilder::new();
        assert!(builder.take().is_none());
    }

    #[test]
    fn test_batch_line_range() {
        let mut builder = BatchBuilder::new();
        builder.push(1, "100,NEM12".to_string());
        builder.push(2, "200,NMI".to_string());

        let batch = builder.take().unwrap();
        assert_eq!(batch.start_line(), 1);
        assert_eq!(batch.end_line(), 2);
        assert_eq!(batch.lines(), &["100,NEM12".to_string(), "200,NMI".to_string()]);
        assert!(builder.take().is_none());
    }

    #[test]
    fn test_consecutive_batches_are_contiguous() {
        let mut builder = BatchBuilder::new();
        builder.push(1, "a".to_string());
        builder.push(2, "b".to_string());
        let first = builder.take().unwrap();

        builder.push(3, "c".to_string());
        let second = builder.take().unwrap();

        assert_eq!(first.end_line() + 1, second.start_line());
        assert_eq!(second.start_line(), 3);
        assert_eq!(second.end_line(), 3);
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_raw_lines_split_fields() {
        let mut builder = BatchBuilder::new();
        builder.push(7, "500,O,S01009,20050310121004,".to_string());
        let batch = builder.take().unwrap();

        let raw: Vec<_> = batch.raw_lines().collect();
        assert_eq!(raw, vec![vec!["500", "O", "S01009", "20050310121004", ""]]);
    }
}
