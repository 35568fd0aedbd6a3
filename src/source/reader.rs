use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("failed to open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

const BYTE_ORDER_MARK: char = '\u{feff}';

/// One line of input with its 1-indexed position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedLine {
    pub number: usize,
    pub text: String,
}

/// Reads a line-oriented source in order, numbering lines from 1.
///
/// Line terminators (`\n` or `\r\n`) and a byte order mark at the start of the
/// first line are stripped. Invalid UTF-8 is a read error.
pub struct LineReader<R> {
    lines: Lines<R>,
    lines_read: usize,
}

impl LineReader<BufReader<File>> {
    /// Open a file for reading
    pub async fn open(path: &Path) -> Result<Self, ReaderError> {
        let file = File::open(path).await.map_err(|source| ReaderError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            lines: source.lines(),
            lines_read: 0,
        }
    }

    /// Read the next line, or None at end of input
    pub async fn next_line(&mut self) -> Result<Option<NumberedLine>, ReaderError> {
        let number = self.lines_read + 1;
        let text = self
            .lines
            .next_line()
            .await
            .map_err(|source| ReaderError::Read {
                line: number,
                source,
            })?;

        Ok(text.map(|mut text| {
            if number == 1 && text.starts_with(BYTE_ORDER_MARK) {
                text.replace_range(..BYTE_ORDER_MARK.len_utf8(), "");
            }
            self.lines_read = number;
            NumberedLine { number, text }
        }))
    }

    /// Number of lines returned so far
    pub fn lines_read(&self) -> usize {
        self.lines_read
    }
}
