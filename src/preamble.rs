use async_std::io::{prelude::*, BufRead, Seek, SeekFrom};

use crate::{
    error::Error,
    record::{decode_record, Dialect},
    Result,
};

/// Everything in front of the first data row
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Preamble {
    /// Column names. Empty if the file has no header line
    pub headers: Vec<String>,
    /// Byte position at which the first data row begins
    pub data_offset: u64,
}

/// Skips `lines_to_skip` lines from the start of `reader` and parses the header line following
/// them if `has_header` is set.
///
/// Running out of lines is not an error. Scanning stops and the offset reached so far is returned.
pub async fn scan_preamble<R: BufRead + Seek + Unpin>(
    reader: &mut R,
    lines_to_skip: usize,
    has_header: bool,
    dialect: &Dialect,
) -> Result<Preamble> {
    reader.seek(SeekFrom::Start(0)).await?;

    let mut offset: u64 = 0;
    let mut buf = Vec::with_capacity(256);

    for _ in 0..lines_to_skip {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).await?;
        if n == 0 {
            break;
        }
        offset += n as u64;
    }

    let mut headers = Vec::new();

    if has_header {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).await?;
        offset += n as u64;

        let line = buf.trim_ascii();
        if !line.is_empty() {
            headers = decode_record(line, dialect).map_err(|_| Error::MalformedHeader)?;
        }
    }

    Ok(Preamble {
        headers,
        data_offset: offset,
    })
}

#[cfg(test)]
mod tests {
    use async_std::io::Cursor;

    use super::*;

    async fn scan(text: &str, skip: usize, has_header: bool) -> Preamble {
        let mut reader = Cursor::new(text.as_bytes().to_vec());
        scan_preamble(&mut reader, skip, has_header, &Dialect::default())
            .await
            .unwrap()
    }

    #[async_std::test]
    async fn test_header_only() {
        let p = scan("ID,Name,Amount\n1,a,2\n", 0, true).await;
        assert_eq!(p.headers, vec!["ID", "Name", "Amount"]);
        assert_eq!(p.data_offset, 15);
    }

    #[async_std::test]
    async fn test_skip_and_header() {
        let text = "Report generated today\r\n\n  ID,Name,Amount  \r\n1,a,2\n";
        let p = scan(text, 2, true).await;
        assert_eq!(p.headers, vec!["ID", "Name", "Amount"]);
        assert_eq!(&text[p.data_offset as usize..], "1,a,2\n");
    }

    #[async_std::test]
    async fn test_no_header() {
        let p = scan("junk\n1,a,2\n", 1, false).await;
        assert!(p.headers.is_empty());
        assert_eq!(p.data_offset, 5);

        let p = scan("1,a,2\n", 0, false).await;
        assert_eq!(p, Preamble::default());
    }

    #[async_std::test]
    async fn test_short_preamble() {
        // Fewer lines than requested
        let p = scan("only line", 4, true).await;
        assert!(p.headers.is_empty());
        assert_eq!(p.data_offset, 9);

        let p = scan("", 2, true).await;
        assert_eq!(p, Preamble::default());
    }

    #[async_std::test]
    async fn test_header_without_newline() {
        let p = scan("a,\"b,c\"", 0, true).await;
        assert_eq!(p.headers, vec!["a", "b,c"]);
        assert_eq!(p.data_offset, 7);
    }
}
