//! Feeding the [`Parser`] from an [`AsyncRead`] byte stream, so the document
//! can be received with non-blocking I/O.

use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::errors::Result;
use crate::reader::Parser;
use crate::tree::Document;

impl Parser {
    /// Feeds the whole content of `source`, read in chunks of at most
    /// `chunk_size` bytes. [`done`](Self::done) must still be called.
    pub async fn feed_from_async<R: AsyncRead + Unpin>(
        &mut self,
        mut source: R,
        chunk_size: usize,
    ) -> Result<()> {
        let mut buf = vec![0; chunk_size.max(1)];
        loop {
            let len = match source.read(&mut buf).await {
                Ok(0) => return Ok(()),
                Ok(len) => len,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return self.record(Err(e.into())),
            };
            self.feed(&buf[..len])?;
        }
    }
}

/// Reads `source` to the end in chunks of `chunk_size` bytes and parses it.
///
/// ```
/// # use dav_xml::reader::parse_from_async_source;
/// # tokio_test::block_on(async {
/// let doc = parse_from_async_source(&b"<a>text</a>"[..], 2).await.unwrap();
/// assert_eq!(doc.root().first_cdata(), "text");
/// # })
/// ```
pub async fn parse_from_async_source<R: AsyncRead + Unpin>(
    source: R,
    chunk_size: usize,
) -> Result<Document> {
    let mut parser = Parser::new();
    parser.feed_from_async(source, chunk_size).await?;
    parser.done()
}
