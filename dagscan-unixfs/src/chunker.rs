//! Fixed-size chunking over a streamed `FileAccessor::open_for_scan` read
//! (SPEC_FULL.md §4.2 step 1). Unlike a chunker that cuts an in-memory
//! buffer, `ChunkReader` pulls bytes as it goes so the file producer never
//! holds more than one chunk of a source file in memory at a time.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reads `chunk_size`-byte chunks off an `AsyncRead`, tracking the byte
/// offset each chunk started at.
///
/// A completely empty stream still yields exactly one (empty) chunk before
/// returning `None`, so an empty file always has at least one leaf to hang
/// a raw node off of (SPEC_FULL.md §8 S1).
pub struct ChunkReader<R> {
    inner: R,
    chunk_size: usize,
    position: u64,
    emitted_any: bool,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    pub fn new(inner: R, chunk_size: usize) -> Self {
        Self {
            inner,
            chunk_size,
            position: 0,
            emitted_any: false,
        }
    }

    /// Bytes consumed from the underlying stream so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Reads the next chunk, or `None` once the stream and the one
    /// mandatory empty-file chunk have both been exhausted.
    pub async fn next_chunk(&mut self) -> std::io::Result<Option<Bytes>> {
        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0usize;

        while filled < self.chunk_size {
            let n = self.inner.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            if self.emitted_any {
                return Ok(None);
            }
            self.emitted_any = true;
            return Ok(Some(Bytes::new()));
        }

        buf.truncate(filled);
        self.position += filled as u64;
        self.emitted_any = true;
        Ok(Some(Bytes::from(buf)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(data: &[u8], chunk_size: usize) -> Vec<Bytes> {
        let mut reader = ChunkReader::new(data, chunk_size);
        let mut chunks = Vec::new();
        while let Some(chunk) = reader.next_chunk().await.unwrap() {
            chunks.push(chunk);
        }
        chunks
    }

    #[tokio::test]
    async fn empty_stream_yields_one_empty_chunk() {
        let chunks = collect(&[], 1024).await;
        assert_eq!(chunks, vec![Bytes::new()]);
    }

    #[tokio::test]
    async fn smaller_than_chunk_size_yields_one_chunk() {
        let data = vec![7u8; 512];
        let chunks = collect(&data, 1024).await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 512);
    }

    #[tokio::test]
    async fn exact_chunk_size_yields_one_chunk() {
        let data = vec![7u8; 1024];
        let chunks = collect(&data, 1024).await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 1024);
    }

    #[tokio::test]
    async fn multiple_chunks_with_short_tail() {
        let data = vec![3u8; 3000];
        let chunks = collect(&data, 1024).await;
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 1024);
        assert_eq!(chunks[1].len(), 1024);
        assert_eq!(chunks[2].len(), 952);
    }

    #[tokio::test]
    async fn position_tracks_consumed_bytes() {
        let data = vec![1u8; 2500];
        let mut reader = ChunkReader::new(&data[..], 1024);
        reader.next_chunk().await.unwrap();
        assert_eq!(reader.position(), 1024);
        reader.next_chunk().await.unwrap();
        assert_eq!(reader.position(), 2048);
        reader.next_chunk().await.unwrap();
        assert_eq!(reader.position(), 2500);
        assert!(reader.next_chunk().await.unwrap().is_none());
    }
}
