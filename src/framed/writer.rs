use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::cipher::Aead;
use crate::codec;
use crate::core::{SnellError, AEAD_TAG_SIZE, LENGTH_HEADER_SIZE, MAX_PAYLOAD_SIZE, MAX_RECORD_SIZE};
use crate::nonce::NonceCounter;

/// Half-duplex framed writer: turns plaintext writes into a stream of
/// AEAD records on `transport`.
///
/// Owns its scratch buffers and reuses them for every record; no
/// allocation occurs once a writer is constructed.
pub struct FramedWriter<W> {
    transport: W,
    aead: Arc<dyn Aead>,
    nonce: NonceCounter,
    header_scratch: Vec<u8>,
    body_scratch: Vec<u8>,
    record: Vec<u8>,
    read_buf: Vec<u8>,
    /// Set once any call fails; every subsequent call fails fast with
    /// [`SnellError::SessionTerminated`] instead of touching the
    /// transport on state that may now be desynchronized.
    poisoned: bool,
}

impl<W> FramedWriter<W>
where
    W: AsyncWrite + Unpin,
{
    /// Wrap an already-established transport with the AEAD used to
    /// encrypt this direction, starting the nonce at zero.
    pub fn new(transport: W, aead: Arc<dyn Aead>) -> Self {
        Self {
            transport,
            aead,
            nonce: NonceCounter::new(),
            header_scratch: Vec::with_capacity(LENGTH_HEADER_SIZE + AEAD_TAG_SIZE),
            body_scratch: Vec::with_capacity(MAX_PAYLOAD_SIZE + AEAD_TAG_SIZE),
            record: Vec::with_capacity(MAX_RECORD_SIZE),
            read_buf: vec![0u8; MAX_PAYLOAD_SIZE],
            poisoned: false,
        }
    }

    /// Write `buf`, chunking at 16383 plaintext bytes per record. An
    /// empty `buf` emits a single zero chunk and returns `Ok(0)`.
    /// Returns the number of plaintext bytes accepted; a transport
    /// failure is surfaced immediately and nothing after the failed
    /// record was emitted.
    ///
    /// Once a call has failed, every subsequent call returns
    /// [`SnellError::SessionTerminated`] without touching the
    /// transport: the framing layer never retries on a nonce that may
    /// now be out of sync with the peer.
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize, SnellError> {
        if self.poisoned {
            return Err(SnellError::SessionTerminated);
        }
        let result = self.write_uncached(buf).await;
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    async fn write_uncached(&mut self, buf: &[u8]) -> Result<usize, SnellError> {
        if buf.is_empty() {
            self.emit_record(&[]).await?;
            return Ok(0);
        }
        let mut written = 0;
        for chunk in buf.chunks(MAX_PAYLOAD_SIZE) {
            self.emit_record(chunk).await?;
            written += chunk.len();
        }
        Ok(written)
    }

    /// Repeatedly read up to 16383 bytes from `source` and emit one
    /// record per non-empty read. EOF from `source` ends the loop
    /// normally and returns the total plaintext bytes relayed; any
    /// other source error is surfaced immediately.
    ///
    /// See [`FramedWriter::write`] for the poisoning contract shared
    /// by both entry points.
    pub async fn read_from<R>(&mut self, source: &mut R) -> Result<u64, SnellError>
    where
        R: AsyncRead + Unpin,
    {
        if self.poisoned {
            return Err(SnellError::SessionTerminated);
        }
        let result = self.read_from_uncached(source).await;
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    async fn read_from_uncached<R>(&mut self, source: &mut R) -> Result<u64, SnellError>
    where
        R: AsyncRead + Unpin,
    {
        let mut total = 0u64;
        loop {
            let n = source
                .read(&mut self.read_buf)
                .await
                .map_err(SnellError::SourceRead)?;
            if n == 0 {
                return Ok(total);
            }
            let mut buf = std::mem::take(&mut self.read_buf);
            self.emit_record(&buf[..n]).await?;
            buf.resize(MAX_PAYLOAD_SIZE, 0);
            self.read_buf = buf;
            total += n as u64;
        }
    }

    /// Shut down the underlying transport's write side, passed through
    /// transparently (a clean TCP half-close rather than a framing
    /// operation). Not gated by the poison flag: closing the transport
    /// should succeed even after a fatal framing error.
    pub async fn shutdown(&mut self) -> Result<(), SnellError> {
        self.transport.shutdown().await.map_err(SnellError::Io)
    }

    async fn emit_record(&mut self, plaintext: &[u8]) -> Result<(), SnellError> {
        debug_assert!(plaintext.len() <= MAX_PAYLOAD_SIZE);
        codec::seal_length(
            &*self.aead,
            &mut self.nonce,
            plaintext.len() as u16,
            &mut self.header_scratch,
        )?;
        self.record.clear();
        self.record.extend_from_slice(&self.header_scratch);
        if !plaintext.is_empty() {
            self.body_scratch.clear();
            self.body_scratch.extend_from_slice(plaintext);
            codec::seal_payload(&*self.aead, &mut self.nonce, &mut self.body_scratch)?;
            self.record.extend_from_slice(&self.body_scratch);
        }
        self.transport.write_all(&self.record).await?;
        Ok(())
    }
}
