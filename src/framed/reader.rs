use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::cipher::Aead;
use crate::codec;
use crate::core::{SnellError, AEAD_TAG_SIZE, LENGTH_HEADER_SIZE, MAX_RECORD_SIZE};
use crate::nonce::NonceCounter;

/// The one-shot fallback slot tried only on a reader's first record.
enum Fallback {
    /// No fallback configured, or the probe already ran.
    None,
    /// Fallback configured and not yet tried.
    Probing(Arc<dyn Aead>),
}

/// Result of attempting to decode one record's length header.
enum HeaderOutcome {
    /// The transport ended cleanly at a record boundary: no bytes of a
    /// new header had arrived yet.
    Eof,
    /// The header decoded to this masked effective length (`0` is the
    /// zero chunk).
    Len(u16),
}

/// Half-duplex framed reader: turns a stream of AEAD records read from
/// `transport` back into plaintext.
///
/// Owns its scratch buffers and reuses them for every record; the
/// `leftover` bytes exposed between [`FramedReader::read`] calls are
/// always a view into the same payload buffer, never a fresh
/// allocation.
pub struct FramedReader<R> {
    transport: R,
    aead: Arc<dyn Aead>,
    fallback: Fallback,
    nonce: NonceCounter,
    header_buf: Vec<u8>,
    payload_buf: Vec<u8>,
    leftover_pos: usize,
    /// Set once any error other than [`SnellError::ZeroChunk`] surfaces;
    /// the nonce/cipher state can no longer be trusted, so every
    /// subsequent call fails fast instead of touching the transport.
    poisoned: bool,
}

impl<R> FramedReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Wrap an already-established transport with the primary AEAD for
    /// this direction, starting the nonce at zero and no fallback
    /// configured.
    pub fn new(transport: R, aead: Arc<dyn Aead>) -> Self {
        Self {
            transport,
            aead,
            fallback: Fallback::None,
            nonce: NonceCounter::new(),
            header_buf: Vec::with_capacity(LENGTH_HEADER_SIZE + AEAD_TAG_SIZE),
            payload_buf: Vec::with_capacity(MAX_RECORD_SIZE),
            leftover_pos: 0,
            poisoned: false,
        }
    }

    /// Like [`FramedReader::new`], but the very first record is
    /// probed against `fallback` if `aead` fails to authenticate it.
    /// On a successful fallback open, `fallback` is promoted to be
    /// this reader's AEAD for every subsequent record.
    pub fn with_fallback(transport: R, aead: Arc<dyn Aead>, fallback: Arc<dyn Aead>) -> Self {
        let mut reader = Self::new(transport, aead);
        reader.fallback = Fallback::Probing(fallback);
        reader
    }

    /// Whether the fallback probe has committed to the fallback AEAD
    /// (only meaningful after the first successful read).
    pub fn current_aead(&self) -> Arc<dyn Aead> {
        self.aead.clone()
    }

    /// If `leftover` is non-empty, copy from it into `out` with no
    /// transport I/O. Otherwise decode one record and copy up to
    /// `out.len()` bytes into it, retaining any excess as leftover.
    ///
    /// Once any error other than [`SnellError::ZeroChunk`] has surfaced
    /// from this reader, every subsequent call fails immediately with
    /// [`SnellError::SessionTerminated`] without touching the transport:
    /// the framing layer never retries on desynchronized nonce/cipher
    /// state.
    pub async fn read(&mut self, out: &mut [u8]) -> Result<usize, SnellError> {
        if self.poisoned {
            return Err(SnellError::SessionTerminated);
        }
        let result = self.read_uncached(out).await;
        self.poison_unless_zero_chunk(&result);
        result
    }

    async fn read_uncached(&mut self, out: &mut [u8]) -> Result<usize, SnellError> {
        if self.leftover_pos >= self.payload_buf.len() {
            let size = match self.decode_length().await? {
                HeaderOutcome::Eof => return Ok(0),
                HeaderOutcome::Len(0) => {
                    self.payload_buf.clear();
                    self.leftover_pos = 0;
                    return Err(SnellError::ZeroChunk);
                }
                HeaderOutcome::Len(size) => size,
            };
            self.decode_payload(size).await?;
        }
        let available = &self.payload_buf[self.leftover_pos..];
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.leftover_pos += n;
        Ok(n)
    }

    /// Drain any leftover to `sink`, then decode and relay records
    /// until the transport ends. EOF terminates normally; any other
    /// transport error propagates. A zero chunk is relayed as a
    /// no-op record (nothing written) rather than ending the stream.
    ///
    /// See [`FramedReader::read`] for the poisoning contract shared by
    /// both entry points.
    pub async fn write_to<W>(&mut self, sink: &mut W) -> Result<u64, SnellError>
    where
        W: AsyncWrite + Unpin,
    {
        if self.poisoned {
            return Err(SnellError::SessionTerminated);
        }
        let result = self.write_to_uncached(sink).await;
        self.poison_unless_zero_chunk(&result);
        result
    }

    async fn write_to_uncached<W>(&mut self, sink: &mut W) -> Result<u64, SnellError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut total = 0u64;
        if self.leftover_pos < self.payload_buf.len() {
            let leftover = &self.payload_buf[self.leftover_pos..];
            sink.write_all(leftover).await?;
            total += leftover.len() as u64;
            self.leftover_pos = self.payload_buf.len();
        }
        loop {
            let size = match self.decode_length().await? {
                HeaderOutcome::Eof => return Ok(total),
                HeaderOutcome::Len(0) => continue,
                HeaderOutcome::Len(size) => size,
            };
            self.decode_payload(size).await?;
            sink.write_all(&self.payload_buf).await?;
            total += self.payload_buf.len() as u64;
            self.leftover_pos = self.payload_buf.len();
        }
    }

    /// A zero chunk is a first-class sentinel, not a session-ending
    /// failure: every other error renders the reader terminal.
    fn poison_unless_zero_chunk<T>(&mut self, result: &Result<T, SnellError>) {
        if let Err(err) = result {
            if !matches!(err, SnellError::ZeroChunk) {
                self.poisoned = true;
            }
        }
    }

    async fn decode_length(&mut self) -> Result<HeaderOutcome, SnellError> {
        if !self.fill_header_or_eof().await? {
            return Ok(HeaderOutcome::Eof);
        }

        if matches!(self.fallback, Fallback::Probing(_)) {
            let Fallback::Probing(fallback_aead) =
                std::mem::replace(&mut self.fallback, Fallback::None)
            else {
                unreachable!("checked above");
            };
            let probe_copy = self.header_buf.clone();
            match codec::open_length(&*self.aead, &mut self.nonce, &mut self.header_buf) {
                Ok(size) => Ok(HeaderOutcome::Len(size)),
                Err(_) => {
                    self.header_buf = probe_copy;
                    let mut fallback_nonce = NonceCounter::new();
                    let size =
                        codec::open_length(&*fallback_aead, &mut fallback_nonce, &mut self.header_buf)
                            .map_err(|_| SnellError::Authentication)?;
                    self.aead = fallback_aead;
                    self.nonce = fallback_nonce;
                    Ok(HeaderOutcome::Len(size))
                }
            }
        } else {
            codec::open_length(&*self.aead, &mut self.nonce, &mut self.header_buf)
                .map_err(|_| SnellError::Authentication)
                .map(HeaderOutcome::Len)
        }
    }

    /// Fill `header_buf` with exactly `LENGTH_HEADER_SIZE + AEAD_TAG_SIZE`
    /// bytes from the transport. Returns `Ok(true)` once the header is
    /// full, or `Ok(false)` if the transport ended before any byte of a
    /// new record arrived (a clean stream end at a record boundary).
    ///
    /// A transport that ends after delivering *some* but not all of the
    /// header bytes is a truncated record, not a clean end: that case
    /// surfaces as a transport error rather than being folded into the
    /// clean-EOF outcome, since spec distinguishes "EOF during streaming"
    /// from "short read before a record boundary".
    async fn fill_header_or_eof(&mut self) -> Result<bool, SnellError> {
        self.header_buf.clear();
        self.header_buf.resize(LENGTH_HEADER_SIZE + AEAD_TAG_SIZE, 0);
        let mut filled = 0;
        while filled < self.header_buf.len() {
            let n = self.transport.read(&mut self.header_buf[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(SnellError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "transport closed mid-record header",
                )));
            }
            filled += n;
        }
        Ok(true)
    }

    async fn decode_payload(&mut self, size: u16) -> Result<(), SnellError> {
        self.payload_buf.clear();
        self.payload_buf.resize(size as usize + AEAD_TAG_SIZE, 0);
        self.transport.read_exact(&mut self.payload_buf).await?;
        codec::open_payload(&*self.aead, &mut self.nonce, &mut self.payload_buf)
            .map_err(|_| SnellError::Authentication)?;
        self.leftover_pos = 0;
        Ok(())
    }
}
