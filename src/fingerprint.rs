//! Content fingerprints and the streaming digest provider.
//!
//! # Overview
//!
//! A [`Fingerprint`] is a 128-bit digest of a file's full byte content.
//! Two files with equal fingerprints are treated as byte-identical
//! (see `--paranoid` for the stricter policy). The duplicate index keys
//! on fingerprints bit by bit, so the bit numbering here is load-bearing:
//! bit `i` lives in byte `i / 8`, at position `i % 8` within that byte,
//! least-significant-bit-first.
//!
//! The digest itself is pluggable behind the [`Fingerprinter`] trait.
//! The default provider truncates a BLAKE3 hash to 128 bits.

use std::fmt;
use std::io::{self, Read};

/// Number of bytes in a content fingerprint.
pub const FINGERPRINT_LEN: usize = 16;

/// Number of addressable bits in a content fingerprint.
pub const FINGERPRINT_BITS: u8 = 128;

/// Chunk size for streaming file content through a fingerprinter.
pub const READ_CHUNK_SIZE: usize = 64 * 1024;

/// A 128-bit content fingerprint.
///
/// Fingerprints are ordered bit sequences: the *divergence point* of two
/// fingerprints is the lowest bit index at which they differ, and it is
/// where the duplicate index places the branch separating them.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Create a fingerprint from raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Value of bit `index` (0..128), least-significant-bit-first per byte.
    ///
    /// # Panics
    ///
    /// Panics if `index >= 128`.
    #[must_use]
    pub fn bit(&self, index: u8) -> bool {
        assert!(index < FINGERPRINT_BITS, "bit index {index} out of range");
        (self.0[usize::from(index) / 8] >> (index % 8)) & 1 == 1
    }

    /// Lowest bit index at which `self` and `other` differ.
    ///
    /// Returns `None` when the fingerprints are bit-for-bit identical.
    /// This doubles as the equality test and, when the keys differ, as the
    /// position at which the duplicate index must branch.
    #[must_use]
    pub fn divergence(&self, other: &Fingerprint) -> Option<u8> {
        for (i, (a, b)) in self.0.iter().zip(other.0.iter()).enumerate() {
            let diff = a ^ b;
            if diff != 0 {
                // Lowest-indexed differing bit is the least significant
                // set bit of the XOR under LSB-first numbering.
                return Some((i as u8) * 8 + diff.trailing_zeros() as u8);
            }
        }
        None
    }

    /// Lowercase hex rendering, for logs and diagnostics.
    #[must_use]
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(FINGERPRINT_LEN * 2);
        for byte in &self.0 {
            use fmt::Write;
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

/// Streaming content digest producing a [`Fingerprint`].
///
/// Implementations must be order-sensitive and deterministic: feeding the
/// same byte stream in the same order always yields the same fingerprint.
pub trait Fingerprinter {
    /// Absorb the next chunk of the byte stream.
    fn update(&mut self, bytes: &[u8]);

    /// Consume the state and produce the final fingerprint.
    fn finish(self) -> Fingerprint;
}

/// BLAKE3-backed fingerprinter, truncated to 128 bits.
#[derive(Default)]
pub struct Blake3Fingerprinter {
    hasher: blake3::Hasher,
}

impl Fingerprinter for Blake3Fingerprinter {
    fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    fn finish(self) -> Fingerprint {
        let digest = self.hasher.finalize();
        let mut key = [0u8; FINGERPRINT_LEN];
        key.copy_from_slice(&digest.as_bytes()[..FINGERPRINT_LEN]);
        Fingerprint::from_bytes(key)
    }
}

/// Stream a reader to completion through a fingerprinter.
///
/// Returns the fingerprint together with the total number of bytes read,
/// which is the size the run counters use for the file.
///
/// # Errors
///
/// Propagates the first read error; the partially fed fingerprinter state
/// is discarded along with the reader.
pub fn fingerprint_reader<R: Read, F: Fingerprinter>(
    mut reader: R,
    mut fingerprinter: F,
) -> io::Result<(Fingerprint, u64)> {
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    let mut total: u64 = 0;
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                total += n as u64;
                fingerprinter.update(&buf[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok((fingerprinter.finish(), total))
}
