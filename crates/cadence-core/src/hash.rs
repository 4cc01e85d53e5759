//! FNV-1a hashing helpers for deterministic state comparison.
//!
//! Not cryptographically secure; used for fast bit-equality checks
//! between two runs of the same command stream.

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;

/// Incremental FNV-1a hash state.
///
/// # Examples
///
/// ```
/// use cadence_core::hash::Fnv1a;
///
/// let mut a = Fnv1a::new();
/// a.write_u64(42);
/// let mut b = Fnv1a::new();
/// b.write_u64(42);
/// assert_eq!(a.finish(), b.finish());
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Fnv1a(u64);

impl Fnv1a {
    /// A fresh hash state at the FNV-1a offset basis.
    pub fn new() -> Self {
        Self(FNV_OFFSET)
    }

    /// Feed a single byte.
    pub fn write_u8(&mut self, byte: u8) {
        self.0 = (self.0 ^ byte as u64).wrapping_mul(FNV_PRIME);
    }

    /// Feed a byte slice.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write_u8(b);
        }
    }

    /// Feed a u32 as 4 little-endian bytes.
    pub fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    /// Feed a u64 as 8 little-endian bytes.
    pub fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    /// Resume hashing from a previously captured value.
    ///
    /// Continuing a run from a state snapshot restores the hash chain
    /// exactly where the snapshot left it, so a full run and a
    /// split-and-resumed run produce identical final values.
    pub fn resume(state: u64) -> Self {
        Self(state)
    }

    /// The current hash value.
    pub fn finish(&self) -> u64 {
        self.0
    }
}

impl Default for Fnv1a {
    fn default() -> Self {
        Self::new()
    }
}
