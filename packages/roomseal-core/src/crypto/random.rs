//! # Secure Random
//!
//! Every nonce, salt and key in this crate is drawn from the operating
//! system's CSPRNG through this module. A failing OS RNG surfaces as
//! [`Error::RngUnavailable`]; there is no fallback source.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{Error, Result};

/// Fill `buf` with bytes from the OS CSPRNG
pub fn fill(buf: &mut [u8]) -> Result<()> {
    OsRng.try_fill_bytes(buf).map_err(|e| {
        tracing::error!("OS random number generator failed: {}", e);
        Error::RngUnavailable
    })
}

/// Draw a fixed-size array of random bytes
pub fn bytes<const N: usize>() -> Result<[u8; N]> {
    let mut out = [0u8; N];
    fill(&mut out)?;
    Ok(out)
}

/// Draw `n` random bytes into a vector
pub fn bytes_vec(n: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; n];
    fill(&mut out)?;
    Ok(out)
}
