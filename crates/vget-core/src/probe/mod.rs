//! HTTP HEAD probe for origin metadata.
//!
//! Uses the curl crate (libcurl) to fetch response headers and confirm a
//! positive `Content-Length`. `Accept-Ranges: bytes` is recorded but range
//! support is proven by the first range GET, not by a trial request. A
//! missing length is fatal: there is no fallback to an unsegmented download.

mod parse;

use std::str;
use std::time::Duration;

use thiserror::Error;

use crate::control::CancelToken;

/// Metadata needed to plan a segmented download.
#[derive(Debug, Clone, Copy)]
pub struct OriginMetadata {
    /// Total size of the target in bytes. Always > 0.
    pub total_len: u64,
    /// True if the origin sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("HEAD request failed: {0}")]
    Transport(#[from] curl::Error),
    #[error("HEAD returned HTTP {0}")]
    HttpStatus(u32),
    #[error("origin did not report a positive Content-Length")]
    NoContentLength,
    #[error("cancelled")]
    Cancelled,
}

/// Performs a HEAD request and returns parsed metadata.
///
/// Follows redirects. Runs on the current thread; call from `spawn_blocking`
/// when used from async code.
pub fn probe(url: &str, cancel: &CancelToken) -> Result<OriginMetadata, ProbeError> {
    let mut headers: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.nobody(true)?; // HEAD request
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(Duration::from_secs(15))?;
    easy.timeout(Duration::from_secs(30))?;
    easy.progress(true)?;

    {
        let cancel = cancel.clone();
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                headers.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.progress_function(move |_, _, _, _| !cancel.is_cancelled())?;
        if let Err(e) = transfer.perform() {
            if e.is_aborted_by_callback() {
                return Err(ProbeError::Cancelled);
            }
            return Err(ProbeError::Transport(e));
        }
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(ProbeError::HttpStatus(code));
    }

    let (content_length, accept_ranges) = parse::parse_headers(&headers);
    match content_length {
        Some(total_len) if total_len > 0 => Ok(OriginMetadata {
            total_len,
            accept_ranges,
        }),
        _ => Err(ProbeError::NoContentLength),
    }
}
