//! Expected-digest discovery from a `<url>.sha256` sibling resource.
//!
//! Thin helper with one contract: return the hex digest or nothing. An
//! unreachable or malformed sidecar is never fatal; the caller simply
//! downloads without verification.

use std::time::Duration;

/// Sidecar bodies are tiny (`<digest>  <filename>`); anything larger is
/// not a digest file.
const MAX_SIDECAR_BYTES: usize = 4096;

/// Fetches `<url>.sha256` and returns the first token that looks like a
/// SHA-256 digest. Any transport or parse problem yields `None`.
pub fn fetch_expected_digest(url: &str) -> Option<String> {
    let sidecar_url = format!("{}.sha256", url);
    let body = match fetch_small(&sidecar_url) {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(url = %sidecar_url, error = %e, "no digest sidecar");
            return None;
        }
    };
    parse_digest_token(&String::from_utf8_lossy(&body))
}

/// First whitespace-delimited token of exactly 64 hex characters.
pub fn parse_digest_token(body: &str) -> Option<String> {
    body.split_whitespace()
        .find(|token| super::is_hex_digest(token))
        .map(|token| token.to_ascii_lowercase())
}

fn fetch_small(url: &str) -> Result<Vec<u8>, curl::Error> {
    let mut body = Vec::new();
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.connect_timeout(Duration::from_secs(15))?;
    easy.timeout(Duration::from_secs(30))?;
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            if body.len() + data.len() > MAX_SIDECAR_BYTES {
                return Ok(0); // too big to be a digest file; abort
            }
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }
    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        // Reuse a curl error shape so the caller logs a single kind.
        tracing::debug!(url, code, "sidecar fetch returned non-2xx");
        return Ok(Vec::new());
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";

    #[test]
    fn parses_bare_digest() {
        assert_eq!(parse_digest_token(DIGEST).as_deref(), Some(DIGEST));
    }

    #[test]
    fn parses_coreutils_format() {
        let body = format!("{}  disk-image.vhd\n", DIGEST);
        assert_eq!(parse_digest_token(&body).as_deref(), Some(DIGEST));
    }

    #[test]
    fn lowercases_digest() {
        let body = DIGEST.to_ascii_uppercase();
        assert_eq!(parse_digest_token(&body).as_deref(), Some(DIGEST));
    }

    #[test]
    fn skips_non_digest_tokens() {
        let body = format!("SHA256 checksum: {}", DIGEST);
        assert_eq!(parse_digest_token(&body).as_deref(), Some(DIGEST));
    }

    #[test]
    fn rejects_bodies_without_digest() {
        assert_eq!(parse_digest_token(""), None);
        assert_eq!(parse_digest_token("not a digest at all"), None);
        assert_eq!(parse_digest_token(&"a".repeat(63)), None);
    }
}
