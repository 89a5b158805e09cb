//! Parse HTTP response header lines into probe metadata.

/// Returns (`Content-Length` if present and numeric, `Accept-Ranges: bytes`).
/// When redirects were followed the lines contain several response blocks;
/// later values win, matching the final response.
pub(crate) fn parse_headers(lines: &[String]) -> (Option<u64>, bool) {
    let mut content_length = None;
    let mut accept_ranges = false;

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                if let Ok(n) = value.parse::<u64>() {
                    content_length = Some(n);
                }
            }
            if name.eq_ignore_ascii_case("accept-ranges") {
                accept_ranges = value.eq_ignore_ascii_case("bytes");
            }
        }
    }

    (content_length, accept_ranges)
}
