//! Content-Disposition header parsing (filename and filename*).

use super::path::percent_decode_lossy;

/// Extracts the filename from a raw Content-Disposition header value.
///
/// Supports:
/// - `filename="value"` (quoted; strips quotes and unescapes)
/// - `filename=value` (token)
/// - `filename*=UTF-8''percent-encoded` (RFC 5987; decoded)
/// If both `filename` and `filename*` exist, `filename*` takes precedence.
pub fn parse_content_disposition_filename(header_value: &str) -> Option<String> {
    let value = header_value.trim();
    let mut filename_from_token: Option<String> = None;

    for param in value.split(';') {
        let param = param.trim();
        if let Some((name, v)) = param.split_once('=') {
            let name = ascii_lowercase(name.trim());
            let v = v.trim();

            if name == "filename*" {
                if let Some(rest) = v.strip_prefix("utf-8''").or_else(|| v.strip_prefix("UTF-8''")) {
                    let decoded = basename(&decode_quoted_filename(&percent_decode_lossy(rest))).to_string();
                    if !decoded.is_empty() {
                        return Some(decoded);
                    }
                }
            }

            if name == "filename" {
                let unquoted = if v.starts_with('"') && v.ends_with('"') && v.len() >= 2 {
                    decode_quoted_filename(&v[1..v.len() - 1])
                } else {
                    v.to_string()
                };
                let unquoted = basename(&unquoted).to_string();
                if !unquoted.is_empty() {
                    filename_from_token = Some(unquoted);
                }
            }
        }
    }

    filename_from_token
}

/// Returns the final path component of `s`, splitting on both `/` and `\`
/// (a server can send either style). Only the basename is ever returned,
/// so an attacker-supplied `../../etc/passwd` collapses to `passwd`.
fn basename(s: &str) -> &str {
    s.rsplit(['/', '\\']).next().unwrap_or(s)
}

/// Decode backslash-escaped quotes in a quoted filename value.
pub(super) fn decode_quoted_filename(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next == '"' || next == '\\' {
                    out.push(chars.next().unwrap());
                    continue;
                }
            }
            out.push(c);
        } else {
            out.push(c);
        }
    }
    out
}

fn ascii_lowercase(s: &str) -> String {
    s.chars()
        .map(|c| {
            if ('A'..='Z').contains(&c) {
                ((c as u8) - b'A' + b'a') as char
            } else {
                c
            }
        })
        .collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quoted() {
        let r = parse_content_disposition_filename("attachment; filename=\"report.pdf\"");
        assert_eq!(r.as_deref(), Some("report.pdf"));
    }

    #[test]
    fn parse_token() {
        let r = parse_content_disposition_filename("attachment; filename=report.pdf");
        assert_eq!(r.as_deref(), Some("report.pdf"));
    }

    #[test]
    fn parse_filename_star_utf8() {
        let r = parse_content_disposition_filename("attachment; filename*=UTF-8''caf%C3%A9.txt");
        assert_eq!(r.as_deref(), Some("café.txt"));
    }

    #[test]
    fn parse_filename_star_precedence() {
        let r = parse_content_disposition_filename(
            "attachment; filename=\"fallback.bin\"; filename*=UTF-8''real%20name.dat",
        );
        assert_eq!(r.as_deref(), Some("real name.dat"));
    }

    #[test]
    fn quoted_filename_with_path_is_basenamed() {
        let r = parse_content_disposition_filename("attachment; filename=\"a/b/c.txt\"");
        assert_eq!(r.as_deref(), Some("c.txt"));
    }

    #[test]
    fn path_traversal_attempt_is_basenamed() {
        let r = parse_content_disposition_filename("attachment; filename=\"../../etc/passwd\"");
        assert_eq!(r.as_deref(), Some("passwd"));
    }

    #[test]
    fn filename_star_with_path_is_basenamed() {
        let r = parse_content_disposition_filename("attachment; filename*=UTF-8''dir%2Ffile.bin");
        assert_eq!(r.as_deref(), Some("file.bin"));
    }

    #[test]
    fn windows_style_path_is_basenamed() {
        let r = parse_content_disposition_filename("attachment; filename=\"dir\\\\file.txt\"");
        assert_eq!(r.as_deref(), Some("file.txt"));
    }
}
