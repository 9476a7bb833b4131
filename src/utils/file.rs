use std::path::Path;

use crate::models::FileId;

/// Name used when the server does not suggest one.
pub fn fallback_file_name(id: FileId) -> String {
    format!("file_{}", id)
}

/// Extracts the suggested file name from a `Content-Disposition` value.
///
/// `filename*=UTF-8''…` wins over `filename="…"`. Both are percent-decoded
/// because the server quotes names before sending them.
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in value.split(';').map(str::trim) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };

        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = raw.trim().trim_matches('"');
                let encoded = encoded
                    .split_once("''")
                    .map(|(_, name)| name)
                    .unwrap_or(encoded);
                extended = Some(percent_decode(encoded));
            }
            "filename" => {
                plain = Some(percent_decode(raw.trim().trim_matches('"')));
            }
            _ => {}
        }
    }

    extended.or(plain).and_then(|name| sanitize_file_name(&name))
}

/// Reduces a server-supplied name to a bare file name so it cannot escape
/// the download directory.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let last = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(name)
        .trim();

    if last.is_empty() || last == "." || last == ".." {
        return None;
    }

    Path::new(last)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
}

fn percent_decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
