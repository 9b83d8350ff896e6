use mime::Mime;

/// Longest original filename kept on a media row
pub const MAX_FILENAME_LEN: usize = 255;

/// Extension used in storage keys when the client filename carries none
pub const FALLBACK_EXTENSION: &str = "bin";

/// Sanitizes a client-supplied filename so it is safe to store and echo back.
/// Directory components are dropped and reserved characters replaced with `_`.
pub fn sanitize_filename(filename: &str) -> String {
    // Browsers on Windows may send full paths with backslashes
    let normalized = filename.replace('\\', "/");
    let name = normalized
        .rsplit('/')
        .find(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .unwrap_or("");

    if name != filename {
        tracing::debug!("Stripped directory components from filename: {}", filename);
    }

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control()
                || c == ':'
                || c == '*'
                || c == '?'
                || c == '"'
                || c == '<'
                || c == '>'
                || c == '|'
                || c == ';'
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        return "unnamed".to_string();
    }

    // Limit length safely for UTF-8
    if sanitized.len() > MAX_FILENAME_LEN {
        let mut end = MAX_FILENAME_LEN;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        sanitized[..end].to_string()
    } else {
        sanitized.to_string()
    }
}

/// Extension of the original filename as used in storage keys: lowercase
/// ASCII alphanumerics only, `bin` when there is nothing usable.
pub fn storage_extension(filename: &str) -> String {
    let ext = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext,
        _ => "",
    };

    let cleaned: String = ext
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();

    if cleaned.is_empty() {
        FALLBACK_EXTENSION.to_string()
    } else {
        cleaned
    }
}

/// Normalizes a client-supplied content type: parameters dropped, lowercased.
/// Returns `None` for values that do not parse as a MIME type.
pub fn normalize_content_type(content_type: &str) -> Option<String> {
    let parsed: Mime = content_type.trim().parse().ok()?;
    Some(parsed.essence_str().to_ascii_lowercase())
}
