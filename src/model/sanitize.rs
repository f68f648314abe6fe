use url::Url;

/// Characters that may not appear in a generated file name
pub const FORBIDDEN_FILENAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Replaces every forbidden file name character with `_`
///
/// The replacement character is itself allowed, so applying the function
/// twice gives the same result as applying it once.
///
/// # Examples
///
/// ```
/// use paper_harvest::sanitize_filename;
///
/// assert_eq!(sanitize_filename("A/B: C?"), "A_B_ C_");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if FORBIDDEN_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Longest generated base name in bytes, leaving room under the usual
/// 255-byte name limit for the `.pdf` and part file suffixes
pub const MAX_BASE_NAME_BYTES: usize = 200;

/// Cuts `name` to at most `max_bytes` bytes without splitting a character
pub fn truncate_filename(name: &str, max_bytes: usize) -> &str {
    if name.len() <= max_bytes {
        return name;
    }
    let mut end = max_bytes;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// Extracts the year from the last non-empty path segment of a URL
///
/// All non-digit characters of that segment are dropped; `None` is returned
/// when nothing is left.
pub fn extract_year(url: &Url) -> Option<String> {
    let segment = url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()?;

    let digits: String = segment.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}
