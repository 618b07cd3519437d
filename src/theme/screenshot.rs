//! Screenshot filename checks.
//!
//! Uploaded images are stored as `{user_id}-{unix_millis}.webp`. Anything
//! else extracted from a stored URL is refused before it reaches the blob
//! store's delete call.

const EXTENSION: &str = ".webp";
const TIMESTAMP_DIGITS: usize = 13;

/// True iff `filename` is `{[A-Za-z0-9_-]+}-{13 digits}.webp`.
pub fn is_valid_screenshot_filename(filename: &str) -> bool {
    let Some(stem) = filename.strip_suffix(EXTENSION) else {
        return false;
    };
    let Some((owner, timestamp)) = stem.rsplit_once('-') else {
        return false;
    };

    !owner.is_empty()
        && owner
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        && timestamp.len() == TIMESTAMP_DIGITS
        && timestamp.bytes().all(|b| b.is_ascii_digit())
}

/// Take the last path segment of `url` and keep it only if `validator`
/// accepts it.
pub fn extract_valid_filename(url: &str, validator: impl Fn(&str) -> bool) -> Option<&str> {
    let filename = url.rsplit('/').next()?;
    if filename.is_empty() || !validator(filename) {
        return None;
    }
    Some(filename)
}
