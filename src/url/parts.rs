//! Derives report fields from a URL's path: the basename without its
//! extension (percent-decoded) and the extension itself.

use url::Url;

/// Returns the lower-cased extension of the URL's path basename, without the
/// leading dot. Empty when the URL does not parse or the basename has no
/// extension.
///
/// # Examples
///
/// ```
/// use linkgauge::url::url_extension;
///
/// assert_eq!(url_extension("https://a.test/path/File.JPG?x=1"), "jpg");
/// assert_eq!(url_extension("https://a.test/readme"), "");
/// ```
pub fn url_extension(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };
    let tail = path_basename(parsed.path());
    match split_extension(tail) {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    }
}

/// Returns the URL's path basename with percent-encodings decoded and the
/// extension stripped. Empty when the URL does not parse.
///
/// # Examples
///
/// ```
/// use linkgauge::url::url_filename_no_ext;
///
/// assert_eq!(url_filename_no_ext("https://a.test/path/File.JPG?x=1"), "File");
/// ```
pub fn url_filename_no_ext(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };
    let tail = path_basename(parsed.path());
    let decoded = match urlencoding::decode(tail) {
        Ok(text) => text.into_owned(),
        Err(_) => tail.to_string(),
    };
    match split_extension(&decoded) {
        Some((name, _)) => name.to_string(),
        None => decoded,
    }
}

/// Last path segment, or the empty string for a trailing slash.
fn path_basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}

/// Splits `name.ext` into `(name, ext)`. A leading dot is part of the name,
/// not an extension marker.
fn split_extension(tail: &str) -> Option<(&str, &str)> {
    let dot = tail.rfind('.')?;
    if dot == 0 {
        return None;
    }
    Some((&tail[..dot], &tail[dot + 1..]))
}
