use std::path::{Component, Path};

/// Normalize a destination prefix for use in S3 keys
///
/// Returns an empty string for `None` or blank input. Otherwise surrounding
/// whitespace and leading slashes are removed and a trailing slash is added,
/// so `"images"`, `"/images"` and `" images/ "` all become `"images/"`.
/// Applying it twice gives the same result as applying it once.
pub fn normalize_destination(prefix: Option<&str>) -> String {
    let Some(prefix) = prefix else {
        return String::new();
    };

    let trimmed = prefix
        .trim_start_matches(|c: char| c == '/' || c.is_whitespace())
        .trim_end();

    if trimmed.is_empty() {
        return String::new();
    }

    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    }
}

/// Derive the S3 object key for a local file
///
/// # Arguments
///
/// * `file` - Path of the file being uploaded (as produced by the walk)
/// * `source` - Upload root, either a directory or the file itself
/// * `destination` - Prefix already passed through [`normalize_destination`]
///
/// The key is the file's path relative to `source`, joined with `/`. When the
/// source is the file itself the relative path degenerates to its file name.
/// Returns `None` if any part of the relative path is not valid UTF-8, since a
/// lossy conversion would map distinct files onto the same key.
pub fn derive_key(file: &Path, source: &Path, destination: &str) -> Option<String> {
    let relative = match file.strip_prefix(source) {
        Ok(rel) if rel.as_os_str().is_empty() => file_name(file)?,
        Ok(rel) => join_components(rel)?,
        // Not under the root; fall back to the bare name rather than leaking
        // an absolute local path into the key.
        Err(_) => file_name(file)?,
    };

    Some(format!("{}{}", destination, relative))
}

fn join_components(path: &Path) -> Option<String> {
    let parts = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_str()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()?.to_str().map(str::to_string)
}
