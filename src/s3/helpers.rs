use std::path::Path;

/// Content headers attached to an uploaded object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentMetadata {
    pub content_type: Option<&'static str>,
    pub content_encoding: Option<&'static str>,
}

/// Resolve Content-Type and Content-Encoding from a file name
///
/// Files without an extension get no metadata. A trailing compression suffix
/// becomes the encoding and the extension before it decides the type, so
/// `logs.tar.gz` is `application/x-tar` encoded with `gzip`. Unknown
/// extensions are not an error, they simply resolve to nothing and S3 falls
/// back to its own default.
pub fn resolve_content_metadata(path: &Path) -> ContentMetadata {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return ContentMetadata::default();
    };

    if path.extension().is_none_or(|e| e.is_empty()) {
        return ContentMetadata::default();
    }

    let expanded;
    let mut name = match expand_suffix(name) {
        Some(full) => {
            expanded = full;
            expanded.as_str()
        }
        None => name,
    };

    let mut metadata = ContentMetadata::default();

    if let Some((stem, ext)) = split_extension(name)
        && let Some(encoding) = detect_content_encoding(ext)
    {
        metadata.content_encoding = Some(encoding);
        name = stem;
    }

    if let Some((_, ext)) = split_extension(name) {
        metadata.content_type = detect_content_type(ext);
    }

    metadata
}

/// Rewrite shorthand suffixes such as `.tgz` into their long form
fn expand_suffix(name: &str) -> Option<String> {
    let (stem, ext) = split_extension(name)?;
    let long = match ext.to_ascii_lowercase().as_str() {
        "tgz" | "taz" | "tz" => "tar.gz",
        "tbz2" => "tar.bz2",
        "txz" => "tar.xz",
        "svgz" => "svg.gz",
        _ => return None,
    };
    Some(format!("{}.{}", stem, long))
}

fn split_extension(name: &str) -> Option<(&str, &str)> {
    let (stem, ext) = name.rsplit_once('.')?;
    // ".bashrc" is a hidden file, not an extension
    if stem.is_empty() || ext.is_empty() {
        None
    } else {
        Some((stem, ext))
    }
}

fn detect_content_encoding(ext: &str) -> Option<&'static str> {
    // ".Z" is case sensitive, it is not the same as ".z"
    if ext == "Z" {
        return Some("compress");
    }

    match ext.to_ascii_lowercase().as_str() {
        "gz" => Some("gzip"),
        "bz2" => Some("bzip2"),
        "xz" => Some("xz"),
        "br" => Some("br"),
        _ => None,
    }
}

fn detect_content_type(ext: &str) -> Option<&'static str> {
    let content_type = match ext.to_ascii_lowercase().as_str() {
        // Video formats
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "flv" => "video/x-flv",
        "wmv" => "video/x-ms-wmv",
        "m4v" => "video/x-m4v",
        "mpeg" | "mpg" => "video/mpeg",
        "ts" => "video/mp2t",

        // Image formats
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/vnd.microsoft.icon",
        "tif" | "tiff" => "image/tiff",

        // Audio formats
        "mp3" => "audio/mpeg",
        "wav" => "audio/x-wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        "m4a" => "audio/mp4",

        // Document formats
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "rtf" => "application/rtf",

        // Text and web formats
        "txt" | "text" | "log" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "map" => "application/json",
        "xml" => "application/xml",
        "csv" => "text/csv",
        "md" => "text/markdown",
        "yaml" | "yml" => "application/yaml",
        "wasm" => "application/wasm",
        "m3u8" => "application/vnd.apple.mpegurl",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",

        // Archive formats
        "zip" => "application/zip",
        "tar" => "application/x-tar",
        "7z" => "application/x-7z-compressed",
        "rar" => "application/vnd.rar",

        // Binary/executable
        "exe" => "application/x-msdownload",
        "dmg" => "application/x-apple-diskimage",
        "iso" => "application/x-iso9660-image",
        "bin" => "application/octet-stream",

        _ => return None,
    };
    Some(content_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn resolve(name: &str) -> ContentMetadata {
        resolve_content_metadata(&PathBuf::from(name))
    }

    #[test]
    fn test_resolve_content_type_image() {
        assert_eq!(resolve("photo.jpg").content_type, Some("image/jpeg"));
        assert_eq!(resolve("/data/img/PHOTO.JPG").content_type, Some("image/jpeg"));
        assert_eq!(resolve("image.png").content_type, Some("image/png"));
    }

    #[test]
    fn test_resolve_content_type_video() {
        assert_eq!(resolve("video.mp4").content_type, Some("video/mp4"));
        assert_eq!(resolve("movie.mov").content_type, Some("video/quicktime"));
    }

    #[test]
    fn test_no_extension_yields_nothing() {
        assert_eq!(resolve("README"), ContentMetadata::default());
        assert_eq!(resolve("/etc/hosts"), ContentMetadata::default());
        assert_eq!(resolve(".bashrc"), ContentMetadata::default());
    }

    #[test]
    fn test_unknown_extension_yields_nothing() {
        assert_eq!(resolve("file.unknownext"), ContentMetadata::default());
    }

    #[test]
    fn test_compressed_archive_has_type_and_encoding() {
        let metadata = resolve("backup.tar.gz");
        assert_eq!(metadata.content_type, Some("application/x-tar"));
        assert_eq!(metadata.content_encoding, Some("gzip"));

        let metadata = resolve("dump.tbz2");
        assert_eq!(metadata.content_type, Some("application/x-tar"));
        assert_eq!(metadata.content_encoding, Some("bzip2"));

        let metadata = resolve("icon.svgz");
        assert_eq!(metadata.content_type, Some("image/svg+xml"));
        assert_eq!(metadata.content_encoding, Some("gzip"));
    }

    #[test]
    fn test_encoding_only() {
        let metadata = resolve("data.gz");
        assert_eq!(metadata.content_type, None);
        assert_eq!(metadata.content_encoding, Some("gzip"));

        assert_eq!(resolve("old.Z").content_encoding, Some("compress"));
        assert_eq!(resolve("bundle.js.br").content_type, Some("text/javascript"));
    }
}
