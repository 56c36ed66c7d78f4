//! File classification - decides whether a file's text is extracted
//!
//! Pure decision logic over a file's extension, size and guessed media
//! type. Extensions are handled lowercase and without the leading dot.

use std::path::Path;

use crate::config::MAX_TEXT_FILE_SIZE;
use crate::models::OutcomeKind;

/// Non-text media types that are still read as text
const TEXT_LIKE_MEDIA_TYPES: &[&str] = &[
    "application/javascript",
    "application/json",
    "application/xml",
    "application/x-sh",
];

/// Extension of a file name, lowercase and without the dot.
///
/// Dotfiles such as `.gitignore` have no other dot, so their whole name
/// (minus the dot) is treated as the extension.
pub fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(0) => name[1..].to_lowercase(),
        Some(idx) => name[idx + 1..].to_lowercase(),
        None => String::new(),
    }
}

/// Extension of a path, see [`extension_of`]
pub fn path_extension(path: &Path) -> String {
    path.file_name()
        .map(|n| extension_of(&n.to_string_lossy()))
        .unwrap_or_default()
}

/// Image, audio, video and office formats that are never read
pub fn is_binary_extension(ext: &str) -> bool {
    matches!(
        ext,
        // Images
        "png" | "jpg" | "jpeg" | "gif" | "bmp" | "webp" | "ico" | "tif" | "tiff"
        // Audio
        | "mp3" | "wav" | "ogg" | "flac"
        // Video
        | "mp4" | "avi" | "mov" | "webm" | "mkv"
        // Office documents
        | "pdf" | "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx"
    )
}

/// Extensions that are always treated as text, overriding the binary set
pub fn is_text_extension(ext: &str) -> bool {
    matches!(
        ext,
        // Plain text, markup and configuration
        "txt" | "log" | "md" | "rst" | "csv" | "tsv" | "tab" | "tex" | "rtf" | "html" | "htm"
        | "xml" | "yaml" | "yml" | "toml" | "ini" | "conf" | "cfg" | "properties" | "json"
        // Scripts and source code
        | "js" | "py" | "ipynb" | "php" | "jsx" | "ts" | "tsx" | "sh" | "bash" | "zsh" | "bat"
        | "cmd" | "ps1" | "go" | "rb" | "pl" | "pm" | "lua" | "java" | "jsp" | "kt" | "swift"
        | "dart" | "groovy" | "scala" | "clj" | "hs" | "ml" | "fs" | "c" | "cpp" | "cxx" | "cc"
        | "h" | "hpp" | "hxx" | "cs" | "vb" | "bas" | "css" | "scss" | "less" | "sql" | "rs"
        // Tooling dotfiles
        | "env" | "gitignore" | "dockerignore" | "dockerfile" | "editorconfig" | "gitattributes"
        | "babelrc" | "eslintignore" | "eslintcache" | "eslintrc" | "prettierrc" | "stylelintrc"
    )
}

/// Guess a media type from an extension.
///
/// Returns `None` when the extension is not in the table, which sends the
/// classifier down the extension fallback.
pub fn guess_media_type(ext: &str) -> Option<&'static str> {
    let media_type = match ext {
        // Text
        "txt" | "text" | "conf" | "def" | "list" | "in" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "tsv" => "text/tab-separated-values",
        "rtf" => "text/rtf",
        "rst" => "text/x-rst",
        "tex" => "text/x-tex",
        "py" => "text/x-python",
        "c" | "h" => "text/x-c",
        "cpp" | "cc" | "cxx" | "hpp" | "hxx" => "text/x-c++",
        "java" => "text/x-java",
        "ts" | "tsx" => "text/x-typescript",
        "rs" => "text/x-rust",
        "go" => "text/x-go",
        "yaml" | "yml" => "text/yaml",
        "toml" => "text/x-toml",
        "sql" => "text/x-sql",
        "bat" => "text/x-msdos-batch",
        // Scripts and data
        "js" | "mjs" | "jsx" => "application/javascript",
        "json" | "ipynb" => "application/json",
        "xml" | "xsl" => "application/xml",
        "sh" => "application/x-sh",
        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "ico" => "image/vnd.microsoft.icon",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        // Audio and video
        "mp3" => "audio/mpeg",
        "wav" => "audio/x-wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        // Documents
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        // Archives and executables
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "7z" => "application/x-7z-compressed",
        "rar" => "application/vnd.rar",
        "jar" => "application/java-archive",
        "wasm" => "application/wasm",
        "exe" | "dll" | "so" | "o" | "a" | "obj" | "bin" | "class" => "application/octet-stream",
        // Fonts
        "ttf" => "font/ttf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => return None,
    };
    Some(media_type)
}

/// Whether a guessed media type counts as text
pub fn is_text_media_type(media_type: &str) -> bool {
    media_type.starts_with("text") || TEXT_LIKE_MEDIA_TYPES.contains(&media_type)
}

/// Classify a file. First matching rule wins:
///
/// 1. extraction off: `NoContentRequested`
/// 2. binary extension without a text override: `SkippedBinaryExt`
/// 3. larger than 10 MiB: `SkippedOversize`
/// 4. media type known but not text: `SkippedNonText`
/// 5. media type unknown and extension not a text extension: `SkippedUnknownType`
/// 6. otherwise `Extracted`
pub fn classify(
    extension: &str,
    size_bytes: u64,
    media_type: Option<&str>,
    extract_requested: bool,
) -> OutcomeKind {
    if !extract_requested {
        return OutcomeKind::NoContentRequested;
    }
    if is_binary_extension(extension) && !is_text_extension(extension) {
        return OutcomeKind::SkippedBinaryExt;
    }
    if size_bytes > MAX_TEXT_FILE_SIZE {
        return OutcomeKind::SkippedOversize;
    }
    match media_type {
        Some(mt) if !is_text_media_type(mt) => OutcomeKind::SkippedNonText,
        Some(_) => OutcomeKind::Extracted,
        None if is_text_extension(extension) => OutcomeKind::Extracted,
        None => OutcomeKind::SkippedUnknownType,
    }
}

/// Classify a file by name and size, guessing its media type from the extension
pub fn classify_file(name: &str, size_bytes: u64, extract_requested: bool) -> OutcomeKind {
    let ext = extension_of(name);
    classify(&ext, size_bytes, guess_media_type(&ext), extract_requested)
}
