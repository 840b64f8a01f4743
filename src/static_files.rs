//! Static asset resolution.
//!
//! # Responsibilities
//! - Search an ordered list of candidate directories for a requested file
//! - Classify files by extension to pick a baseline content type
//! - Read files in text or binary mode
//! - Build handler results for assets (`send_from_directory`)
//!
//! # Design Decisions
//! - First candidate directory holding a regular file wins
//! - Paths with `..` components are never resolved
//! - Reads are blocking; the server runs dispatch on the blocking pool

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::http::fault::RequestFault;
use crate::http::response::{HandlerResult, CONTENT_TYPE};

/// Cache policy attached to images and files sent from a directory.
pub const STATIC_CACHE_CONTROL: &str = "public, max-age=43200";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "gif", "png", "ico"];

/// Guess a MIME type from a file name. Unknown extensions map to `text/html`.
pub fn mime_guess(filename: &str) -> &'static str {
    let extension = filename
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    match extension.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" | "map" => "application/json",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/vnd.microsoft.icon",
        "webp" => "image/webp",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "wasm" => "application/wasm",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        _ => "text/html",
    }
}

/// How a static asset is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Css,
    Javascript,
    /// Binary image with its guessed MIME type.
    Image(&'static str),
    /// Anything else, served as text with default headers.
    Other,
}

impl AssetKind {
    pub fn classify(path: &str) -> Self {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".css") {
            AssetKind::Css
        } else if lower.ends_with(".js") {
            AssetKind::Javascript
        } else if IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            AssetKind::Image(mime_guess(path))
        } else {
            AssetKind::Other
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, AssetKind::Image(_))
    }
}

/// File content read in text or binary mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Binary(Vec<u8>),
}

impl From<FileContent> for HandlerResult {
    fn from(content: FileContent) -> Self {
        match content {
            FileContent::Text(text) => HandlerResult::Text(text),
            FileContent::Binary(bytes) => HandlerResult::bytes(bytes),
        }
    }
}

/// `path` relative to a candidate directory, or `None` when it tries to
/// escape (`..`) or names a root.
fn relative_path(path: &str) -> Option<PathBuf> {
    let relative = Path::new(path.trim_start_matches('/'));
    let mut clean = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!clean.as_os_str().is_empty()).then_some(clean)
}

/// First `dir/path` that is a regular file, trying `dirs` in order.
pub fn find_file<P: AsRef<Path>>(path: &str, dirs: &[P]) -> Option<PathBuf> {
    let relative = relative_path(path)?;
    dirs.iter()
        .map(|dir| dir.as_ref().join(&relative))
        .find(|candidate| candidate.is_file())
}

/// Read a file. Text mode falls back to raw bytes for non-UTF-8 content.
pub fn read_file(path: &Path, binary: bool) -> io::Result<FileContent> {
    let bytes = fs::read(path)?;
    if binary {
        return Ok(FileContent::Binary(bytes));
    }
    Ok(match String::from_utf8(bytes) {
        Ok(text) => FileContent::Text(text),
        Err(e) => FileContent::Binary(e.into_bytes()),
    })
}

/// Options for [`send_from_directory`].
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Overrides the guessed MIME type.
    pub mimetype: Option<String>,
    /// Adds `Content-Disposition: attachment`.
    pub as_attachment: bool,
    /// Read as binary instead of text.
    pub binary: bool,
}

/// Serve `filename` from the first of `dirs` that holds it, for use
/// inside handlers.
pub fn send_from_directory<P: AsRef<Path>>(
    filename: &str,
    dirs: &[P],
    options: &SendOptions,
) -> HandlerResult {
    let content = find_file(filename, dirs).and_then(|path| match read_file(&path, options.binary) {
        Ok(content) => Some(content),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read file");
            None
        }
    });

    let Some(content) = content else {
        return HandlerResult::text(format!("named resource not found: <b>{filename}</b>"))
            .with_status(404);
    };

    let mimetype = options
        .mimetype
        .clone()
        .unwrap_or_else(|| mime_guess(filename).to_string());
    let mut headers = vec![
        (CONTENT_TYPE.to_string(), mimetype),
        ("Cache-Control".to_string(), STATIC_CACHE_CONTROL.to_string()),
    ];
    if options.as_attachment {
        headers.push((
            "Content-Disposition".to_string(),
            format!("attachment; filename={filename}"),
        ));
    }
    HandlerResult::from(content).with_headers(200, headers)
}

/// Resolves request paths to static files in fixed candidate directories.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    candidate_dirs: Vec<PathBuf>,
}

impl StaticResolver {
    pub fn new(candidate_dirs: Vec<PathBuf>) -> Self {
        Self { candidate_dirs }
    }

    pub fn candidate_dirs(&self) -> &[PathBuf] {
        &self.candidate_dirs
    }

    pub fn find(&self, path: &str) -> Option<PathBuf> {
        find_file(path, &self.candidate_dirs)
    }

    /// Handler result for the asset at request `path`.
    pub fn serve(&self, path: &str) -> Result<HandlerResult, RequestFault> {
        let not_found = || RequestFault::StaticAssetNotFound {
            path: path.to_string(),
        };
        let file = self.find(path).ok_or_else(not_found)?;
        let kind = AssetKind::classify(path);
        let content = read_file(&file, kind.is_binary()).map_err(|e| {
            tracing::warn!(path = %file.display(), error = %e, "Failed to read static file");
            not_found()
        })?;

        tracing::debug!(path = %path, file = %file.display(), kind = ?kind, "Serving static file");
        let result = HandlerResult::from(content);
        Ok(match kind {
            AssetKind::Css => result.with_content_type(200, "text/css"),
            AssetKind::Javascript => result.with_content_type(200, "text/javascript"),
            AssetKind::Image(mime) => result.with_headers(
                200,
                vec![(CONTENT_TYPE, mime), ("Cache-Control", STATIC_CACHE_CONTROL)],
            ),
            AssetKind::Other => result,
        })
    }
}
