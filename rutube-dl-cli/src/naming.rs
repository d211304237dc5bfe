use std::path::{Path, PathBuf};

const FORBIDDEN: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
const EXTENSION: &str = "mp4";

/// Makes a video title usable as a file name on common filesystems.
pub fn sanitize_title(title: &str) -> String {
    title
        .trim()
        .chars()
        .map(|c| {
            if FORBIDDEN.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// `<dir>/<sanitized title>.mp4`, falling back to the video id for blank titles.
pub fn artifact_path(dir: &Path, title: &str, video_id: &str) -> PathBuf {
    let mut stem = sanitize_title(title);
    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        stem = video_id.to_string();
    }
    dir.join(format!("{stem}.{EXTENSION}"))
}
