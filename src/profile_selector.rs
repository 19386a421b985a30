//! Profile Selector (`spec.md` §4.C).
//!
//! A pure function of the input path set, wrapped in a 500 ms deadline via
//! `tokio::time::timeout` around a spawned blocking classification — the
//! classification itself is cheap and synchronous, but the deadline exists
//! to satisfy the literal "must complete in < 500 ms or fall back to
//! default" requirement even under pathological input sizes.

use std::path::{Path, PathBuf};
use std::time::Duration;

const SELECTOR_TIMEOUT: Duration = Duration::from_millis(500);

const IMAGE_SEQUENCE_EXTS: [&str; 4] = ["tif", "tiff", "dpx", "exr"];
const LARGE_VIDEO_EXTS: [&str; 5] = ["mov", "mp4", "mxf", "avi", "mkv"];
const PROXY_MEDIA_EXTS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileName {
    ImageSequences,
    LargeVideos,
    ProxyMedia,
    SmallFiles,
    General,
}

impl ProfileName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ImageSequences => "image-sequences",
            Self::LargeVideos => "large-videos",
            Self::ProxyMedia => "proxy-media",
            Self::SmallFiles => "small-files",
            Self::General => "general",
        }
    }
}

/// Classifies `paths` in order of precedence (`spec.md` §4.C); falls back to
/// [`ProfileName::General`] if the classification does not finish in time.
pub async fn select_profile(paths: &[PathBuf]) -> ProfileName {
    let owned = paths.to_vec();
    let task = tokio::task::spawn_blocking(move || classify(&owned));
    match tokio::time::timeout(SELECTOR_TIMEOUT, task).await {
        Ok(Ok(name)) => name,
        Ok(Err(_)) | Err(_) => ProfileName::General,
    }
}

fn classify(paths: &[PathBuf]) -> ProfileName {
    let count = paths.len();
    if count == 0 {
        return ProfileName::General;
    }

    if count > 100 {
        let matching = paths.iter().filter(|p| has_ext(p, &IMAGE_SEQUENCE_EXTS)).count();
        if matching as f64 / count as f64 >= 0.8 {
            return ProfileName::ImageSequences;
        }
    }

    if paths.iter().any(|p| has_ext(p, &LARGE_VIDEO_EXTS)) {
        return ProfileName::LargeVideos;
    }

    if paths.iter().any(|p| has_ext(p, &PROXY_MEDIA_EXTS)) {
        return ProfileName::ProxyMedia;
    }

    if count > 100 {
        let mean_len: f64 =
            paths.iter().map(|p| p.as_os_str().len() as f64).sum::<f64>() / count as f64;
        if mean_len < 100.0 {
            return ProfileName::SmallFiles;
        }
    }

    ProfileName::General
}

fn has_ext(path: &Path, candidates: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| candidates.iter().any(|c| c.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[tokio::test]
    async fn picks_general_for_small_mixed_set() {
        let input = paths(&["/a/one.txt", "/a/two.doc"]);
        assert_eq!(select_profile(&input).await, ProfileName::General);
    }

    #[tokio::test]
    async fn picks_large_videos_when_any_video_present() {
        let input = paths(&["/a/one.txt", "/a/clip.mp4"]);
        assert_eq!(select_profile(&input).await, ProfileName::LargeVideos);
    }

    #[tokio::test]
    async fn picks_proxy_media_over_small_files() {
        let mut input: Vec<PathBuf> = (0..150).map(|i| PathBuf::from(format!("/a/f{i}.txt"))).collect();
        input.push(PathBuf::from("/a/thumb.png"));
        assert_eq!(select_profile(&input).await, ProfileName::ProxyMedia);
    }

    #[tokio::test]
    async fn picks_image_sequences_when_dominant() {
        let input: Vec<PathBuf> = (0..200).map(|i| PathBuf::from(format!("/a/frame{i:04}.exr"))).collect();
        assert_eq!(select_profile(&input).await, ProfileName::ImageSequences);
    }

    #[tokio::test]
    async fn picks_small_files_for_many_short_paths() {
        let input: Vec<PathBuf> = (0..150).map(|i| PathBuf::from(format!("/a/{i}.cfg"))).collect();
        assert_eq!(select_profile(&input).await, ProfileName::SmallFiles);
    }
}
