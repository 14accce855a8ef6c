//! Output path helpers

use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Longest slug kept in generated file names
const MAX_SLUG_CHARS: usize = 48;

/// Lowercase ASCII slug of `title`; `lesson` when nothing usable remains
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
            if slug.len() >= MAX_SLUG_CHARS {
                break;
            }
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "lesson".to_string()
    } else {
        slug
    }
}

/// Request-scoped output path: `<media_dir>/video_<slug>_<request>.mp4`
pub fn output_path_for(media_dir: &Path, title: &str, request_id: Uuid) -> PathBuf {
    let id = request_id.simple().to_string();
    media_dir.join(format!("video_{}_{}.mp4", slugify(title), &id[..8]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Intro to APIs"), "intro-to-apis");
        assert_eq!(slugify("  C++ & Rust: a tour!  "), "c-rust-a-tour");
        assert_eq!(slugify("???"), "lesson");
        assert!(slugify(&"long title ".repeat(20)).len() <= MAX_SLUG_CHARS);
    }

    #[test]
    fn test_output_paths_are_request_scoped() {
        let dir = Path::new("media");
        let a = output_path_for(dir, "Intro to APIs", Uuid::new_v4());
        let b = output_path_for(dir, "Intro to APIs", Uuid::new_v4());
        assert_ne!(a, b);
        let name = a.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("video_intro-to-apis_"));
        assert!(name.ends_with(".mp4"));
        assert!(a.starts_with("media"));
    }
}
