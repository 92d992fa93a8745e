//! Rendered media on disk: frame sequences and their resource handles.

use std::path::{Path, PathBuf};

use montage_common::error::MontageResult;

/// Split a frame file name into `(prefix, digits, extension)`.
///
/// `frame0042.png` gives `("frame", "0042", "png")`.
fn split_frame_name(path: &Path) -> Option<(String, String, String)> {
    let stem = path.file_stem()?.to_str()?;
    let extension = path.extension()?.to_str()?;
    let prefix = stem.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &stem[prefix.len()..];
    if digits.is_empty() {
        return None;
    }
    Some((prefix.to_string(), digits.to_string(), extension.to_string()))
}

/// Frame number of a frame file, if its name ends in digits.
pub fn frame_number(path: &Path) -> Option<u64> {
    let (_, digits, _) = split_frame_name(path)?;
    digits.parse().ok()
}

/// The frame file with the lowest number in `dir`.
pub fn lowest_numbered_file(dir: &Path) -> MontageResult<Option<PathBuf>> {
    let mut lowest: Option<(u64, PathBuf)> = None;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(number) = frame_number(&path) else {
            continue;
        };
        if lowest.as_ref().map_or(true, |(n, _)| number < *n) {
            lowest = Some((number, path));
        }
    }
    Ok(lowest.map(|(_, path)| path))
}

/// Image sequence resource name for a frame file.
///
/// `frame0005.png` becomes `frame%04d.png?begin=5`; the `begin` suffix is
/// left out when the sequence starts at zero.
pub fn img_seq_resource_name(frame_file: &Path) -> Option<String> {
    let (prefix, digits, extension) = split_frame_name(frame_file)?;
    let start: u64 = digits.parse().ok()?;
    let mut name = format!("{prefix}%0{}d.{extension}", digits.len());
    if start != 0 {
        name.push_str(&format!("?begin={start}"));
    }
    Some(name)
}

/// Image sequence resource path for the frames in `dir`.
pub fn frame_sequence_resource(dir: &Path) -> MontageResult<Option<PathBuf>> {
    let Some(first) = lowest_numbered_file(dir)? else {
        return Ok(None);
    };
    Ok(img_seq_resource_name(&first).map(|name| dir.join(name)))
}

/// Copy a directory tree, replacing whatever is at `dst`.
pub fn copy_tree(src: &Path, dst: &Path) -> MontageResult<u64> {
    if dst.exists() {
        std::fs::remove_dir_all(dst)?;
    }
    std::fs::create_dir_all(dst)?;
    let mut copied = 0;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copied += copy_tree(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_name_with_begin() {
        assert_eq!(
            img_seq_resource_name(Path::new("/r/frame0005.png")).as_deref(),
            Some("frame%04d.png?begin=5")
        );
        assert_eq!(
            img_seq_resource_name(Path::new("/r/frame000.png")).as_deref(),
            Some("frame%03d.png")
        );
        assert_eq!(img_seq_resource_name(Path::new("/r/cover.png")), None);
    }

    #[test]
    fn test_lowest_numbered_file_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["frame0012.png", "frame0003.png", "frame0040.png", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let lowest = lowest_numbered_file(dir.path()).unwrap().unwrap();
        assert_eq!(lowest, dir.path().join("frame0003.png"));

        let resource = frame_sequence_resource(dir.path()).unwrap().unwrap();
        assert_eq!(resource, dir.path().join("frame%04d.png?begin=3"));
    }

    #[test]
    fn test_empty_dir_has_no_sequence() {
        let dir = tempfile::tempdir().unwrap();
        assert!(frame_sequence_resource(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_copy_tree_replaces_destination() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::create_dir(src.path().join("nested")).unwrap();
        std::fs::write(src.path().join("frame0001.png"), b"one").unwrap();
        std::fs::write(src.path().join("nested").join("frame0002.png"), b"two").unwrap();
        std::fs::write(dst.path().join("stale.png"), b"old").unwrap();

        let copied = copy_tree(src.path(), dst.path()).unwrap();
        assert_eq!(copied, 2);
        assert!(!dst.path().join("stale.png").exists());
        assert_eq!(
            std::fs::read(dst.path().join("nested").join("frame0002.png")).unwrap(),
            b"two"
        );
    }
}
