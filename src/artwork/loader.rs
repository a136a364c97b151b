use crate::error::{Result, VideoError};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "webp", "bmp", "gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SortOrder {
    /// Oldest first by modification time
    #[value(name = "date_modified")]
    DateModified,
    /// Case-insensitive file name
    Filename,
    Random,
    /// Shuffled through sub-folders, avoiding two neighbours from the same folder
    Interleave,
}

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Images of `folder` in the requested order. Only `Interleave` descends
/// into sub-folders.
pub fn load_images(folder: &Path, sort: SortOrder) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(VideoError::NotFound(folder.to_path_buf()));
    }

    let mut rng = rand::thread_rng();
    let images = match sort {
        SortOrder::Interleave => {
            let images: Vec<PathBuf> = WalkDir::new(folder)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|path| is_supported_image(path))
                .collect();
            interleave_by_folder(images, &mut rng)
        }
        _ => {
            let mut images = Vec::new();
            for entry in std::fs::read_dir(folder)? {
                let path = entry?.path();
                if path.is_file() && is_supported_image(&path) {
                    images.push(path);
                }
            }
            match sort {
                SortOrder::DateModified => {
                    let mut dated: Vec<(SystemTime, PathBuf)> = images
                        .into_iter()
                        .map(|p| {
                            let modified = std::fs::metadata(&p)
                                .and_then(|m| m.modified())
                                .unwrap_or(SystemTime::UNIX_EPOCH);
                            (modified, p)
                        })
                        .collect();
                    dated.sort();
                    dated.into_iter().map(|(_, p)| p).collect()
                }
                SortOrder::Filename => {
                    images.sort_by_key(|p| file_name_key(p));
                    images
                }
                _ => {
                    images.shuffle(&mut rng);
                    images
                }
            }
        }
    };

    if images.is_empty() {
        return Err(VideoError::Scene(format!(
            "No images found in {}",
            folder.display()
        )));
    }
    Ok(images)
}

fn file_name_key(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn parent_key(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

/// Round-robin across shuffled folders, then swap forward to break up any
/// remaining runs from one folder.
pub fn interleave_by_folder<R: Rng + ?Sized>(images: Vec<PathBuf>, rng: &mut R) -> Vec<PathBuf> {
    let mut groups: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for image in images {
        groups.entry(parent_key(&image)).or_default().push(image);
    }

    if groups.len() <= 1 {
        let mut all: Vec<PathBuf> = groups.into_values().flatten().collect();
        all.shuffle(rng);
        return all;
    }

    let mut queues: Vec<std::collections::VecDeque<PathBuf>> = groups
        .into_values()
        .map(|mut group| {
            group.shuffle(rng);
            group.into()
        })
        .collect();
    queues.shuffle(rng);

    let mut result = Vec::new();
    while queues.iter().any(|q| !q.is_empty()) {
        for queue in queues.iter_mut() {
            if let Some(image) = queue.pop_front() {
                result.push(image);
            }
        }
    }

    for i in 1..result.len() {
        if parent_key(&result[i]) == parent_key(&result[i - 1]) {
            let current = parent_key(&result[i]);
            if let Some(j) = (i + 1..result.len()).find(|&j| parent_key(&result[j]) != current) {
                result.swap(i, j);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_extension_filter() {
        assert!(is_supported_image(Path::new("a/B.JPG")));
        assert!(is_supported_image(Path::new("c.webp")));
        assert!(!is_supported_image(Path::new("notes.txt")));
        assert!(!is_supported_image(Path::new("noext")));
    }

    #[test]
    fn test_filename_sort_ignores_case_and_other_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "A.jpg", "c.JPEG", "readme.md"] {
            touch(&dir.path().join(name));
        }
        let images = load_images(dir.path(), SortOrder::Filename).unwrap();
        let names: Vec<_> = images.iter().map(|p| file_name_key(p)).collect();
        assert_eq!(names, vec!["a.jpg", "b.png", "c.jpeg"]);
    }

    #[test]
    fn test_missing_or_empty_folder_is_fatal() {
        assert!(matches!(
            load_images(Path::new("/no/such/folder"), SortOrder::Filename),
            Err(VideoError::NotFound(_))
        ));
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("only.txt"));
        assert!(load_images(dir.path(), SortOrder::Random).is_err());
    }

    #[test]
    fn test_interleave_avoids_same_folder_neighbours() {
        let images: Vec<PathBuf> = ["x/1.jpg", "x/2.jpg", "y/1.jpg", "y/2.jpg", "z/1.jpg"]
            .iter()
            .map(PathBuf::from)
            .collect();
        let mut rng = StdRng::seed_from_u64(3);
        let ordered = interleave_by_folder(images.clone(), &mut rng);
        assert_eq!(ordered.len(), images.len());
        for pair in ordered.windows(2) {
            assert_ne!(parent_key(&pair[0]), parent_key(&pair[1]), "{:?}", ordered);
        }
    }

    #[test]
    fn test_interleave_walks_sub_folders() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("beach/1.png"));
        touch(&dir.path().join("city/1.png"));
        touch(&dir.path().join("city/2.png"));
        let images = load_images(dir.path(), SortOrder::Interleave).unwrap();
        assert_eq!(images.len(), 3);
        let beach = images
            .iter()
            .filter(|p| parent_key(p) == dir.path().join("beach"))
            .count();
        assert_eq!(beach, 1);
    }
}
