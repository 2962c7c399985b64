use std::path::{Component, Path, PathBuf};

/// Lexically normalizes `path`: drops `.` and resolves `..` against what came before.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut new_path = PathBuf::new();

    for component in path.components() {
        match component {
            // Skip the current-dir marker "."
            Component::CurDir => {}

            // For "..", pop the last component if possible
            Component::ParentDir => {
                new_path.pop();
            }

            // For normal components, push them
            other => new_path.push(other.as_os_str()),
        }
    }

    new_path
}

/// Whether `name` can be used as a single entry name under a parent directory.
pub fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();

    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(first)), None) if first == name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_resolves_dots() {
        assert_eq!(
            normalize_path(Path::new("/output/./pkg/../README.md")),
            PathBuf::from("/output/README.md")
        );
        assert_eq!(normalize_path(Path::new("/output/.")), PathBuf::from("/output"));
    }

    #[test]
    fn plain_names() {
        assert!(is_plain_name("README.md"));
        assert!(is_plain_name(".config"));

        assert!(!is_plain_name(""));
        assert!(!is_plain_name("."));
        assert!(!is_plain_name(".."));
        assert!(!is_plain_name("pkg/a.txt"));
        assert!(!is_plain_name("/etc"));
        assert!(!is_plain_name("trailing/"));
    }
}
