//! Virtual asset paths
//!
//! A virtual path is `<namespace>/<relative-path>.<extension>`, e.g.
//! `textures/terrain/rock.png`. It is derived from the name a caller asks
//! for and is the only key the cache knows.

use std::borrow::Borrow;
use std::fmt;

use crate::error::AssetError;

/// Normalized cache key for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualPath(String);

impl VirtualPath {
    /// Normalize a caller-supplied name into a virtual path inside `namespace`.
    ///
    /// Backslashes become `/`, empty and `.` segments are dropped, a leading
    /// namespace segment is not repeated, and `default_extension` is appended
    /// when the file name has none. `..` segments are rejected.
    pub fn normalize(
        namespace: &str,
        name: &str,
        default_extension: &str,
    ) -> Result<Self, AssetError> {
        let cleaned = name.trim().replace('\\', "/");
        let mut segments = Vec::new();
        for segment in cleaned.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(AssetError::InvalidArgument(format!(
                        "asset name '{}' escapes its namespace",
                        name
                    )))
                }
                s => segments.push(s),
            }
        }

        if segments.len() > 1 && segments[0] == namespace {
            segments.remove(0);
        }

        let Some(file_name) = segments.pop() else {
            return Err(AssetError::InvalidArgument(format!(
                "asset name '{}' is empty",
                name
            )));
        };

        let file_name = file_name.trim_end_matches('.');
        if file_name.is_empty() {
            return Err(AssetError::InvalidArgument(format!(
                "asset name '{}' has no file name",
                name
            )));
        }

        let file_name = if split_extension(file_name).is_some() || default_extension.is_empty() {
            file_name.to_string()
        } else {
            format!("{}.{}", file_name, default_extension.trim_start_matches('.'))
        };

        let mut path = String::with_capacity(namespace.len() + cleaned.len() + 8);
        path.push_str(namespace);
        for segment in segments {
            path.push('/');
            path.push_str(segment);
        }
        path.push('/');
        path.push_str(&file_name);

        Ok(Self(path))
    }

    /// The full path as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The namespace (first segment).
    pub fn namespace(&self) -> &str {
        self.0.split_once('/').map_or(&self.0, |(ns, _)| ns)
    }

    /// The path below the namespace.
    pub fn relative(&self) -> &str {
        self.0.split_once('/').map_or("", |(_, rest)| rest)
    }

    /// The last segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit_once('/').map_or(&self.0, |(_, name)| name)
    }

    /// Lowercase extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        split_extension(self.file_name()).map(|(_, ext)| ext.to_ascii_lowercase())
    }
}

/// Split `name` into stem and extension. Hidden-file style names such as
/// `.rock` have no extension.
fn split_extension(name: &str) -> Option<(&str, &str)> {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some((stem, ext)),
        _ => None,
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VirtualPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for VirtualPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture(name: &str) -> Result<VirtualPath, AssetError> {
        VirtualPath::normalize("textures", name, "png")
    }

    #[test]
    fn appends_default_extension() {
        assert_eq!(texture("rock").unwrap().as_str(), "textures/rock.png");
        assert_eq!(texture("rock.").unwrap().as_str(), "textures/rock.png");
        assert_eq!(texture("rock.bmp").unwrap().as_str(), "textures/rock.bmp");
    }

    #[test]
    fn keeps_existing_namespace() {
        assert_eq!(
            texture("textures/terrain/rock.png").unwrap().as_str(),
            "textures/terrain/rock.png"
        );
        // A file literally called "textures" is not a namespace prefix.
        assert_eq!(texture("textures").unwrap().as_str(), "textures/textures.png");
    }

    #[test]
    fn cleans_separators() {
        assert_eq!(
            texture(r".\terrain\\rock.png").unwrap().as_str(),
            "textures/terrain/rock.png"
        );
        assert_eq!(texture("/terrain/./rock").unwrap().as_str(), "textures/terrain/rock.png");
    }

    #[test]
    fn rejects_bad_names() {
        assert!(matches!(texture(""), Err(AssetError::InvalidArgument(_))));
        assert!(matches!(texture("  / "), Err(AssetError::InvalidArgument(_))));
        assert!(matches!(texture("../secret.png"), Err(AssetError::InvalidArgument(_))));
        assert!(matches!(texture("..."), Err(AssetError::InvalidArgument(_))));
    }

    #[test]
    fn path_parts() {
        let path = texture("terrain/Rock.PNG").unwrap();
        assert_eq!(path.namespace(), "textures");
        assert_eq!(path.relative(), "terrain/Rock.PNG");
        assert_eq!(path.file_name(), "Rock.PNG");
        assert_eq!(path.extension().as_deref(), Some("png"));
    }

    #[test]
    fn hidden_file_gets_extension() {
        let path = texture(".rock").unwrap();
        assert_eq!(path.as_str(), "textures/.rock.png");
        assert_eq!(path.extension().as_deref(), Some("png"));
    }
}
