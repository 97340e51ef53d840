use std::path::{Component, Path, PathBuf};

pub mod address;
pub mod classify;
pub mod index;

/// Does an import literal address a file relative to the importing file?
pub fn is_relative_literal(literal: &str) -> bool {
    literal == "."
        || literal == ".."
        || literal.starts_with("./")
        || literal.starts_with("../")
}

/// Normalize a path by resolving `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                // Only pop if there's a normal component to pop
                if components
                    .last()
                    .is_some_and(|c| matches!(c, Component::Normal(_)))
                {
                    components.pop();
                } else {
                    components.push(component);
                }
            }
            Component::CurDir => {}
            other => {
                components.push(other);
            }
        }
    }
    components.iter().collect()
}

/// Render a path as a forward-slash string, whatever the platform separator.
pub fn to_slash(path: &Path) -> String {
    let rendered = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        rendered.into_owned()
    } else {
        rendered.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

/// Normalized forward-slash key for a path.
pub fn path_key(path: &Path) -> String {
    to_slash(&normalize_path(path))
}

/// Strip a trailing extension from a forward-slash address when it is one of `extensions`.
///
/// Only known source extensions are stripped, so `helper.test` never collapses
/// onto `helper`.
pub fn strip_source_extension<'a>(address: &'a str, extensions: &[String]) -> &'a str {
    let file_start = address.rfind('/').map(|i| i + 1).unwrap_or(0);
    let file_name = &address[file_start..];
    if let Some(dot) = file_name.rfind('.') {
        if dot > 0 && extensions.iter().any(|e| e == &file_name[dot + 1..]) {
            return &address[..file_start + dot];
        }
    }
    address
}

/// Extension of the last segment of a literal or path string, if any.
pub fn literal_extension(literal: &str) -> Option<&str> {
    let file_name = literal.rsplit('/').next().unwrap_or(literal);
    match file_name.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < file_name.len() => Some(&file_name[dot + 1..]),
        _ => None,
    }
}

/// Resolve a relative literal against the directory of `containing_file`.
pub fn resolve_relative(literal: &str, containing_file: &Path) -> PathBuf {
    let base_dir = containing_file.parent().unwrap_or(Path::new("/"));
    normalize_path(&base_dir.join(literal))
}

/// Build a relative import literal that reaches `target` from `from_dir`.
///
/// The result always starts with `./` or `../` so it stays a relative specifier.
pub fn relative_literal(from_dir: &Path, target: &Path) -> String {
    let relative = pathdiff::diff_paths(target, from_dir).unwrap_or_else(|| target.to_path_buf());
    let relative = to_slash(&relative);
    if relative.is_empty() {
        ".".to_string()
    } else if relative == ".." || relative.starts_with("../") || relative.starts_with("./") {
        relative
    } else {
        format!("./{}", relative)
    }
}
