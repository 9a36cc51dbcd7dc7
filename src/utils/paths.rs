use std::path::PathBuf;

/// File extension of a binary unit inside an artifact tree
pub const UNIT_SUFFIX: &str = ".unit";

/// Converts a fully-qualified unit name to its binary entry name
/// Example: "a.b.C" -> "a/b/C.unit"
pub fn binary_name(name: &str) -> String {
    format!("{}{}", name.replace('.', "/"), UNIT_SUFFIX)
}

/// Converts a fully-qualified unit name to its artifact-relative path
pub fn unit_path(name: &str) -> PathBuf {
    PathBuf::from(binary_name(name))
}

/// Converts a binary entry name back to a fully-qualified unit name
/// Example: "a/b/C.unit" -> "a.b.C"
pub fn unit_name(binary: &str) -> String {
    binary
        .strip_suffix(UNIT_SUFFIX)
        .unwrap_or(binary)
        .replace('/', ".")
}

/// Converts a package name to the directory prefix its members live under
pub fn package_prefix(package: &str) -> String {
    format!("{}/", package.replace('.', "/"))
}
