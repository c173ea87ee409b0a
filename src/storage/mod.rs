pub mod local;
pub mod proxy;

#[cfg(feature = "lambda")]
pub mod s3;

use uuid::Uuid;

/// Uniquifies an object key so repeated benchmark runs never collide:
/// `dir/name.ext` becomes `dir/name.<8 hex>.ext`.
pub fn unique_name(key: &str) -> String {
    let random = Uuid::new_v4().to_string();
    let random = random.split('-').next().unwrap_or("0");
    match key.rsplit_once('.') {
        // a dot inside a path component is an extension only if it comes
        // after the last slash
        Some((stem, ext)) if !ext.contains('/') => format!("{}.{}.{}", stem, random, ext),
        _ => format!("{}.{}", key, random),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_name_keeps_extension() {
        let name = unique_name("out/result.csv");
        assert!(name.starts_with("out/result."));
        assert!(name.ends_with(".csv"));
        assert_ne!(name, "out/result.csv");
    }

    #[test]
    fn test_unique_name_without_extension() {
        let name = unique_name("blob");
        assert!(name.starts_with("blob."));
        assert_eq!(name.split('.').count(), 2);
    }

    #[test]
    fn test_unique_name_dot_in_directory() {
        let name = unique_name("v1.2/data");
        assert!(name.starts_with("v1.2/data."));
    }

    #[test]
    fn test_unique_names_differ() {
        assert_ne!(unique_name("a.txt"), unique_name("a.txt"));
    }
}
