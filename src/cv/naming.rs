//! Fold artifact naming.

use std::path::{Path, PathBuf};

/// Path of fold `fold`'s artifact: `name.ext` becomes `name.fold{k:03}.ext`
/// in the same directory.
///
/// ```
/// use std::path::Path;
/// use foldwise::cv::fold_artifact_path;
///
/// let p = fold_artifact_path(Path::new("out/model.json"), 7);
/// assert_eq!(p, Path::new("out/model.fold007.json"));
/// ```
pub fn fold_artifact_path(base: &Path, fold: usize) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match base.extension() {
        Some(ext) => format!("{stem}.fold{fold:03}.{}", ext.to_string_lossy()),
        None => format!("{stem}.fold{fold:03}"),
    };
    base.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("model.zip", 0, "model.fold000.zip")]
    #[case("dir/model.zip", 12, "dir/model.fold012.zip")]
    #[case("model", 3, "model.fold003")]
    #[case("a.b.c", 1, "a.b.fold001.c")]
    #[case("m.bin", 1234, "m.fold1234.bin")]
    fn test_fold_artifact_path(#[case] base: &str, #[case] fold: usize, #[case] expected: &str) {
        assert_eq!(fold_artifact_path(Path::new(base), fold), PathBuf::from(expected));
    }
}
