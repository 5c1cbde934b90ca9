//! Conventional on-disk layout derived from the project root and target.

use std::path::PathBuf;

/// All canonical paths for one target under a project root.
///
/// Layout: `data/<target>/<target>_sample.pdf` (document),
/// `data/<target>/result.csv` (reference table),
/// `custom_parsers/<target>_parser.py` (candidate, overwritten per attempt),
/// `.parsegen/<target>/attempts/<n>/` (attempt artifacts).
#[derive(Debug, Clone)]
pub struct TargetPaths {
    pub root: PathBuf,
    pub target: String,
    pub document_path: PathBuf,
    pub reference_path: PathBuf,
    pub parser_path: PathBuf,
    pub attempts_dir: PathBuf,
    pub config_path: PathBuf,
}

impl TargetPaths {
    pub fn new(root: impl Into<PathBuf>, target: &str) -> Self {
        let root = root.into();
        let data_dir = root.join("data").join(target);
        Self {
            document_path: data_dir.join(format!("{target}_sample.pdf")),
            reference_path: data_dir.join("result.csv"),
            parser_path: root
                .join("custom_parsers")
                .join(format!("{target}_parser.py")),
            attempts_dir: root.join(".parsegen").join(target).join("attempts"),
            config_path: root.join("parsegen.toml"),
            target: target.to_string(),
            root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn paths_are_stable() {
        let paths = TargetPaths::new("/work", "icici");
        assert_eq!(
            paths.document_path,
            Path::new("/work/data/icici/icici_sample.pdf")
        );
        assert_eq!(paths.reference_path, Path::new("/work/data/icici/result.csv"));
        assert_eq!(
            paths.parser_path,
            Path::new("/work/custom_parsers/icici_parser.py")
        );
        assert_eq!(
            paths.attempts_dir,
            Path::new("/work/.parsegen/icici/attempts")
        );
        assert_eq!(paths.config_path, Path::new("/work/parsegen.toml"));
    }
}
