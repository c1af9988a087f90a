//! Orphan removal after a build.

use std::fs;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

use crate::context::ProcessedSet;

/// What a sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub files: usize,
    pub dirs: usize,
}

/// Delete every file under `output_dir` that the build did not produce, then
/// every directory left empty. The output directory itself is never removed.
///
/// A missing output directory is not an error.
pub fn sweep_orphans(output_dir: &Path, processed: &ProcessedSet) -> io::Result<SweepReport> {
    let mut report = SweepReport::default();
    if !output_dir.is_dir() {
        return Ok(report);
    }

    for entry in WalkDir::new(output_dir).min_depth(1).contents_first(true) {
        let entry = entry.map_err(io::Error::from)?;
        let path = entry.path();

        if entry.file_type().is_dir() {
            if fs::read_dir(path)?.next().is_none() {
                fs::remove_dir(path)?;
                tracing::debug!("Removed empty directory: {}", path.display());
                report.dirs += 1;
            }
        } else if !processed.contains(path) {
            fs::remove_file(path)?;
            tracing::info!("Removed orphan: {}", path.display());
            report.files += 1;
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn removes_orphans_and_empty_directories() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("docs");
        let kept = out.join("posts/a/index.html");
        touch(&kept);
        touch(&out.join("old/page.html"));
        touch(&out.join("static/css/style.1111111111.css"));
        fs::create_dir_all(out.join("empty/nested")).unwrap();

        let mut processed = ProcessedSet::default();
        processed.insert(kept.clone());

        let report = sweep_orphans(&out, &processed).unwrap();

        assert_eq!(report, SweepReport { files: 2, dirs: 5 });
        assert!(kept.exists());
        assert!(!out.join("old").exists());
        assert!(!out.join("static").exists());
        assert!(!out.join("empty").exists());
        assert!(out.is_dir());
    }

    #[test]
    fn empty_output_directory_survives() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("docs");
        touch(&out.join("stale.html"));

        sweep_orphans(&out, &ProcessedSet::default()).unwrap();

        assert!(out.is_dir());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn missing_output_directory_is_a_no_op() {
        let temp = tempdir().unwrap();

        let report = sweep_orphans(&temp.path().join("nope"), &ProcessedSet::default()).unwrap();

        assert_eq!(report, SweepReport::default());
    }
}
