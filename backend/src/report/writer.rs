use chrono::{DateTime, Local};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::ReportError;

pub fn report_file_name(at: &DateTime<Local>) -> String {
    format!("TumorX_Report_{}.pdf", at.format("%Y%m%d_%H%M%S"))
}

/// Stages the bytes in a hidden temp file next to the target and renames it
/// into place. The staging file is removed on every failure path, and an
/// existing report with the same name is never overwritten.
pub fn write_report(
    bytes: &[u8],
    output_dir: &Path,
    file_name: &str,
) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(output_dir)?;
    let target = output_dir.join(file_name);

    let mut staging = tempfile::Builder::new()
        .prefix(".tumorx-report-")
        .suffix(".pdf.tmp")
        .tempfile_in(output_dir)?;
    staging.write_all(bytes)?;
    staging.as_file().sync_all()?;

    persist(staging, &target)?;
    Ok(target)
}

fn persist(staging: NamedTempFile, target: &Path) -> Result<(), ReportError> {
    staging.persist_noclobber(target).map(|_| ()).map_err(|e| {
        // Dropping the returned handle deletes the staging file.
        drop(e.file);
        if e.error.kind() == std::io::ErrorKind::AlreadyExists {
            ReportError::AlreadyExists(target.to_path_buf())
        } else {
            ReportError::Io(e.error)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn staged_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tumorx-report-"))
            .count()
    }

    #[test]
    fn test_file_name_embeds_timestamp() {
        let at = Local.with_ymd_and_hms(2026, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(report_file_name(&at), "TumorX_Report_20260305_140709.pdf");
    }

    #[test]
    fn test_write_report() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("reports");
        let path = write_report(b"%PDF-1.3 test", &out, "a.pdf").unwrap();
        assert_eq!(path, out.join("a.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.3 test");
        assert_eq!(staged_files(&out), 0);
    }

    #[test]
    fn test_same_name_is_not_overwritten() {
        let tmp = tempfile::tempdir().unwrap();
        write_report(b"first", tmp.path(), "dup.pdf").unwrap();
        let err = write_report(b"second", tmp.path(), "dup.pdf").unwrap_err();
        assert!(matches!(err, ReportError::AlreadyExists(_)));
        assert_eq!(std::fs::read(tmp.path().join("dup.pdf")).unwrap(), b"first");
        assert_eq!(staged_files(tmp.path()), 0);
    }
}
