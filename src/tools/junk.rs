//! Junk (temp file) measurement and cleanup

use crate::context::AppContext;
use crate::exec::{run_capture, ExternalCommand};
use crate::platform::OsKind;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use walkdir::WalkDir;

/// Temp directories worth scanning on this OS. Missing paths are fine,
/// measurement just skips them.
pub fn temp_paths(os: OsKind) -> Vec<PathBuf> {
    match os {
        OsKind::Windows => {
            let mut paths = Vec::new();
            if let Ok(temp) = std::env::var("TEMP") {
                paths.push(PathBuf::from(temp));
            }
            if let Ok(local) = std::env::var("LOCALAPPDATA") {
                paths.push(PathBuf::from(local).join("Temp"));
            }
            paths.push(PathBuf::from(r"C:\Windows\Temp"));
            paths
        }
        _ => vec![std::env::temp_dir()],
    }
}

/// Total size in bytes of all files under the given paths. Unreadable
/// entries are skipped.
pub fn measure(paths: &[PathBuf]) -> u64 {
    paths
        .iter()
        .filter(|path| path.exists())
        .flat_map(|path| WalkDir::new(path).into_iter().filter_map(|e| e.ok()))
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}

/// Remove the contents of the given directories, best effort. Returns the
/// bytes actually freed; locked or protected entries are left in place
/// without complaint.
pub fn sweep_paths(paths: &[PathBuf]) -> u64 {
    let mut freed = 0u64;
    for dir in paths {
        if !dir.is_dir() {
            continue;
        }
        let Ok(entries) = fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                let size = measure(std::slice::from_ref(&path));
                if fs::remove_dir_all(&path).is_ok() {
                    freed += size;
                }
            } else {
                let size = fs::symlink_metadata(&path).map(|m| m.len()).unwrap_or(0);
                if fs::remove_file(&path).is_ok() {
                    freed += size;
                }
            }
        }
    }
    freed
}

/// Clean this OS's temp paths and, on Windows, empty the recycle bin.
/// Returns the bytes freed from the temp sweep.
pub fn sweep(ctx: &mut AppContext) -> u64 {
    let freed = sweep_paths(&temp_paths(ctx.os));
    if ctx.os == OsKind::Windows {
        clear_recycle_bin(ctx);
    }
    ctx.sink.append(&format!("[junk] freed {freed} bytes"));
    freed
}

/// Best effort; a failure is logged and forgotten
fn clear_recycle_bin(ctx: &mut AppContext) {
    let cmd = ExternalCommand::new("powershell")
        .args([
            "-NoProfile",
            "-Command",
            "Clear-RecycleBin -Force -ErrorAction SilentlyContinue",
        ])
        .with_title("Emptying Recycle Bin");
    let result = run_capture(&cmd, Some(Duration::from_secs(30)));
    if !result.success() {
        ctx.sink.append("[junk] recycle bin clear failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, bytes: usize) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(&vec![0u8; bytes]).unwrap();
        path
    }

    #[test]
    fn test_measure_sums_files_recursively() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "a.tmp", 100);
        fs::create_dir(dir.path().join("nested")).unwrap();
        let nested = dir.path().join("nested").join("b.tmp");
        File::create(&nested).unwrap().write_all(&[0u8; 50]).unwrap();

        assert_eq!(measure(&[dir.path().to_path_buf()]), 150);
    }

    #[test]
    fn test_measure_skips_missing_paths() {
        assert_eq!(measure(&[PathBuf::from("/no/such/dir/upkeep")]), 0);
    }

    #[test]
    fn test_sweep_paths_removes_files_and_subtrees() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "a.tmp", 100);
        fs::create_dir(dir.path().join("nested")).unwrap();
        File::create(dir.path().join("nested").join("b.tmp"))
            .unwrap()
            .write_all(&[0u8; 50])
            .unwrap();

        let freed = sweep_paths(&[dir.path().to_path_buf()]);
        assert_eq!(freed, 150);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_sweep_paths_ignores_missing_dirs() {
        assert_eq!(sweep_paths(&[PathBuf::from("/no/such/dir/upkeep")]), 0);
    }

    #[test]
    fn test_temp_paths_not_empty() {
        assert!(!temp_paths(OsKind::current()).is_empty());
    }
}
