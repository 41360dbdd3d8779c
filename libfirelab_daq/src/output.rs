use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const PARTIAL_EXTENSION: &str = "part";

/// Path of the in-progress file for an output, e.g. `list.chcfg.part`
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(OsString::from(format!(".{PARTIAL_EXTENSION}")));
    PathBuf::from(name)
}

/// Write an output file so that it only appears at `path` once completely written.
///
/// The contents go to a `.part` file next to the target, which is flushed, closed and then
/// renamed over the target. If writing fails the `.part` file is removed and the target is
/// left untouched.
pub fn write_file_atomically<F, E>(path: &Path, write: F) -> Result<(), E>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), E>,
    E: From<std::io::Error>,
{
    let part = partial_path(path);
    let result = File::create(&part)
        .map_err(E::from)
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            write(&mut writer)?;
            writer.flush()?;
            Ok(())
        })
        .and_then(|_| std::fs::rename(&part, path).map_err(E::from));

    if result.is_err() && part.exists() {
        if let Err(e) = std::fs::remove_file(&part) {
            log::warn!("Could not remove partial file {}: {e}", part.display());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("a/b_channel_list.chcfg")),
            PathBuf::from("a/b_channel_list.chcfg.part")
        );
    }

    #[test]
    fn test_failed_write_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.txt");
        let result: Result<(), std::io::Error> = write_file_atomically(&target, |w| {
            w.write_all(b"half of a file")?;
            Err(std::io::Error::other("interrupted"))
        });
        assert!(result.is_err());
        assert!(!target.exists());
        assert!(!partial_path(&target).exists());
    }

    #[test]
    fn test_successful_write_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.txt");
        std::fs::write(&target, "old").unwrap();
        let result: Result<(), std::io::Error> =
            write_file_atomically(&target, |w| w.write_all(b"new"));
        assert!(result.is_ok());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
        assert!(!partial_path(&target).exists());
    }
}
