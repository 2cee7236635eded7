use std::{
    fs::{self, OpenOptions, ReadDir},
    io::Write as _,
    path::{Path, PathBuf},
};

pub mod error {
    use std::{io, path::PathBuf};

    pub type Result<T> = std::result::Result<T, self::Error>;

    type Msg = &'static str;

    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("{0} ({1}): {2}")]
        SingleIO(Msg, PathBuf, #[source] io::Error),

        #[error("Failed to canonicalize path '{0}': {1}")]
        CanonicalizePath(PathBuf, #[source] io::Error),

        #[error("No entry matched glob '{0}' in '{1}'")]
        NoEntryMatchedGlob(::glob::Pattern, PathBuf),
    }
}
pub use error::{Error, Result};

#[must_use]
pub fn mkdir_all(path: impl AsRef<Path>) -> Result<()> {
    let dir = path.as_ref();
    fs::create_dir_all(dir).map_err(|e| Error::SingleIO("Cannot create dir", dir.to_owned(), e))
}

/// Reads a whole file, replacing invalid UTF-8 sequences with U+FFFD.
#[must_use]
pub fn read_to_string_lossy(filepath: impl AsRef<Path>) -> Result<String> {
    let bytes = fs::read(&filepath)
        .map_err(|e| Error::SingleIO("Cannot read file", filepath.as_ref().to_owned(), e))?;
    Ok(match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            log::debug!(
                "'{}' is not valid UTF-8, decoding lossily",
                filepath.as_ref().to_string_lossy()
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    })
}

/// Writes `contents` to a file that must not exist yet.
#[must_use]
pub fn write_new_with_mkdir<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    let filepath = filepath.as_ref();
    if let Some(dir) = filepath.parent() {
        self::mkdir_all(dir)?;
    }
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(filepath)
        .and_then(|mut f| f.write_all(contents.as_ref()))
        .map_err(|e| Error::SingleIO("Cannot write new file", filepath.to_owned(), e))
}

#[must_use]
pub fn remove_file(filepath: impl AsRef<Path>) -> Result<()> {
    fs::remove_file(&filepath)
        .map_err(|e| Error::SingleIO("Cannot remove file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn read_dir(dir: impl AsRef<Path>) -> Result<ReadDir> {
    fs::read_dir(&dir).map_err(|e| Error::SingleIO("Cannot read dir", dir.as_ref().to_owned(), e))
}

pub fn canonicalize_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    path.canonicalize()
        .map_err(|e| Error::CanonicalizePath(path.to_owned(), e))
}

/// Recursively collects files under `dir` whose file name matches `filename_pattern`.
/// The result is sorted so that runs are reproducible.
pub fn find_files_recursively(
    dir: impl AsRef<Path>,
    filename_pattern: &::glob::Pattern,
) -> Result<Vec<PathBuf>> {
    fn walk(dir: &Path, pat: &::glob::Pattern, acc: &mut Vec<PathBuf>) -> Result<()> {
        for entry in self::read_dir(dir)?.filter_map(std::result::Result::ok) {
            let Ok(ft) = entry.file_type() else {
                continue
            };
            let path = entry.path();
            if ft.is_dir() {
                walk(&path, pat, acc)?;
            } else if pat.matches(entry.file_name().to_string_lossy().as_ref()) {
                acc.push(path);
            }
        }
        Ok(())
    }

    let dir = dir.as_ref();
    let mut files = Vec::new();
    walk(dir, filename_pattern, &mut files)?;
    if files.is_empty() {
        return Err(Error::NoEntryMatchedGlob(
            filename_pattern.to_owned(),
            dir.to_owned(),
        ));
    }
    files.sort();
    Ok(files)
}
