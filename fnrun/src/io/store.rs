//! Flat-directory function store.
//!
//! Each function lives at `<root>/<name>.<extension>`. Names are validated
//! with [`FunctionName::parse`] before any path is built, so only grammar-safe
//! names ever touch the filesystem. Writes go through a temp file in the same
//! directory followed by a rename, so readers see either the previous source
//! or the new one, never a partial write.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::core::name::FunctionName;
use crate::error::{FunctionError, FunctionResult};

pub const DEFAULT_EXTENSION: &str = "py";

const TEMP_PREFIX: &str = ".put-";

/// A registered function located on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFunction {
    pub name: FunctionName,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FunctionStore {
    root: PathBuf,
    extension: String,
}

impl FunctionStore {
    /// Open the store at `root`, creating the directory if absent.
    pub fn open(root: impl Into<PathBuf>) -> FunctionResult<Self> {
        Self::open_with_extension(root, DEFAULT_EXTENSION)
    }

    pub fn open_with_extension(root: impl Into<PathBuf>, extension: &str) -> FunctionResult<Self> {
        if !is_valid_extension(extension) {
            return Err(FunctionError::io(
                format!("invalid store extension {extension:?}"),
                std::io::Error::from(ErrorKind::InvalidInput),
            ));
        }
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| {
            FunctionError::io(format!("create store root {}", root.display()), err)
        })?;
        debug!(root = %root.display(), extension, "function store opened");
        Ok(Self {
            root,
            extension: extension.to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Register `source` under `name`, replacing any previous source.
    #[instrument(skip_all, fields(name = %name, bytes = source.len()))]
    pub fn put(&self, name: &str, source: &[u8]) -> FunctionResult<()> {
        let name = parse_name(name)?;
        let path = self.path_for(&name);

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.root)
            .map_err(|err| {
                FunctionError::io(format!("create temp file in {}", self.root.display()), err)
            })?;
        tmp.write_all(source)
            .map_err(|err| FunctionError::io(format!("write function {name}"), err))?;
        tmp.as_file()
            .sync_all()
            .map_err(|err| FunctionError::io(format!("sync function {name}"), err))?;
        tmp.persist(&path).map_err(|err| {
            FunctionError::io(format!("replace function {}", path.display()), err.error)
        })?;

        info!(%name, "function registered");
        Ok(())
    }

    pub fn exists(&self, name: &str) -> FunctionResult<bool> {
        let name = parse_name(name)?;
        let path = self.path_for(&name);
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(FunctionError::io(format!("stat {}", path.display()), err)),
        }
    }

    /// Delete the function. Fails with `NotFound` if nothing is stored.
    #[instrument(skip_all, fields(name = %name))]
    pub fn remove(&self, name: &str) -> FunctionResult<()> {
        let name = parse_name(name)?;
        let path = self.path_for(&name);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(%name, "function removed");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(FunctionError::NotFound(name.to_string()))
            }
            Err(err) => Err(FunctionError::io(format!("remove {}", path.display()), err)),
        }
    }

    /// Locate the stored source for `name`.
    pub fn resolve(&self, name: &str) -> FunctionResult<ResolvedFunction> {
        let name = parse_name(name)?;
        if !self.exists(name.as_str())? {
            return Err(FunctionError::NotFound(name.to_string()));
        }
        let path = self.path_for(&name);
        debug!(%name, path = %path.display(), "function resolved");
        Ok(ResolvedFunction { name, path })
    }

    pub fn read(&self, name: &str) -> FunctionResult<Vec<u8>> {
        let name = parse_name(name)?;
        let path = self.path_for(&name);
        fs::read(&path).map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                FunctionError::NotFound(name.to_string())
            } else {
                FunctionError::io(format!("read {}", path.display()), err)
            }
        })
    }

    /// Names of all stored functions, sorted.
    ///
    /// In-flight temp files and files that do not map back to a valid name
    /// with this store's extension are skipped.
    pub fn list(&self) -> FunctionResult<Vec<FunctionName>> {
        let entries = fs::read_dir(&self.root).map_err(|err| {
            FunctionError::io(format!("read store root {}", self.root.display()), err)
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| {
                FunctionError::io(format!("read store root {}", self.root.display()), err)
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if let Ok(name) = FunctionName::parse(stem) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn path_for(&self, name: &FunctionName) -> PathBuf {
        self.root.join(format!("{}.{}", name, self.extension))
    }
}

fn parse_name(raw: &str) -> FunctionResult<FunctionName> {
    FunctionName::parse(raw).map_err(|reason| FunctionError::InvalidName {
        name: raw.to_string(),
        reason,
    })
}

fn is_valid_extension(extension: &str) -> bool {
    !extension.is_empty()
        && extension.len() <= 16
        && extension.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FunctionStore) {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = FunctionStore::open(temp.path().join("functions")).expect("open");
        (temp, store)
    }

    #[test]
    fn open_creates_missing_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("nested").join("functions");
        FunctionStore::open(&root).expect("open");
        assert!(root.is_dir());
    }

    #[test]
    fn put_then_read_round_trips_bytes() {
        let (_temp, store) = store();
        let source = b"print('hi')\n\x00\xff".to_vec();
        store.put("hello", &source).expect("put");
        assert_eq!(store.read("hello").expect("read"), source);
        let resolved = store.resolve("hello").expect("resolve");
        assert_eq!(resolved.path, store.root().join("hello.py"));
        assert_eq!(fs::read(&resolved.path).expect("read path"), source);
    }

    #[test]
    fn put_overwrites_without_residue() {
        let (_temp, store) = store();
        store.put("hello", b"a much longer first version").expect("put 1");
        store.put("hello", b"short").expect("put 2");
        assert_eq!(store.read("hello").expect("read"), b"short");
    }

    #[test]
    fn put_leaves_no_temp_files() {
        let (_temp, store) = store();
        store.put("hello", b"x").expect("put");
        let entries: Vec<_> = fs::read_dir(store.root())
            .expect("read_dir")
            .map(|e| e.expect("entry").file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("hello.py")]);
    }

    #[test]
    fn remove_twice_reports_not_found() {
        let (_temp, store) = store();
        store.put("hello", b"x").expect("put");
        store.remove("hello").expect("remove");
        assert!(!store.exists("hello").expect("exists"));
        let err = store.remove("hello").unwrap_err();
        assert!(matches!(err, FunctionError::NotFound(ref n) if n == "hello"));
    }

    #[test]
    fn resolve_and_read_missing_are_not_found() {
        let (_temp, store) = store();
        assert!(matches!(
            store.resolve("missing"),
            Err(FunctionError::NotFound(_))
        ));
        assert!(matches!(store.read("missing"), Err(FunctionError::NotFound(_))));
    }

    #[test]
    fn traversal_names_are_rejected_before_touching_disk() {
        let (temp, store) = store();
        for raw in ["../escape", "..", "a/b", ""] {
            let err = store.put(raw, b"x").unwrap_err();
            assert!(matches!(err, FunctionError::InvalidName { .. }), "{raw:?}");
            assert!(matches!(
                store.remove(raw),
                Err(FunctionError::InvalidName { .. })
            ));
            assert!(matches!(
                store.resolve(raw),
                Err(FunctionError::InvalidName { .. })
            ));
        }
        assert!(!temp.path().join("escape.py").exists());
    }

    #[test]
    fn list_skips_foreign_files() {
        let (_temp, store) = store();
        store.put("b", b"x").expect("put b");
        store.put("a", b"x").expect("put a");
        fs::write(store.root().join("notes.txt"), "x").expect("write txt");
        fs::write(store.root().join(".put-abc.py"), "x").expect("write temp");
        fs::create_dir(store.root().join("dir.py")).expect("mkdir");

        let names: Vec<String> = store
            .list()
            .expect("list")
            .into_iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn custom_extension_is_used() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = FunctionStore::open_with_extension(temp.path(), "sh").expect("open");
        store.put("job", b"echo hi").expect("put");
        assert!(temp.path().join("job.sh").is_file());
    }

    #[test]
    fn rejects_extension_with_separator() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(FunctionStore::open_with_extension(temp.path(), "../py").is_err());
        assert!(FunctionStore::open_with_extension(temp.path(), "").is_err());
    }

    #[test]
    fn concurrent_reads_never_see_partial_writes() {
        let (_temp, store) = store();
        let first = vec![b'a'; 1 << 20];
        let second = vec![b'b'; (1 << 20) + 4096];
        store.put("blob", &first).expect("seed");

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..40 {
                    let source = if i % 2 == 0 { &second } else { &first };
                    store.put("blob", source).expect("put");
                }
            });
            scope.spawn(|| {
                for _ in 0..200 {
                    let read = store.read("blob").expect("read");
                    assert!(read == first || read == second, "torn read of {} bytes", read.len());
                }
            });
        });
    }
}
