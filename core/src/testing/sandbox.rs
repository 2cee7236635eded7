//! Scratch directories with a fake compiler for tests that spawn real processes.

use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use crate::config::Config;

/// Copies a fixture into an executable shell script, dropping its `//` directive lines.
/// A fixture containing a `#COMPILE_ERROR` line is rejected with exit code 3.
const FAKE_COMPILER: &str = r#"#!/bin/sh
# usage: fake-cc.sh -o OUT SUPPORT... FIXTURE
out="$2"
shift 2
for src; do :; done
if grep -q '^#COMPILE_ERROR' "$src"; then
  echo "fake-cc: refusing to compile $src" >&2
  exit 3
fi
{ echo '#!/bin/sh'; grep -v '^//' "$src" || true; } > "$out" && chmod +x "$out"
"#;

pub(crate) struct Sandbox {
    pub root: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let root = std::env::temp_dir().join(format!("testrun-{}", rand::random::<u64>()));
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("fake-cc.sh"), FAKE_COMPILER).unwrap();
        fs::write(root.join("support.sh"), "").unwrap();
        Self { root }
    }

    pub fn config(&self) -> Config {
        let mut cfg = Config::with_root(&self.root);
        cfg.compiler.command = vec!["sh".to_owned(), "./fake-cc.sh".to_owned()];
        cfg.compiler.support_sources = vec![PathBuf::from("support.sh")];
        cfg
    }

    pub fn fixture(&self, filename: &str, contents: &str) -> PathBuf {
        let path = self.root.join(filename);
        fs::write(&path, contents).unwrap();
        path
    }

    /// Writes an already "compiled" executable script.
    ///
    /// The file is written by a child shell so that no fd open for writing can leak into
    /// processes spawned concurrently by other tests (ETXTBSY).
    pub fn executable(&self, filename: &str, script: &str) -> PathBuf {
        let path = self.root.join(filename);
        let status = Command::new("sh")
            .args(["-c", r#"printf '#!/bin/sh\n%s\n' "$1" > "$2" && chmod 755 "$2""#, "sh"])
            .arg(script)
            .arg(&path)
            .status()
            .unwrap();
        assert!(status.success());
        path
    }

    pub fn path(&self) -> &Path {
        &self.root
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}
