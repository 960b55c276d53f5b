use docc_lib::compiler::IncludeResolver;
use docc_lib::core::Position;
use std::path::{Path, PathBuf};

/// Looks up included files next to the including file, then in the
/// directories given with `-I`
#[derive(Debug, Clone, Default)]
pub struct FsIncludes {
    pub dirs: Vec<PathBuf>,
}

impl FsIncludes {
    fn candidates(&self, path: &str, from: &Position) -> Vec<PathBuf> {
        let path = Path::new(path);
        if path.is_absolute() {
            return vec![path.to_owned()];
        }
        let here = Path::new(&from.file)
            .parent()
            .map(|dir| dir.join(path))
            .unwrap_or_else(|| path.to_owned());
        std::iter::once(here)
            .chain(self.dirs.iter().map(|dir| dir.join(path)))
            .collect()
    }
}

impl IncludeResolver for FsIncludes {
    fn resolve(&mut self, path: &str, from: &Position) -> Option<(String, String)> {
        for candidate in self.candidates(path, from) {
            match std::fs::read_to_string(&candidate) {
                Ok(src) => return Some((candidate.display().to_string(), src)),
                Err(e) => tracing::debug!(path = %candidate.display(), "{e}"),
            }
        }
        None
    }
}
