use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::audio::SamplePool;

// Every .wav directly inside `dir`, sorted by file name.
pub fn index_wav_in_dir(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
        })
        .collect();
    paths.sort();
    Ok(paths)
}

// Decode everything in `dir` into the pool. Files that fail to decode are
// skipped (the pool already logged why). Returns how many made it in.
pub fn fill_pool(pool: &mut SamplePool, dir: &Path) -> usize {
    let paths = match index_wav_in_dir(dir) {
        Ok(paths) => paths,
        Err(e) => {
            warn!("can't read sample dir {}: {e}", dir.display());
            return 0;
        }
    };
    let loaded = paths.iter().filter(|p| pool.add_file(p).is_ok()).count();
    info!("loaded {loaded}/{} samples from {}", paths.len(), dir.display());
    loaded
}
