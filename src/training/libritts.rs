//! LibriTTS via the Mellotron filelists. These are already `path|text|speaker` but every path starts
//! with the directory layout of the machine they were generated on, which has to be swapped for
//! wherever LibriTTS lives locally.
use crate::filelist::Filelist;
use std::path::Path;

/// Length of the `/path/to/LibriTTS` style prefix on every Mellotron path
pub const MELLOTRON_PREFIX_LEN: usize = 17;

/// Replaces the first `prefix_len` characters of every path with `source_folder`.
pub fn rebase_paths(mut filelist: Filelist, source_folder: &str, prefix_len: usize) -> Filelist {
    for record in filelist.records.iter_mut() {
        let relative = record
            .audio_path
            .char_indices()
            .nth(prefix_len)
            .map(|(i, _)| &record.audio_path[i..])
            .unwrap_or_default();
        let rebased = format!("{}{}", source_folder, relative);
        record.audio_path = rebased;
    }
    filelist
}

/// Loads a Mellotron LibriTTS filelist and points it at `source_folder`.
pub fn load_mellotron(
    source_folder: impl AsRef<Path>,
    mellotron_filelist: impl AsRef<Path>,
) -> anyhow::Result<Filelist> {
    let filelist = Filelist::open(mellotron_filelist)?;
    let source_folder = source_folder.as_ref().to_string_lossy();
    Ok(rebase_paths(filelist, &source_folder, MELLOTRON_PREFIX_LEN))
}
