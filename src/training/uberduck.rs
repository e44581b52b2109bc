//! Single speaker folders as exported by uberduck: an `all.txt` filelist next to the audio, with
//! paths relative to the folder and usually no speaker column. Paths are always treated as relative,
//! a leading `/` doesn't escape the folder.
use crate::filelist::{Filelist, SpeakerId};
use std::path::Path;

pub fn load(source_folder: impl AsRef<Path>, speaker_id: SpeakerId) -> anyhow::Result<Filelist> {
    let source_folder = source_folder.as_ref();
    let mut filelist =
        Filelist::open_with_default_speaker(source_folder.join("all.txt"), speaker_id)?;
    for record in filelist.records.iter_mut() {
        record.audio_path = source_folder
            .join(record.audio_path.trim_start_matches('/'))
            .to_string_lossy()
            .into_owned();
    }
    Ok(filelist)
}
