//! VCTK 0.92 keeps audio and transcripts in two parallel trees:
//! `wav48_silence_trimmed/<speaker>/<utterance>_mic<n>.flac` and `txt/<speaker>/<utterance>.txt`.
//! Each utterance was recorded with two microphones, only mic 1 is used.
use crate::filelist::{Filelist, Record, SpeakerId};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const AUDIO_DIR: &str = "wav48_silence_trimmed";
const TEXT_DIR: &str = "txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clip {
    pub transcript: String,
    pub audio: PathBuf,
}

/// Clips for each speaker, ordered by speaker name and then utterance
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub speakers: BTreeMap<String, Vec<Clip>>,
}

fn audio_name(name: &str) -> Option<(&str, &str)> {
    static AUDIO_REGEX: OnceCell<Regex> = OnceCell::new();
    let regex = AUDIO_REGEX
        .get_or_init(|| Regex::new(r"^([[:alnum:]]+_[[:alnum:]]+)_mic(\d+)\.[[:alnum:]]+$").unwrap());
    let captures = regex.captures(name)?;
    Some((captures.get(1)?.as_str(), captures.get(2)?.as_str()))
}

fn text_name(name: &str) -> Option<&str> {
    static TEXT_REGEX: OnceCell<Regex> = OnceCell::new();
    let regex =
        TEXT_REGEX.get_or_init(|| Regex::new(r"^([[:alnum:]]+_[[:alnum:]]+)\.txt$").unwrap());
    Some(regex.captures(name)?.get(1)?.as_str())
}

fn list_names(dir: &Path) -> io::Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if let Ok(name) = entry.file_name().into_string() {
            names.insert(name);
        } else {
            warn!("Skipping non UTF-8 file name in {}", dir.display());
        }
    }
    Ok(names)
}

fn load_speaker(audio_dir: &Path, text_dir: &Path) -> anyhow::Result<Vec<Clip>> {
    let audio = list_names(audio_dir)?
        .into_iter()
        .filter_map(|name| {
            let (utterance, mic) = audio_name(&name)?;
            (mic == "1").then(|| (utterance.to_string(), name.clone()))
        })
        .collect::<BTreeMap<_, _>>();
    let texts = list_names(text_dir)?
        .into_iter()
        .filter_map(|name| Some((text_name(&name)?.to_string(), name.clone())))
        .collect::<BTreeMap<_, _>>();

    let mut clips = vec![];
    for (utterance, text_file) in &texts {
        let Some(audio_file) = audio.get(utterance) else {
            debug!("No mic1 audio for {}", utterance);
            continue;
        };
        let transcript = fs::read_to_string(text_dir.join(text_file))?;
        clips.push(Clip {
            transcript: transcript.trim_matches(&['\r', '\n'][..]).to_string(),
            audio: audio_dir.join(audio_file),
        });
    }
    Ok(clips)
}

impl Dataset {
    /// Loads every speaker which has both an audio and transcript directory
    pub fn load(root: impl AsRef<Path>) -> anyhow::Result<Self> {
        let root = root.as_ref();
        let audio_root = root.join(AUDIO_DIR);
        let text_root = root.join(TEXT_DIR);

        let audio_speakers = list_names(&audio_root)?;
        let text_speakers = list_names(&text_root)?;

        let mut speakers = BTreeMap::new();
        for speaker in audio_speakers.intersection(&text_speakers) {
            let clips = load_speaker(&audio_root.join(speaker), &text_root.join(speaker))?;
            if clips.is_empty() {
                warn!("Speaker {} has no usable clips", speaker);
            } else {
                speakers.insert(speaker.clone(), clips);
            }
        }
        info!("Loaded {} VCTK speakers", speakers.len());
        Ok(Self { speakers })
    }

    pub fn len(&self) -> usize {
        self.speakers.values().map(|x| x.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Speakers are numbered from `first_speaker` in name order.
    pub fn into_filelist(self, first_speaker: SpeakerId) -> Filelist {
        let mut filelist = Filelist::default();
        for (speaker_id, (speaker, clips)) in (first_speaker..).zip(self.speakers) {
            debug!("VCTK speaker {} -> {}", speaker, speaker_id);
            filelist.records.extend(clips.into_iter().map(|clip| Record {
                audio_path: clip.audio.to_string_lossy().into_owned(),
                transcript: clip.transcript,
                speaker_id,
            }));
        }
        filelist
    }
}
