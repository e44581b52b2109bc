//! Does some analytics on datasets.
use crate::filelist::{Filelist, Record, SpeakerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;
use unicode_segmentation::UnicodeSegmentation;

/// Transcripts longer than this (in characters) are usually a sign of a bad split
const LONG_TRANSCRIPT: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub max: f64,
    pub min: f64,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analytics {
    pub clips: usize,
    pub speakers: usize,
    pub clips_per_speaker: BTreeMap<SpeakerId, usize>,
    /// Transcript length in grapheme clusters
    pub transcript_characters: Option<SummaryStatistics>,
    /// Transcript length in words
    pub transcript_words: Option<SummaryStatistics>,
    pub word_frequencies: BTreeMap<String, usize>,
}

/// Percentile of already sorted data, interpolating linearly between the closest ranks.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}

/// Summary of a distribution, `None` when there's nothing to summarise
pub fn summary_statistics(values: &[f64]) -> Option<SummaryStatistics> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    Some(SummaryStatistics {
        p10: percentile(&sorted, 10.0),
        p25: percentile(&sorted, 25.0),
        p50: percentile(&sorted, 50.0),
        p75: percentile(&sorted, 75.0),
        p90: percentile(&sorted, 90.0),
        max: sorted[sorted.len() - 1],
        min: sorted[0],
    })
}

#[derive(Debug, Default)]
pub struct AnalyticsGenerator {
    clips: usize,
    clips_per_speaker: BTreeMap<SpeakerId, usize>,
    character_lengths: Vec<f64>,
    word_lengths: Vec<f64>,
    word_frequencies: BTreeMap<String, usize>,
}

impl AnalyticsGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_sentence(&mut self, sentence: &str) {
        let characters = sentence.graphemes(true).count();
        if characters > LONG_TRANSCRIPT {
            info!("Very long sentence found: '{}'", sentence);
        }
        let mut words = 0;
        for word in sentence.unicode_words() {
            words += 1;
            *self.word_frequencies.entry(word.to_lowercase()).or_insert(0) += 1;
        }
        self.character_lengths.push(characters as f64);
        self.word_lengths.push(words as f64);
    }

    pub fn push_record(&mut self, record: &Record) {
        self.clips += 1;
        *self.clips_per_speaker.entry(record.speaker_id).or_insert(0) += 1;
        self.push_sentence(&record.transcript);
    }

    pub fn push_filelist(&mut self, filelist: &Filelist) {
        for record in filelist {
            self.push_record(record);
        }
    }

    pub fn generate_report(&self) -> Analytics {
        Analytics {
            clips: self.clips,
            speakers: self.clips_per_speaker.len(),
            clips_per_speaker: self.clips_per_speaker.clone(),
            transcript_characters: summary_statistics(&self.character_lengths),
            transcript_words: summary_statistics(&self.word_lengths),
            word_frequencies: self.word_frequencies.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn percentiles() {
        let stats = summary_statistics(&[5.0, 3.0, 1.0, 4.0, 2.0]).unwrap();
        assert_abs_diff_eq!(stats.p10, 1.4, epsilon = 1e-9);
        assert_abs_diff_eq!(stats.p25, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(stats.p50, 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(stats.p75, 4.0, epsilon = 1e-9);
        assert_abs_diff_eq!(stats.p90, 4.6, epsilon = 1e-9);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.min, 1.0);

        let single = summary_statistics(&[7.0]).unwrap();
        assert_eq!(single.p10, 7.0);
        assert_eq!(single.p90, 7.0);

        assert!(summary_statistics(&[]).is_none());
    }

    #[test]
    fn filelist_report() {
        let filelist = Filelist::new(vec![
            Record {
                audio_path: "a.wav".into(),
                transcript: "Don't stop, don't!".into(),
                speaker_id: 0,
            },
            Record {
                audio_path: "b.wav".into(),
                transcript: "Héllo wörld!".into(),
                speaker_id: 2,
            },
            Record {
                audio_path: "c.wav".into(),
                transcript: "Stop".into(),
                speaker_id: 2,
            },
        ]);

        let mut generator = AnalyticsGenerator::new();
        generator.push_filelist(&filelist);
        let report = generator.generate_report();

        assert_eq!(report.clips, 3);
        assert_eq!(report.speakers, 2);
        assert_eq!(report.clips_per_speaker, BTreeMap::from([(0, 1), (2, 2)]));
        assert_eq!(report.word_frequencies["don't"], 2);
        assert_eq!(report.word_frequencies["stop"], 2);
        assert_eq!(report.word_frequencies["héllo"], 1);

        let characters = report.transcript_characters.unwrap();
        assert_eq!(characters.max, 18.0);
        assert_eq!(characters.min, 4.0);
        assert_eq!(characters.p50, 12.0);
        let words = report.transcript_words.unwrap();
        assert_eq!(words.max, 3.0);
        assert_eq!(words.min, 1.0);
    }

    #[test]
    fn empty_report() {
        let report = AnalyticsGenerator::new().generate_report();
        assert_eq!(report, Analytics::default());
    }
}
