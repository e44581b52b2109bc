//! Datasets are labelled independently so their speaker ids overlap, LJSpeech and an uberduck
//! folder will both call their only speaker `0`. Before the filelists can be used together the ids
//! need to be merged into one numbering. One filelist is picked as the reference and its ids are
//! left alone (typically the one a pretrained model's speaker embedding was trained on), every
//! other filelist has its colliding ids moved to the smallest ids nobody is using yet.
use crate::filelist::{Filelist, SpeakerId};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("Reference filelist {index} is out of range for {len} filelists")]
    ReferenceOutOfRange { index: usize, len: usize },
    #[error("Filelist {index} needs {needed} replacement speaker ids but only {available} are free")]
    ReplacementPoolExhausted {
        index: usize,
        needed: usize,
        available: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Output filelists in the same order as the input
    pub filelists: Vec<Filelist>,
    /// For each filelist the ids which were rewritten, old id to new id
    pub remaps: Vec<BTreeMap<SpeakerId, SpeakerId>>,
    /// Every speaker id in use across all the outputs
    pub reserved: BTreeSet<SpeakerId>,
}

impl Reconciliation {
    /// Whether any speaker id was changed
    pub fn is_unchanged(&self) -> bool {
        self.remaps.iter().all(|x| x.is_empty())
    }
}

/// Works out which ids of `speakers` collide with `reserved` and what they should become.
///
/// Collisions are taken in ascending order and paired with the ascending free ids in
/// `[0, |reserved| + |speakers|)`. There are at least as many free ids in that range as there are
/// collisions: the union of the two sets is exactly `|overlap|` smaller than the range.
fn plan_remap(
    index: usize,
    speakers: &BTreeSet<SpeakerId>,
    reserved: &BTreeSet<SpeakerId>,
) -> Result<BTreeMap<SpeakerId, SpeakerId>, ReconcileError> {
    let overlap = speakers.intersection(reserved).copied().collect::<Vec<_>>();
    if overlap.is_empty() {
        return Ok(BTreeMap::new());
    }
    let limit = SpeakerId::try_from(reserved.len() + speakers.len()).unwrap_or(SpeakerId::MAX);
    let replacements = (0..limit)
        .filter(|id| !reserved.contains(id) && !speakers.contains(id))
        .take(overlap.len())
        .collect::<Vec<_>>();

    if replacements.len() < overlap.len() {
        return Err(ReconcileError::ReplacementPoolExhausted {
            index,
            needed: overlap.len(),
            available: replacements.len(),
        });
    }

    Ok(overlap.into_iter().zip(replacements).collect())
}

/// Remaps the speaker ids of every filelist apart from `reference` so no two filelists share an
/// id. Filelists are handled in input order and each one reserves its (rewritten) ids for all the
/// ones after it. Rows, paths and transcripts are untouched.
pub fn reconcile_speaker_ids(
    filelists: &[Filelist],
    reference: usize,
) -> Result<Reconciliation, ReconcileError> {
    let anchor = filelists
        .get(reference)
        .ok_or(ReconcileError::ReferenceOutOfRange {
            index: reference,
            len: filelists.len(),
        })?;

    let mut reserved = anchor.speaker_ids();
    info!(
        "Reference filelist {} reserves {} speakers",
        reference,
        reserved.len()
    );

    let mut outputs = Vec::with_capacity(filelists.len());
    let mut remaps = Vec::with_capacity(filelists.len());

    for (index, filelist) in filelists.iter().enumerate() {
        if index == reference {
            outputs.push(filelist.clone());
            remaps.push(BTreeMap::new());
            continue;
        }
        let speakers = filelist.speaker_ids();
        let remap = plan_remap(index, &speakers, &reserved)?;
        for (old, new) in &remap {
            debug!("Filelist {}: speaker {} -> {}", index, old, new);
        }
        if !remap.is_empty() {
            info!(
                "Filelist {}: remapped {} of {} speakers",
                index,
                remap.len(),
                speakers.len()
            );
        }

        let rewritten = filelist.remap_speakers(&remap);
        reserved.extend(rewritten.speaker_ids());
        outputs.push(rewritten);
        remaps.push(remap);
    }

    Ok(Reconciliation {
        filelists: outputs,
        remaps,
        reserved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filelist::Record;

    fn filelist(name: &str, ids: &[SpeakerId]) -> Filelist {
        Filelist::new(
            ids.iter()
                .enumerate()
                .map(|(i, id)| Record {
                    audio_path: format!("{}/{}.wav", name, i),
                    transcript: format!("{} clip {}", name, i),
                    speaker_id: *id,
                })
                .collect(),
        )
    }

    fn ids(filelist: &Filelist) -> Vec<SpeakerId> {
        filelist.iter().map(|x| x.speaker_id).collect()
    }

    #[test]
    fn two_filelists_one_collision() {
        let a = filelist("a", &[0, 1, 1, 0]);
        let b = filelist("b", &[1, 2, 1]);

        let result = reconcile_speaker_ids(&[a.clone(), b], 0).unwrap();

        assert_eq!(result.filelists[0], a);
        assert_eq!(ids(&result.filelists[1]), vec![3, 2, 3]);
        assert_eq!(result.remaps[1], BTreeMap::from([(1, 3)]));
        assert_eq!(result.reserved, BTreeSet::from([0, 1, 2, 3]));
    }

    #[test]
    fn reference_not_first() {
        let a = filelist("a", &[0, 1]);
        let b = filelist("b", &[0]);
        let c = filelist("c", &[0, 5]);

        let result = reconcile_speaker_ids(&[a, b.clone(), c], 1).unwrap();

        // reserved {0}, a: pool [0,3) minus {0,1} -> 2
        assert_eq!(ids(&result.filelists[0]), vec![2, 1]);
        assert_eq!(result.filelists[1], b);
        // reserved {0,1,2}, c: pool [0,5) minus {0,1,2,5} -> 3
        assert_eq!(ids(&result.filelists[2]), vec![3, 5]);
        assert_eq!(result.reserved, BTreeSet::from([0, 1, 2, 3, 5]));
    }

    #[test]
    fn many_single_speaker_datasets() {
        let lists = (0..5).map(|i| filelist(&i.to_string(), &[0, 0])).collect::<Vec<_>>();

        let result = reconcile_speaker_ids(&lists, 0).unwrap();

        let outputs = result
            .filelists
            .iter()
            .map(|x| x.speaker_ids().into_iter().collect::<Vec<_>>())
            .collect::<Vec<_>>();
        assert_eq!(outputs, vec![vec![0], vec![1], vec![2], vec![3], vec![4]]);
    }

    #[test]
    fn outputs_are_disjoint_and_rows_preserved() {
        let inputs = vec![
            filelist("a", &[3, 4, 7, 3]),
            filelist("b", &[0, 1, 2, 3, 4]),
            filelist("c", &[4, 9, 0, 0, 1]),
            filelist("d", &[]),
            filelist("e", &[2, 8]),
        ];

        let result = reconcile_speaker_ids(&inputs, 1).unwrap();

        let mut seen = BTreeSet::new();
        for output in &result.filelists {
            let speakers = output.speaker_ids();
            assert!(seen.is_disjoint(&speakers), "{:?} vs {:?}", seen, speakers);
            seen.extend(speakers);
        }
        assert_eq!(seen, result.reserved);

        for (input, output) in inputs.iter().zip(&result.filelists) {
            assert_eq!(input.len(), output.len());
            for (before, after) in input.iter().zip(output) {
                assert_eq!(before.audio_path, after.audio_path);
                assert_eq!(before.transcript, after.transcript);
            }
        }
        assert!(result.filelists[3].is_empty());
        assert_eq!(result.filelists[1], inputs[1]);
    }

    #[test]
    fn distinct_speakers_stay_distinct() {
        let inputs = vec![filelist("a", &[0, 1]), filelist("b", &[1, 2, 3, 0])];

        let result = reconcile_speaker_ids(&inputs, 0).unwrap();

        let mapping = inputs[1]
            .iter()
            .zip(&result.filelists[1])
            .map(|(before, after)| (before.speaker_id, after.speaker_id))
            .collect::<BTreeMap<_, _>>();
        let targets = mapping.values().collect::<BTreeSet<_>>();
        assert_eq!(mapping.len(), targets.len());
        // overlap {0, 1} in ascending order takes free ids {4, 5}
        assert_eq!(mapping, BTreeMap::from([(0, 4), (1, 5), (2, 2), (3, 3)]));
    }

    #[test]
    fn deterministic_and_idempotent() {
        let inputs = vec![
            filelist("a", &[0, 1, 2]),
            filelist("b", &[2, 0, 6]),
            filelist("c", &[1, 1, 3]),
        ];

        let first = reconcile_speaker_ids(&inputs, 0).unwrap();
        let second = reconcile_speaker_ids(&inputs, 0).unwrap();
        assert_eq!(first, second);
        assert!(!first.is_unchanged());

        let again = reconcile_speaker_ids(&first.filelists, 0).unwrap();
        assert!(again.is_unchanged());
        assert_eq!(again.filelists, first.filelists);
        assert_eq!(again.reserved, first.reserved);
    }

    #[test]
    fn single_filelist() {
        let a = filelist("a", &[4, 2]);
        let result = reconcile_speaker_ids(&[a.clone()], 0).unwrap();
        assert_eq!(result.filelists, vec![a]);
        assert!(result.is_unchanged());
    }

    #[test]
    fn reference_out_of_range() {
        let inputs = vec![filelist("a", &[0])];
        assert_eq!(
            reconcile_speaker_ids(&inputs, 1),
            Err(ReconcileError::ReferenceOutOfRange { index: 1, len: 1 })
        );
        assert_eq!(
            reconcile_speaker_ids(&[], 0),
            Err(ReconcileError::ReferenceOutOfRange { index: 0, len: 0 })
        );
    }
}
