//! There is no training code implemented in this project. This module holds the data
//! preparation side of training a TTS model: turning public corpora into filelists and
//! analysing the resulting datasets.

pub mod analytics;
pub mod libritts;
pub mod lj_speech;
pub mod uberduck;
pub mod vctk;

pub use analytics::*;
