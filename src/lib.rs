// Palisade: cross-modal moderation decision engine for user-generated content.
//
// This is the library root. Each module corresponds to a major subsystem:
// decision stages per modality, the fusion reducer, and the external
// collaborators they call through trait seams.

pub mod collaborators;
pub mod config;
pub mod degrade;
pub mod features;
pub mod fusion;
pub mod lexicon;
pub mod output;
pub mod signal;
pub mod stages;
pub mod status;
