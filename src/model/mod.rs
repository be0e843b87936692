pub mod cache;
pub mod candidate;
pub mod products;

pub use cache::{DataProductUnavailable, ProducerRegistry};
pub use candidate::{Candidate, CandidateInfo, CandidateSource, SourceError};
pub use products::{
    DISPERSION_CONSTANT, FoldSummary, FreqVsPhase, ProductKind, Profile, SinglePulseSummary,
};
