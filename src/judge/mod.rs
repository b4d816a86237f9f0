//! Post-hoc transcript judging
//!
//! A judge runs one or more rubric prompts over a finished transcript
//! and parses structured assessments out of the model replies. Mixture
//! mode fans the rubric catalog out concurrently and synthesizes the
//! surviving assessments into one composite verdict.

mod analyzer;
mod rubric;
mod verdict;

pub use analyzer::Judge;
pub use verdict::{JudgeMode, JudgeVerdict};
