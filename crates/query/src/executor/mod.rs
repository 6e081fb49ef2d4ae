//! Query evaluation.

mod evaluator;

pub use evaluator::Evaluator;
