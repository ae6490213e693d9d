pub mod cancel;
pub mod evaluator;
pub mod optree;
pub mod scope;
