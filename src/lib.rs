pub mod cipher;
pub mod config;
pub mod consts;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod optimizer;
pub mod solution;
