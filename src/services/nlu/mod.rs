pub mod classifier;
pub mod entities;

pub use classifier::{classify, classify_as, normalize, Classification};
