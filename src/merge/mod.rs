pub mod error;
pub mod fusion;
pub mod merger;
pub mod params;
pub mod similarity;
pub mod stats;
