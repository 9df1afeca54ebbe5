pub mod mismatches;
