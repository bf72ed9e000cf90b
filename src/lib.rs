// lib.rs
pub mod alignment_record;
pub mod commands;
pub mod connect;
pub mod consistency;
pub mod dna;
pub mod extension;
pub mod fm_index;
pub mod index;
pub mod interval_cache;
pub mod overlap;
pub mod parallel;
pub mod placement;
pub mod recruit;
pub mod sampled_sa;
pub mod seqidx;
pub mod sequence_store;
pub mod window;
