//! Analysis engines.
//!
//! Each engine consumes slices of the cleaned dataset and produces one typed
//! section of the analysis bundle. Engines are independent: a failure in one
//! never aborts the others, the pipeline records it and moves on.

pub mod menu;
pub mod satisfaction;
pub mod segmentation;
pub mod temporal;
