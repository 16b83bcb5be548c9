pub mod scanner;

pub use scanner::{
    detect_duplicates, scan_index_groups, BACKGROUND_HAMMING_THRESHOLD,
    DEFAULT_HAMMING_THRESHOLD,
};
