pub mod match_lists;
pub mod merge;
pub mod replay;
pub mod summary;
