pub mod criteria;
pub mod dataset;
pub mod listing;
