pub mod approval;
pub mod identity;
pub mod listing;
pub mod review;
