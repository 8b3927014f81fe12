pub mod listing;
pub mod review;
pub mod user;
