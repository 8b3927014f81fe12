pub mod admin;
pub mod listing;
pub mod review;
pub mod user;
