pub mod blog;
pub mod booking;
pub mod calendar;
pub mod catalog;
pub mod timing;
