pub mod blog;
pub mod booking;
pub mod service;

pub use blog::{BlogPost, MonthCount, NewPost, PostFilter, PostStatus, PostUpdate};
pub use booking::{
    Booking, BookingConfirmation, BookingDetails, BookingRequest, BookingServiceLine,
    BookingStatus, LineItem, LineItemRequest, NewBooking,
};
pub use service::Service;
