pub mod models;
pub mod pii;

pub use models::booking::{Booking, BookingDetail, BookingFilter};
pub use models::events::SeatEvent;
pub use models::ids::{BookingId, MovieId, SeatId, UserId};
pub use models::movie::{Movie, NewMovie};
pub use models::seat::{Seat, SeatFilter};
pub use models::user::{NewUser, User};
pub use models::ValidationError;
pub use pii::Masked;
