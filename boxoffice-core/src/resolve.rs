use boxoffice_shared::{Booking, BookingDetail};

use crate::repository::{CatalogRepository, UserDirectory};
use crate::StoreResult;

/// Follows a booking's references into the catalog and user directory.
pub async fn booking_detail(
    catalog: &dyn CatalogRepository,
    users: &dyn UserDirectory,
    booking: Booking,
) -> StoreResult<BookingDetail> {
    let movie = catalog.get_movie(booking.movie_id).await?;
    let seat = catalog.get_seat(booking.seat_id).await?;
    let user = users.get_user(booking.user_id).await?;
    Ok(BookingDetail {
        id: booking.id,
        movie,
        seat,
        user,
        booking_date: booking.booking_date,
    })
}

pub async fn booking_details(
    catalog: &dyn CatalogRepository,
    users: &dyn UserDirectory,
    bookings: Vec<Booking>,
) -> StoreResult<Vec<BookingDetail>> {
    let mut details = Vec::with_capacity(bookings.len());
    for booking in bookings {
        details.push(booking_detail(catalog, users, booking).await?);
    }
    Ok(details)
}
