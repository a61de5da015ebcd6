use chrono::Duration;

use crate::models::Booking;

/// Escapes TEXT values per RFC 5545 section 3.3.11.
fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace("\r\n", "\\n")
        .replace('\n', "\\n")
}

pub fn generate_ics(booking: &Booking) -> String {
    let dtstart = booking.booking_utc.format("%Y%m%dT%H%M%SZ").to_string();
    let dtend = (booking.booking_utc + Duration::minutes(booking.duration_minutes))
        .format("%Y%m%dT%H%M%SZ")
        .to_string();
    let dtstamp = booking.created_at_utc.format("%Y%m%dT%H%M%SZ").to_string();
    let uid = format!("{}@portfolio", booking.booking_id);

    let summary = escape_text(&booking.booking_subject);
    let description = if booking.notes.is_empty() {
        "No additional notes".to_string()
    } else {
        escape_text(&booking.notes)
    };

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Portfolio//Call Booking//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         STATUS:TENTATIVE\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;

    use crate::models::BookingStatus;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn booking(notes: &str, duration_minutes: i64) -> Booking {
        Booking {
            booking_id: 42,
            customer_name: "John Doe".to_string(),
            customer_email: "john.doe@example.com".to_string(),
            booking_subject: "Consultation".to_string(),
            booking_utc: utc("2024-07-28T14:00:00Z"),
            start_time_local: "10:00".to_string(),
            end_time_local: "11:00".to_string(),
            timezone: "America/New_York".to_string(),
            duration_minutes,
            notes: notes.to_string(),
            booking_status: BookingStatus::Pending,
            revenue: Decimal::from(200),
            created_at_utc: utc("2024-07-20T09:15:00Z"),
        }
    }

    #[test]
    fn test_generate_ics() {
        let ics = generate_ics(&booking("Need help with setup", 60));
        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(ics.contains("BEGIN:VEVENT"));
        assert!(ics.contains("UID:42@portfolio"));
        assert!(ics.contains("DTSTAMP:20240720T091500Z"));
        assert!(ics.contains("DTSTART:20240728T140000Z"));
        assert!(ics.contains("DTEND:20240728T150000Z"));
        assert!(ics.contains("SUMMARY:Consultation"));
        assert!(ics.contains("DESCRIPTION:Need help with setup"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
    }

    #[test]
    fn test_generate_ics_crosses_midnight_and_escapes() {
        let mut b = booking("Line one\nwith; commas, too", 90);
        b.booking_utc = utc("2024-07-28T23:30:00Z");
        let ics = generate_ics(&b);
        assert!(ics.contains("DTEND:20240729T010000Z"));
        assert!(ics.contains("DESCRIPTION:Line one\\nwith\\; commas\\, too"));
    }

    #[test]
    fn test_generate_ics_no_notes() {
        let ics = generate_ics(&booking("", 30));
        assert!(ics.contains("DTEND:20240728T143000Z"));
        assert!(ics.contains("DESCRIPTION:No additional notes"));
    }
}
