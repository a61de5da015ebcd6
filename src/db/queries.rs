use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use crate::models::{
    BlogPost, Booking, BookingServiceLine, BookingStatus, MonthCount, NewBooking, PostFilter,
    PostStatus, Service,
};

pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn timestamp_at(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn decimal_at(row: &Row, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ── Services ──

pub fn list_services(conn: &Connection) -> rusqlite::Result<Vec<Service>> {
    let mut stmt = conn.prepare(
        "SELECT service_id, service_name, description, default_price
         FROM services ORDER BY service_id ASC",
    )?;
    let rows = stmt.query_map([], parse_service_row)?;
    rows.collect()
}

pub fn get_service(conn: &Connection, service_id: i64) -> rusqlite::Result<Option<Service>> {
    conn.query_row(
        "SELECT service_id, service_name, description, default_price
         FROM services WHERE service_id = ?1",
        params![service_id],
        parse_service_row,
    )
    .optional()
}

fn parse_service_row(row: &Row) -> rusqlite::Result<Service> {
    Ok(Service {
        service_id: row.get(0)?,
        service_name: row.get(1)?,
        description: row.get(2)?,
        default_price: decimal_at(row, 3)?,
    })
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "booking_id, customer_name, customer_email, booking_subject, booking_utc, \
     start_time_local, end_time_local, timezone, duration_minutes, notes, booking_status, revenue, created_at_utc";

/// Inserts the booking row with zero revenue and `Pending` status, returning
/// the assigned id. Line items are written separately.
pub fn insert_booking(
    conn: &Connection,
    booking: &NewBooking,
    created_at: &DateTime<Utc>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO bookings (customer_name, customer_email, booking_subject, booking_utc,
             start_time_local, end_time_local, timezone, duration_minutes, notes,
             booking_status, revenue, created_at_utc)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            booking.customer_name,
            booking.customer_email,
            booking.booking_subject,
            format_timestamp(&booking.booking_utc),
            booking.start_time_local,
            booking.end_time_local,
            booking.timezone,
            booking.duration_minutes,
            booking.notes,
            BookingStatus::Pending.as_str(),
            Decimal::ZERO.to_string(),
            format_timestamp(created_at),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_booking_line(conn: &Connection, line: &BookingServiceLine) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO booking_services (booking_id, service_id, quantity, agreed_price)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            line.booking_id,
            line.service_id,
            line.quantity,
            line.agreed_price.to_string(),
        ],
    )?;
    Ok(())
}

pub fn update_booking_revenue(
    conn: &Connection,
    booking_id: i64,
    revenue: Decimal,
) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET revenue = ?1 WHERE booking_id = ?2",
        params![revenue.to_string(), booking_id],
    )?;
    Ok(count > 0)
}

pub fn get_booking_by_id(conn: &Connection, booking_id: i64) -> rusqlite::Result<Option<Booking>> {
    conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_id = ?1"),
        params![booking_id],
        parse_booking_row,
    )
    .optional()
}

pub fn get_booking_lines(
    conn: &Connection,
    booking_id: i64,
) -> rusqlite::Result<Vec<BookingServiceLine>> {
    let mut stmt = conn.prepare(
        "SELECT booking_id, service_id, quantity, agreed_price
         FROM booking_services WHERE booking_id = ?1 ORDER BY service_id ASC",
    )?;
    let rows = stmt.query_map(params![booking_id], |row| {
        Ok(BookingServiceLine {
            booking_id: row.get(0)?,
            service_id: row.get(1)?,
            quantity: row.get(2)?,
            agreed_price: decimal_at(row, 3)?,
        })
    })?;
    rows.collect()
}

fn parse_booking_row(row: &Row) -> rusqlite::Result<Booking> {
    let status: String = row.get(10)?;
    Ok(Booking {
        booking_id: row.get(0)?,
        customer_name: row.get(1)?,
        customer_email: row.get(2)?,
        booking_subject: row.get(3)?,
        booking_utc: timestamp_at(row, 4)?,
        start_time_local: row.get(5)?,
        end_time_local: row.get(6)?,
        timezone: row.get(7)?,
        duration_minutes: row.get(8)?,
        notes: row.get(9)?,
        booking_status: BookingStatus::parse(&status),
        revenue: decimal_at(row, 11)?,
        created_at_utc: timestamp_at(row, 12)?,
    })
}

// ── Blog Posts ──

const POST_COLUMNS: &str =
    "id, title, content, category, keywords, author, status, created_at, updated_at, published_at";

pub fn insert_post(conn: &Connection, post: &BlogPost) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO blog_posts (id, title, content, category, keywords, author, status,
             created_at, updated_at, published_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            post.id,
            post.title,
            post.content,
            post.category,
            keywords_json(&post.keywords),
            post.author,
            post.status.as_str(),
            format_timestamp(&post.created_at),
            format_timestamp(&post.updated_at),
            post.published_at.as_ref().map(format_timestamp),
        ],
    )?;
    Ok(())
}

/// Writes every mutable column of an existing post. Returns false when the
/// id is unknown.
pub fn save_post(conn: &Connection, post: &BlogPost) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE blog_posts SET title = ?2, content = ?3, category = ?4, keywords = ?5,
             status = ?6, updated_at = ?7, published_at = ?8
         WHERE id = ?1",
        params![
            post.id,
            post.title,
            post.content,
            post.category,
            keywords_json(&post.keywords),
            post.status.as_str(),
            format_timestamp(&post.updated_at),
            post.published_at.as_ref().map(format_timestamp),
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_post(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let count = conn.execute("DELETE FROM blog_posts WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn get_post(conn: &Connection, id: &str) -> rusqlite::Result<Option<BlogPost>> {
    conn.query_row(
        &format!("SELECT {POST_COLUMNS} FROM blog_posts WHERE id = ?1"),
        params![id],
        parse_post_row,
    )
    .optional()
}

pub fn list_posts(conn: &Connection, filter: PostFilter) -> rusqlite::Result<Vec<BlogPost>> {
    let sql = match filter {
        PostFilter::All => format!(
            "SELECT {POST_COLUMNS} FROM blog_posts ORDER BY created_at ASC, rowid ASC"
        ),
        PostFilter::Published => format!(
            "SELECT {POST_COLUMNS} FROM blog_posts WHERE status = 'published'
             ORDER BY created_at ASC, rowid ASC"
        ),
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], parse_post_row)?;
    rows.collect()
}

pub fn published_posts_by_keyword(conn: &Connection, keyword: &str) -> rusqlite::Result<Vec<BlogPost>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM blog_posts
         WHERE status = 'published'
           AND EXISTS (SELECT 1 FROM json_each(blog_posts.keywords) WHERE json_each.value = ?1)
         ORDER BY created_at ASC, rowid ASC"
    ))?;
    let rows = stmt.query_map(params![keyword], parse_post_row)?;
    rows.collect()
}

pub fn published_posts_by_category(
    conn: &Connection,
    category: &str,
) -> rusqlite::Result<Vec<BlogPost>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM blog_posts
         WHERE status = 'published' AND category = ?1
         ORDER BY created_at ASC, rowid ASC"
    ))?;
    let rows = stmt.query_map(params![category], parse_post_row)?;
    rows.collect()
}

/// Keyword lists of every post, oldest post first.
pub fn all_keyword_lists(conn: &Connection) -> rusqlite::Result<Vec<Vec<String>>> {
    let mut stmt = conn.prepare("SELECT keywords FROM blog_posts ORDER BY created_at ASC, rowid ASC")?;
    let rows = stmt.query_map([], |row| parse_keywords(row, 0))?;
    rows.collect()
}

pub fn post_years(conn: &Connection) -> rusqlite::Result<Vec<i32>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT CAST(substr(created_at, 1, 4) AS INTEGER) AS year
         FROM blog_posts ORDER BY year DESC",
    )?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect()
}

pub fn post_months_for_year(conn: &Connection, year: i32) -> rusqlite::Result<Vec<MonthCount>> {
    let mut stmt = conn.prepare(
        "SELECT CAST(substr(created_at, 6, 2) AS INTEGER) AS month, COUNT(*)
         FROM blog_posts WHERE substr(created_at, 1, 4) = ?1
         GROUP BY month ORDER BY month ASC",
    )?;
    let rows = stmt.query_map(params![format!("{year:04}")], |row| {
        Ok(MonthCount {
            month: row.get(0)?,
            count: row.get(1)?,
        })
    })?;
    rows.collect()
}

pub fn posts_for_month(conn: &Connection, year: i32, month: u32) -> rusqlite::Result<Vec<BlogPost>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM blog_posts WHERE substr(created_at, 1, 7) = ?1
         ORDER BY created_at DESC, rowid DESC"
    ))?;
    let rows = stmt.query_map(params![format!("{year:04}-{month:02}")], parse_post_row)?;
    rows.collect()
}

pub fn recent_published_posts(conn: &Connection, limit: i64) -> rusqlite::Result<Vec<BlogPost>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM blog_posts WHERE status = 'published'
         ORDER BY published_at DESC, rowid DESC LIMIT ?1"
    ))?;
    let rows = stmt.query_map(params![limit], parse_post_row)?;
    rows.collect()
}

fn keywords_json(keywords: &[String]) -> String {
    serde_json::to_string(keywords).unwrap_or_else(|_| "[]".to_string())
}

fn parse_keywords(row: &Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_post_row(row: &Row) -> rusqlite::Result<BlogPost> {
    let status: String = row.get(6)?;
    let published_at = match row.get::<_, Option<String>>(9)? {
        Some(_) => Some(timestamp_at(row, 9)?),
        None => None,
    };
    Ok(BlogPost {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        category: row.get(3)?,
        keywords: parse_keywords(row, 4)?,
        author: row.get(5)?,
        status: PostStatus::parse(&status),
        created_at: timestamp_at(row, 7)?,
        updated_at: timestamp_at(row, 8)?,
        published_at,
    })
}
