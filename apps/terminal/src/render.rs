use chrono::{DateTime, Local, TimeZone};
use shared::domain::{Entry, Role};

pub fn format_entry(entry: &Entry) -> String {
    format_entry_in(entry, &Local)
}

pub fn format_entry_in<Tz: TimeZone>(entry: &Entry, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let at: DateTime<Tz> = entry.created_at.with_timezone(tz);
    let who = match entry.role {
        Role::User => "you",
        Role::Bot => "bot",
    };
    format!("[{}] {who}: {}", at.format("%H:%M"), entry.content)
}
