use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use tokio::sync::mpsc;

use crate::rss::{Feed, Item};
use crate::storage::NewPost;

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

// Two or more line breaks, possibly with horizontal space between them,
// plus whatever whitespace trails the run.
static BLANK_LINES_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t\r]*\n)+\s*").expect("valid blank line regex"));

const OFFSET_FORMAT: &str = "%d %b %Y %H:%M:%S %z";
const NAMED_ZONE_FORMAT: &str = "%d %b %Y %H:%M:%S";

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Fan out the items of `feed` into concurrent conversions.
///
/// Every item is converted on the blocking pool and sent into a channel sized
/// to the feed, so no conversion ever waits on the receiver. The channel
/// closes once the last conversion has finished, which lets the consumer
/// drain it to completion. Posts arrive in no particular order.
pub fn normalize(feed: Feed) -> mpsc::Receiver<NewPost> {
    let (tx, rx) = mpsc::channel(feed.items.len().max(1));

    for item in feed.items {
        let tx = tx.clone();
        tokio::task::spawn_blocking(move || {
            // The receiver going away just means nobody wants the batch.
            let _ = tx.blocking_send(to_post(item));
        });
    }

    rx
}

/// Convert one feed item into a post ready to be stored.
pub fn to_post(item: Item) -> NewPost {
    let content = collapse_blank_lines(&strip_markup(&item.description));

    NewPost {
        title: item.title,
        content,
        pub_time: parse_pub_date(&item.pub_date),
        link: item.link,
    }
}

/// Remove markup tags from `html`, keeping the text between them.
pub fn strip_markup(html: &str) -> String {
    let text = TAG_PATTERN.replace_all(html, "");
    let decoded = html_escape::decode_html_entities(&text).replace('\u{a0}', " ");

    // Entities such as `&lt;b&gt;` only turn into tags once decoded.
    TAG_PATTERN.replace_all(&decoded, "").into_owned()
}

/// Replace every run of blank lines with a single line break.
pub fn collapse_blank_lines(text: &str) -> String {
    BLANK_LINES_PATTERN.replace_all(text, "\n").into_owned()
}

/// Parse an RSS `pubDate`, falling back to the current time.
///
/// A date ending in a digit is read as RFC 1123 with a numeric offset
/// (`Mon, 02 Jan 2006 15:04:05 -0700`), anything else as RFC 1123 with a
/// zone name (`Mon, 02 Jan 2006 15:04:05 MST`). The weekday must be a valid
/// name but is not checked against the date.
pub fn parse_pub_date(raw: &str) -> DateTime<Utc> {
    let raw = raw.trim();
    let parsed = match raw.chars().last() {
        None => None,
        Some(c) if c.is_ascii_digit() => parse_with_offset(raw),
        Some(_) => parse_with_zone_name(raw),
    };

    parsed.unwrap_or_else(Utc::now)
}

fn without_weekday(raw: &str) -> Option<&str> {
    let (day, rest) = raw.split_once(", ")?;
    WEEKDAYS.contains(&day).then_some(rest)
}

fn parse_with_offset(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(without_weekday(raw)?, OFFSET_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_with_zone_name(raw: &str) -> Option<DateTime<Utc>> {
    let (stamp, zone) = without_weekday(raw)?.rsplit_once(' ')?;
    let offset = zone_offset(zone)?;
    let naive = NaiveDateTime::parse_from_str(stamp, NAMED_ZONE_FORMAT).ok()?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Offsets for the zone names of RFC 822. Other abbreviations are accepted
/// as UTC, since their offset cannot be known from the name alone.
fn zone_offset(zone: &str) -> Option<FixedOffset> {
    let hours = match zone {
        "GMT" | "UT" | "UTC" | "Z" => 0,
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        other if (3..=5).contains(&other.len())
            && other.chars().all(|c| c.is_ascii_uppercase()) =>
        {
            0
        }
        _ => return None,
    };

    FixedOffset::east_opt(hours * 3600)
}
