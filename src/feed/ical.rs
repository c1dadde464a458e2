// src/feed/ical.rs
//! iCalendar rendering and parsing for the published feed.
//!
//! Rendering writes one VCALENDAR holding VEVENTs with UTC timestamps. Description lines
//! are joined with an escaped newline and folded onto continuation lines. Parsing goes
//! through `ical`, which unfolds them again, so a rendered feed reads back into the same
//! events.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use ical::parser::ical::component::IcalEvent;

use crate::error::ParseError;
use crate::feed::event::{Event, EventStatus};

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const CRLF: &str = "\r\n";

fn stamp(t: NaiveDateTime) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_stamp(name: &str, value: &str) -> Result<NaiveDateTime, ParseError> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT)
        .map_err(|e| ParseError::BadFeed(format!("{name}:{value}: {e}")))
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

/// Undo `escape_text`, splitting at escaped newlines.
fn unescape_lines(s: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            current.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => lines.push(std::mem::take(&mut current)),
            Some(other) => current.push(other),
            None => current.push('\\'),
        }
    }
    lines.push(current);
    lines
}

fn push_line(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push(':');
    out.push_str(value);
    out.push_str(CRLF);
}

fn render_event(out: &mut String, ev: &Event) {
    push_line(out, "BEGIN", "VEVENT");
    push_line(out, "UID", &ev.uid);
    push_line(out, "DTSTAMP", &stamp(ev.modified));
    push_line(out, "DTSTART", &stamp(ev.start));
    push_line(out, "DTEND", &stamp(ev.end));
    push_line(out, "SUMMARY", &escape_text(&ev.summary));
    if !ev.description.is_empty() {
        let folded: Vec<String> = ev.description.iter().map(|l| escape_text(l)).collect();
        push_line(out, "DESCRIPTION", &folded.join("\\n\r\n "));
    }
    push_line(out, "LAST-MODIFIED", &stamp(ev.modified));
    push_line(out, "SEQUENCE", &ev.sequence.to_string());
    push_line(out, "STATUS", ev.status.as_str());
    push_line(out, "END", "VEVENT");
}

/// Render events as a complete calendar, ordered by uid.
pub fn render_feed(events: &BTreeMap<String, Event>, prodid: &str) -> String {
    let mut out = String::new();
    push_line(&mut out, "BEGIN", "VCALENDAR");
    push_line(&mut out, "VERSION", "2.0");
    push_line(&mut out, "PRODID", prodid);
    for ev in events.values() {
        render_event(&mut out, ev);
    }
    push_line(&mut out, "END", "VCALENDAR");
    out
}

#[derive(Default)]
struct PartialEvent {
    uid: Option<String>,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    summary: Option<String>,
    description: Vec<String>,
    stamp: Option<NaiveDateTime>,
    modified: Option<NaiveDateTime>,
    sequence: Option<u32>,
    status: Option<EventStatus>,
}

impl PartialEvent {
    fn set(&mut self, name: &str, value: &str) -> Result<(), ParseError> {
        match name {
            "UID" => self.uid = Some(value.trim().to_string()),
            "DTSTART" => self.start = Some(parse_stamp(name, value)?),
            "DTEND" => self.end = Some(parse_stamp(name, value)?),
            "DTSTAMP" => self.stamp = Some(parse_stamp(name, value)?),
            "LAST-MODIFIED" => self.modified = Some(parse_stamp(name, value)?),
            "SUMMARY" => self.summary = Some(unescape_lines(value).join("\n")),
            "DESCRIPTION" => self.description = unescape_lines(value),
            "SEQUENCE" => {
                let seq = value
                    .trim()
                    .parse()
                    .map_err(|_| ParseError::BadFeed(format!("SEQUENCE:{value}")))?;
                self.sequence = Some(seq);
            }
            "STATUS" => self.status = Some(value.parse()?),
            _ => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<Event, ParseError> {
        let missing = |field: &str| {
            ParseError::BadFeed(format!(
                "event {} has no {field}",
                self.uid.as_deref().unwrap_or("?")
            ))
        };
        Ok(Event {
            uid: self.uid.clone().ok_or_else(|| missing("UID"))?,
            start: self.start.ok_or_else(|| missing("DTSTART"))?,
            end: self.end.ok_or_else(|| missing("DTEND"))?,
            summary: self.summary.clone().unwrap_or_default(),
            description: self.description.clone(),
            modified: self
                .modified
                .or(self.stamp)
                .ok_or_else(|| missing("LAST-MODIFIED"))?,
            sequence: self.sequence.unwrap_or(0),
            status: self.status.unwrap_or(EventStatus::Tentative),
        })
    }
}

/// Parse a feed produced by `render_feed` back into its uid → event mapping.
pub fn parse_feed(text: &str) -> Result<BTreeMap<String, Event>, ParseError> {
    let mut events = BTreeMap::new();
    for calendar in ical::IcalParser::new(text.as_bytes()) {
        let calendar = calendar.map_err(|e| ParseError::BadFeed(format!("calendar: {e}")))?;
        for vevent in &calendar.events {
            let ev = event_from_component(vevent)?;
            events.insert(ev.uid.clone(), ev);
        }
    }
    Ok(events)
}

fn event_from_component(vevent: &IcalEvent) -> Result<Event, ParseError> {
    let mut partial = PartialEvent::default();
    for property in &vevent.properties {
        let name = property.name.to_ascii_uppercase();
        partial.set(&name, property.value.as_deref().unwrap_or_default())?;
    }
    partial.finish()
}
