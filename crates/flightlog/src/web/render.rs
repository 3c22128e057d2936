//! Server-rendered HTML pages.

use std::fmt::{Display, Write};

use crate::record::FlightRecord;
use crate::stats::Summary;

/// Escape text for use in HTML content and attribute values.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} | Open Flight Log</title>
</head>
<body>
<nav><a href="/">Summary</a> | <a href="/flights">Flights</a> | <a href="/flights/add">Add flight</a> | <a href="/export">Export CSV</a></nav>
<main>
<h1>{title}</h1>
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
    )
}

/// The summary page.
#[must_use]
pub fn summary_page(summary: &Summary, quote: &str) -> String {
    let last_flight = summary
        .last_flight
        .map_or_else(|| crate::stats::NOT_AVAILABLE.to_string(), |d| d.to_string());
    let body = format!(
        r#"<blockquote>{quote}</blockquote>
<dl>
<dt>Total flights</dt><dd id="total-flights">{flights}</dd>
<dt>Total flight time</dt><dd id="total-time">{time}</dd>
<dt>Most flown aircraft</dt><dd id="most-flown">{aircraft}</dd>
<dt>Last flight</dt><dd id="last-flight">{last_flight}</dd>
</dl>"#,
        quote = escape(quote),
        flights = summary.total_flights,
        time = summary.total_time_display(),
        aircraft = escape(&summary.most_flown_aircraft),
    );
    layout("Summary", &body)
}

const FLIGHT_HEADERS: &[&str] = &[
    "Date",
    "Departure",
    "Dep. time",
    "Arrival",
    "Arr. time",
    "Aircraft",
    "Registration",
    "SP",
    "MP",
    "Total",
    "PIC",
    "Ldg day",
    "Ldg night",
    "Night",
    "IFR",
    "PIC time",
    "Co-pilot",
    "Dual",
    "Instructor",
    "Sim date",
    "Sim type",
    "Sim time",
    "Remarks",
];

/// The flight table.
#[must_use]
pub fn flights_page(flights: &[FlightRecord]) -> String {
    let mut body = String::from("<table>\n<thead><tr>");
    for header in FLIGHT_HEADERS {
        let _ = write!(body, "<th>{header}</th>");
    }
    body.push_str("</tr></thead>\n<tbody>\n");

    for flight in flights {
        let e = &flight.entry;
        let cells = [
            e.date.to_string(),
            escape(&e.departure_place),
            e.departure_time.format("%H:%M").to_string(),
            escape(&e.arrival_place),
            e.arrival_time.format("%H:%M").to_string(),
            cell(e.aircraft_type.as_deref().map(escape)),
            cell(e.aircraft_registration.as_deref().map(escape)),
            cell(e.single_pilot_time),
            cell(e.multi_pilot_time),
            cell(e.total_flight_time),
            escape(&e.pilot_in_command),
            cell(e.landings_day),
            cell(e.landings_night),
            cell(e.night_time),
            cell(e.ifr_time),
            cell(e.pic_time),
            cell(e.copilot_time),
            cell(e.dual_time),
            cell(e.instructor_time),
            cell(e.simulator_date),
            cell(e.simulator_type.as_deref().map(escape)),
            cell(e.simulator_time),
            cell(e.remarks.as_deref().map(escape)),
        ];
        let _ = write!(body, "<tr id=\"flight-{}\">", flight.id);
        for value in cells {
            let _ = write!(body, "<td>{value}</td>");
        }
        body.push_str("</tr>\n");
    }

    body.push_str("</tbody>\n</table>");
    if flights.is_empty() {
        body.push_str("\n<p>No flights logged yet.</p>");
    }
    layout("Flights", &body)
}

fn cell<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// (name, label, input type, required, placeholder)
const FORM_FIELDS: &[(&str, &str, &str, bool, &str)] = &[
    ("date", "Date", "date", true, ""),
    ("departure_place", "Departure place", "text", true, ""),
    ("departure_time", "Departure time", "text", true, "HH:MM"),
    ("arrival_place", "Arrival place", "text", true, ""),
    ("arrival_time", "Arrival time", "text", true, "HH:MM"),
    ("aircraft_type", "Aircraft type", "text", false, ""),
    ("aircraft_registration", "Registration", "text", false, ""),
    ("single_pilot_time", "Single-pilot time", "text", false, "HH:MM"),
    ("multi_pilot_time", "Multi-pilot time", "text", false, "HH:MM"),
    ("total_flight_time", "Total flight time", "text", false, "HH:MM"),
    ("pilot_in_command", "Pilot in command", "text", true, ""),
    ("landings_day", "Day landings", "number", false, ""),
    ("landings_night", "Night landings", "number", false, ""),
    ("night_time", "Night time", "text", false, "HH:MM"),
    ("ifr_time", "IFR time", "text", false, "HH:MM"),
    ("pic_time", "PIC time", "text", false, "HH:MM"),
    ("copilot_time", "Co-pilot time", "text", false, "HH:MM"),
    ("dual_time", "Dual time", "text", false, "HH:MM"),
    ("instructor_time", "Instructor time", "text", false, "HH:MM"),
    ("simulator_date", "Simulator date", "date", false, ""),
    ("simulator_type", "Simulator type", "text", false, ""),
    ("simulator_time", "Simulator time", "text", false, "HH:MM"),
    ("remarks", "Remarks", "text", false, ""),
];

/// The add-flight form, with an optional validation message.
#[must_use]
pub fn add_flight_page(error: Option<&str>) -> String {
    let mut body = String::new();
    if let Some(message) = error {
        let _ = writeln!(body, "<p class=\"error\">{}</p>", escape(message));
    }
    body.push_str("<form method=\"post\" action=\"/flights/add\">\n");
    for (name, label, kind, required, placeholder) in FORM_FIELDS {
        let _ = writeln!(
            body,
            "<label for=\"{name}\">{label}</label> \
             <input id=\"{name}\" name=\"{name}\" type=\"{kind}\"{}{}><br>",
            if *required { " required" } else { "" },
            if placeholder.is_empty() {
                String::new()
            } else {
                format!(" placeholder=\"{placeholder}\"")
            },
        );
    }
    body.push_str("<button type=\"submit\">Save flight</button>\n</form>");
    layout("Add flight", &body)
}

/// A page explaining why a request failed.
#[must_use]
pub fn error_page(title: &str, message: &str) -> String {
    layout(title, &format!("<p class=\"error\">{}</p>", escape(message)))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::*;
    use crate::duration::FlightTime;
    use crate::record::FlightEntry;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<b>"Tom & Jerry's"</b>"#),
            "&lt;b&gt;&quot;Tom &amp; Jerry&#39;s&quot;&lt;/b&gt;"
        );
        assert_eq!(escape("EDDF"), "EDDF");
    }

    #[test]
    fn test_summary_page() {
        let summary = Summary {
            total_flights: 12,
            total_time: FlightTime::from_minutes(605),
            most_flown_aircraft: "C172".to_string(),
            last_flight: NaiveDate::from_ymd_opt(2025, 8, 30),
        };
        let html = summary_page(&summary, "Fly <safe>");

        assert!(html.contains("<dd id=\"total-flights\">12</dd>"));
        assert!(html.contains("10h 5m"));
        assert!(html.contains("C172"));
        assert!(html.contains("2025-08-30"));
        assert!(html.contains("Fly &lt;safe&gt;"));
    }

    #[test]
    fn test_summary_page_without_flights() {
        let summary = Summary {
            total_flights: 0,
            total_time: FlightTime::ZERO,
            most_flown_aircraft: crate::stats::NOT_AVAILABLE.to_string(),
            last_flight: None,
        };
        let html = summary_page(&summary, "quote");
        assert!(html.contains("<dd id=\"last-flight\">N/A</dd>"));
        assert!(html.contains("<dd id=\"most-flown\">N/A</dd>"));
    }

    #[test]
    fn test_flights_page_escapes_user_text() {
        let mut entry = FlightEntry::new(
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            ("EDDK", NaiveTime::from_hms_opt(7, 0, 0).unwrap()),
            ("EDDL", NaiveTime::from_hms_opt(7, 40, 0).unwrap()),
            "SELF",
        )
        .with_aircraft("A320", FlightTime::from_minutes(40));
        entry.remarks = Some("<script>alert(1)</script>".to_string());

        let html = flights_page(&[FlightRecord { id: 9, entry }]);
        assert!(html.contains("<tr id=\"flight-9\">"));
        assert!(html.contains("<td>00:40</td>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("No flights logged yet."));
    }

    #[test]
    fn test_flights_page_empty() {
        let html = flights_page(&[]);
        assert!(html.contains("No flights logged yet."));
    }

    #[test]
    fn test_add_flight_page_has_every_field() {
        let html = add_flight_page(None);
        for (name, ..) in FORM_FIELDS {
            assert!(html.contains(&format!("name=\"{name}\"")), "missing {name}");
        }
        assert!(!html.contains("class=\"error\""));

        let html = add_flight_page(Some("invalid value for date"));
        assert!(html.contains("invalid value for date"));
    }
}
