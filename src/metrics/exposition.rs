//! Prometheus text exposition format.

use crate::metrics::data::TrafficSnapshot;
use crate::metrics::samples::{extract_samples, MetricFamily};
use std::fmt::Write;

/// Content type served alongside [`render`] output.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Comment emitted when the snapshot has no interfaces.
pub const NO_DATA_MARKER: &str = "# No interface data available";

/// Render a snapshot as Prometheus exposition text.
///
/// The HELP/TYPE preamble for every family always comes first. A snapshot
/// without interfaces gets an explicit marker comment so scrapers can tell
/// "no data" apart from a truncated body.
pub fn render(snapshot: &TrafficSnapshot) -> String {
    let mut output = String::new();

    for family in MetricFamily::ALL {
        let _ = writeln!(output, "# HELP {} {}", family.name(), family.help());
        let _ = writeln!(output, "# TYPE {} {}", family.name(), family.kind());
    }

    if snapshot.is_empty() {
        output.push_str(NO_DATA_MARKER);
        output.push('\n');
        return output;
    }

    for sample in extract_samples(snapshot) {
        let _ = writeln!(
            output,
            "{}{{interface=\"{}\",direction=\"{}\"}} {}",
            sample.family.name(),
            escape_label_value(sample.interface),
            sample.direction.as_str(),
            format_value(sample.value)
        );
    }

    output
}

/// Escape a label value for Prometheus format.
/// Backslash must go first so the escapes added for quote and newline survive.
pub fn escape_label_value(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Byte counts are printed with no decimal places, rounding fractions.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let sign = if value > 0.0 { '+' } else { '-' };
        format!("{}Inf", sign)
    } else {
        format!("{:.0}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::data::{InterfaceTraffic, TrafficCounters};

    #[test]
    fn test_escape_order() {
        assert_eq!(escape_label_value(r#"a\b"#), r#"a\\b"#);
        assert_eq!(escape_label_value(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_label_value("line\nbreak"), r#"line\nbreak"#);
        assert_eq!(escape_label_value("\\\"\n"), r#"\\\"\n"#);
    }

    #[test]
    fn test_format_value_rounds() {
        assert_eq!(format_value(100.0), "100");
        assert_eq!(format_value(10.6), "11");
        assert_eq!(format_value(1.2e12), "1200000000000");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NAN), "NaN");
    }

    #[test]
    fn test_empty_snapshot_has_marker() {
        for snapshot in [TrafficSnapshot::absent(), TrafficSnapshot::new(Vec::new())] {
            let text = render(&snapshot);
            assert!(text.ends_with("# No interface data available\n"));
            assert_eq!(text.lines().filter(|l| l.starts_with("# HELP")).count(), 3);
            assert_eq!(text.lines().filter(|l| !l.starts_with('#')).count(), 0);
        }
    }

    #[test]
    fn test_render_sample_lines() {
        let snapshot = TrafficSnapshot::new(vec![InterfaceTraffic::new("eth0")
            .with_total(TrafficCounters::new(100.0, 50.0))
            .with_today(TrafficCounters::new(2.0, 2.0))]);

        let text = render(&snapshot);
        assert!(text.contains("vnstat_traffic_total_bytes{interface=\"eth0\",direction=\"rx\"} 100\n"));
        assert!(text.contains("vnstat_traffic_total_bytes{interface=\"eth0\",direction=\"tx\"} 50\n"));
        assert!(text.contains("vnstat_traffic_today_bytes{interface=\"eth0\",direction=\"tx\"} 2\n"));
        assert!(!text.contains("vnstat_traffic_month_bytes{"));
        assert!(!text.contains(NO_DATA_MARKER));
    }
}
