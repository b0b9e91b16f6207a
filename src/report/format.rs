use super::{EntryValue, Report};

/// Plain-text rendering: a heading per source, one bullet per entry.
pub fn render_text(report: &Report) -> String {
    let mut out = format!("# {}\n", report.title);
    if report.is_empty() {
        out.push_str("\nNo sources answered.\n");
        return out;
    }

    let mut current = None;
    for entry in &report.entries {
        if current != Some(entry.source) {
            out.push_str(&format!("\n## {}\n\n", entry.source_name));
            current = Some(entry.source);
        }
        match &entry.value {
            EntryValue::Scalar(text) if text.contains('\n') => {
                out.push_str(&format!("- {}:\n", entry.label));
                for line in text.lines() {
                    out.push_str(&format!("    {line}\n"));
                }
            }
            EntryValue::Scalar(text) => out.push_str(&format!("- {}: {text}\n", entry.label)),
            EntryValue::Nested(pairs) => {
                out.push_str(&format!("- {}:\n", entry.label));
                for (key, value) in pairs {
                    out.push_str(&format!("    - {key}: {value}\n"));
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Entry;
    use crate::source::SourceId;

    fn entry(source: SourceId, label: &str, value: EntryValue) -> Entry {
        Entry {
            source,
            source_name: source.display_name(),
            label: label.to_string(),
            value,
        }
    }

    #[test]
    fn groups_entries_under_source_headings() {
        let report = Report {
            title: "Phone Number Lookup: 9876543210".into(),
            entries: vec![
                entry(SourceId::PhoneTrace, "Owner Name", EntryValue::Scalar("R K".into())),
                entry(SourceId::PhoneTrace, "SIM card", EntryValue::Scalar("Jio".into())),
                entry(SourceId::LeakDatabase, "Error", EntryValue::Scalar("timed out after 20s".into())),
            ],
        };
        let text = render_text(&report);
        assert_eq!(
            text,
            "# Phone Number Lookup: 9876543210\n\
             \n## Call Trace\n\n\
             - Owner Name: R K\n\
             - SIM card: Jio\n\
             \n## Leak Database\n\n\
             - Error: timed out after 20s\n"
        );
    }

    #[test]
    fn nested_and_multiline_values_are_indented() {
        let report = Report {
            title: "Image".into(),
            entries: vec![
                entry(SourceId::ImageText, "Text", EntryValue::Scalar("EXIT\nONLY".into())),
                entry(
                    SourceId::ImageText,
                    "Details",
                    EntryValue::Nested(vec![("Lines".into(), "2".into())]),
                ),
            ],
        };
        let text = render_text(&report);
        assert!(text.contains("- Text:\n    EXIT\n    ONLY\n"), "got: {text}");
        assert!(text.contains("- Details:\n    - Lines: 2\n"), "got: {text}");
    }

    #[test]
    fn empty_report_says_so() {
        let report = Report {
            title: "Nothing".into(),
            entries: Vec::new(),
        };
        assert!(render_text(&report).contains("No sources answered."));
    }
}
