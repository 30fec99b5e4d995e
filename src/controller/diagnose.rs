//! # Device Diagnostics
//!
//! One-shot report over every input node, used by `--list-devices` to find
//! out why a transmitter is not picked up.
//!
//! A node is flagged when it looks like a joystick (absolute axes plus
//! joystick buttons) or when its name, physical path or node path contains
//! one of [`DIAGNOSTIC_KEYWORDS`]. The report lists the reason for every flag
//! and ends with a summary.

use std::fmt;

use super::matcher::{DeviceMatcher, MatchField, MatchRule, MatchSubject};

/// Keywords that hint at a radio transmitter or game controller.
pub const DIAGNOSTIC_KEYWORDS: &[&str] = &[
    "radiomaster",
    "tx16s",
    "opentx",
    "edgetx",
    "er9x",
    "jumper",
    "tx16",
    "transmitter",
    "radio",
    "joystick",
    "gamepad",
    "controller",
];

/// Description of one input node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedNode {
    pub path: String,
    pub name: String,
    pub phys: String,
    pub bus: u16,
    pub vendor: u16,
    pub product: u16,
    pub axis_count: usize,
    pub joystick_like: bool,
    /// Why the node could not be opened, if it could not.
    pub error: Option<String>,
}

impl ScannedNode {
    /// A node that exists but could not be opened.
    #[must_use]
    pub fn unreadable(path: String, error: String) -> Self {
        Self {
            path,
            error: Some(error),
            ..Self::default()
        }
    }
}

impl MatchSubject for ScannedNode {
    fn field(&self, field: MatchField) -> Option<&str> {
        match field {
            MatchField::Name => Some(&self.name),
            MatchField::Path => Some(&self.path),
            MatchField::Phys => Some(&self.phys),
        }
    }
}

/// Rule set for the diagnostics report: every keyword on every field.
#[must_use]
pub fn keyword_matcher() -> DeviceMatcher {
    let fields = [MatchField::Name, MatchField::Phys, MatchField::Path];
    let rules = DIAGNOSTIC_KEYWORDS
        .iter()
        .flat_map(|keyword| fields.iter().map(move |field| MatchRule::contains(*field, keyword)))
        .collect();
    DeviceMatcher::from_rules(rules)
}

/// A node with the reasons it was flagged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub node: ScannedNode,
    pub reasons: Vec<String>,
}

impl ReportEntry {
    /// Returns true if any heuristic flagged the node.
    pub fn is_flagged(&self) -> bool {
        !self.reasons.is_empty()
    }
}

/// Full diagnostics report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticReport {
    pub entries: Vec<ReportEntry>,
}

impl DiagnosticReport {
    /// Applies the heuristics to scanned nodes.
    #[must_use]
    pub fn build(nodes: Vec<ScannedNode>, matcher: &DeviceMatcher) -> Self {
        let entries = nodes
            .into_iter()
            .map(|node| {
                let mut reasons = Vec::new();
                if node.joystick_like {
                    reasons.push("capabilities indicate joystick/gamepad".to_string());
                }
                reasons.extend(matcher.matching_rules(&node).map(|rule| {
                    format!("{} contains '{}'", rule.field.label(), rule.pattern)
                }));
                ReportEntry { node, reasons }
            })
            .collect();
        Self { entries }
    }

    /// Number of nodes scanned.
    pub fn total(&self) -> usize {
        self.entries.len()
    }

    /// Number of nodes whose capabilities look like a joystick.
    pub fn joystick_like_count(&self) -> usize {
        self.entries.iter().filter(|e| e.node.joystick_like).count()
    }

    /// Positions of flagged nodes in the report.
    pub fn flagged_indices(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_flagged())
            .map(|(idx, _)| idx)
            .collect()
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Enumerating input devices (via evdev)")?;
        for (idx, entry) in self.entries.iter().enumerate() {
            let node = &entry.node;
            writeln!(f, "Device {}:", idx)?;
            writeln!(f, "  Path: {}", node.path)?;
            if let Some(error) = &node.error {
                writeln!(f, "  Unreadable: {}", error)?;
            } else {
                if !node.name.is_empty() {
                    writeln!(f, "  Name: {}", node.name)?;
                }
                if !node.phys.is_empty() {
                    writeln!(f, "  Phys: {}", node.phys)?;
                }
                writeln!(f, "  Bus: 0x{:04x}", node.bus)?;
                writeln!(f, "  Vendor ID: 0x{:04x}", node.vendor)?;
                writeln!(f, "  Product ID: 0x{:04x}", node.product)?;
                writeln!(f, "  Axes: {}", node.axis_count)?;
            }
            if entry.is_flagged() {
                writeln!(f, "  MATCHED: {}", entry.reasons.join(", "))?;
            }
            writeln!(f, "  ---")?;
        }

        let flagged = self.flagged_indices();
        writeln!(f, "Summary:")?;
        writeln!(f, "  Total input devices: {}", self.total())?;
        writeln!(f, "  Joystick-like (by capabilities): {}", self.joystick_like_count())?;
        writeln!(f, "  Devices matched by heuristics: {}", flagged.len())?;
        if flagged.is_empty() {
            writeln!(f, "  No obvious RadioMaster or transmitter device found using simple heuristics.")?;
            writeln!(f, "  Suggestions:")?;
            writeln!(f, "  - Ensure your radio is in 'Joystick' or 'PC' mode (not storage/bootloader).")?;
            writeln!(f, "  - Use a data USB cable and try other USB ports.")?;
            writeln!(f, "  - Check that your user can read /dev/input/event* (e.g. the 'input' group).")?;
            writeln!(f, "  - If the radio exposes a serial/CDC interface instead of HID, it will not appear here.")?;
        } else {
            let list: Vec<String> = flagged.iter().map(|idx| idx.to_string()).collect();
            writeln!(f, "  Matched device indices: {}", list.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(path: &str, name: &str, phys: &str, joystick_like: bool) -> ScannedNode {
        ScannedNode {
            path: path.to_string(),
            name: name.to_string(),
            phys: phys.to_string(),
            bus: 0x03,
            vendor: 0x1209,
            product: 0x4f54,
            axis_count: if joystick_like { 8 } else { 0 },
            joystick_like,
            error: None,
        }
    }

    #[test]
    fn test_keyword_matcher_covers_all_fields() {
        let matcher = keyword_matcher();
        assert_eq!(matcher.rules().len(), DIAGNOSTIC_KEYWORDS.len() * 3);
    }

    #[test]
    fn test_flags_by_capabilities() {
        let report = DiagnosticReport::build(
            vec![node("/dev/input/event4", "Unnamed HID", "", true)],
            &keyword_matcher(),
        );
        assert_eq!(report.entries[0].reasons, vec!["capabilities indicate joystick/gamepad"]);
        assert_eq!(report.joystick_like_count(), 1);
    }

    #[test]
    fn test_flags_by_keywords_with_reasons() {
        let report = DiagnosticReport::build(
            vec![node("/dev/input/event7", "RadioMaster TX16S Joystick", "usb-0000:00:14.0-2/input0", false)],
            &keyword_matcher(),
        );
        let reasons = &report.entries[0].reasons;
        assert!(reasons.contains(&"name contains 'radiomaster'".to_string()));
        assert!(reasons.contains(&"name contains 'tx16s'".to_string()));
        assert!(reasons.contains(&"name contains 'radio'".to_string()));
        assert!(reasons.contains(&"name contains 'joystick'".to_string()));
        assert!(!reasons.iter().any(|r| r.starts_with("phys")));
    }

    #[test]
    fn test_unflagged_nodes_and_summary() {
        let report = DiagnosticReport::build(
            vec![
                node("/dev/input/event0", "Power Button", "LNXPWRBN/button/input0", false),
                node("/dev/input/event1", "AT Translated Set 2 keyboard", "isa0060/serio0/input0", false),
                node("/dev/input/event2", "EdgeTX Joystick", "", true),
            ],
            &keyword_matcher(),
        );
        assert_eq!(report.total(), 3);
        assert_eq!(report.flagged_indices(), vec![2]);

        let text = report.to_string();
        assert!(text.contains("Total input devices: 3"));
        assert!(text.contains("Matched device indices: 2"));
        assert!(!text.contains("Suggestions"));
    }

    #[test]
    fn test_report_suggestions_when_nothing_flagged() {
        let report = DiagnosticReport::build(
            vec![node("/dev/input/event0", "Power Button", "", false)],
            &keyword_matcher(),
        );
        let text = report.to_string();
        assert!(text.contains("Devices matched by heuristics: 0"));
        assert!(text.contains("Suggestions:"));
    }

    #[test]
    fn test_unreadable_node_is_listed() {
        let report = DiagnosticReport::build(
            vec![ScannedNode::unreadable("/dev/input/event9".to_string(), "Permission denied".to_string())],
            &keyword_matcher(),
        );
        let text = report.to_string();
        assert!(text.contains("Unreadable: Permission denied"));
        assert!(report.flagged_indices().is_empty());
    }
}
