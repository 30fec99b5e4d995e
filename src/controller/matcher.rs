//! # Device Matcher
//!
//! Selects the transmitter among the visible input devices.
//!
//! Matching is a list of declarative [`MatchRule`]s evaluated in order by one
//! generic function. The default rule set is permissive on purpose: EdgeTX
//! firmware reports different names across platforms and USB modes, so a
//! substring of the vendor name is enough to accept a device. Operators can
//! narrow the target with `--name`.
//!
//! ## Usage
//!
//! ```
//! use rc_joystick_bridge::controller::backend::DeviceInfo;
//! use rc_joystick_bridge::controller::matcher::find_candidate;
//!
//! let devices = vec![
//!     DeviceInfo { index: 0, instance_id: 1, name: "Logitech Mouse".into(), path: String::new() },
//!     DeviceInfo { index: 1, instance_id: 2, name: "RadioMaster Pocket Joystick".into(), path: String::new() },
//! ];
//! assert_eq!(find_candidate(&devices, "radiomaster pocket joystick"), Some(1));
//! ```

use super::backend::DeviceInfo;

/// Known names of the transmitter family, tried after the target string.
pub const DEFAULT_ALIASES: &[&str] = &["radiomaster", "edgetx"];

/// Device attribute a rule looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    /// Advertised device name.
    Name,
    /// Node path.
    Path,
    /// Physical topology string (USB port path).
    Phys,
}

impl MatchField {
    /// Lowercase label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            MatchField::Name => "name",
            MatchField::Path => "path",
            MatchField::Phys => "phys",
        }
    }
}

/// How the pattern is compared against the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Field contains the pattern.
    Contains,
    /// Field equals the pattern.
    Equals,
}

/// Anything the matcher can read attributes from.
pub trait MatchSubject {
    /// Value of a field, `None` if the subject does not carry it.
    fn field(&self, field: MatchField) -> Option<&str>;
}

impl MatchSubject for DeviceInfo {
    fn field(&self, field: MatchField) -> Option<&str> {
        match field {
            MatchField::Name => Some(&self.name),
            MatchField::Path => Some(&self.path),
            MatchField::Phys => None,
        }
    }
}

/// A single match rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRule {
    pub field: MatchField,
    pub pattern: String,
    pub kind: MatchKind,
    pub fold_case: bool,
}

impl MatchRule {
    /// Case-insensitive substring rule on the device name.
    #[must_use]
    pub fn name_contains(pattern: &str) -> Self {
        Self::contains(MatchField::Name, pattern)
    }

    /// Case-insensitive substring rule on any field.
    #[must_use]
    pub fn contains(field: MatchField, pattern: &str) -> Self {
        Self {
            field,
            pattern: pattern.to_lowercase(),
            kind: MatchKind::Contains,
            fold_case: true,
        }
    }

    /// Returns true when the subject satisfies this rule.
    ///
    /// Empty fields and empty patterns never match.
    pub fn matches<S: MatchSubject + ?Sized>(&self, subject: &S) -> bool {
        let Some(value) = subject.field(self.field) else {
            return false;
        };
        if value.is_empty() || self.pattern.is_empty() {
            return false;
        }

        let (value, pattern) = if self.fold_case {
            (value.to_lowercase(), self.pattern.to_lowercase())
        } else {
            (value.to_string(), self.pattern.clone())
        };

        match self.kind {
            MatchKind::Contains => value.contains(&pattern),
            MatchKind::Equals => value == pattern,
        }
    }
}

/// Ordered rule set used to pick the transmitter.
#[derive(Debug, Clone)]
pub struct DeviceMatcher {
    rules: Vec<MatchRule>,
}

impl Default for DeviceMatcher {
    fn default() -> Self {
        Self::new("radiomaster pocket joystick", DEFAULT_ALIASES)
    }
}

impl DeviceMatcher {
    /// Builds the rule set: target name first, then each alias.
    #[must_use]
    pub fn new<A: AsRef<str>>(target: &str, aliases: &[A]) -> Self {
        let mut rules = vec![MatchRule::name_contains(target)];
        rules.extend(aliases.iter().map(|alias| MatchRule::name_contains(alias.as_ref())));
        Self::from_rules(rules)
    }

    /// Builds a matcher from an explicit rule list.
    #[must_use]
    pub fn from_rules(rules: Vec<MatchRule>) -> Self {
        Self { rules }
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[MatchRule] {
        &self.rules
    }

    /// Rules that the subject satisfies.
    pub fn matching_rules<'a, S: MatchSubject + ?Sized>(
        &'a self,
        subject: &'a S,
    ) -> impl Iterator<Item = &'a MatchRule> + 'a {
        self.rules.iter().filter(move |rule| rule.matches(subject))
    }

    /// Returns true if any rule accepts the subject.
    pub fn is_match<S: MatchSubject + ?Sized>(&self, subject: &S) -> bool {
        self.rules.iter().any(|rule| rule.matches(subject))
    }

    /// Index of the first device in enumeration order that any rule accepts.
    pub fn find_candidate(&self, devices: &[DeviceInfo]) -> Option<usize> {
        devices
            .iter()
            .find(|device| self.is_match(*device))
            .map(|device| device.index)
    }
}

/// Picks a device by target name plus the [`DEFAULT_ALIASES`].
pub fn find_candidate(devices: &[DeviceInfo], target: &str) -> Option<usize> {
    DeviceMatcher::new(target, DEFAULT_ALIASES).find_candidate(devices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(index: usize, name: &str) -> DeviceInfo {
        DeviceInfo {
            index,
            instance_id: index as u32 + 100,
            name: name.to_string(),
            path: format!("/dev/input/event{}", index),
        }
    }

    #[test]
    fn test_case_insensitive_match() {
        let upper = vec![device(0, "RadioMaster Pocket")];
        let lower = vec![device(0, "radiomaster pocket")];
        assert_eq!(find_candidate(&upper, "Pocket"), Some(0));
        assert_eq!(find_candidate(&upper, "pocket"), find_candidate(&lower, "pocket"));
        assert_eq!(find_candidate(&upper, "POCKET"), find_candidate(&lower, "POCKET"));
    }

    #[test]
    fn test_target_matches_substring() {
        let devices = vec![device(0, "Generic USB Gamepad"), device(1, "TX16S Joystick")];
        assert_eq!(find_candidate(&devices, "tx16s"), Some(1));
    }

    #[test]
    fn test_alias_matches_without_target() {
        let devices = vec![device(0, "Keyboard"), device(1, "EdgeTX Radio")];
        assert_eq!(find_candidate(&devices, "something else"), Some(1));
    }

    #[test]
    fn test_first_match_in_enumeration_order_wins() {
        let devices = vec![
            device(0, "Mouse"),
            device(1, "RadioMaster Zorro"),
            device(2, "RadioMaster Pocket Joystick"),
        ];
        // Target matches index 2, but the alias already accepts index 1
        assert_eq!(find_candidate(&devices, "radiomaster pocket joystick"), Some(1));
    }

    #[test]
    fn test_no_match() {
        let devices = vec![device(0, "Logitech Mouse"), device(1, "Xbox Controller")];
        assert_eq!(find_candidate(&devices, "radiomaster pocket joystick"), None);
    }

    #[test]
    fn test_empty_device_list() {
        assert_eq!(find_candidate(&[], "radiomaster"), None);
    }

    #[test]
    fn test_returns_device_index_not_position() {
        let devices = vec![device(4, "Mouse"), device(7, "EdgeTX Joystick")];
        assert_eq!(find_candidate(&devices, "x"), Some(7));
    }

    #[test]
    fn test_empty_name_never_matches() {
        let devices = vec![device(0, "")];
        assert_eq!(find_candidate(&devices, "radiomaster"), None);
    }

    #[test]
    fn test_custom_aliases() {
        let matcher = DeviceMatcher::new("nothing", &["jumper"]);
        let devices = vec![device(0, "RadioMaster Pocket"), device(1, "Jumper T-Pro")];
        assert_eq!(matcher.find_candidate(&devices), Some(1));
        assert_eq!(matcher.rules().len(), 2);
    }

    #[test]
    fn test_equals_rule() {
        let rule = MatchRule {
            field: MatchField::Name,
            pattern: "tx16s".to_string(),
            kind: MatchKind::Equals,
            fold_case: true,
        };
        assert!(rule.matches(&device(0, "TX16S")));
        assert!(!rule.matches(&device(0, "TX16S Joystick")));
    }

    #[test]
    fn test_case_sensitive_rule() {
        let rule = MatchRule {
            field: MatchField::Name,
            pattern: "EdgeTX".to_string(),
            kind: MatchKind::Contains,
            fold_case: false,
        };
        assert!(rule.matches(&device(0, "EdgeTX Joystick")));
        assert!(!rule.matches(&device(0, "edgetx joystick")));
    }

    #[test]
    fn test_path_rule() {
        let rule = MatchRule::contains(MatchField::Path, "EVENT3");
        assert!(rule.matches(&device(3, "Mouse")));
        assert!(!rule.matches(&device(4, "Mouse")));
    }

    #[test]
    fn test_phys_rule_on_device_info_never_matches() {
        let rule = MatchRule::contains(MatchField::Phys, "usb");
        assert!(!rule.matches(&device(0, "usb joystick")));
    }

    #[test]
    fn test_matching_rules_reports_every_hit() {
        let matcher = DeviceMatcher::default();
        let subject = device(0, "RadioMaster Pocket Joystick");
        let hits: Vec<_> = matcher.matching_rules(&subject).map(|r| r.pattern.as_str()).collect();
        assert_eq!(hits, vec!["radiomaster pocket joystick", "radiomaster"]);
    }

    #[test]
    fn test_field_labels() {
        assert_eq!(MatchField::Name.label(), "name");
        assert_eq!(MatchField::Path.label(), "path");
        assert_eq!(MatchField::Phys.label(), "phys");
    }
}
