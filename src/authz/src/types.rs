//! Core enforcement types

/// A policy or grouping row: ordered field values
pub type Rule = Vec<String>;

/// Request definition section
pub const SEC_REQUEST: &str = "r";

/// Policy definition section
pub const SEC_POLICY: &str = "p";

/// Role definition section
pub const SEC_ROLE: &str = "g";

/// Policy effect section
pub const SEC_EFFECT: &str = "e";

/// Matchers section
pub const SEC_MATCHER: &str = "m";

/// Sections that hold rule rows (and are cleared on reload)
pub const RULE_SECTIONS: [&str; 2] = [SEC_POLICY, SEC_ROLE];

/// Kind of incremental change applied to grouping rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyOp {
    /// Rows were added
    Add,
    /// Rows were removed
    Remove,
}

/// Convert borrowed field values into an owned rule
pub fn to_rule<S: AsRef<str>>(fields: &[S]) -> Rule {
    fields.iter().map(|f| f.as_ref().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_rule() {
        let rule = to_rule(&["alice", "data1", "read"]);
        assert_eq!(rule, vec!["alice".to_string(), "data1".to_string(), "read".to_string()]);
    }

    #[test]
    fn test_rule_sections() {
        assert!(RULE_SECTIONS.contains(&SEC_POLICY));
        assert!(RULE_SECTIONS.contains(&SEC_ROLE));
        assert!(!RULE_SECTIONS.contains(&SEC_MATCHER));
    }
}
