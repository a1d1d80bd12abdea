//! Text rewriting applied to matcher and effect expressions
//!
//! Model text addresses tokens as `r.sub` or `p.obj`, but identifiers cannot
//! contain dots, so `r.sub` is rewritten to `r_sub` and attribute chains such
//! as `r.obj.Owner.Position` become `r_obj["Owner"]["Position"]`.

use crate::error::{PolicyError, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static ATTRIBUTE_CHAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([rp][0-9]*)\.(\w+)((?:\.[\p{L}_][\p{L}\p{N}_]*)+)")
        .expect("attribute chain pattern is valid")
});
static TOKEN_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([rp][0-9]*)\.").expect("token prefix pattern is valid"));
static EVAL_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\beval\(([^),]*)\)").expect("eval pattern is valid"));

/// Drop everything after the first `#`
pub fn remove_comments(text: &str) -> String {
    text.split('#').next().unwrap_or("").trim().to_string()
}

/// Rewrite `r.x` / `p.x` tokens and attribute chains into evaluator syntax
pub fn escape_assertion(text: &str) -> String {
    let indexed = ATTRIBUTE_CHAIN.replace_all(text, |caps: &Captures| {
        let attrs: String = caps[3][1..]
            .split('.')
            .map(|attr| format!("[\"{}\"]", attr))
            .collect();
        format!("{}_{}{}", &caps[1], &caps[2], attrs)
    });
    TOKEN_PREFIX.replace_all(&indexed, "${1}_").into_owned()
}

/// Whether the expression calls `eval(...)`
pub fn has_eval(text: &str) -> bool {
    EVAL_CALL.is_match(text)
}

/// Rule names passed to `eval(...)`, in order of appearance
pub fn get_eval_value(text: &str) -> Vec<String> {
    EVAL_CALL
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .collect()
}

/// Substitute every `eval(name)` with the escaped, parenthesised rule text
///
/// `lookup` resolves a rule name to its expression text. A name it does not
/// know is an error.
pub fn replace_eval<'a, F>(expr: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut out = String::with_capacity(expr.len());
    let mut last = 0;
    for caps in EVAL_CALL.captures_iter(expr) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let name = name.as_str().trim();
        let rule = lookup(name).ok_or_else(|| PolicyError::EvalRuleNotFound(name.to_string()))?;

        out.push_str(&expr[last..whole.start()]);
        out.push('(');
        out.push_str(&escape_assertion(rule));
        out.push(')');
        last = whole.end();
    }
    out.push_str(&expr[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_remove_comments() {
        assert_eq!(remove_comments("r.act == p.act # comments"), "r.act == p.act");
        assert_eq!(remove_comments("r.act == p.act#comments"), "r.act == p.act");
        assert_eq!(remove_comments("r.act == p.act###"), "r.act == p.act");
        assert_eq!(remove_comments("### comments"), "");
        assert_eq!(remove_comments("r.act == p.act"), "r.act == p.act");
    }

    #[test]
    fn test_escape_plain_tokens() {
        assert_eq!(
            escape_assertion("m = r.sub == p.sub && r.obj == p.obj && r.act == p.act"),
            "m = r_sub == p_sub && r_obj == p_obj && r_act == p_act"
        );
        assert_eq!(escape_assertion("r2.sub == p2.sub"), "r2_sub == p2_sub");
    }

    #[test]
    fn test_escape_attributes() {
        assert_eq!(
            escape_assertion("m = r.sub.Chief == r.obj.Owner"),
            r#"m = r_sub["Chief"] == r_obj["Owner"]"#
        );
        assert_eq!(
            escape_assertion("m = r.sub == r.obj._Owner"),
            r#"m = r_sub == r_obj["_Owner"]"#
        );
        assert_eq!(
            escape_assertion("m = r.sub == r.obj.Идентификатор1"),
            r#"m = r_sub == r_obj["Идентификатор1"]"#
        );
        assert_eq!(
            escape_assertion("m = r.sub == r.obj.Owner.Position"),
            r#"m = r_sub == r_obj["Owner"]["Position"]"#
        );
    }

    #[test]
    fn test_has_eval() {
        assert!(has_eval("eval() && a && b && c"));
        assert!(has_eval("a && b && eval(c)"));
        assert!(!has_eval("eval) && a && b && c"));
        assert!(!has_eval("eval)( && a && b && c"));
        assert!(has_eval("eval(c * (a + b)) && a && b && c"));
        assert!(!has_eval("xeval() && a && b && c"));
        assert!(has_eval("eval(a) && eval(b) && a && b && c"));
    }

    #[test]
    fn test_get_eval_value() {
        assert_eq!(get_eval_value("eval(a) && a && b && c"), vec!["a"]);
        assert_eq!(get_eval_value("eval(a) && eval(b) && a && b && c"), vec!["a", "b"]);
        assert_eq!(
            get_eval_value("eval(p_sub_rule) || p_obj == r_obj && eval(p_domain_rule)"),
            vec!["p_sub_rule", "p_domain_rule"]
        );
    }

    #[test]
    fn test_replace_eval() {
        let rules: HashMap<&str, &str> = [("a", "1 + 1"), ("b", "a + 1")].into_iter().collect();
        assert_eq!(
            replace_eval("eval(a) && eval(b) && c", |name| rules.get(name).copied()).unwrap(),
            "(1 + 1) && (a + 1) && c"
        );

        let rules: HashMap<&str, &str> = [("b", "1"), ("c", "(a + 1) + c")].into_iter().collect();
        assert_eq!(
            replace_eval("a && eval(b) && eval(c)", |name| rules.get(name).copied()).unwrap(),
            "a && (1) && ((a + 1) + c)"
        );
    }

    #[test]
    fn test_replace_eval_escapes_rule_text() {
        let rule = "r.sub.Age > 18";
        assert_eq!(
            replace_eval("eval(p_sub_rule)", |_| Some(rule)).unwrap(),
            r#"(r_sub["Age"] > 18)"#
        );
        assert!(replace_eval("eval(missing)", |_| None).is_err());
    }
}
