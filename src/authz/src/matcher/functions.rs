//! Built-in matcher functions
//!
//! The string operators are plain functions so they can also serve as role
//! manager matching functions; [`builtin_functions`] wraps them for use inside
//! matcher expressions under their expression names (`keyMatch`, `ipMatch`, ...).

use super::error::{MatcherError, Result};
use super::value::Value;
use glob::{MatchOptions, Pattern};
use ipnet::IpNet;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

/// A function callable from a matcher expression
pub type Function = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

static KEY_MATCH2_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":[^/]+").expect("key_match2 pattern is valid"));
static KEY_MATCH3_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^/]+\}").expect("key_match3 pattern is valid"));

/// Whether `key1` matches `key2`, where `key2` may end in a `*` wildcard
///
/// `"/foo/bar"` matches `"/foo/*"` and `"/foobar"` matches `"/foo*"`.
pub fn key_match(key1: &str, key2: &str) -> bool {
    match key2.find('*') {
        None => key1 == key2,
        Some(i) => {
            if key1.len() > i {
                key1.as_bytes()[..i] == key2.as_bytes()[..i]
            } else {
                key1 == &key2[..i]
            }
        }
    }
}

/// Like [`key_match`], plus `:name` path segments
///
/// `"/resource1"` matches `"/:resource"`. A pattern that does not form a valid
/// template never matches.
pub fn key_match2(key1: &str, key2: &str) -> bool {
    let pattern = key2.replace("/*", "/.*");
    let pattern = KEY_MATCH2_PATTERN.replace_all(&pattern, "[^/]+");
    full_match(key1, &pattern)
}

/// Like [`key_match2`], with `{name}` path segments instead of `:name`
pub fn key_match3(key1: &str, key2: &str) -> bool {
    let pattern = key2.replace("/*", "/.*");
    let pattern = KEY_MATCH3_PATTERN.replace_all(&pattern, "[^/]+");
    full_match(key1, &pattern)
}

fn full_match(key: &str, pattern: &str) -> bool {
    Regex::new(&format!("^{}$", pattern))
        .map(|re| re.is_match(key))
        .unwrap_or(false)
}

/// Whether `key2`, as a regular expression, matches at the start of `key1`
pub fn regex_match(key1: &str, key2: &str) -> Result<bool> {
    let re = Regex::new(key2).map_err(|e| MatcherError::function("regexMatch", e.to_string()))?;
    Ok(re.find(key1).is_some_and(|m| m.start() == 0))
}

/// Path-aware glob match: `*` and `?` never cross a `/`, a leading `.` must
/// be matched literally and `\x` matches `x` literally
///
/// An invalid pattern matches nothing.
pub fn glob_match(value: &str, pattern: &str) -> bool {
    const OPTIONS: MatchOptions = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };
    Pattern::new(&bracket_escapes(pattern))
        .map(|p| p.matches_with(value, OPTIONS))
        .unwrap_or(false)
}

/// Rewrite backslash escapes outside `[...]` into the bracket form `glob` understands
fn bracket_escapes(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;
    while let Some(c) = chars.next() {
        if in_class {
            in_class = c != ']';
            out.push(c);
            continue;
        }
        match c {
            '\\' => match chars.next() {
                Some(m @ ('*' | '?' | '[' | ']')) => {
                    out.push('[');
                    out.push(m);
                    out.push(']');
                }
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            '[' => {
                out.push('[');
                if let Some(&neg @ '!') = chars.peek() {
                    out.push(neg);
                    chars.next();
                }
                // A `]` right after the opening bracket is a member
                if let Some(&']') = chars.peek() {
                    out.push(']');
                    chars.next();
                }
                in_class = true;
            }
            c => out.push(c),
        }
    }
    out
}

/// Whether address `ip1` falls within `ip2` (an address or a CIDR block)
///
/// If either side is not an IP address the two are compared as strings.
pub fn ip_match(ip1: &str, ip2: &str) -> bool {
    let Ok(addr) = ip1.parse::<IpAddr>() else {
        return ip1 == ip2;
    };

    if let Ok(net) = ip2.parse::<IpNet>() {
        return net.contains(&addr);
    }
    match ip2.parse::<IpAddr>() {
        Ok(other) => addr == other,
        Err(_) => ip1 == ip2,
    }
}

/// Extract exactly two string arguments for `name`
pub(crate) fn two_strings<'a>(name: &str, args: &'a [Value]) -> Result<(&'a str, &'a str)> {
    match args {
        [a, b] => match (a.as_str(), b.as_str()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(MatcherError::TypeMismatch(format!(
                "{} expects string arguments, got {} and {}",
                name,
                a.type_name(),
                b.type_name()
            ))),
        },
        _ => Err(MatcherError::function(
            name,
            format!("expected 2 arguments, got {}", args.len()),
        )),
    }
}

/// Wrap a two-string predicate as a matcher function
pub fn string_predicate<F>(name: &'static str, predicate: F) -> Function
where
    F: Fn(&str, &str) -> bool + Send + Sync + 'static,
{
    Arc::new(move |args: &[Value]| -> Result<Value> {
        let (a, b) = two_strings(name, args)?;
        Ok(Value::Bool(predicate(a, b)))
    })
}

/// The built-in operators under their matcher names
pub fn builtin_functions() -> HashMap<String, Function> {
    let mut functions: HashMap<String, Function> = HashMap::new();
    functions.insert("keyMatch".into(), string_predicate("keyMatch", key_match));
    functions.insert("keyMatch2".into(), string_predicate("keyMatch2", key_match2));
    functions.insert("keyMatch3".into(), string_predicate("keyMatch3", key_match3));
    functions.insert("globMatch".into(), string_predicate("globMatch", glob_match));
    functions.insert("ipMatch".into(), string_predicate("ipMatch", ip_match));
    functions.insert(
        "regexMatch".into(),
        Arc::new(|args: &[Value]| -> Result<Value> {
            let (a, b) = two_strings("regexMatch", args)?;
            Ok(Value::Bool(regex_match(a, b)?))
        }),
    );
    functions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_match() {
        assert!(key_match("/foo", "/foo"));
        assert!(key_match("/foo", "/foo*"));
        assert!(!key_match("/foo", "/foo/*"));
        assert!(!key_match("/foo/bar", "/foo"));
        assert!(key_match("/foo/bar", "/foo*"));
        assert!(key_match("/foo/bar", "/foo/*"));
        assert!(!key_match("/foobar", "/foo"));
        assert!(key_match("/foobar", "/foo*"));
        assert!(!key_match("/foobar", "/foo/*"));
    }

    #[test]
    fn test_key_match2() {
        assert!(key_match2("/foo", "/foo"));
        assert!(key_match2("/foo", "/foo*"));
        assert!(!key_match2("/foo", "/foo/*"));
        assert!(!key_match2("/foo/bar", "/foo*"));
        assert!(key_match2("/foo/bar", "/foo/*"));
        assert!(!key_match2("/foobar", "/foo*"));

        assert!(!key_match2("/", "/:resource"));
        assert!(key_match2("/resource1", "/:resource"));
        assert!(!key_match2("/myid", "/:id/using/:resId"));
        assert!(key_match2("/myid/using/myresid", "/:id/using/:resId"));

        assert!(!key_match2("/proxy/myid", "/proxy/:id/*"));
        assert!(key_match2("/proxy/myid/", "/proxy/:id/*"));
        assert!(key_match2("/proxy/myid/res/res2/res3", "/proxy/:id/*"));
        assert!(!key_match2("/proxy/", "/proxy/:id/*"));

        assert!(key_match2("/alice/all", "/:id/all"));
        assert!(!key_match2("/alice", "/:id/all"));
        assert!(!key_match2("/alice/all", "/:id"));
        assert!(!key_match2("/alice/all", "/:/all"));
    }

    #[test]
    fn test_key_match3() {
        assert!(key_match3("/foo", "/foo"));
        assert!(key_match3("/foo/bar", "/foo/*"));
        assert!(!key_match3("/foobar", "/foo/*"));
        assert!(!key_match3("/", "/{resource}"));
        assert!(key_match3("/resource1", "/{resource}"));
        assert!(!key_match3("/myid", "/{id}/using/{resId}"));
        assert!(key_match3("/myid/using/myresid", "/{id}/using/{resId}"));
        assert!(!key_match3("/proxy/myid", "/proxy/{id}/*"));
        assert!(key_match3("/proxy/myid/res", "/proxy/{id}/*"));
        assert!(!key_match3("/myid/using/myresid", "/{id/using/{resId}"));
    }

    #[test]
    fn test_regex_match() {
        assert!(regex_match("/topic/create", "/topic/create").unwrap());
        assert!(regex_match("/topic/create/123", "/topic/create").unwrap());
        assert!(!regex_match("/topic/delete", "/topic/create").unwrap());
        assert!(!regex_match("/topic/edit", "/topic/edit/[0-9]+").unwrap());
        assert!(regex_match("/topic/edit/123", "/topic/edit/[0-9]+").unwrap());
        assert!(!regex_match("/topic/edit/abc", "/topic/edit/[0-9]+").unwrap());
        assert!(!regex_match("/foo/delete/123", "/topic/delete/[0-9]+").unwrap());
        assert!(regex_match("/topic/delete/0", "/topic/delete/[0-9]+").unwrap());
        assert!(regex_match("/topic", "(").is_err());
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("/foo", "/foo"));
        assert!(glob_match("/foo", "/foo*"));
        assert!(!glob_match("/foo", "/foo/*"));
        assert!(!glob_match("/foo/bar", "/foo*"));
        assert!(glob_match("/foo/bar", "/foo/*"));
        assert!(glob_match("/foobar", "/foo*"));

        assert!(glob_match("/foo", "*/foo"));
        assert!(glob_match("/foo/bar", "*/foo/*"));
        assert!(!glob_match("/prefix/foo", "*/foo"));
        assert!(!glob_match("/prefix/foobar", "*/foo*"));
        assert!(!glob_match("/prefix/subprefix/foo/bar", "*/foo/*"));

        assert!(glob_match("/file1.txt", "/file?.txt"));
        assert!(glob_match("/file1.txt", "/file[0-9].txt"));
        assert!(!glob_match("/file1.txt", "/file[!0-9].txt"));
    }

    #[test]
    fn test_glob_match_escapes() {
        assert!(glob_match("a*", "a\\*"));
        assert!(!glob_match("ab", "a\\*"));
        assert!(glob_match("/file?.txt", "/file\\?.txt"));
        assert!(!glob_match("/file1.txt", "/file\\?.txt"));
        assert!(glob_match("/a[1]", "/a\\[1\\]"));
        assert!(glob_match("/abc", "/a\\bc"));
        assert!(glob_match("a\\", "a\\"));
    }

    #[test]
    fn test_glob_match_classes() {
        assert!(glob_match("/b", "/[abc]"));
        assert!(!glob_match("/d", "/[abc]"));
        assert!(glob_match("/d", "/[!abc]"));
        assert!(glob_match("/]", "/[]]"));
        assert!(glob_match("/x", "/[!]]"));
        assert!(!glob_match("/a/b", "/a?b"));
        assert!(!glob_match("/a/b", "/a[/]b"));
        // Unclosed class
        assert!(!glob_match("/a", "/[a"));
    }

    #[test]
    fn test_glob_match_leading_dot() {
        assert!(!glob_match(".profile", "*"));
        assert!(glob_match(".profile", ".*"));
        assert!(!glob_match("/home/.profile", "/home/*"));
        assert!(glob_match("/home/a.profile", "/home/*"));
    }

    #[test]
    fn test_ip_match() {
        assert!(ip_match("192.168.2.123", "192.168.2.0/24"));
        assert!(!ip_match("192.168.2.123", "192.168.3.0/24"));
        assert!(ip_match("192.168.2.123", "192.168.2.0/16"));
        assert!(ip_match("192.168.2.123", "192.168.2.123"));
        assert!(ip_match("192.168.2.123", "192.168.2.123/32"));
        assert!(ip_match("10.0.0.11", "10.0.0.0/8"));
        assert!(!ip_match("11.0.0.123", "10.0.0.0/8"));
        assert!(ip_match("2001:db8::1", "2001:db8::/32"));
        assert!(ip_match("not-an-ip", "not-an-ip"));
        assert!(!ip_match("not-an-ip", "10.0.0.0/8"));
    }

    #[test]
    fn test_builtin_wrappers() {
        let functions = builtin_functions();
        let func = &functions["keyMatch"];
        let args = vec![Value::from("/foo/bar"), Value::from("/foo/*")];
        assert_eq!(func(&args).unwrap(), Value::Bool(true));

        let args = vec![Value::from("/foo")];
        assert!(func(&args).is_err());

        let args = vec![Value::Int(1), Value::from("/foo")];
        assert!(matches!(func(&args), Err(MatcherError::TypeMismatch(_))));
    }
}
