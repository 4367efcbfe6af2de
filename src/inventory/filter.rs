//! Host selection.
//!
//! [`HostSet`] is an ordered, immutable collection of shared hosts. Every
//! selection returns a new set and keeps the relative order of the input.
//! [`HostFilter`] is a composable predicate; filters combine with `&`, `|`
//! and `!`, and can be parsed from a host pattern string.

use regex::Regex;
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::sync::Arc;

use super::{Host, InventoryError, InventoryResult};

/// An ordered set of hosts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostSet {
    hosts: Vec<Arc<Host>>,
}

impl HostSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep hosts for which `predicate` holds. The input is untouched.
    pub fn filter<P>(&self, predicate: P) -> HostSet
    where
        P: Fn(&Host) -> bool,
    {
        self.hosts
            .iter()
            .filter(|host| predicate(host))
            .cloned()
            .collect()
    }

    /// Keep hosts matching `filter`.
    pub fn filter_by(&self, filter: &HostFilter) -> HostSet {
        self.filter(|host| filter.matches(host))
    }

    /// Hosts in `self` followed by hosts only in `other`.
    pub fn union(&self, other: &HostSet) -> HostSet {
        let mut hosts = self.hosts.clone();
        for host in &other.hosts {
            if !self.contains(&host.name) {
                hosts.push(Arc::clone(host));
            }
        }
        HostSet { hosts }
    }

    /// Hosts of `self` also present in `other`.
    pub fn intersection(&self, other: &HostSet) -> HostSet {
        self.filter(|host| other.contains(&host.name))
    }

    /// Hosts of `self` absent from `other`.
    pub fn difference(&self, other: &HostSet) -> HostSet {
        self.filter(|host| !other.contains(&host.name))
    }

    /// True if a host with this name is in the set.
    pub fn contains(&self, name: &str) -> bool {
        self.hosts.iter().any(|host| host.name == name)
    }

    /// Look up a host by name.
    pub fn get(&self, name: &str) -> Option<&Arc<Host>> {
        self.hosts.iter().find(|host| host.name == name)
    }

    /// Host names, in order.
    pub fn names(&self) -> Vec<&str> {
        self.hosts.iter().map(|host| host.name.as_str()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Host>> {
        self.hosts.iter()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl FromIterator<Arc<Host>> for HostSet {
    fn from_iter<I: IntoIterator<Item = Arc<Host>>>(iter: I) -> Self {
        Self {
            hosts: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<Host> for HostSet {
    fn from_iter<I: IntoIterator<Item = Host>>(iter: I) -> Self {
        iter.into_iter().map(Arc::new).collect()
    }
}

impl<'a> IntoIterator for &'a HostSet {
    type Item = &'a Arc<Host>;
    type IntoIter = std::slice::Iter<'a, Arc<Host>>;

    fn into_iter(self) -> Self::IntoIter {
        self.hosts.iter()
    }
}

/// A predicate over hosts.
#[derive(Debug, Clone)]
pub enum HostFilter {
    /// Every host
    All,
    /// Host name equals
    Name(String),
    /// Host lists the group among its direct groups
    Group(String),
    /// Host belongs to the group directly or through a parent group
    GroupTree(String),
    /// Platform tag equals (case-insensitive)
    Platform(String),
    /// Host name matches a regular expression
    NameRegex(Regex),
    /// Resolved variable equals a value
    Var {
        key: String,
        value: serde_yaml::Value,
    },
    And(Vec<HostFilter>),
    Or(Vec<HostFilter>),
    Not(Box<HostFilter>),
}

impl HostFilter {
    pub fn name(name: impl Into<String>) -> Self {
        HostFilter::Name(name.into())
    }

    pub fn group(group: impl Into<String>) -> Self {
        HostFilter::Group(group.into())
    }

    pub fn group_tree(group: impl Into<String>) -> Self {
        HostFilter::GroupTree(group.into())
    }

    pub fn platform(platform: impl Into<String>) -> Self {
        HostFilter::Platform(platform.into())
    }

    pub fn var(key: impl Into<String>, value: impl Into<serde_yaml::Value>) -> Self {
        HostFilter::Var {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Evaluate the predicate against one host.
    pub fn matches(&self, host: &Host) -> bool {
        match self {
            HostFilter::All => true,
            HostFilter::Name(name) => host.name == *name,
            HostFilter::Group(group) => host.in_group(group),
            HostFilter::GroupTree(group) => host.belongs_to(group),
            HostFilter::Platform(platform) => host
                .platform()
                .is_some_and(|p| p.eq_ignore_ascii_case(platform)),
            HostFilter::NameRegex(re) => re.is_match(&host.name),
            HostFilter::Var { key, value } => host.var(key) == Some(value),
            HostFilter::And(filters) => filters.iter().all(|f| f.matches(host)),
            HostFilter::Or(filters) => filters.iter().any(|f| f.matches(host)),
            HostFilter::Not(filter) => !filter.matches(host),
        }
    }

    /// Parse a host pattern.
    ///
    /// Supported forms:
    /// - `all` or `*` - every host
    /// - `name` - a host of that name, or any member of that group (inherited
    ///   membership counts)
    /// - `leaf*`, `leaf0?` - glob on host name
    /// - `~^leaf0[12]$` - regex on host name
    /// - `a:b` or `a,b` - union
    /// - `a:&b` - intersection
    /// - `a:!b` - exclusion
    ///
    /// Parts are applied left to right. A pattern starting with an
    /// exclusion or intersection starts from every host.
    pub fn parse(pattern: &str) -> InventoryResult<HostFilter> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(invalid(pattern, "empty pattern"));
        }

        let mut acc: Option<HostFilter> = None;
        for part in split_pattern(pattern) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            acc = Some(if let Some(rest) = part.strip_prefix('&') {
                acc.unwrap_or(HostFilter::All) & parse_term(rest, pattern)?
            } else if let Some(rest) = part.strip_prefix('!') {
                acc.unwrap_or(HostFilter::All) & !parse_term(rest, pattern)?
            } else {
                let term = parse_term(part, pattern)?;
                match acc {
                    Some(prev) => prev | term,
                    None => term,
                }
            });
        }

        acc.ok_or_else(|| invalid(pattern, "no terms"))
    }
}

impl BitAnd for HostFilter {
    type Output = HostFilter;

    fn bitand(self, rhs: HostFilter) -> HostFilter {
        match (self, rhs) {
            (HostFilter::All, other) | (other, HostFilter::All) => other,
            (HostFilter::And(mut left), HostFilter::And(right)) => {
                left.extend(right);
                HostFilter::And(left)
            }
            (HostFilter::And(mut left), other) => {
                left.push(other);
                HostFilter::And(left)
            }
            (left, right) => HostFilter::And(vec![left, right]),
        }
    }
}

impl BitOr for HostFilter {
    type Output = HostFilter;

    fn bitor(self, rhs: HostFilter) -> HostFilter {
        match (self, rhs) {
            (HostFilter::Or(mut left), HostFilter::Or(right)) => {
                left.extend(right);
                HostFilter::Or(left)
            }
            (HostFilter::Or(mut left), other) => {
                left.push(other);
                HostFilter::Or(left)
            }
            (left, right) => HostFilter::Or(vec![left, right]),
        }
    }
}

impl Not for HostFilter {
    type Output = HostFilter;

    fn not(self) -> HostFilter {
        match self {
            HostFilter::Not(inner) => *inner,
            other => HostFilter::Not(Box::new(other)),
        }
    }
}

impl fmt::Display for HostFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, filters: &[HostFilter], op: &str) -> fmt::Result {
            write!(f, "(")?;
            for (i, filter) in filters.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", op)?;
                }
                write!(f, "{}", filter)?;
            }
            write!(f, ")")
        }

        match self {
            HostFilter::All => write!(f, "all"),
            HostFilter::Name(name) => write!(f, "name={}", name),
            HostFilter::Group(group) => write!(f, "group={}", group),
            HostFilter::GroupTree(group) => write!(f, "group~={}", group),
            HostFilter::Platform(platform) => write!(f, "platform={}", platform),
            HostFilter::NameRegex(re) => write!(f, "name~/{}/", re.as_str()),
            HostFilter::Var { key, value } => {
                let value = serde_yaml::to_string(value).unwrap_or_default();
                write!(f, "{}={}", key, value.trim_end())
            }
            HostFilter::And(filters) => join(f, filters, "&"),
            HostFilter::Or(filters) => join(f, filters, "|"),
            HostFilter::Not(filter) => write!(f, "!{}", filter),
        }
    }
}

fn invalid(pattern: &str, message: impl Into<String>) -> InventoryError {
    InventoryError::InvalidPattern {
        pattern: pattern.to_string(),
        message: message.into(),
    }
}

fn parse_term(term: &str, pattern: &str) -> InventoryResult<HostFilter> {
    let term = term.trim();
    if term.is_empty() {
        return Err(invalid(pattern, "empty term after operator"));
    }

    if term == "all" || term == "*" {
        return Ok(HostFilter::All);
    }

    if let Some(expr) = term.strip_prefix('~') {
        let re = Regex::new(expr).map_err(|e| invalid(pattern, e.to_string()))?;
        return Ok(HostFilter::NameRegex(re));
    }

    if term.contains(['*', '?', '[']) {
        let re = Regex::new(&glob_to_regex(term)).map_err(|e| invalid(pattern, e.to_string()))?;
        return Ok(HostFilter::NameRegex(re));
    }

    Ok(HostFilter::name(term) | HostFilter::group_tree(term))
}

/// Split a pattern on `:` and `,`, ignoring separators inside brackets.
fn split_pattern(pattern: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut depth: usize = 0;

    for (i, ch) in pattern.char_indices() {
        match ch {
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            ':' | ',' if depth == 0 => {
                parts.push(&pattern[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    parts.push(&pattern[start..]);
    parts
}

fn glob_to_regex(glob: &str) -> String {
    let mut regex = String::from("^");
    let mut in_class = false;
    let mut chars = glob.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_class {
            match ch {
                ']' => {
                    in_class = false;
                    regex.push(']');
                }
                '\\' | '[' => {
                    regex.push('\\');
                    regex.push(ch);
                }
                _ => regex.push(ch),
            }
            continue;
        }
        match ch {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            '[' => {
                in_class = true;
                regex.push('[');
                // `[!...]` negates the class
                if matches!(chars.peek(), Some('!') | Some('^')) {
                    chars.next();
                    regex.push('^');
                }
            }
            '(' | ')' | '{' | '}' | '.' | '+' | '^' | '$' | '|' | '\\' | ']' => {
                regex.push('\\');
                regex.push(ch);
            }
            _ => regex.push(ch),
        }
    }
    regex.push('$');
    regex
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn host(name: &str, groups: &[&str], platform: Option<&str>) -> Host {
        let mut host = Host::new(name);
        host.groups = groups.iter().map(|g| g.to_string()).collect();
        host.lineage = host.groups.clone();
        host.connection.platform = platform.map(str::to_string);
        host
    }

    fn fleet() -> HostSet {
        vec![
            host("leaf01", &["A"], Some("nxos")),
            host("leaf02", &["B"], Some("eos")),
            host("leaf03", &["A"], Some("NXOS")),
            host("spine01", &[], None),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_filter_preserves_order() {
        let set = fleet();
        let a = set.filter_by(&HostFilter::group("A"));
        assert_eq!(a.names(), vec!["leaf01", "leaf03"]);
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_platform_case_insensitive() {
        let set = fleet().filter_by(&HostFilter::platform("nxos"));
        assert_eq!(set.names(), vec!["leaf01", "leaf03"]);
    }

    #[test]
    fn test_combinators() {
        let set = fleet();
        let f = HostFilter::group("A") & !HostFilter::name("leaf01");
        assert_eq!(set.filter_by(&f).names(), vec!["leaf03"]);

        let f = HostFilter::group("B") | HostFilter::name("spine01");
        assert_eq!(set.filter_by(&f).names(), vec!["leaf02", "spine01"]);

        let f = !!HostFilter::group("B");
        assert!(matches!(f, HostFilter::Group(_)));
    }

    #[test]
    fn test_set_operations() {
        let set = fleet();
        let a = set.filter_by(&HostFilter::group("A"));
        let b = set.filter_by(&HostFilter::group("B"));

        assert_eq!(a.union(&b).names(), vec!["leaf01", "leaf03", "leaf02"]);
        assert!(a.intersection(&b).is_empty());
        assert_eq!(set.difference(&a).names(), vec!["leaf02", "spine01"]);
    }

    #[test]
    fn test_parse_patterns() {
        let set = fleet();
        let select = |p: &str| set.filter_by(&HostFilter::parse(p).unwrap()).names().join(",");

        assert_eq!(select("all"), "leaf01,leaf02,leaf03,spine01");
        assert_eq!(select("A"), "leaf01,leaf03");
        assert_eq!(select("A:B"), "leaf01,leaf02,leaf03");
        assert_eq!(select("A,spine01"), "leaf01,leaf03,spine01");
        assert_eq!(select("leaf*:&A"), "leaf01,leaf03");
        assert_eq!(select("leaf*:!A"), "leaf02");
        assert_eq!(select("!A"), "leaf02,spine01");
        assert_eq!(select("~^leaf0[12]$"), "leaf01,leaf02");
        assert_eq!(select("leaf0[23]"), "leaf02,leaf03");
        assert_eq!(select("leaf0[!1]"), "leaf02,leaf03");
        assert_eq!(select("leaf0[!12]:spine*"), "leaf03,spine01");
    }

    #[test]
    fn test_glob_negated_class() {
        assert_eq!(glob_to_regex("leaf[!1]"), "^leaf[^1]$");
        assert_eq!(glob_to_regex("sw[0-9].dc"), "^sw[0-9]\\.dc$");

        let re = Regex::new(&glob_to_regex("leaf0[!1]")).unwrap();
        assert!(!re.is_match("leaf01"));
        assert!(!re.is_match("leaf0!"));
        assert!(re.is_match("leaf02"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(HostFilter::parse("").is_err());
        assert!(HostFilter::parse("A:&").is_err());
        assert!(HostFilter::parse("~(unclosed").is_err());
    }

    #[test]
    fn test_display() {
        let f = HostFilter::group("A") & !HostFilter::platform("eos");
        assert_eq!(f.to_string(), "(group=A & !platform=eos)");
    }
}
