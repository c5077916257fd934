//! Domain types providing compile-time safety and self-documentation
//!
//! These wrappers keep a class-and-line location from being confused with a
//! package scope, and make the control surface signatures self-describing.

use std::fmt;

/// Convert a dotted class or package name to its `/`-separated form.
///
/// `com.app.Worker` and `com/app/Worker` name the same class; comparisons
/// always go through this form.
pub fn canonicalize(name: &str) -> String {
    name.replace('.', "/")
}

/// Source line whose execution rate is the profiling goal
///
/// Immutable once configured. There is no explicit unset: a new point
/// replaces the old one while the session is not running.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgressPoint {
    class_name: String,
    line_number: i32,
}

impl ProgressPoint {
    pub fn new(class_name: impl Into<String>, line_number: i32) -> Self {
        Self { class_name: class_name.into(), line_number }
    }

    /// Class name exactly as configured
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn line_number(&self) -> i32 {
        self.line_number
    }

    /// Parse `<class>:<line>`, splitting on the last colon.
    pub fn parse(s: &str) -> Option<Self> {
        let (class, line) = s.rsplit_once(':')?;
        if class.is_empty() {
            return None;
        }
        let line = line.trim().parse().ok()?;
        Some(Self::new(class, line))
    }
}

impl fmt::Display for ProgressPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.class_name, self.line_number)
    }
}

/// Package whose code is virtually sped up during a run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    package_name: String,
}

impl Scope {
    pub fn new(package_name: impl Into<String>) -> Self {
        Self { package_name: package_name.into() }
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Returns true if `class` lives in this package or one of its subpackages.
    ///
    /// Accepts dotted names, `/`-separated names and JVM-style signatures
    /// (`Lcom/app/Worker;`).
    pub fn contains_class(&self, class: &str) -> bool {
        let package = canonicalize(self.package_name.trim_end_matches(['.', '/']));
        if package.is_empty() {
            return true;
        }
        let class = canonicalize(strip_signature(class));
        class.strip_prefix(package.as_str()).is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.package_name)
    }
}

/// Strip the `L...;` wrapper from a JVM class signature, if present.
fn strip_signature(class: &str) -> &str {
    class
        .strip_prefix('L')
        .and_then(|rest| rest.strip_suffix(';'))
        .unwrap_or(class)
}
