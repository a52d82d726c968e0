//! Host name handling shared by the topology and the proxy rules.

/// Directory entries that are never domains or subdomains.
pub const IGNORED_DIRS: &[&str] = &["bin", "tmp"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NameError {
    #[error("name must not be empty")]
    Empty,
    #[error("invalid character {ch:?} in {name:?}")]
    InvalidCharacter { name: String, ch: char },
    #[error("{0:?} is reserved")]
    Reserved(String),
    #[error("{0:?} must not start or end with '.' or '-'")]
    BadEdge(String),
}

/// Validate a domain name or subdomain label before it becomes a directory name.
///
/// Accepts ASCII letters, digits, `-` and `.`; rejects anything that could escape the
/// services root (`..`, `/`) or collide with the bookkeeping directories.
pub fn validate(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '.')))
    {
        return Err(NameError::InvalidCharacter {
            name: name.to_string(),
            ch,
        });
    }
    if IGNORED_DIRS.contains(&name) {
        return Err(NameError::Reserved(name.to_string()));
    }
    if name.starts_with(['.', '-']) || name.ends_with(['.', '-']) || name.contains("..") {
        return Err(NameError::BadEdge(name.to_string()));
    }
    Ok(())
}

/// The fully-qualified name for `label` under `domain`.
///
/// The apex is addressed by the domain name itself; an already-qualified label is kept.
#[must_use]
pub fn qualify(label: &str, domain: &str) -> String {
    if label == domain || label.ends_with(&format!(".{domain}")) {
        label.to_string()
    } else {
        format!("{label}.{domain}")
    }
}

/// The label part of `fqdn`, or the domain itself for the apex.
#[must_use]
pub fn label_of<'a>(fqdn: &'a str, domain: &str) -> &'a str {
    fqdn.strip_suffix(domain)
        .and_then(|rest| rest.strip_suffix('.'))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(fqdn)
}

/// Whether a directory named `entry` inside the domain root is one of its subdomains.
#[must_use]
pub fn is_subdomain_dir(entry: &str, domain: &str) -> bool {
    !IGNORED_DIRS.contains(&entry) && (entry == domain || entry.ends_with(&format!(".{domain}")))
}

/// The sanitized identifier used as proxy rule name and compose project name.
#[must_use]
pub fn escape(fqdn: &str) -> String {
    fqdn.replace('.', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualify_handles_apex_and_labels() {
        assert_eq!(qualify("example.com", "example.com"), "example.com");
        assert_eq!(qualify("blog", "example.com"), "blog.example.com");
        assert_eq!(qualify("blog.example.com", "example.com"), "blog.example.com");
    }

    #[test]
    fn label_of_strips_the_domain() {
        assert_eq!(label_of("blog.example.com", "example.com"), "blog");
        assert_eq!(label_of("example.com", "example.com"), "example.com");
    }

    #[test]
    fn subdomain_dirs_must_end_with_the_domain() {
        assert!(is_subdomain_dir("example.com", "example.com"));
        assert!(is_subdomain_dir("blog.example.com", "example.com"));
        assert!(!is_subdomain_dir("notexample.com", "example.com"));
        assert!(!is_subdomain_dir("tmp", "example.com"));
        assert!(!is_subdomain_dir("other.org", "example.com"));
    }

    #[test]
    fn escape_replaces_dots() {
        assert_eq!(escape("blog.example.com"), "blog-example-com");
    }

    #[test]
    fn validate_rejects_traversal_and_reserved_names() {
        assert_eq!(validate("blog"), Ok(()));
        assert_eq!(validate("a.b-c.example.com"), Ok(()));
        assert_eq!(validate(""), Err(NameError::Empty));
        assert!(matches!(
            validate("../etc"),
            Err(NameError::InvalidCharacter { ch: '/', .. })
        ));
        assert!(matches!(validate(".."), Err(NameError::BadEdge(_))));
        assert!(matches!(validate("bin"), Err(NameError::Reserved(_))));
        assert!(matches!(validate("-blog"), Err(NameError::BadEdge(_))));
    }
}
