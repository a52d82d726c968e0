//! Route rules inside a shared, hand-maintained haproxy configuration.
//!
//! The file is rewritten line by line. Only three things are touched for a route: its
//! `acl`/`use_backend` pair in `frontend http`, its `backend <id>` block, and its certificate
//! on the TLS bind line that follows `bind *:80`. Generated rules live between the
//! `# SERVICES` / `# END OF SERVICES` sentinels: indented sentinels inside `frontend http`,
//! column-0 sentinels around the backend blocks. Everything else passes through in order.
//!
//! There is no locking; concurrent writers to the same file race.

/// Opens a region of generated rules.
pub const SERVICES_BEGIN: &str = "# SERVICES";
/// Closes a region of generated rules; new rules are inserted right before it.
pub const SERVICES_END: &str = "# END OF SERVICES";

const HTTP_FRONTEND: &str = "http";
const PLAIN_BIND: &str = "bind *:80";
const TLS_BIND: &str = "bind *:443 ssl";

const SECTION_KEYWORDS: &[&str] = &[
    "global",
    "defaults",
    "frontend",
    "backend",
    "listen",
    "resolvers",
    "peers",
    "userlist",
    "program",
    "http-errors",
    "cache",
    "ring",
    "mailers",
];

/// The rule set of one subdomain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route<'a> {
    /// Sanitized identifier, used as acl and backend name.
    pub id: &'a str,
    /// Host header value to match.
    pub host: &'a str,
    /// Combined PEM file to serve for this host, if one is available.
    pub certificate: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteChange {
    /// (Re)generate the rules, pointing at `127.0.0.1:<port>`.
    Add { server: String, port: u16 },
    Remove,
}

impl RouteChange {
    const fn is_add(&self) -> bool {
        matches!(self, Self::Add { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Neutral,
    MatchingBackend,
    OtherBackend,
    HttpFrontend,
    OtherFrontend,
}

/// Apply `change` for `route` to the configuration text `original`.
///
/// Existing rules for the route are always dropped and, when adding, regenerated before
/// the closing sentinels. Applying the same `Add` twice yields the same text as applying it
/// once, and `Remove` after `Add` restores the text that did not contain the route.
#[must_use]
pub fn rewrite(original: &str, route: &Route<'_>, change: &RouteChange) -> String {
    let mut out = String::with_capacity(original.len() + 512);
    let mut section = Section::Neutral;
    let mut after_plain_bind = false;

    for line in original.split_inclusive('\n') {
        let (body, eol) = split_eol(line);
        let trimmed = body.trim();
        let column0 = !body.starts_with([' ', '\t']);
        let follows_plain_bind = std::mem::take(&mut after_plain_bind);

        if column0 && (trimmed == SERVICES_BEGIN || trimmed == SERVICES_END) {
            section = Section::Neutral;
            if trimmed == SERVICES_END {
                if let RouteChange::Add { server, port } = change {
                    push_backend(&mut out, route.id, server, *port);
                }
            }
            out.push_str(line);
            continue;
        }

        if column0 {
            if let Some(next) = section_start(trimmed, route.id) {
                section = next;
                if section != Section::MatchingBackend {
                    out.push_str(line);
                }
                continue;
            }
        }

        match section {
            Section::MatchingBackend => continue,
            Section::HttpFrontend => {
                if follows_plain_bind {
                    if trimmed.starts_with(TLS_BIND) {
                        out.push_str(&patch_tls_bind(body, eol, route.certificate, change));
                        continue;
                    }
                    if let (true, Some(cert)) = (change.is_add(), route.certificate) {
                        out.push_str(&format!("\t{TLS_BIND} crt {cert}\n"));
                    }
                }
                if is_route_rule(trimmed, route.id) {
                    continue;
                }
                if trimmed == SERVICES_END && change.is_add() {
                    out.push_str(&format!("\tacl {} req.hdr(Host) {}\n", route.id, route.host));
                    out.push_str(&format!("\tuse_backend {0} if {0}\n", route.id));
                }
                if trimmed == PLAIN_BIND {
                    after_plain_bind = true;
                }
            }
            Section::Neutral | Section::OtherBackend | Section::OtherFrontend => {}
        }
        out.push_str(line);
    }

    out
}

/// Names of all `backend` sections, in file order.
#[must_use]
pub fn backend_names(text: &str) -> Vec<&str> {
    text.lines()
        .filter(|line| !line.starts_with([' ', '\t']))
        .filter_map(|line| line.trim().strip_prefix("backend "))
        .map(str::trim)
        .collect()
}

/// The `server` line target of backend `id`, e.g. `127.0.0.1:8080`.
#[must_use]
pub fn backend_target<'a>(text: &'a str, id: &str) -> Option<&'a str> {
    let mut inside = false;
    for line in text.lines() {
        let trimmed = line.trim();
        if !line.starts_with([' ', '\t']) {
            inside = trimmed.strip_prefix("backend ").map(str::trim) == Some(id);
            continue;
        }
        if inside {
            if let Some(rest) = trimmed.strip_prefix("server ") {
                return rest.split_whitespace().nth(1);
            }
        }
    }
    None
}

fn split_eol(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

fn section_start(trimmed: &str, id: &str) -> Option<Section> {
    let mut words = trimmed.split_whitespace();
    let keyword = words.next()?;
    if !SECTION_KEYWORDS.contains(&keyword) {
        return None;
    }
    let name = words.next();
    Some(match keyword {
        "backend" if name == Some(id) => Section::MatchingBackend,
        "backend" => Section::OtherBackend,
        "frontend" if name == Some(HTTP_FRONTEND) => Section::HttpFrontend,
        "frontend" => Section::OtherFrontend,
        _ => Section::Neutral,
    })
}

fn is_route_rule(trimmed: &str, id: &str) -> bool {
    if let Some(rest) = trimmed.strip_prefix("acl ") {
        return rest.strip_prefix(id).is_some_and(|r| r.starts_with([' ', '\t']));
    }
    if let Some(rest) = trimmed.strip_prefix("use_backend ") {
        return rest
            .strip_prefix(id)
            .is_some_and(|r| r.is_empty() || r.starts_with([' ', '\t']));
    }
    false
}

/// Byte range of ` crt <cert>` in `body`, matched as whole tokens.
fn find_cert(body: &str, cert: &str) -> Option<std::ops::Range<usize>> {
    let needle = format!(" crt {cert}");
    let mut from = 0;
    while let Some(pos) = body[from..].find(&needle) {
        let start = from + pos;
        let end = start + needle.len();
        if body[end..].is_empty() || body[end..].starts_with([' ', '\t']) {
            return Some(start..end);
        }
        from = start + 1;
    }
    None
}

fn patch_tls_bind(body: &str, eol: &str, cert: Option<&str>, change: &RouteChange) -> String {
    let Some(cert) = cert else {
        return format!("{body}{eol}");
    };
    let found = find_cert(body, cert);
    match (change, found) {
        (RouteChange::Add { .. }, None) => format!("{body} crt {cert}{eol}"),
        (RouteChange::Remove, Some(range)) => {
            let mut stripped = String::with_capacity(body.len());
            stripped.push_str(&body[..range.start]);
            stripped.push_str(&body[range.end..]);
            // Our certificate was the only one: the whole binding goes.
            if stripped.trim() == TLS_BIND {
                String::new()
            } else {
                format!("{stripped}{eol}")
            }
        }
        _ => format!("{body}{eol}"),
    }
}

fn push_backend(out: &mut String, id: &str, server: &str, port: u16) {
    out.push_str(&format!("backend {id}\n"));
    out.push_str("\toption httpclose\n");
    out.push_str("\toption forwardfor\n");
    out.push_str("\thttp-request set-header X-Forwarded-Port %[dst_port]\n");
    out.push_str("\thttp-request add-header X-Forwarded-Proto https if { ssl_fc }\n");
    out.push_str(&format!(
        "\tserver {server} 127.0.0.1:{port} check fall 3 rise 2\n"
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CERT: &str = "/etc/ssl/example.com/blog.example.com.pem";

    const BASE: &str = "\
global
\tlog /dev/log local0

defaults
\tmode http

frontend http
\tbind *:80
\tbind *:443 ssl crt /etc/ssl/example.com/example.com.pem
\t# SERVICES
\tacl example-com req.hdr(Host) example.com
\tuse_backend example-com if example-com
\t# END OF SERVICES
\tdefault_backend fallback

# SERVICES
backend example-com
\tserver Webserver 127.0.0.1:8000 check fall 3 rise 2
# END OF SERVICES

backend fallback
\tserver local 127.0.0.1:8080
";

    fn blog(certificate: Option<&'static str>) -> Route<'static> {
        Route {
            id: "blog-example-com",
            host: "blog.example.com",
            certificate,
        }
    }

    fn add() -> RouteChange {
        RouteChange::Add {
            server: "WordPress".to_string(),
            port: 4242,
        }
    }

    #[test]
    fn add_generates_all_rules() {
        let out = rewrite(BASE, &blog(Some(CERT)), &add());

        assert!(out.contains(&format!(
            "\tbind *:443 ssl crt /etc/ssl/example.com/example.com.pem crt {CERT}\n"
        )));
        assert!(out.contains(
            "\tuse_backend example-com if example-com\n\
             \tacl blog-example-com req.hdr(Host) blog.example.com\n\
             \tuse_backend blog-example-com if blog-example-com\n\
             \t# END OF SERVICES\n"
        ));
        assert!(out.contains(
            "backend blog-example-com\n\
             \toption httpclose\n\
             \toption forwardfor\n\
             \thttp-request set-header X-Forwarded-Port %[dst_port]\n\
             \thttp-request add-header X-Forwarded-Proto https if { ssl_fc }\n\
             \tserver WordPress 127.0.0.1:4242 check fall 3 rise 2\n\
             # END OF SERVICES\n"
        ));
        assert_eq!(
            backend_names(&out),
            vec!["example-com", "blog-example-com", "fallback"]
        );
        assert_eq!(
            backend_target(&out, "blog-example-com"),
            Some("127.0.0.1:4242")
        );
    }

    #[test]
    fn add_replaces_a_stale_backend() {
        let once = rewrite(BASE, &blog(None), &add());
        let moved = rewrite(
            &once,
            &blog(None),
            &RouteChange::Add {
                server: "WordPress".to_string(),
                port: 5000,
            },
        );
        assert_eq!(backend_target(&moved, "blog-example-com"), Some("127.0.0.1:5000"));
        let sections = backend_names(&moved)
            .into_iter()
            .filter(|name| *name == "blog-example-com")
            .count();
        assert_eq!(sections, 1);
        assert_eq!(moved.matches("use_backend blog-example-com ").count(), 1);
        assert_eq!(moved.matches("acl blog-example-com ").count(), 1);
    }

    #[test]
    fn tls_bind_is_inserted_when_missing() {
        let text = "frontend http\n\tbind *:80\n\t# SERVICES\n\t# END OF SERVICES\n";
        let out = rewrite(text, &blog(Some(CERT)), &add());
        assert!(out.starts_with(&format!(
            "frontend http\n\tbind *:80\n\tbind *:443 ssl crt {CERT}\n\t# SERVICES\n"
        )));

        let back = rewrite(&out, &blog(Some(CERT)), &RouteChange::Remove);
        assert_eq!(back, text);
    }

    #[test]
    fn remove_keeps_other_certificates() {
        let text = format!(
            "frontend http\n\tbind *:80\n\tbind *:443 ssl crt {CERT} crt /other.pem\n"
        );
        let out = rewrite(&text, &blog(Some(CERT)), &RouteChange::Remove);
        assert_eq!(out, "frontend http\n\tbind *:80\n\tbind *:443 ssl crt /other.pem\n");
    }

    #[test]
    fn certificate_prefix_is_not_a_match() {
        let text = format!("frontend http\n\tbind *:80\n\tbind *:443 ssl crt {CERT}.old\n");
        let out = rewrite(&text, &blog(Some(CERT)), &RouteChange::Remove);
        assert_eq!(out, text);
    }

    #[test]
    fn similar_rule_names_are_left_alone() {
        let text = "\
frontend http
\tbind *:80
\t# SERVICES
\tacl blog-example-com-old req.hdr(Host) old.blog.example.com
\tuse_backend blog-example-com-old if blog-example-com-old
\t# END OF SERVICES
# SERVICES
backend blog-example-com-old
\tserver s 127.0.0.1:1
# END OF SERVICES
";
        assert_eq!(rewrite(text, &blog(None), &RouteChange::Remove), text);
    }

    #[test]
    fn other_frontends_are_not_patched() {
        let text = "frontend stats\n\tbind *:80\n\t# SERVICES\n\t# END OF SERVICES\n";
        assert_eq!(rewrite(text, &blog(Some(CERT)), &add()), text);
    }

    #[test]
    fn closing_sentinel_ends_a_matching_backend() {
        let text = "\
# SERVICES
backend blog-example-com
\tserver WordPress 127.0.0.1:1 check fall 3 rise 2
# END OF SERVICES
backend fallback
";
        let out = rewrite(text, &blog(None), &RouteChange::Remove);
        assert_eq!(out, "# SERVICES\n# END OF SERVICES\nbackend fallback\n");
    }

    #[test]
    fn crlf_lines_survive() {
        let text = "frontend http\r\n\tbind *:80\r\n\tbind *:443 ssl crt /a.pem\r\n";
        let out = rewrite(text, &blog(Some(CERT)), &add());
        assert_eq!(
            out,
            format!("frontend http\r\n\tbind *:80\r\n\tbind *:443 ssl crt /a.pem crt {CERT}\r\n")
        );
        assert_eq!(rewrite(&out, &blog(Some(CERT)), &RouteChange::Remove), text);
    }

    fn other_id() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z]{1,8}-example-com",
            "blog-example-com-[a-z]{1,3}",
            Just("blog".to_string()),
        ]
    }

    fn build_config(ids: &std::collections::BTreeSet<String>, certs: &[String], stats: bool) -> String {
        let mut text = String::from("global\n\tlog /dev/log local0\n\ndefaults\n\tmode http\n\n");
        text.push_str("frontend http\n\tbind *:80\n");
        if !certs.is_empty() {
            text.push_str("\tbind *:443 ssl");
            for cert in certs {
                text.push_str(&format!(" crt {cert}"));
            }
            text.push('\n');
        }
        text.push_str("\t# SERVICES\n");
        for id in ids {
            text.push_str(&format!("\tacl {id} req.hdr(Host) {id}\n\tuse_backend {id} if {id}\n"));
        }
        text.push_str("\t# END OF SERVICES\n\tdefault_backend fallback\n");
        if stats {
            text.push_str("\nfrontend stats\n\tbind *:8404\n\tstats enable\n");
        }
        text.push_str("\n# SERVICES\n");
        for id in ids {
            text.push_str(&format!("backend {id}\n\tserver s 127.0.0.1:9000 check\n"));
        }
        text.push_str("# END OF SERVICES\n\nbackend fallback\n\tserver local 127.0.0.1:8080\n");
        text
    }

    fn config() -> impl Strategy<Value = String> {
        (
            proptest::collection::btree_set(other_id(), 0..4),
            proptest::collection::vec("/etc/ssl/[a-z]{1,6}\\.pem", 0..3),
            any::<bool>(),
        )
            .prop_map(|(ids, certs, stats)| build_config(&ids, &certs, stats))
    }

    proptest! {
        #[test]
        fn add_is_idempotent(text in config(), with_cert in any::<bool>()) {
            let route = blog(with_cert.then_some(CERT));
            let once = rewrite(&text, &route, &add());
            let twice = rewrite(&once, &route, &add());
            prop_assert_eq!(twice, once);
        }

        #[test]
        fn remove_undoes_add(text in config(), with_cert in any::<bool>()) {
            let route = blog(with_cert.then_some(CERT));
            let added = rewrite(&text, &route, &add());
            prop_assert_eq!(rewrite(&added, &route, &RouteChange::Remove), text);
        }

        #[test]
        fn remove_of_absent_route_is_identity(text in config()) {
            prop_assert_eq!(rewrite(&text, &blog(Some(CERT)), &RouteChange::Remove), text.clone());
        }
    }
}
