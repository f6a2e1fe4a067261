// src/checker/local.rs
// =============================================================================
// Checks that never leave the machine.
//
// - Local / Resource: does the target exist relative to the document, and
//   does the `#fragment` name a heading of the target document?
// - Mail: does the address look like an address?
// - CrossReference / Tab: docfx syntaxes, checked against the registry or
//   for shape only
// - Empty / Unrecognized: always reported
//
// All of these are effectively synchronous: a `stat` at most.
// =============================================================================

use std::path::{Component, Path, PathBuf};

use super::classify::ClassifiedLink;
use super::context::ValidationContext;
use super::engine::LinkOutcome;
use crate::config::{has_extension, XrefPolicy};
use crate::report::{Finding, Severity};

fn failed(link: &ClassifiedLink, severity: Severity, message: String) -> LinkOutcome {
    LinkOutcome::Failed(Finding::new(
        &link.link.file,
        link.link.line,
        link.link.column,
        severity,
        message,
    ))
}

pub(super) fn check_empty(link: &ClassifiedLink) -> LinkOutcome {
    failed(link, Severity::Warning, "empty link".to_string())
}

pub(super) fn check_unrecognized(link: &ClassifiedLink) -> LinkOutcome {
    failed(
        link,
        Severity::Suggestion,
        format!("unrecognized link syntax: {}", link.link.raw),
    )
}

pub(super) fn check_local(context: &ValidationContext, link: &ClassifiedLink) -> LinkOutcome {
    let target = resolve_target(&link.link.file, &link.target);
    if !context.root.join(&target).exists() {
        return failed(
            link,
            Severity::Error,
            format!("file not found: {}", link.target),
        );
    }

    if let Some(fragment) = &link.fragment {
        // Only documents have headings; `code.rs#L10` style fragments are left alone
        let is_document =
            link.target.is_empty() || has_extension(&target, &context.document_extensions);
        if is_document
            && context.headings.knows(&target)
            && !context.headings.contains(&target, fragment)
        {
            return failed(
                link,
                Severity::Warning,
                format!("anchor #{} not found in {}", fragment, target.display()),
            );
        }
    }

    LinkOutcome::Resolved { resource: None }
}

pub(super) fn check_resource(context: &ValidationContext, link: &ClassifiedLink) -> LinkOutcome {
    let target = resolve_target(&link.link.file, &link.target);
    if !context.root.join(&target).is_file() {
        return failed(
            link,
            Severity::Error,
            format!("resource not found: {}", link.target),
        );
    }
    LinkOutcome::Resolved {
        resource: Some(target),
    }
}

pub(super) fn check_mail(link: &ClassifiedLink) -> LinkOutcome {
    // `mailto:a@x.com,b@y.com?subject=...`
    let addresses = link.target.split('?').next().unwrap_or_default();
    if addresses.trim().is_empty() {
        return failed(link, Severity::Warning, "mail link has no address".to_string());
    }

    match addresses.split(',').map(str::trim).find(|a| !is_mail_address(a)) {
        Some(bad) => failed(
            link,
            Severity::Warning,
            format!("malformed mail address: {}", bad),
        ),
        None => LinkOutcome::Resolved { resource: None },
    }
}

pub(super) fn check_xref(context: &ValidationContext, link: &ClassifiedLink) -> LinkOutcome {
    if context.xrefs.policy() == XrefPolicy::Accept {
        return LinkOutcome::Resolved { resource: None };
    }
    if link.target.is_empty() {
        return failed(link, Severity::Warning, "cross-reference has no uid".to_string());
    }
    if !context.xrefs.contains(&link.target) {
        return failed(
            link,
            Severity::Warning,
            format!("unknown cross-reference uid: {}", link.target),
        );
    }
    LinkOutcome::Resolved { resource: None }
}

// `#tab/<id>[/<condition>]`
pub(super) fn check_tab(link: &ClassifiedLink) -> LinkOutcome {
    let id = link.target.split('/').next().unwrap_or_default();
    if id.trim().is_empty() {
        return failed(link, Severity::Suggestion, "tab link has no tab id".to_string());
    }
    LinkOutcome::Resolved { resource: None }
}

// Resolves a link target against the document that contains it
//
// Both `document` and the result are relative to the root. `/x` is taken
// from the root, an empty target is the document itself.
pub fn resolve_target(document: &Path, target: &str) -> PathBuf {
    if target.is_empty() {
        return document.to_path_buf();
    }

    let joined = match target.strip_prefix('/') {
        Some(from_root) => PathBuf::from(from_root),
        None => document.parent().unwrap_or(Path::new("")).join(target),
    };
    normalize_path(&joined)
}

// Collapses `.` and `..` without touching the filesystem; leading `..` that
// can't be popped are kept
fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                _ => components.push(component),
            },
            other => components.push(other),
        }
    }
    components.iter().collect()
}

// local@domain.tld, no blanks, a single `@`, no empty domain labels
fn is_mail_address(address: &str) -> bool {
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !address.chars().any(char::is_whitespace)
        && !domain.contains('@')
        && domain.contains('.')
        && domain
            .split('.')
            .all(|label| {
                !label.is_empty() && label.chars().all(|c| c.is_alphanumeric() || c == '-')
            })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::anchors::HeadingIndex;
    use crate::checker::classify::{ClassifyOptions, LinkKind};
    use crate::checker::context::XrefRegistry;
    use crate::config::Config;
    use crate::crawl::CrawledDocument;
    use crate::document::{Heading, Hyperlink, LinkOrigin};
    use std::fs;

    fn link(file: &str, raw: &str) -> ClassifiedLink {
        ClassifiedLink::new(
            Hyperlink {
                file: PathBuf::from(file),
                line: 3,
                column: 7,
                raw: raw.to_string(),
                origin: LinkOrigin::Inline,
            },
            &ClassifyOptions::from(&Config::default()),
        )
    }

    fn context(root: &Path, policy: XrefPolicy) -> ValidationContext {
        let documents = vec![CrawledDocument {
            path: PathBuf::from("guide/setup.md"),
            links: Vec::new(),
            headings: vec![Heading {
                file: PathBuf::from("guide/setup.md"),
                line: 1,
                column: 1,
                title: "Install".to_string(),
                id: None,
            }],
            uid: None,
        }];
        ValidationContext {
            root: root.to_path_buf(),
            document_extensions: vec!["md".to_string()],
            headings: HeadingIndex::build(&documents),
            xrefs: XrefRegistry::new(policy, vec!["guide.setup".to_string()]),
            skip_urls: Vec::new(),
            http: None,
        }
    }

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("guide/.attachments")).unwrap();
        fs::write(dir.path().join("guide/setup.md"), "# Install\n").unwrap();
        fs::write(dir.path().join("guide/.attachments/shot.png"), b"png").unwrap();
        fs::write(dir.path().join("index.md"), "").unwrap();
        dir
    }

    fn finding(outcome: LinkOutcome) -> Finding {
        match outcome {
            LinkOutcome::Failed(finding) => finding,
            LinkOutcome::Resolved { .. } => panic!("expected a finding"),
        }
    }

    #[test]
    fn test_resolve_target() {
        let cases = [
            ("a/b/c.md", "../d.md", "a/d.md"),
            ("a/c.md", "./x/./y.md", "a/x/y.md"),
            ("a/c.md", "/top.md", "top.md"),
            ("c.md", "../../out.md", "../../out.md"),
            ("a/c.md", "", "a/c.md"),
        ];
        for (document, target, expected) in cases {
            assert_eq!(
                resolve_target(Path::new(document), target),
                PathBuf::from(expected),
                "{} from {}",
                target,
                document
            );
        }
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tree();
        let ctx = context(dir.path(), XrefPolicy::Accept);
        let f = finding(check_local(&ctx, &link("index.md", "./missing.md")));
        assert_eq!(f.severity, Severity::Error);
        assert_eq!((f.line, f.column), (3, 7));
        assert_eq!(f.message, "file not found: ./missing.md");
    }

    #[test]
    fn test_anchor_checks() {
        let dir = tree();
        let ctx = context(dir.path(), XrefPolicy::Accept);

        let ok = check_local(&ctx, &link("index.md", "guide/setup.md#install"));
        assert_eq!(ok, LinkOutcome::Resolved { resource: None });

        let f = finding(check_local(&ctx, &link("index.md", "guide/setup.md#section")));
        assert_eq!(f.severity, Severity::Warning);
        assert_eq!(f.message, "anchor #section not found in guide/setup.md");

        // Same-document anchor
        let f = finding(check_local(&ctx, &link("guide/setup.md", "#nope")));
        assert_eq!(f.severity, Severity::Warning);
        let ok = check_local(&ctx, &link("guide/setup.md", "#Install"));
        assert_eq!(ok, LinkOutcome::Resolved { resource: None });
    }

    #[test]
    fn test_resource_is_recorded() {
        let dir = tree();
        let ctx = context(dir.path(), XrefPolicy::Accept);
        let l = link("guide/setup.md", ".attachments/shot.png");
        assert_eq!(l.kind, LinkKind::Resource);
        assert_eq!(
            check_resource(&ctx, &l),
            LinkOutcome::Resolved {
                resource: Some(PathBuf::from("guide/.attachments/shot.png"))
            }
        );

        let f = finding(check_resource(&ctx, &link("index.md", "gone.png")));
        assert_eq!(f.severity, Severity::Error);
    }

    #[test]
    fn test_mail_addresses() {
        assert!(matches!(
            check_mail(&link("a.md", "mailto:docs@example.com?subject=Hi")),
            LinkOutcome::Resolved { .. }
        ));
        assert!(matches!(
            check_mail(&link("a.md", "mailto:a@example.com, b@example.org")),
            LinkOutcome::Resolved { .. }
        ));
        let malformed = [
            "mailto:",
            "mailto:nobody",
            "mailto:a@b",
            "mailto:a@@b.com",
            "mailto:a b@c.com",
        ];
        for bad in malformed {
            let f = finding(check_mail(&link("a.md", bad)));
            assert_eq!(f.severity, Severity::Warning, "{}", bad);
        }
    }

    #[test]
    fn test_xref_policy() {
        let dir = tree();
        let accept = context(dir.path(), XrefPolicy::Accept);
        assert!(matches!(
            check_xref(&accept, &link("a.md", "xref:anything")),
            LinkOutcome::Resolved { .. }
        ));

        let verify = context(dir.path(), XrefPolicy::Verify);
        assert!(matches!(
            check_xref(&verify, &link("a.md", "xref:guide.setup")),
            LinkOutcome::Resolved { .. }
        ));
        let f = finding(check_xref(&verify, &link("a.md", "xref:Unknown.Type")));
        assert_eq!(f.message, "unknown cross-reference uid: Unknown.Type");
    }

    #[test]
    fn test_tabs_empty_and_unrecognized() {
        assert!(matches!(check_tab(&link("a.md", "#tab/linux")), LinkOutcome::Resolved { .. }));
        assert_eq!(finding(check_tab(&link("a.md", "#tab/"))).severity, Severity::Suggestion);
        assert_eq!(finding(check_empty(&link("a.md", ""))).message, "empty link");
        assert_eq!(
            finding(check_unrecognized(&link("a.md", "tel:123"))).severity,
            Severity::Suggestion
        );
    }
}
