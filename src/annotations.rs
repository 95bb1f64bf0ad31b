//! Recognizes the `@kernel` / `@vertex` / `@fragment` / `@device` /
//! `@workgroup_size` doc-comment tags attached to a function declaration
//! (§3, §6).

use swc_common::BytePos;
use swc_common::comments::{Comments, SingleThreadedComments};

use crate::diagnostics::Diagnostic;
use crate::types::StageKind;

/// The classification read from a function's leading doc comment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Annotation {
    Stage(StageKind),
    Device,
}

/// Look at the comments immediately preceding `pos` (a function
/// declaration's start) and return its annotation, if any.
///
/// A function may carry at most one of kernel/vertex/fragment/device; if
/// more than one tag is present the first one encountered wins, matching
/// invariant 1's "exactly one applies" by construction rather than by a
/// separate conflict check (an author writing two is already violating
/// the one documented tag they're expected to use).
pub fn function_annotation(comments: &SingleThreadedComments, pos: BytePos) -> Option<Annotation> {
    let leading = comments.get_leading(pos)?;
    for comment in leading.iter() {
        for line in comment.text.lines() {
            let line = line.trim_start_matches(['*', ' ', '\t']).trim();
            if let Some(tag) = line.strip_prefix('@') {
                match tag.split_whitespace().next().unwrap_or("") {
                    "kernel" => return Some(Annotation::Stage(StageKind::Kernel)),
                    "vertex" => return Some(Annotation::Stage(StageKind::Vertex)),
                    "fragment" => return Some(Annotation::Stage(StageKind::Fragment)),
                    "device" => return Some(Annotation::Device),
                    _ => {}
                }
            }
        }
    }
    None
}

/// Parse an optional `@workgroup_size` override from the same leading
/// comment block. Accepts `N, M, K` with or without surrounding
/// parentheses; 1 to 3 positive integers.
///
/// Returns `Ok(None)` when no tag is present, `Ok(Some(dims))` on a valid
/// tag, and `Err(diagnostic)` when the tag is present but malformed (the
/// default workgroup size of 64 is used by the caller in that case).
pub fn workgroup_size_override(
    comments: &SingleThreadedComments,
    pos: BytePos,
    function_name: &str,
) -> Result<Option<Vec<u32>>, Diagnostic> {
    let Some(leading) = comments.get_leading(pos) else {
        return Ok(None);
    };
    for comment in leading.iter() {
        for line in comment.text.lines() {
            let line = line.trim_start_matches(['*', ' ', '\t']).trim();
            if let Some(rest) = line.strip_prefix("@workgroup_size") {
                let rest = rest.trim();
                let inner = rest
                    .strip_prefix('(')
                    .and_then(|s| s.strip_suffix(')'))
                    .unwrap_or(rest);
                let dims: Option<Vec<u32>> = inner
                    .split(',')
                    .map(|part| part.trim().parse::<u32>().ok())
                    .collect();
                return match dims {
                    Some(dims) if !dims.is_empty() && dims.len() <= 3 && dims.iter().all(|d| *d > 0) => {
                        Ok(Some(dims))
                    }
                    _ => Err(Diagnostic::MalformedWorkgroupCount {
                        function: function_name.to_string(),
                    }),
                };
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_common::DUMMY_SP;
    use swc_common::comments::{Comment, CommentKind};

    fn comments_with(text: &str, pos: BytePos) -> SingleThreadedComments {
        let comments = SingleThreadedComments::default();
        comments.add_leading(
            pos,
            Comment {
                kind: CommentKind::Block,
                span: DUMMY_SP,
                text: text.into(),
            },
        );
        comments
    }

    #[test]
    fn recognizes_kernel_tag() {
        let pos = BytePos(10);
        let comments = comments_with("*\n * @kernel\n ", pos);
        assert_eq!(
            function_annotation(&comments, pos),
            Some(Annotation::Stage(StageKind::Kernel))
        );
    }

    #[test]
    fn recognizes_device_tag() {
        let pos = BytePos(20);
        let comments = comments_with("* @device", pos);
        assert_eq!(function_annotation(&comments, pos), Some(Annotation::Device));
    }

    #[test]
    fn no_tag_returns_none() {
        let pos = BytePos(30);
        let comments = comments_with("* just a note", pos);
        assert_eq!(function_annotation(&comments, pos), None);
    }

    #[test]
    fn parses_parenthesized_workgroup_size() {
        let pos = BytePos(40);
        let comments = comments_with("* @kernel\n * @workgroup_size(8, 8, 1)", pos);
        assert_eq!(
            workgroup_size_override(&comments, pos, "f"),
            Ok(Some(vec![8, 8, 1]))
        );
    }

    #[test]
    fn parses_bare_workgroup_size() {
        let pos = BytePos(50);
        let comments = comments_with("* @workgroup_size 16, 16", pos);
        assert_eq!(
            workgroup_size_override(&comments, pos, "f"),
            Ok(Some(vec![16, 16]))
        );
    }

    #[test]
    fn malformed_workgroup_size_is_a_diagnostic() {
        let pos = BytePos(60);
        let comments = comments_with("* @workgroup_size(a, b)", pos);
        assert_eq!(
            workgroup_size_override(&comments, pos, "f"),
            Err(Diagnostic::MalformedWorkgroupCount {
                function: "f".to_string()
            })
        );
    }

    #[test]
    fn absent_tag_is_ok_none() {
        let pos = BytePos(70);
        let comments = comments_with("* @kernel", pos);
        assert_eq!(workgroup_size_override(&comments, pos, "f"), Ok(None));
    }
}
