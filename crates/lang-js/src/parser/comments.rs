//! Comment blocks preceding a source position.
//!
//! Works on the `comment` nodes of the syntax tree: starting at a byte
//! offset, it walks back over the comments separated from it by whitespace
//! only. Adjacent whole-line comments (`// ...`) on consecutive lines count
//! as one block.

use tree_sitter::Node;

/// Comment blocks immediately before `offset`, in source order. The last
/// element is the block nearest to `offset`.
pub fn comments_before(root: Node, text: &str, offset: usize) -> Vec<String> {
    let mut candidates = Vec::new();
    collect_comments(root, offset, &mut candidates);

    let mut blocks: Vec<Vec<Node>> = Vec::new();
    let mut end = offset.min(text.len());
    for comment in candidates.into_iter().rev() {
        let Some(gap) = text.get(comment.end_byte()..end) else {
            break;
        };
        if !gap.trim().is_empty() {
            break;
        }
        let line_comment = is_line_comment(&comment, text);
        if line_comment && !starts_line(&comment, text) {
            break;
        }

        let joins_previous = line_comment
            && gap.matches('\n').count() == 1
            && blocks
                .last()
                .and_then(|block| block.first())
                .is_some_and(|next| is_line_comment(next, text));
        match blocks.last_mut() {
            Some(block) if joins_previous => block.insert(0, comment),
            _ => blocks.push(vec![comment]),
        }
        end = comment.start_byte();
    }

    blocks.reverse();
    blocks
        .iter()
        .filter_map(|block| {
            let lines: Option<Vec<&str>> = block
                .iter()
                .map(|comment| comment.utf8_text(text.as_bytes()).ok().map(str::trim_end))
                .collect();
            lines.map(|lines| lines.join("\n"))
        })
        .collect()
}

fn collect_comments<'t>(node: Node<'t>, offset: usize, found: &mut Vec<Node<'t>>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.start_byte() >= offset {
            break;
        }
        if child.kind() == "comment" {
            if child.end_byte() <= offset {
                found.push(child);
            }
        } else {
            collect_comments(child, offset, found);
        }
    }
}

fn is_line_comment(comment: &Node, text: &str) -> bool {
    text.get(comment.start_byte()..)
        .is_some_and(|rest| rest.starts_with("//"))
}

/// Only whitespace between the start of the line and the comment.
fn starts_line(comment: &Node, text: &str) -> bool {
    let start = comment.start_byte();
    let line_start = text[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    text[line_start..start].trim().is_empty()
}
