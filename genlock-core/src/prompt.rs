//! Prompt payload handed to the runner.
//!
//! The payload is a small tagged envelope:
//!
//! ```text
//! <prompt>
//! Update the docs.
//! </prompt>
//! <changed_files>
//! src/a.md
//! </changed_files>
//! <removed_files>
//! src/b.md
//! </removed_files>
//! ```
//!
//! `<removed_files>` only appears when something was removed.

/// Fields recovered from an assembled payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPayload {
    pub prompt: String,
    pub changed_files: Vec<String>,
    pub removed_files: Vec<String>,
}

pub fn assemble_prompt(prompt: &str, changed_files: &[String], removed_files: &[String]) -> String {
    let mut out = String::new();
    push_block(&mut out, "prompt", std::iter::once(prompt.trim_end()));
    push_block(&mut out, "changed_files", changed_files.iter().map(String::as_str));
    if !removed_files.is_empty() {
        push_block(&mut out, "removed_files", removed_files.iter().map(String::as_str));
    }
    out
}

fn push_block<'a>(out: &mut String, tag: &str, lines: impl Iterator<Item = &'a str>) {
    out.push('<');
    out.push_str(tag);
    out.push_str(">\n");
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("</");
    out.push_str(tag);
    out.push_str(">\n");
}

/// Recovers the fields of a payload built by [`assemble_prompt`].
///
/// Blocks are peeled off from the end, so the free-form prompt text may
/// contain any of the tags without confusing the file lists.
pub fn parse_prompt(payload: &str) -> Option<PromptPayload> {
    let body = payload.strip_prefix("<prompt>\n")?;

    let (rest, removed_files) = match body.strip_suffix("</removed_files>\n") {
        Some(head) => {
            let (head, list) = split_last_block(head, "removed_files")?;
            (head, lines(list))
        }
        None => (body, Vec::new()),
    };

    let rest = rest.strip_suffix("</changed_files>\n")?;
    let (rest, changed) = split_last_block(rest, "changed_files")?;
    let prompt = rest.strip_suffix("</prompt>\n")?;

    Some(PromptPayload {
        prompt: prompt.trim_end_matches('\n').to_string(),
        changed_files: lines(changed),
        removed_files,
    })
}

/// Splits at the last line that is exactly `<tag>`, keeping the newline
/// that ends the preceding line on the left side.
fn split_last_block<'a>(text: &'a str, tag: &str) -> Option<(&'a str, &'a str)> {
    let open = format!("\n<{}>\n", tag);
    let at = text.rfind(&open)?;
    Some((&text[..at + 1], &text[at + open.len()..]))
}

fn lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
