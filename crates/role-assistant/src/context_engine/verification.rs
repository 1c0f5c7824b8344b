//! Parsing of the verifier's tagged reply

/// Tag the verifier emits when the answer matches the context.
pub const VERIFIED_TAG: &str = "VERIFIED:";
/// Tag the verifier emits when it rewrote the answer.
pub const CORRECTED_TAG: &str = "CORRECTED:";
/// End-of-reply marker the verifier appends.
pub const SENTINEL: &str = "TERMINATE";

/// Decision extracted from the verifier's raw reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified(String),
    Corrected(String),
    /// Neither tag was present. Degraded, but still returned to the caller.
    Unparsed(String),
}

impl VerificationOutcome {
    /// Case-sensitive substring search: `VERIFIED:` wins over `CORRECTED:`,
    /// text after the first occurrence of the tag is kept.
    pub fn parse(raw: &str) -> Self {
        if let Some(text) = text_after_tag(raw, VERIFIED_TAG) {
            VerificationOutcome::Verified(text)
        } else if let Some(text) = text_after_tag(raw, CORRECTED_TAG) {
            VerificationOutcome::Corrected(text)
        } else {
            VerificationOutcome::Unparsed(raw.trim().to_string())
        }
    }

    pub fn text(&self) -> &str {
        match self {
            VerificationOutcome::Verified(text)
            | VerificationOutcome::Corrected(text)
            | VerificationOutcome::Unparsed(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            VerificationOutcome::Verified(text)
            | VerificationOutcome::Corrected(text)
            | VerificationOutcome::Unparsed(text) => text,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VerificationOutcome::Verified(_) => "verified",
            VerificationOutcome::Corrected(_) => "corrected",
            VerificationOutcome::Unparsed(_) => "unparsed",
        }
    }
}

fn text_after_tag(raw: &str, tag: &str) -> Option<String> {
    raw.find(tag)
        .map(|start| cut_at_sentinel(&raw[start + tag.len()..]).trim().to_string())
}

/// Truncate at the first `TERMINATE` that stands alone as a word. Occurrences
/// inside longer words (`TERMINATED`, `TERMINATE_CONTRACTS`) are content.
fn cut_at_sentinel(text: &str) -> &str {
    let standalone = text.match_indices(SENTINEL).find(|(at, _)| {
        let before = text[..*at].chars().next_back();
        let after = text[at + SENTINEL.len()..].chars().next();
        before.map_or(true, char::is_whitespace) && after.map_or(true, char::is_whitespace)
    });
    match standalone {
        Some((at, _)) => &text[..at],
        None => text,
    }
}
