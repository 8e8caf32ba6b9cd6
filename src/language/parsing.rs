//! Pure string-parsing helpers for extracting fenced `action` blocks
//! from LLM replies.
//!
//! These utilities are provider-agnostic and operate entirely on the
//! text content of a model response.  They are used by the strict
//! [`JsonActionLanguage`](super::JsonActionLanguage) and by tests to
//! validate parsing behaviour.

/// Opening fence token, exactly as the instruction template requests it.
const OPEN_FENCE: &str = "```action";
/// Closing fence; the *last* occurrence after the opening token wins.
const CLOSE_FENCE: &str = "```";

/// Extract the content strictly between the first ```` ```action ````
/// marker and the last ```` ``` ```` after it, trimmed.
///
/// Errors when the opening marker is absent or no closing fence
/// follows it — a reply without a well-formed block is a hard parse
/// failure for the strict language.
pub fn extract_action_block(reply: &str) -> anyhow::Result<String> {
    let start = reply
        .find(OPEN_FENCE)
        .ok_or_else(|| anyhow::anyhow!("no ```action block in response"))?;
    let inner_start = start + OPEN_FENCE.len();

    let end = reply
        .rfind(CLOSE_FENCE)
        .filter(|&end| end >= inner_start)
        .ok_or_else(|| anyhow::anyhow!("unterminated ```action block in response"))?;

    Ok(reply[inner_start..end].trim().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_action_block() {
        let input = "```action\n{\"tool\": \"terminate\", \"args\": {\"message\": \"done\"}}\n```";
        let result = extract_action_block(input).unwrap();
        assert_eq!(result, "{\"tool\": \"terminate\", \"args\": {\"message\": \"done\"}}");
    }

    #[test]
    fn thoughts_before_the_block_are_ignored() {
        let input = "Let me think about this.\nThe file looks relevant.\n\n```action\n{\"tool\": \"read_file\", \"args\": {\"path\": \"a.txt\"}}\n```";
        let result = extract_action_block(input).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["tool"], "read_file");
    }

    #[test]
    fn last_closing_fence_wins() {
        // A code block inside the action args must not end extraction early.
        let input = "```action\n{\"tool\": \"terminate\", \"args\": {\"message\": \"use ```rust``` fences\"}}\n```";
        let result = extract_action_block(input).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["args"]["message"], "use ```rust``` fences");
    }

    #[test]
    fn missing_open_marker_is_an_error() {
        assert!(extract_action_block("just plain text").is_err());
        // A bare ```json fence is not an action block.
        assert!(extract_action_block("```json\n{}\n```").is_err());
    }

    #[test]
    fn unterminated_block_is_an_error() {
        assert!(extract_action_block("```action\n{\"tool\": \"x\"}").is_err());
    }
}
