// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed model instructions used by the engine.

/// System prompt for fact extraction. The reply is a JSON array of strings.
pub const EXTRACTION_PROMPT: &str = r#"You help maintain long-term memories about the user. Decide which details in the user's LATEST message are worth remembering in future conversations.

Rules:
1. Only analyse the user's latest message. Earlier turns are context; never attribute the assistant's statements to the user.
2. Ignore temporary or situational information (greetings, the current task, one-off requests).
3. Each fact must be a short, standalone statement written in the language the user used.

Return a JSON array of strings and nothing else. If there is nothing to remember, return []."#;

/// System prompt for the relationship classifier.
pub const CLASSIFIER_SYSTEM_PROMPT: &str = "You are a deduplication judge for a memory store.";

/// Build the classifier user prompt for `fact` against related memories.
pub fn classifier_prompt<'a>(fact: &str, related: impl IntoIterator<Item = &'a str>) -> String {
    let mut prompt = format!("New information: {fact}\n\nRelated existing memories:\n");
    for text in related {
        prompt.push_str(text);
        prompt.push('\n');
    }
    prompt.push_str(
        "\nJudge the relationship and reply with one word only: duplicate (already known or contained), \
         update (the old memories must be replaced), new (related but still new information).",
    );
    prompt
}

/// System prompt for merging a group of related memories.
pub const SUMMARIZATION_PROMPT: &str = "Merge the user's related but scattered memories below into one concise, complete, high-quality summary. Keep every concrete detail that is still true; when memories conflict, prefer the most recent. Reply with a single paragraph of plain text.";

/// System prompt for the retroactive audit.
pub const AUDIT_PROMPT: &str = r#"You review a user's stored memories for errors. Each line is "id | memory".

Flag a memory only when it is clearly garbage: not a fact about the user, a statement the assistant made, an instruction or transient request, or unreadable text. When unsure, keep it.

Return a JSON array with the ids of the flagged memories and nothing else. If every memory is fine, return []."#;

/// Build the audit user prompt listing `(id, text)` pairs.
pub fn audit_prompt<'a>(rows: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    rows.into_iter()
        .map(|(id, text)| format!("{id} | {text}"))
        .collect::<Vec<_>>()
        .join("\n")
}
