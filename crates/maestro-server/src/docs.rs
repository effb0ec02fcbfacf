//! Static documentation served by `get_adk_documentation`.

/// Topic name and body pairs. Kept in source so the tool works offline.
const TOPICS: &[(&str, &str)] = &[
    (
        "agents",
        "Agents are named definitions with a system instruction, a model id, \
         and a list of tool bindings. Create one with create_adk_agent, then \
         send it messages with run_adk_agent. Pass a session_id to continue a \
         conversation; omit it to start a fresh session.",
    ),
    (
        "tools",
        "Agents use tools through bindings. Built-in bindings name tools the \
         server ships (search_web, load_webpage_content). Proxied bindings \
         reference tools on an external server attached with \
         add_mcp_tools_to_agent. list_available_tools shows everything \
         currently bindable.",
    ),
    (
        "multi_agent",
        "create_multi_agent_system registers a coordinator whose tools are \
         other agents. The coordinator's model decides when to delegate; each \
         delegation runs the sub-agent in its own fresh session. Composition \
         fails as a whole if any sub-agent is missing or a delegation cycle \
         would form.",
    ),
    (
        "evaluation",
        "evaluate_adk_agent runs a list of {input, expected_output} cases \
         against an agent, each in an isolated session. A case passes when \
         expected_output appears in the reply, ignoring case. The report \
         includes per-case results and an overall pass count.",
    ),
    (
        "sessions",
        "Sessions hold ordered user/agent turns under an opaque string id. \
         Ids are client-supplied or generated per run. A session only ever \
         serves one run at a time; concurrent runs against the same id are \
         rejected as busy.",
    ),
];

/// Look up a topic, or `None` if unknown.
pub fn topic(name: &str) -> Option<&'static str> {
    TOPICS
        .iter()
        .find(|(t, _)| *t == name)
        .map(|(_, body)| *body)
}

/// All topic names, for the unknown-topic fallback.
pub fn topic_names() -> Vec<&'static str> {
    TOPICS.iter().map(|(t, _)| *t).collect()
}
