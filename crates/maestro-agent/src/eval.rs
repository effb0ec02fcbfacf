//! Evaluation harness.
//!
//! Runs a batch of test cases against an agent, each in a fresh isolated
//! session, and scores replies by case-insensitive substring match. A
//! failing or erroring case never aborts the batch.

use std::sync::Arc;

use maestro_types::{CaseResult, EvaluationReport, TestCase};

use crate::engine::ExecutionEngine;
use crate::error::Result;

/// Evaluate an agent against a batch of cases, in order.
///
/// An unknown agent is an error; everything after that is recorded per
/// case. Backend failures count as failed cases with the error text as
/// the actual output.
pub async fn evaluate(
    engine: &Arc<ExecutionEngine>,
    agent_name: &str,
    cases: Vec<TestCase>,
) -> Result<EvaluationReport> {
    engine.registry().get(agent_name).await?;

    let mut results = Vec::with_capacity(cases.len());
    for (index, case) in cases.into_iter().enumerate() {
        let actual = match engine.run(agent_name, &case.input, None).await {
            Ok(outcome) => outcome.reply,
            Err(e) => format!("error: {}", e),
        };
        let passed = actual
            .to_lowercase()
            .contains(&case.expected_output.to_lowercase());

        tracing::debug!(
            agent = %agent_name,
            case = index + 1,
            passed,
            "evaluated case"
        );
        results.push(CaseResult {
            case: index + 1,
            input: case.input,
            expected: case.expected_output,
            actual,
            passed,
        });
    }

    let report = EvaluationReport::from_results(agent_name, results);
    tracing::info!(
        agent = %agent_name,
        total = report.total,
        passed = report.passed,
        "evaluation complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AgentRegistry;
    use crate::session::SessionStore;
    use crate::tools::{BuiltinTools, WebToolConfig};
    use maestro_llm::{MockBackend, ModelBackend};
    use maestro_proxy::ProxyManager;
    use maestro_types::AgentDefinition;

    fn engine_with(backend: Arc<MockBackend>) -> (Arc<ExecutionEngine>, Arc<AgentRegistry>) {
        let builtins = Arc::new(BuiltinTools::new(WebToolConfig::default()));
        let registry = Arc::new(AgentRegistry::new(builtins.names()));
        let engine = Arc::new(ExecutionEngine::new(
            Arc::clone(&registry),
            Arc::new(SessionStore::new()),
            Arc::new(ProxyManager::default()),
            backend as Arc<dyn ModelBackend>,
            builtins,
        ));
        (engine, registry)
    }

    fn case(input: &str, expected: &str) -> TestCase {
        TestCase {
            input: input.to_string(),
            expected_output: expected.to_string(),
        }
    }

    #[tokio::test]
    async fn scores_three_of_five() {
        let backend = Arc::new(MockBackend::with_replies([
            "The answer is 4.",
            "The answer is 6.",
            "I cannot compute that.",
            "The answer is 10.",
            "No idea.",
        ]));
        let (engine, registry) = engine_with(backend);
        registry
            .create(
                AgentDefinition::new("math", "Do arithmetic.", "gemini-2.0-flash"),
                false,
            )
            .await
            .unwrap();

        let report = evaluate(
            &engine,
            "math",
            vec![
                case("2+2", "4"),
                case("3+3", "6"),
                case("4+4", "8"),
                case("5+5", "10"),
                case("6+6", "12"),
            ],
        )
        .await
        .unwrap();

        assert_eq!(report.total, 5);
        assert_eq!(report.passed, 3);
        assert_eq!(report.pass_rate(), Some(0.6));
        assert!(!report.results[2].passed);
        assert_eq!(report.results[2].actual, "I cannot compute that.");
    }

    #[tokio::test]
    async fn matching_is_case_insensitive() {
        let backend = Arc::new(MockBackend::with_replies(["PARIS is the capital."]));
        let (engine, registry) = engine_with(backend);
        registry
            .create(
                AgentDefinition::new("geo", "Answer geography.", "gemini-2.0-flash"),
                false,
            )
            .await
            .unwrap();

        let report = evaluate(&engine, "geo", vec![case("capital of France?", "paris")])
            .await
            .unwrap();
        assert_eq!(report.passed, 1);
    }

    #[tokio::test]
    async fn backend_error_fails_case_without_aborting_batch() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_with("overloaded");
        let (engine, registry) = engine_with(Arc::clone(&backend));
        registry
            .create(
                AgentDefinition::new("flaky", "x", "gemini-2.0-flash"),
                false,
            )
            .await
            .unwrap();

        let report = evaluate(
            &engine,
            "flaky",
            vec![case("a", "anything"), case("b", "anything")],
        )
        .await
        .unwrap();

        assert_eq!(report.total, 2);
        assert_eq!(report.passed, 0);
        assert!(report.results[0].actual.contains("overloaded"));
    }

    #[tokio::test]
    async fn empty_batch_has_no_pass_rate() {
        let (engine, registry) = engine_with(Arc::new(MockBackend::new()));
        registry
            .create(
                AgentDefinition::new("idle", "x", "gemini-2.0-flash"),
                false,
            )
            .await
            .unwrap();

        let report = evaluate(&engine, "idle", vec![]).await.unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(report.pass_rate(), None);
    }

    #[tokio::test]
    async fn unknown_agent_is_an_error() {
        let (engine, _registry) = engine_with(Arc::new(MockBackend::new()));
        assert!(evaluate(&engine, "ghost", vec![]).await.is_err());
    }

    #[tokio::test]
    async fn cases_run_in_isolated_sessions() {
        let backend = Arc::new(MockBackend::new());
        let (engine, registry) = engine_with(Arc::clone(&backend));
        registry
            .create(
                AgentDefinition::new("echoer", "x", "gemini-2.0-flash"),
                false,
            )
            .await
            .unwrap();

        evaluate(
            &engine,
            "echoer",
            vec![case("one", "one"), case("two", "two")],
        )
        .await
        .unwrap();

        // Neither case saw the other's history.
        for request in backend.requests() {
            assert!(request.history.is_empty());
        }
    }
}
