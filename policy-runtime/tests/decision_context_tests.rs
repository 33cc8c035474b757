mod common;

use common::{DEFAULTS, PolicyBuilder, USECASE_A, info, init_tracing, version};
use policy_config::MatchingStrategies;
use policy_loading::{LoadError, PolicyLoadTarget};
use policy_runtime::decision::engine::mock::MockDecisionEngine;
use policy_runtime::decision::{EngineError, EngineResult, Evaluation};
use policy_runtime::{
    DecisionPolicyRequest, DecisionPolicyRuntimeContext, PolicyError, PolicyResult, PolicyRuntimeContext, RuntimeError,
};
use policy_types::Entity;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn make_context(strategy: MatchingStrategies) -> (Arc<MockDecisionEngine>, DecisionPolicyRuntimeContext) {
    init_tracing();
    let engine = Arc::new(MockDecisionEngine::new());
    let context = DecisionPolicyRuntimeContext::new(engine.clone(), Arc::new(strategy));
    (engine, context)
}

fn rules_only(patch: u32) -> Entity {
    PolicyBuilder::new("a/b", 1, 0, patch).rule("decision.dmn").build()
}

fn request() -> DecisionPolicyRequest {
    DecisionPolicyRequest::new("A.A.A.A", "decision.dmn").with_arg("amount", 10)
}

fn error_of<R: std::fmt::Debug>(result: PolicyResult<R>) -> (PolicyError, String) {
    match result {
        PolicyResult::Failure(info) => (info.error, info.message),
        other => panic!("expected failure, got {other:?}"),
    }
}

// ── Loading ──────────────────────────────────────────────────────

#[test]
fn load_registers_rule_set_under_sanitized_runtime_id() {
    let (engine, context) = make_context(MatchingStrategies::MatchAllNonNull);
    let entity = PolicyBuilder::new("a//b", 1, 0, 0)
        .rule("second.dmn")
        .rule("first.dmn")
        .build();

    context.load(&entity).unwrap();

    assert_eq!(engine.runtimes(), vec!["a/b/1.0.0".to_string()]);
    assert_eq!(
        engine.rules("a/b/1.0.0"),
        Some(vec!["first.dmn".to_string(), "second.dmn".to_string()])
    );
    let metadata = engine.metadata("a/b/1.0.0").unwrap();
    assert_eq!(metadata.identifier, "a//b/1.0.0");
    assert_eq!(metadata.policy_version, "1.0.0");
    assert_eq!(context.loaded_entities(), vec![info("a//b", 1, 0, 0)]);
}

#[test]
fn reloading_identical_content_is_a_noop() {
    let (engine, context) = make_context(MatchingStrategies::MatchAllNonNull);
    context.load(&rules_only(0)).unwrap();
    context.load(&rules_only(0)).unwrap();

    assert_eq!(engine.loads().len(), 1);
}

#[test]
fn reloading_changed_content_replaces_rule_set() {
    let (engine, context) = make_context(MatchingStrategies::MatchAllNonNull);
    context.load(&rules_only(0)).unwrap();
    let changed = PolicyBuilder::new("a/b", 1, 0, 0)
        .rule("decision.dmn")
        .rule("extra.dmn")
        .build();
    context.load(&changed).unwrap();

    assert_eq!(engine.loads().len(), 2);
    assert!(engine.removals().is_empty());
    assert_eq!(engine.rules("a/b/1.0.0").map(|r| r.len()), Some(2));
}

#[test]
fn newer_patch_releases_previous_exactly_once() {
    let (engine, context) = make_context(MatchingStrategies::MatchAllNonNull);
    context.load(&rules_only(0)).unwrap();
    context.load(&rules_only(1)).unwrap();

    assert_eq!(engine.removals(), vec!["a/b/1.0.0".to_string()]);
    assert_eq!(engine.runtimes(), vec!["a/b/1.0.1".to_string()]);
    assert_eq!(context.loaded_entities(), vec![info("a/b", 1, 0, 1)]);
    assert!(matches!(
        context.invoke(&version("a/b", 1, 0, 0), &request()),
        Err(RuntimeError::PolicyNotFound { .. })
    ));
}

#[test]
fn failed_release_of_previous_patch_is_swallowed() {
    let (engine, context) = make_context(MatchingStrategies::MatchAllNonNull);
    context.load(&rules_only(0)).unwrap();
    engine.fail_remove(true);

    context.load(&rules_only(1)).unwrap();

    assert_eq!(engine.removals().len(), 1);
    assert_eq!(context.loaded_entities(), vec![info("a/b", 1, 0, 1)]);
}

#[test]
fn refused_rule_set_names_runtime_and_rules() {
    let (engine, context) = make_context(MatchingStrategies::MatchAllNonNull);
    engine.refuse_load("a/b/1.0.0");
    let entity = PolicyBuilder::new("a/b", 1, 0, 0)
        .rule("b.dmn")
        .rule("a.dmn")
        .build();

    let err = context.load(&entity).unwrap_err();

    assert!(matches!(err, LoadError::RuleSetLoad { .. }));
    assert_eq!(err.to_string(), "RuntimeName: a/b/1.0.0, Rules: a.dmn,b.dmn");
    assert!(context.loaded_entities().is_empty());
}

#[test]
fn engine_error_on_load_is_a_rule_set_failure() {
    let (engine, context) = make_context(MatchingStrategies::MatchAllNonNull);
    engine.error_on_load("a/b/1.0.0");

    assert!(matches!(
        context.load(&rules_only(0)),
        Err(LoadError::RuleSetLoad { .. })
    ));
}

#[test]
fn failed_load_keeps_previous_patch_serving() {
    let (engine, context) = make_context(MatchingStrategies::MatchAllNonNull);
    context.load(&rules_only(0)).unwrap();
    engine.refuse_load("a/b/1.0.1");

    assert!(context.load(&rules_only(1)).is_err());
    assert_eq!(context.loaded_entities(), vec![info("a/b", 1, 0, 0)]);
    assert!(
        context
            .invoke(&version("a/b", 1, 0, 0), &request())
            .unwrap()
            .is_success()
    );
}

#[test]
fn identifiers_sharing_a_runtime_id_conflict() {
    let (_engine, context) = make_context(MatchingStrategies::MatchAllNonNull);
    context
        .load(&PolicyBuilder::new("a//b", 1, 0, 0).rule("x.dmn").build())
        .unwrap();

    let err = context
        .load(&PolicyBuilder::new("a/b", 1, 0, 0).rule("x.dmn").build())
        .unwrap_err();

    match err {
        LoadError::RuntimeIdConflict {
            runtime_id,
            existing,
            requested,
        } => {
            assert_eq!(runtime_id, "a/b/1.0.0");
            assert_eq!(existing, "a//b/1.0.0");
            assert_eq!(requested, "a/b/1.0.0");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unsupported_entity_and_bad_config_are_rejected() {
    let (_engine, context) = make_context(MatchingStrategies::MatchAllNonNull);
    let other = Entity::Other {
        info: info("proc", 1, 0, 0),
    };
    assert!(matches!(
        context.load(&other),
        Err(LoadError::UnsupportedEntityKind(_))
    ));

    let broken = PolicyBuilder::new("a/b", 1, 0, 0)
        .rule("decision.dmn")
        .config("defaults.json", "{")
        .build();
    assert!(matches!(context.load(&broken), Err(LoadError::Content { .. })));
}

// ── Unloading ────────────────────────────────────────────────────

#[test]
fn unload_ignores_non_latest_patch() {
    let (engine, context) = make_context(MatchingStrategies::MatchAllNonNull);
    context.load(&rules_only(1)).unwrap();

    context.unload(&info("a/b", 1, 0, 0)).unwrap();

    assert!(engine.removals().is_empty());
    assert_eq!(context.loaded_entities(), vec![info("a/b", 1, 0, 1)]);
}

#[test]
fn unload_latest_removes_runtime() {
    let (engine, context) = make_context(MatchingStrategies::MatchAllNonNull);
    context.load(&rules_only(0)).unwrap();

    context.unload(&info("a/b", 1, 0, 0)).unwrap();

    assert!(engine.runtimes().is_empty());
    assert!(context.loaded_entities().is_empty());
    assert!(context.invoke(&version("a/b", 1, 0, 0), &request()).is_err());
}

#[test]
fn unload_reports_engine_failure() {
    let (engine, context) = make_context(MatchingStrategies::MatchAllNonNull);
    context.load(&rules_only(0)).unwrap();
    engine.fail_remove(true);

    assert!(matches!(
        context.unload(&info("a/b", 1, 0, 0)),
        Err(LoadError::RuleEngine(_))
    ));
    assert!(context.loaded_entities().is_empty());
}

// ── Invocation ───────────────────────────────────────────────────

#[test]
fn reserved_prefix_is_rejected_before_lookup() {
    let (_engine, context) = make_context(MatchingStrategies::MatchAllNonNull);
    let request = request()
        .with_arg("config.zeta", 1)
        .with_arg("config.alpha", 2);

    let (error, message) = error_of(context.invoke(&version("never/loaded", 1, 0, 0), &request).unwrap());

    assert_eq!(error, PolicyError::ReservedPrefixUsed);
    assert_eq!(error.code(), 787_400);
    assert!(message.ends_with("config.alpha,config.zeta"), "{message}");
}

#[test]
fn unknown_patch_is_an_integration_error() {
    let (_engine, context) = make_context(MatchingStrategies::MatchAllNonNull);
    let err = context.invoke(&version("a/b", 1, 0, 0), &request()).unwrap_err();
    assert_eq!(err.to_string(), "Requested Policy Not Found. identifier:=a/b/1.0.0");
}

#[test]
fn policy_without_config_evaluates_with_request_body() {
    let (engine, context) = make_context(MatchingStrategies::MatchExactOnly);
    context.load(&rules_only(0)).unwrap();

    let result = context.invoke(&version("a/b", 1, 0, 0), &request()).unwrap();

    let response = result.success().unwrap();
    assert_eq!(response.result.get("amount"), Some(&json!(10)));
    assert_eq!(response.result.get("ruleUnit"), Some(&json!("decision.dmn")));
    let (runtime_id, unit, _) = engine.evaluations().remove(0);
    assert_eq!((runtime_id.as_str(), unit.as_str()), ("a/b/1.0.0", "decision.dmn"));
}

#[test]
fn matched_configuration_is_merged_under_reserved_prefix() {
    let (_engine, context) = make_context(MatchingStrategies::MatchAllNonNull);
    let entity = PolicyBuilder::new("a/b", 1, 0, 0)
        .rule("decision.dmn")
        .config("defaults.json", DEFAULTS)
        .config("usecase-a.json", USECASE_A)
        .build();
    context.load(&entity).unwrap();

    let result = context.invoke(&version("a/b", 1, 0, 0), &request()).unwrap();

    let response = result.success().unwrap();
    assert_eq!(response.result.get("config.param-A"), Some(&json!("A")));
    assert_eq!(response.result.get("config.param-B"), Some(&json!("Y")));
    assert_eq!(response.result.get("amount"), Some(&json!(10)));
}

#[test]
fn unmatched_business_event_is_missing_config() {
    let (_engine, context) = make_context(MatchingStrategies::MatchExactOnly);
    let entity = PolicyBuilder::new("a/b", 1, 0, 0)
        .rule("decision.dmn")
        .config("defaults.json", DEFAULTS)
        .config("usecase-a.json", USECASE_A)
        .build();
    context.load(&entity).unwrap();
    let request = DecisionPolicyRequest::new("B.B.B.B", "decision.dmn");

    let (error, message) = error_of(context.invoke(&version("a/b", 1, 0, 0), &request).unwrap());

    assert_eq!(error.code(), 788_401);
    assert_eq!(
        message,
        "Could not find a configuration that matches supplied business event 'B.B.B.B'"
    );
}

#[test]
fn unknown_rule_unit_is_reported() {
    let (_engine, context) = make_context(MatchingStrategies::MatchAllNonNull);
    context.load(&rules_only(0)).unwrap();
    let request = DecisionPolicyRequest::new("A.A.A.A", "other.dmn");

    let (error, _) = error_of(context.invoke(&version("a/b", 1, 0, 0), &request).unwrap());

    assert_eq!(error, PolicyError::MissingRuleUnit);
    assert_eq!(error.code(), 787_401);
}

#[test]
fn non_success_evaluation_is_execution_error() {
    let (engine, context) = make_context(MatchingStrategies::MatchAllNonNull);
    context.load(&rules_only(0)).unwrap();
    engine.set_evaluator(|_, _| Ok(Evaluation::failure()));

    let (error, message) = error_of(context.invoke(&version("a/b", 1, 0, 0), &request()).unwrap());

    assert_eq!(error.code(), 787_200);
    assert_eq!(message, "Decision execution error.");
}

#[test]
fn engine_error_during_evaluation_is_execution_error() {
    let (engine, context) = make_context(MatchingStrategies::MatchAllNonNull);
    context.load(&rules_only(0)).unwrap();
    engine.set_evaluator(|_, _| Err(EngineError::Internal("boom".into())));

    let (error, message) = error_of(context.invoke(&version("a/b", 1, 0, 0), &request()).unwrap());

    assert_eq!(error, PolicyError::ExecutionError);
    assert_eq!(message, "Decision invocation error.");
}

#[test]
fn panicking_engine_is_execution_error() {
    let (engine, context) = make_context(MatchingStrategies::MatchAllNonNull);
    context.load(&rules_only(0)).unwrap();
    engine.set_evaluator(|_, _| -> EngineResult<Evaluation> { panic!("engine crashed") });

    let (error, message) = error_of(context.invoke(&version("a/b", 1, 0, 0), &request()).unwrap());

    assert_eq!(error, PolicyError::ExecutionError);
    assert_eq!(message, "Decision invocation error.");

    engine.set_evaluator(|_, input| Ok(Evaluation::success(input.clone())));
    assert!(context.invoke(&version("a/b", 1, 0, 0), &request()).unwrap().is_success());
}
