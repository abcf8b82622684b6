use super::{StudyPlanOutcome, parse_study_plan};

fn expect_success(outcome: StudyPlanOutcome) -> super::StudyPlan {
    match outcome {
        StudyPlanOutcome::Success { plan, .. } => plan,
        StudyPlanOutcome::ParseError { error, .. } => {
            panic!("expected a parsed plan, got parse error: {error}")
        }
    }
}

fn expect_parse_error(outcome: StudyPlanOutcome) -> (String, String) {
    match outcome {
        StudyPlanOutcome::ParseError {
            raw_content, error, ..
        } => (raw_content, error),
        StudyPlanOutcome::Success { .. } => panic!("expected a parse error"),
    }
}

#[test]
fn parses_strict_json_plan() {
    let raw = r#"{"title":"T","priority":"High","tasks":[{"title":"A","duration":"30m"}]}"#;
    let plan = expect_success(parse_study_plan(raw, 42, "gpt-3.5-turbo"));

    assert_eq!(plan.title, "T");
    assert_eq!(plan.priority, "High");
    assert_eq!(plan.tasks.len(), 1);
    assert_eq!(plan.tasks[0].title, "A");
    assert_eq!(plan.tasks[0].duration, "30m");
}

#[test]
fn strips_code_fences_with_language_tag() {
    let raw = "```json\n{\"title\":\"T\",\"priority\":\"High\",\"tasks\":[{\"title\":\"A\",\"duration\":\"30m\"}]}\n```";
    let plan = expect_success(parse_study_plan(raw, 0, "m"));
    assert_eq!(plan.title, "T");
}

#[test]
fn accepts_single_quoted_object_literals() {
    let raw = "{'title': 'T', 'priority': 'High', 'tasks': [{'title': 'A', 'duration': '30m'}]}";
    let plan = expect_success(parse_study_plan(raw, 0, "m"));
    assert_eq!(plan.priority, "High");
    assert_eq!(plan.tasks[0].duration, "30m");
}

#[test]
fn accepts_single_quotes_inside_fences() {
    let raw = "```\n{'title': 'T', 'priority': 'Low', 'tasks': []}\n```";
    let plan = expect_success(parse_study_plan(raw, 0, "m"));
    assert_eq!(plan.priority, "Low");
    assert!(plan.tasks.is_empty());
}

#[test]
fn preserves_apostrophes_in_double_quoted_strings() {
    let raw = r#"{"title":"Don't panic","priority":"High","tasks":[{"title":"A","duration":"1h"}]}"#;
    let plan = expect_success(parse_study_plan(raw, 0, "m"));
    assert_eq!(plan.title, "Don't panic");
}

#[test]
fn handles_escaped_quote_inside_single_quoted_string() {
    let raw = r"{'title': 'Don\'t panic', 'priority': 'High', 'tasks': [{'title': 'A', 'duration': '1h'}]}";
    let plan = expect_success(parse_study_plan(raw, 0, "m"));
    assert_eq!(plan.title, "Don't panic");
}

#[test]
fn stringifies_numeric_durations() {
    let raw = r#"{"title":"T","priority":"High","tasks":[{"title":"A","duration":45}]}"#;
    let plan = expect_success(parse_study_plan(raw, 0, "m"));
    assert_eq!(plan.tasks[0].duration, "45");
}

#[test]
fn missing_tasks_degrades_and_preserves_raw_text() {
    let raw = "```json\n{\"title\":\"T\",\"priority\":\"High\"}\n```";
    let (raw_content, error) = expect_parse_error(parse_study_plan(raw, 17, "m"));

    assert_eq!(raw_content, raw);
    assert!(error.contains("tasks"), "unexpected error: {error}");
}

#[test]
fn task_without_duration_degrades() {
    let raw = r#"{"title":"T","priority":"High","tasks":[{"title":"A"}]}"#;
    let (_, error) = expect_parse_error(parse_study_plan(raw, 0, "m"));
    assert!(error.contains("duration"), "unexpected error: {error}");
}

#[test]
fn empty_task_title_degrades() {
    let raw = r#"{"title":"T","priority":"High","tasks":[{"title":"  ","duration":"1h"}]}"#;
    let (_, error) = expect_parse_error(parse_study_plan(raw, 0, "m"));
    assert!(error.contains("title"), "unexpected error: {error}");
}

#[test]
fn non_object_content_degrades() {
    let (raw_content, _) = expect_parse_error(parse_study_plan("just some prose", 3, "m"));
    assert_eq!(raw_content, "just some prose");

    let (_, error) = expect_parse_error(parse_study_plan("[1, 2, 3]", 0, "m"));
    assert!(error.contains("object"), "unexpected error: {error}");
}

#[test]
fn carries_token_and_model_metadata_through_both_outcomes() {
    let raw = r#"{"title":"T","priority":"High","tasks":[]}"#;
    match parse_study_plan(raw, 99, "gpt-4o") {
        StudyPlanOutcome::Success {
            tokens_used, model, ..
        } => {
            assert_eq!(tokens_used, 99);
            assert_eq!(model, "gpt-4o");
        }
        StudyPlanOutcome::ParseError { .. } => panic!("expected success"),
    }

    match parse_study_plan("nope", 7, "gpt-4o") {
        StudyPlanOutcome::ParseError {
            tokens_used, model, ..
        } => {
            assert_eq!(tokens_used, 7);
            assert_eq!(model, "gpt-4o");
        }
        StudyPlanOutcome::Success { .. } => panic!("expected parse error"),
    }
}
