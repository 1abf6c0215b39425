use std::rc::Rc;

use form_autofill::error::OracleError;
use form_autofill::oracle::gemini::GeminiInference;
use form_autofill::oracle::ollama::{DEFAULT_OLLAMA_ENDPOINT, OllamaInference};
use form_autofill::oracle::oracle::{
    LlmOracle, MappingOracle, MockTextInference, OracleRequest, ProposalStyle, StaticOracle,
};
use form_autofill::oracle::prompt::{build_actions_prompt, build_mapping_prompt};

use crate::common::values;

mod common;

const TREE: &str = "[AXWindow] Title: 'W-2 Entry' (Enabled: true)\n  [AXTextField] Title: 'Wages' ID: 'txtWages' (Enabled: true)\n";

// ============================================================================
// Prompts
// ============================================================================

#[test]
fn mapping_prompt_carries_tree_and_values() {
    let prompt = build_mapping_prompt(TREE, &values(&[("wages", "75000.00"), ("state_tax", " ")]));

    assert!(prompt.contains("UI STRUCTURE OF THE APPLICATION:\n[AXWindow] Title: 'W-2 Entry'"));
    assert!(prompt.contains("\"wages\": \"75000.00\""));
    assert!(!prompt.contains("state_tax"));
    assert!(prompt.contains("\"confidence\": \"high|medium|low\""));
}

#[test]
fn actions_prompt_lists_fields_to_map() {
    let prompt = build_actions_prompt(
        TREE,
        &values(&[("employee_name", "John Smith"), ("wages", "75000.00"), ("notes", "")]),
    );

    assert!(prompt.contains("Fields to map: employee_name, wages\n"));
    assert!(prompt.contains("\"type\": \"set_text\" | \"click\" | \"select\" | \"tab\" | \"wait\""));

    let empty = build_actions_prompt(TREE, &values(&[]));
    assert!(empty.contains("Fields to map: (none)"));
}

#[test]
fn llm_oracle_picks_the_prompt_by_style() {
    let mock = Rc::new(MockTextInference::new("{\"mappings\": []}"));
    let oracle = LlmOracle::new(Box::new(mock.clone()));
    let form = values(&[("wages", "1.00")]);

    for style in [ProposalStyle::Mapping, ProposalStyle::Actions] {
        let reply = oracle
            .propose(&OracleRequest {
                tree: TREE,
                values: &form,
                style,
            })
            .unwrap();
        assert_eq!(reply, "{\"mappings\": []}");
    }

    let prompts = mock.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("Return ONLY a JSON object"));
    assert!(prompts[1].contains("Return a JSON array of actions"));
}

#[test]
fn blank_reply_is_an_empty_response() {
    let oracle = LlmOracle::with_mock_response("\n  \n");
    let form = values(&[]);
    let request = OracleRequest {
        tree: TREE,
        values: &form,
        style: ProposalStyle::Mapping,
    };

    assert!(matches!(oracle.propose(&request), Err(OracleError::EmptyResponse)));
}

// ============================================================================
// Static replies
// ============================================================================

#[test]
fn static_oracle_replays_a_saved_reply() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reply.txt");
    std::fs::write(&path, "[{\"type\": \"tab\"}]").unwrap();

    let oracle = StaticOracle::from_file(path.to_str().unwrap()).unwrap();
    let form = values(&[]);
    let reply = oracle
        .propose(&OracleRequest {
            tree: "",
            values: &form,
            style: ProposalStyle::Actions,
        })
        .unwrap();
    assert_eq!(reply, "[{\"type\": \"tab\"}]");

    assert!(matches!(
        StaticOracle::from_file("/nonexistent/reply.txt"),
        Err(OracleError::NotConfigured(_))
    ));
}

#[test]
fn boxed_oracles_delegate() {
    let boxed: Box<dyn MappingOracle> = Box::new(StaticOracle::new("ok"));
    let form = values(&[]);
    let request = OracleRequest {
        tree: TREE,
        values: &form,
        style: ProposalStyle::Mapping,
    };
    assert_eq!(boxed.propose(&request).unwrap(), "ok");
}

// ============================================================================
// Providers
// ============================================================================

#[test]
fn proposal_style_parses_leniently() {
    assert_eq!("Mappings".parse::<ProposalStyle>(), Ok(ProposalStyle::Mapping));
    assert_eq!("ACTIONS".parse::<ProposalStyle>(), Ok(ProposalStyle::Actions));
    assert!("steps".parse::<ProposalStyle>().is_err());
}

#[test]
fn gemini_requires_an_api_key() {
    assert!(matches!(
        GeminiInference::new("  ", "gemini-2.0-flash-exp"),
        Err(OracleError::NotConfigured(_))
    ));

    let gemini = GeminiInference::new("test-key", "gemini-2.0-flash-exp")
        .unwrap()
        .with_base_url("http://localhost:8080/v1beta/");
    assert_eq!(gemini.base_url, "http://localhost:8080/v1beta");
    assert_eq!(gemini.model, "gemini-2.0-flash-exp");
}

#[test]
fn ollama_explicit_settings_win() {
    let ollama = OllamaInference::from_settings(Some("http://gpu-box:11434/api/generate"), Some("llama3"))
        .unwrap();
    assert_eq!(ollama.endpoint, "http://gpu-box:11434/api/generate");
    assert_eq!(ollama.model, "llama3");

    let local = OllamaInference::new(DEFAULT_OLLAMA_ENDPOINT, "qwen2.5:1.5b").unwrap();
    assert_eq!(local.endpoint, "http://localhost:11434/api/generate");
}
