//! Unit tests for the classifier contract: wire-format parsing, the
//! best-effort JSON extraction, and provider selection.

use tracker_bot::classifier::{
    self, extract_judgement, instruction_prompt, CommitmentJudgement,
};
use tracker_bot::config::{ClassifierConfig, ClassifierProvider};

#[test]
fn judgement_deserializes_spanish_wire_names() {
    let json = r#"{
        "es_compromiso": true,
        "asignado_a": "<@U12345678>",
        "descripcion": "Preparar el informe",
        "fecha_limite": "05/03/2024"
    }"#;
    let judgement: CommitmentJudgement = serde_json::from_str(json).expect("valid judgement");

    assert!(judgement.is_commitment);
    assert_eq!(judgement.assignee_hint, "<@U12345678>");
    assert_eq!(judgement.description, "Preparar el informe");
    assert_eq!(judgement.due_date.as_deref(), Some("05/03/2024"));
}

#[test]
fn judgement_tolerates_null_due_date_and_missing_fields() {
    let judgement: CommitmentJudgement =
        serde_json::from_str(r#"{"es_compromiso": false, "fecha_limite": null}"#)
            .expect("valid judgement");

    assert!(!judgement.is_commitment);
    assert!(judgement.assignee_hint.is_empty());
    assert!(judgement.description.is_empty());
    assert!(judgement.due_date.is_none());
}

#[test]
fn judgement_serializes_back_to_spanish_wire_names() {
    let judgement = CommitmentJudgement {
        is_commitment: true,
        assignee_hint: "ana".to_owned(),
        description: "revisar PR".to_owned(),
        due_date: None,
    };
    let json = serde_json::to_value(&judgement).expect("serialize");

    assert_eq!(json["es_compromiso"], true);
    assert_eq!(json["asignado_a"], "ana");
    assert_eq!(json["descripcion"], "revisar PR");
    assert!(json["fecha_limite"].is_null());
}

#[test]
fn extract_judgement_parses_bare_json() {
    let content = r#"{"es_compromiso": true, "asignado_a": "", "descripcion": "x", "fecha_limite": null}"#;
    let judgement = extract_judgement(content).expect("parsed");
    assert!(judgement.is_commitment);
}

/// Models sometimes wrap the object in prose; the outermost braces are
/// extracted best-effort.
#[test]
fn extract_judgement_parses_json_embedded_in_prose() {
    let content = "Claro, aquí está el análisis:\n\
                   {\"es_compromiso\": true, \"asignado_a\": \"juan\", \
                    \"descripcion\": \"deploy\", \"fecha_limite\": \"2024-03-05\"}\n\
                   Espero que sirva.";
    let judgement = extract_judgement(content).expect("parsed");
    assert!(judgement.is_commitment);
    assert_eq!(judgement.assignee_hint, "juan");
}

#[test]
fn extract_judgement_returns_none_without_braces() {
    assert!(extract_judgement("no hay compromiso aquí").is_none());
}

#[test]
fn extract_judgement_returns_none_for_unparseable_braces() {
    assert!(extract_judgement("{this is not json}").is_none());
}

#[test]
fn instruction_prompt_embeds_message_and_contract_fields() {
    let prompt = instruction_prompt("@ana prepara el informe para el viernes");

    assert!(prompt.contains("@ana prepara el informe para el viernes"));
    assert!(prompt.contains("es_compromiso"));
    assert!(prompt.contains("asignado_a"));
    assert!(prompt.contains("descripcion"));
    assert!(prompt.contains("fecha_limite"));
}

#[test]
fn from_config_builds_the_configured_provider() {
    let openai = ClassifierConfig {
        provider: ClassifierProvider::Openai,
        model: None,
        api_key: "sk-test".to_owned(),
    };
    assert!(classifier::from_config(&openai).is_ok());

    let anthropic = ClassifierConfig {
        provider: ClassifierProvider::Anthropic,
        model: Some("claude-3-5-haiku-latest".to_owned()),
        api_key: "sk-ant-test".to_owned(),
    };
    assert!(classifier::from_config(&anthropic).is_ok());
}
