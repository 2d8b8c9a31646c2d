//! Validates contract fixtures and live serializations against frozen JSON
//! schemas.

use jsonschema::JSONSchema;
use pod_shell_app::host::{AuxWindow, PipeAction, SystemAction, WindowAction};
use pod_shell_app::stdio::{Inbound, Outbound};
use pod_shell_core::{ImageDimensions, ImagePayload, InboundMessage, SenderRef};
use serde_json::{Value, json};

fn load_json(path: &str) -> Value {
    let raw = std::fs::read_to_string(path).expect("json file should be readable");
    serde_json::from_str(&raw).expect("json file should be valid")
}

fn compile_validator(schema_path: &str) -> JSONSchema {
    let schema = load_json(schema_path);
    JSONSchema::compile(&schema).expect("schema should compile")
}

macro_rules! contract {
    ($file:literal) => {
        concat!(env!("CARGO_MANIFEST_DIR"), "/../../contracts/", $file)
    };
}

#[test]
fn image_payload_fixtures_match_schema() {
    let validator = compile_validator(contract!("image-payload.schema.json"));
    for fixture in [
        contract!("fixtures/image-payload.valid.json"),
        contract!("fixtures/image-payload.error.json"),
    ] {
        assert!(
            validator.is_valid(&load_json(fixture)),
            "{fixture} should validate against schema"
        );
    }
}

#[test]
fn image_payload_serialization_matches_schema() {
    let validator = compile_validator(contract!("image-payload.schema.json"));

    let success =
        serde_json::to_value(ImagePayload::success("aGVsbG8=", "png")).expect("serialize");
    let error = serde_json::to_value(ImagePayload::error("no capture file")).expect("serialize");
    assert!(validator.is_valid(&success), "success payload: {success}");
    assert!(validator.is_valid(&error), "error payload: {error}");

    let mixed = json!({"message": "success", "data": null, "type": "image/png;base64"});
    assert!(!validator.is_valid(&mixed));
}

#[test]
fn renderer_message_fixture_matches_schema_and_parses() {
    let validator = compile_validator(contract!("renderer-message.schema.json"));
    let fixture = load_json(contract!("fixtures/renderer-message.valid.json"));
    assert!(validator.is_valid(&fixture));

    let message = InboundMessage::parse(fixture)
        .expect("fixture is well-formed")
        .expect("fixture tag is known");
    assert_eq!(message.str_field("tag"), Some("ci"));

    assert!(!validator.is_valid(&json!({"title": "no tag"})));
}

#[test]
fn host_inbound_fixture_matches_schema_and_decodes() {
    let validator = compile_validator(contract!("host-inbound.schema.json"));
    let lines = load_json(contract!("fixtures/host-inbound.valid.json"));
    let lines = lines.as_array().expect("fixture is a list of lines");

    for line in lines {
        assert!(validator.is_valid(line), "inbound line should validate: {line}");
        serde_json::from_value::<Inbound>(line.clone())
            .unwrap_or_else(|error| panic!("inbound line should decode: {line}: {error}"));
    }

    assert!(!validator.is_valid(&json!({"type": "send", "message": {"cmd": "setLocale"}})));
}

#[test]
fn host_outbound_fixture_matches_schema() {
    let validator = compile_validator(contract!("host-outbound.schema.json"));
    let lines = load_json(contract!("fixtures/host-outbound.valid.json"));

    for line in lines.as_array().expect("fixture is a list of lines") {
        assert!(validator.is_valid(line), "outbound line should validate: {line}");
    }
}

#[test]
fn host_outbound_serialization_matches_schema() {
    let validator = compile_validator(contract!("host-outbound.schema.json"));
    let view = SenderRef::view(10);
    let events = [
        Outbound::Push {
            target: view,
            channel: "screen-snippet-data".to_string(),
            payload: json!({"message": "success", "data": "", "type": "image/png;base64"}),
        },
        Outbound::InvokeResult { id: 3, result: None },
        Outbound::Window {
            window: 1,
            action: WindowAction::SetZoom { level: 1.25 },
        },
        Outbound::TrustedOrigin {
            origin: "https://acme.symphony.com/".to_string(),
        },
        Outbound::OpenWindow {
            window: AuxWindow::SnippetEditor {
                image: "/tmp/pod-shell/capture.png".into(),
                dimensions: ImageDimensions {
                    width: 640,
                    height: 480,
                },
            },
        },
        Outbound::CloseWindow {
            window_type: "screen-sharing-indicator".to_string(),
            key: "4".to_string(),
        },
        Outbound::CloseAllWindows,
        Outbound::AlwaysOnTop { enabled: true },
        Outbound::Pipe {
            sender: view,
            action: PipeAction::Write { data: vec![1, 2, 3] },
        },
        Outbound::System {
            action: SystemAction::BadgeCount { count: 9 },
        },
        Outbound::CredentialsRequired {
            hostname: "proxy.acme.com".to_string(),
            is_retry: true,
        },
    ];

    for event in events {
        let value = serde_json::to_value(&event).expect("serialize");
        assert!(validator.is_valid(&value), "outbound event should validate: {value}");
    }
}
