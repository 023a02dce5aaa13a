//! Import, export and round-trip tests for every vendor transcoder.
mod common;
use common::*;
use serde_json::{Value, json};
use voxflow::graph::{DISPLAY_NAME_KEY, GLOBAL_PROMPT_KEY, GREETING_KEY};
use voxflow::prelude::*;
use voxflow::vendors::RetellFlowTranscoder;

/// Import, export to the same format, import again.
fn round_trip(registry: &Registry, payload: Payload, format: Format) -> (Graph, Graph) {
    let first = registry.import_as(format, payload).expect("first import");
    let native = registry.export(&first, format).expect("export");
    let payload = match native {
        Native::Json(value) => Payload::Json(value),
        Native::Source(text) => Payload::Source(text),
        Native::Table(text) => Payload::Table(text),
    };
    let second = registry.import_as(format, payload).expect("second import");
    (first, second)
}

#[cfg(test)]
mod retell_llm_tests {
    use super::*;

    #[test]
    fn test_four_state_import() {
        let graph = Registry::new().import(retell_llm_four_states()).unwrap();

        assert_eq!(graph.nodes().len(), 4);
        assert_eq!(graph.entry_node_id(), "greeting");
        let entry = graph.entry_node();
        assert_eq!(entry.transitions.len(), 2);
        assert!(entry
            .transitions
            .iter()
            .all(|t| t.condition.type_name() == "llm_prompt"));

        assert_eq!(graph.default_model(), Some("gpt-4o"));
        assert_eq!(
            graph.metadata_str(GLOBAL_PROMPT_KEY),
            Some("You are the front desk of Acme Dental. Be brief.")
        );
        assert_eq!(graph.metadata_str("llm_id"), Some("llm_5f2c"));
    }

    #[test]
    fn test_general_tools_reach_every_state() {
        let graph = Registry::new().import(retell_llm_four_states()).unwrap();
        for node in graph.nodes() {
            assert!(node.tool("end_call").is_some(), "{} lacks end_call", node.id);
        }
        let scheduling = graph.node("scheduling").unwrap();
        let book = scheduling.tool("book_slot").unwrap();
        assert_eq!(book.kind, ToolKind::Custom);
        assert_eq!(book.metadata.get("speak_during_execution"), Some(&json!(true)));
        assert_eq!(scheduling.tools[0].name, "book_slot");
    }

    #[test]
    fn test_starting_state_overrides_first_state() {
        let mut payload = retell_llm_four_states();
        payload["starting_state"] = json!("billing");
        let graph = Registry::new().import(payload).unwrap();
        assert_eq!(graph.entry_node_id(), "billing");
    }

    #[test]
    fn test_edge_to_unknown_state_fails_import() {
        let mut payload = retell_llm_four_states();
        payload["states"][3]["edges"] =
            json!([{ "destination_state_name": "nowhere", "description": "?" }]);
        let result = Registry::new().import(payload);
        assert!(matches!(
            result,
            Err(TranscodeError::Graph(GraphError::UnresolvedTargets { .. }))
        ));
    }

    #[test]
    fn test_single_prompt_llm() {
        let payload = json!({ "model": "gpt-4o-mini", "general_prompt": "Answer FAQs." });
        let graph = Registry::new().import(payload).unwrap();
        assert_eq!(graph.nodes().len(), 1);
        assert_eq!(graph.entry_node().prompt, "Answer FAQs.");

        let native = Registry::new().export(&graph, Format::RetellLlm).unwrap();
        let json = native.into_json().unwrap();
        assert_eq!(json["general_prompt"], "Answer FAQs.");
        assert!(json.get("states").is_none());
    }

    #[test]
    fn test_round_trip() {
        let registry = Registry::new();
        let (first, second) = round_trip(
            &registry,
            Payload::Json(retell_llm_four_states()),
            Format::RetellLlm,
        );
        assert_eq!(first, second);
    }

    #[test]
    fn test_general_tools_are_exported_once() {
        let registry = Registry::new();
        let graph = registry.import(retell_llm_four_states()).unwrap();
        let json = registry.export(&graph, Format::RetellLlm).unwrap().into_json().unwrap();

        assert_eq!(json["general_tools"].as_array().unwrap().len(), 1);
        for state in json["states"].as_array().unwrap() {
            let names: Vec<&str> = state["tools"]
                .as_array()
                .map(|tools| tools.iter().filter_map(|t| t["name"].as_str()).collect())
                .unwrap_or_default();
            assert!(!names.contains(&"end_call"));
        }
    }
}

#[cfg(test)]
mod retell_flow_tests {
    use super::*;

    #[test]
    fn test_bare_flow_import() {
        let graph = Registry::new().import(retell_flow()).unwrap();

        assert_eq!(graph.nodes().len(), 3);
        assert_eq!(graph.entry_node_id(), "start");
        assert_eq!(graph.default_model(), Some("gpt-4.1"));
        assert_eq!(
            graph.metadata_str(GLOBAL_PROMPT_KEY),
            Some("You are an order-status assistant.")
        );

        let start = graph.entry_node();
        assert_eq!(start.metadata_str(DISPLAY_NAME_KEY), Some("Start"));
        assert_eq!(start.transitions[0].condition, Condition::prompt("The caller gave an order number"));
        assert_eq!(start.transitions[1].condition, Condition::equation("{{attempts}} >= 3"));

        let lookup = graph.node("lookup").unwrap();
        assert_eq!(lookup.kind(), NodeKind::Function);
        assert_eq!(lookup.tools.len(), 1);
        assert_eq!(lookup.tools[0].vendor_id.as_deref(), Some("tool_lookup"));
        assert_eq!(lookup.transitions[0].condition, Condition::Always);

        let goodbye = graph.node("goodbye").unwrap();
        assert_eq!(goodbye.kind(), NodeKind::End);
        assert_eq!(goodbye.prompt, "Thanks for calling, goodbye!");
    }

    #[test]
    fn test_round_trip() {
        let registry = Registry::new();
        let (first, second) =
            round_trip(&registry, Payload::Json(retell_flow()), Format::RetellFlow);
        assert_eq!(first, second);
    }

    #[test]
    fn test_every_unconditional_edge_survives() {
        let pathway = json!({
            "nodes": [
                { "id": "a", "type": "Default", "data": { "name": "A", "isStart": true, "prompt": "Open the call." } },
                { "id": "b", "type": "Default", "data": { "name": "B", "prompt": "Take a message." } },
                { "id": "c", "type": "Default", "data": { "name": "C", "prompt": "Book a callback." } }
            ],
            "edges": [
                { "id": "e1", "source": "a", "target": "b" },
                { "id": "e2", "source": "a", "target": "c" }
            ]
        });
        let registry = Registry::new();
        let graph = registry.import_as(Format::Bland, pathway).unwrap();
        assert_eq!(graph.entry_node().transitions.len(), 2);

        let native = registry.export(&graph, Format::RetellFlow).unwrap();
        let json = native.into_json().unwrap();
        let start = &json["nodes"][0];
        assert_eq!(start["skip_response_edge"]["destination_node_id"], "b");
        assert_eq!(start["edges"][0]["destination_node_id"], "c");

        let again = registry.import_as(Format::RetellFlow, json).unwrap();
        let mut targets: Vec<(&str, &Condition)> = again
            .entry_node()
            .transitions
            .iter()
            .map(|t| (t.target_node_id.as_str(), &t.condition))
            .collect();
        targets.sort_by_key(|(target, _)| *target);
        assert_eq!(targets, vec![("b", &Condition::Always), ("c", &Condition::Always)]);
    }

    #[test]
    fn test_equation_edges_export_structurally() {
        let registry = Registry::new();
        let graph = registry.import(retell_flow()).unwrap();
        let json = registry.export(&graph, Format::RetellFlow).unwrap().into_json().unwrap();

        let condition = &json["nodes"][0]["edges"][1]["transition_condition"];
        assert_eq!(condition["type"], "equation");
        assert_eq!(condition["operator"], "&&");
        assert_eq!(
            condition["equations"][0],
            json!({ "left": "{{attempts}}", "operator": ">=", "right": "3" })
        );
    }

    #[test]
    fn test_wrapped_agent_import() {
        let registry = Registry::new();
        let wrapped = registry.import(retell_agent_envelope()).unwrap();
        let bare = registry.import(retell_flow()).unwrap();

        assert_eq!(wrapped.nodes(), bare.nodes());
        assert_eq!(wrapped.entry_node_id(), bare.entry_node_id());
        let agent = wrapped.metadata().get("agent").and_then(Value::as_object).unwrap();
        assert_eq!(agent.get("agent_name"), Some(&json!("Order Desk")));
        assert_eq!(agent.get("voice_id"), Some(&json!("11labs-Adrian")));
    }

    #[test]
    fn test_agent_envelope_export_round_trips() {
        let registry = Registry::new();
        let graph = registry.import(retell_agent_envelope()).unwrap();

        let envelope = RetellFlowTranscoder.export_agent_envelope(&graph);
        let json = envelope.as_json().unwrap();
        assert_eq!(json["agent_name"], "Order Desk");
        assert_eq!(json["response_engine"]["type"], "conversation-flow");
        assert_eq!(json["conversationFlow"]["start_node_id"], "start");

        let again = registry.import(json.clone()).unwrap();
        assert_eq!(again, graph);
    }

    #[test]
    fn test_ambiguous_envelope_is_rejected() {
        let result = Registry::new().import(retell_ambiguous_envelope());
        assert!(matches!(
            result,
            Err(TranscodeError::Ambiguous {
                format: Format::RetellFlow,
                ..
            })
        ));
    }

    #[test]
    fn test_two_wrappers_are_ambiguous() {
        let payload = json!({
            "conversationFlow": retell_flow(),
            "conversation_flow": retell_flow(),
        });
        let result = Registry::new().import(payload);
        assert!(matches!(result, Err(TranscodeError::Ambiguous { .. })));
    }

    #[test]
    fn test_unknown_tool_reference_is_malformed() {
        let mut payload = retell_flow();
        payload["nodes"][1]["tool_id"] = json!("tool_missing");
        let result = Registry::new().import(payload);
        assert!(matches!(result, Err(TranscodeError::Malformed { .. })));
    }

    #[test]
    fn test_terminal_synthesis_on_export() {
        let registry = Registry::new();
        let json = registry
            .export(&single_node_with_end_call(), Format::RetellFlow)
            .unwrap()
            .into_json()
            .unwrap();

        let nodes = json["nodes"].as_array().unwrap();
        assert_eq!(nodes.len(), 2);
        let edges = nodes[0]["edges"].as_array().unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0]["destination_node_id"], nodes[1]["id"]);
        assert_eq!(nodes[1]["type"], "end");
        // Terminal tools become nodes, not tools.
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn test_transfer_node_gets_failure_edge() {
        let json = Registry::new()
            .export(&support_graph(), Format::RetellFlow)
            .unwrap()
            .into_json()
            .unwrap();
        let transfer = json["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .find(|n| n["type"] == "transfer_call")
            .unwrap();
        assert_eq!(transfer["edge"]["destination_node_id"], "end_call");
        assert_eq!(transfer["transfer_destination"]["number"], "+15550199");
    }
}

#[cfg(test)]
mod vapi_tests {
    use super::*;

    #[test]
    fn test_assistant_import() {
        let graph = Registry::new().import(vapi_assistant()).unwrap();
        assert_eq!(graph.nodes().len(), 1);
        assert_eq!(graph.default_model(), Some("gpt-4o"));
        assert_eq!(graph.metadata().get("voice"), Some(&json!({ "provider": "11labs", "voiceId": "burt" })));

        let node = graph.entry_node();
        assert_eq!(node.id, "Receptionist");
        assert_eq!(node.prompt, "You book appointments for a clinic.");
        assert_eq!(node.metadata_str(GREETING_KEY), Some("Hi, this is Riley. How can I help?"));

        let kinds: Vec<(&str, &ToolKind)> = node.tools.iter().map(|t| (t.name.as_str(), &t.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("book_appointment", &ToolKind::Custom),
                ("transfer_call", &ToolKind::TransferCall),
                ("end_call", &ToolKind::EndCall),
            ]
        );
        assert_eq!(node.tools[0].url.as_deref(), Some("https://hooks.clinic.test/book"));
    }

    #[test]
    fn test_assistant_round_trip() {
        let registry = Registry::new();
        let (first, second) = round_trip(&registry, Payload::Json(vapi_assistant()), Format::Vapi);
        assert_eq!(first, second);

        let json = registry.export(&first, Format::Vapi).unwrap().into_json().unwrap();
        assert_eq!(json["endCallFunctionEnabled"], true);
        assert_eq!(json["model"]["tools"].as_array().unwrap().len(), 2);
        assert_eq!(json["model"]["temperature"], 0.3);
    }

    #[test]
    fn test_squad_import() {
        let graph = Registry::new().import(vapi_squad()).unwrap();
        assert_eq!(graph.nodes().len(), 2);
        assert_eq!(graph.entry_node_id(), "Intake");
        assert_eq!(graph.metadata_str("name"), Some("Clinic Squad"));

        let handoff = &graph.entry_node().transitions[0];
        assert_eq!(handoff.target_node_id, "Billing");
        assert_eq!(
            handoff.condition,
            Condition::prompt("The caller has a question about a bill")
        );
        assert_eq!(handoff.description.as_deref(), Some("Let me connect you with billing."));
        assert_eq!(graph.node("Billing").unwrap().metadata_str("model"), Some("gpt-4o-mini"));
    }

    #[test]
    fn test_squad_round_trip() {
        let registry = Registry::new();
        let (first, second) = round_trip(&registry, Payload::Json(vapi_squad()), Format::Vapi);
        assert_eq!(first, second);
    }

    #[test]
    fn test_global_prompt_rides_on_entry_assistant() {
        let registry = Registry::new();
        let graph = registry.import(retell_llm_four_states()).unwrap();

        let json = registry.export(&graph, Format::Vapi).unwrap().into_json().unwrap();
        let messages = json["members"][0]["assistant"]["model"]["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["content"], "You are the front desk of Acme Dental. Be brief.");
        assert_eq!(json["members"][1]["assistant"]["model"]["messages"].as_array().unwrap().len(), 1);

        let again = registry.import_as(Format::Vapi, json).unwrap();
        assert_eq!(
            again.metadata_str(GLOBAL_PROMPT_KEY),
            Some("You are the front desk of Acme Dental. Be brief.")
        );
        assert_eq!(again.entry_node().prompt, "Greet the caller and ask how you can help.");
    }

    #[test]
    fn test_padded_member_names_still_resolve() {
        let mut squad = vapi_squad();
        squad["members"][1]["assistant"]["name"] = json!("  Billing ");
        squad["members"][0]["assistantDestinations"][0]["assistantName"] = json!("  Billing ");

        let graph = Registry::new().import(squad).unwrap();
        assert!(graph.node("Billing").is_some());
        assert!(graph.entry_node().has_transition_to("Billing"));
    }

    #[test]
    fn test_multi_node_graph_exports_as_squad_led_by_entry() {
        let registry = Registry::new();
        let mut payload = retell_llm_four_states();
        payload["starting_state"] = json!("billing");
        let graph = registry.import(payload).unwrap();

        let json = registry.export(&graph, Format::Vapi).unwrap().into_json().unwrap();
        let members = json["members"].as_array().unwrap();
        assert_eq!(members.len(), 4);
        assert_eq!(members[0]["assistant"]["name"], "billing");
        assert_eq!(members[0]["assistantDestinations"][0]["assistantName"], "wrap_up");
    }
}

#[cfg(test)]
mod bland_tests {
    use super::*;

    #[test]
    fn test_pathway_import() {
        let graph = Registry::new().import(bland_pathway()).unwrap();
        assert_eq!(graph.nodes().len(), 2);
        assert_eq!(graph.entry_node_id(), "1");
        assert_eq!(graph.metadata_str(GLOBAL_PROMPT_KEY), Some("Stay friendly and concise."));

        let intro = graph.entry_node();
        assert_eq!(intro.prompt, "Introduce yourself and ask about their budget.");
        assert_eq!(intro.metadata_str(GREETING_KEY), Some("Hey there, this is Sam from Acme."));
        assert_eq!(intro.metadata_str(DISPLAY_NAME_KEY), Some("Intro"));
        assert_eq!(intro.tools[0].name, "score_lead");
        assert_eq!(intro.transitions[0].condition, Condition::prompt("Budget captured"));

        assert_eq!(graph.node("2").unwrap().kind(), NodeKind::End);
    }

    #[test]
    fn test_round_trip() {
        let registry = Registry::new();
        let (first, second) = round_trip(&registry, Payload::Json(bland_pathway()), Format::Bland);
        assert_eq!(first, second);
    }

    #[test]
    fn test_unlabelled_edges_are_unconditional() {
        let payload = json!({
            "nodes": [
                { "id": "a", "data": { "prompt": "One", "isStart": true } },
                { "id": "b", "data": { "prompt": "Two" } },
                { "id": "c", "data": { "prompt": "Three" } }
            ],
            "edges": [
                { "source": "a", "target": "b" },
                { "source": "b", "target": "c", "data": { "label": "Caller agreed" } }
            ]
        });
        let graph = Registry::new().import(payload).unwrap();
        assert_eq!(graph.node("a").unwrap().transitions[0].condition, Condition::Always);
        assert_eq!(
            graph.node("b").unwrap().transitions[0].condition,
            Condition::prompt("Caller agreed")
        );
    }

    #[test]
    fn test_terminal_synthesis_on_export() {
        let json = Registry::new()
            .export(&single_node_with_end_call(), Format::Bland)
            .unwrap()
            .into_json()
            .unwrap();
        assert_eq!(json["nodes"].as_array().unwrap().len(), 2);
        let edges = json["edges"].as_array().unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0]["source"], "main");
        assert_eq!(json["nodes"][1]["type"], "End Call");
    }
}

#[cfg(test)]
mod livekit_tests {
    use super::*;

    #[test]
    fn test_mined_agents_and_handoffs() {
        let graph = Registry::new()
            .import(Payload::Source(LIVEKIT_SOURCE.to_string()))
            .unwrap();

        assert_eq!(graph.nodes().len(), 2);
        assert_eq!(graph.entry_node_id(), "Greeter");
        assert_eq!(graph.default_model(), Some("gpt-4o-mini"));

        let greeter = graph.entry_node();
        assert_eq!(greeter.prompt, "Greet the caller and find out what they need.");
        assert_eq!(greeter.metadata_str(GREETING_KEY), Some("Welcome the caller warmly."));
        assert_eq!(greeter.transitions.len(), 1);
        assert_eq!(greeter.transitions[0].target_node_id, "Billing");
        assert_eq!(
            greeter.transitions[0].condition,
            Condition::prompt("The caller has a billing question.")
        );
        assert_eq!(greeter.tools.len(), 1);
        assert_eq!(greeter.tools[0].kind, ToolKind::EndCall);

        let billing = graph.node("Billing").unwrap();
        assert_eq!(billing.prompt, "Help with invoices and payments.");
        let lookup = billing.tool("lookup_invoice").unwrap();
        assert_eq!(lookup.kind, ToolKind::FunctionTool);
        assert_eq!(
            lookup.parameters,
            json!({
                "type": "object",
                "properties": {
                    "invoice_id": { "type": "string" },
                    "year": { "type": "integer" }
                },
                "required": ["invoice_id"]
            })
        );
    }

    #[test]
    fn test_source_without_agents_yields_fallback_node() {
        let graph = Registry::new()
            .import(Payload::Source(LIVEKIT_NO_AGENT.to_string()))
            .unwrap();
        assert_eq!(graph.nodes().len(), 1);
        assert_eq!(graph.entry_node_id(), "agent");
        assert_eq!(graph.entry_node().prompt, "Answer questions about opening hours.");
        assert_eq!(graph.default_model(), Some("openai/gpt-4o"));
    }

    #[test]
    fn test_subclass_inherits_instructions() {
        let source = r#"from livekit.agents import Agent

class Base(Agent):
    def __init__(self) -> None:
        super().__init__(instructions="Shared persona.")

class Spanish(Base):
    pass
"#;
        let graph = Registry::new()
            .import(Payload::Source(source.to_string()))
            .unwrap();
        assert_eq!(graph.node("Spanish").unwrap().prompt, "Shared persona.");
    }

    #[test]
    fn test_round_trip() {
        let registry = Registry::new();
        let (first, second) = round_trip(
            &registry,
            Payload::Source(LIVEKIT_SOURCE.to_string()),
            Format::LiveKit,
        );
        assert_eq!(first, second);
    }

    #[test]
    fn test_json_graphs_render_as_python() {
        let registry = Registry::new();
        let graph = registry.import(vapi_squad()).unwrap();
        let native = registry.export(&graph, Format::LiveKit).unwrap();
        let source = native.as_text().unwrap();

        assert!(source.contains("class Intake(Agent):"));
        assert!(source.contains("class Billing(Agent):"));
        assert!(source.contains("return Billing()"));
        assert!(source.contains("await session.start(agent=Intake(), room=ctx.room)"));

        let mined = registry.import(Payload::Source(source.to_string())).unwrap();
        assert_eq!(mined.entry_node_id(), "Intake");
        assert!(mined.entry_node().has_transition_to("Billing"));
    }
}

#[cfg(test)]
mod survey_tests {
    use super::*;
    use voxflow::vendors::survey::{QUESTION_TYPE_KEY, RELEVANT_KEY};

    #[test]
    fn test_skip_logic_becomes_conditional_edge() {
        let graph = Registry::new()
            .import(Payload::Table(SURVEY_CSV.to_string()))
            .unwrap();
        assert_eq!(graph.nodes().len(), 3);
        assert_eq!(graph.entry_node_id(), "smoker");

        let smoker = graph.node("smoker").unwrap();
        let to_cigarettes = smoker
            .transitions
            .iter()
            .find(|t| t.target_node_id == "cigarettes")
            .expect("skip-logic edge");
        assert!(to_cigarettes.condition.text().contains("yes"));
        assert!(smoker.has_transition_to("age"));

        let cigarettes = graph.node("cigarettes").unwrap();
        assert_eq!(cigarettes.metadata_str(RELEVANT_KEY), Some("${smoker} = 'yes'"));
        assert_eq!(cigarettes.metadata_str(QUESTION_TYPE_KEY), Some("integer"));
        assert_eq!(graph.node("age").unwrap().prompt, "How old are you?\n\nIn years");
    }

    #[test]
    fn test_redcap_dictionary() {
        let graph = Registry::new()
            .import(Payload::Table(REDCAP_CSV.to_string()))
            .unwrap();
        let consent = graph.node("consent").unwrap();
        assert_eq!(consent.prompt, "Do you consent to the survey?");
        assert_eq!(
            consent.transitions[0].condition,
            Condition::prompt("The answer to consent is \"1\"")
        );
    }

    #[test]
    fn test_groups_survive_round_trip() {
        let csv = "type,name,label
begin_group,household,Household
integer,members,How many people live with you?
end_group,,
text,comments,Anything else?
";
        let registry = Registry::new();
        let (first, second) = round_trip(&registry, Payload::Table(csv.to_string()), Format::Survey);
        assert_eq!(first, second);
        assert_eq!(first.node("members").unwrap().metadata_str("group"), Some("household"));
        assert!(first.node("comments").unwrap().metadata_str("group").is_none());
    }

    #[test]
    fn test_round_trip() {
        let registry = Registry::new();
        let (first, second) =
            round_trip(&registry, Payload::Table(SURVEY_CSV.to_string()), Format::Survey);
        assert_eq!(first, second);
    }

    #[test]
    fn test_graphs_with_callable_tools_cannot_become_surveys() {
        let result = Registry::new().export(&support_graph(), Format::Survey);
        assert!(matches!(result, Err(TranscodeError::UnsupportedTarget { .. })));
    }

    #[test]
    fn test_branching_graph_cannot_become_a_survey() {
        let a = Node::new("a", "Do you smoke?")
            .with_transition(Transition::new("c", Condition::prompt("The caller is a smoker")));
        let b = Node::new("b", "How old are you?")
            .with_transition(Transition::new("a", Condition::prompt("Retry")));
        let c = Node::new("c", "How many per day?");
        let graph = Graph::new(vec![a, b, c], "a").unwrap();

        let result = Registry::new().export(&graph, Format::Survey);
        match result {
            Err(TranscodeError::UnsupportedTarget { .. }) => {}
            other => panic!("expected unsupported target, got {:?}", other),
        }
    }

    #[test]
    fn test_linear_graph_exports_as_survey() {
        let a = Node::new("a", "Do you smoke?")
            .with_transition(Transition::new("b", Condition::Always));
        let b = Node::new("b", "How old are you?");
        let graph = Graph::new(vec![a, b], "a").unwrap();

        let registry = Registry::new();
        let native = registry.export(&graph, Format::Survey).unwrap();
        let again = registry
            .import_as(Format::Survey, Payload::Table(native.as_text().unwrap().to_string()))
            .unwrap();
        assert_eq!(again.entry_node_id(), "a");
        assert_eq!(again.entry_node().transitions, graph.entry_node().transitions);
    }

    #[test]
    fn test_survey_entry_must_be_first_row() {
        let a = Node::new("a", "First?");
        let b = Node::new("b", "Second?").with_transition(Transition::new("a", Condition::Always));
        let graph = Graph::new(vec![a, b], "b").unwrap();
        let result = Registry::new().export(&graph, Format::Survey);
        assert!(matches!(result, Err(TranscodeError::UnsupportedTarget { .. })));
    }

    #[test]
    fn test_empty_survey_is_malformed() {
        let result = Registry::new().import_as(Format::Survey, Payload::Table("name,label\n".to_string()));
        assert!(matches!(result, Err(TranscodeError::Malformed { .. })));
    }
}

#[cfg(test)]
mod cross_vendor_tests {
    use super::*;

    #[test]
    fn test_retell_llm_to_bland_synthesizes_end_node() {
        let registry = Registry::new();
        let graph = registry.import(retell_llm_four_states()).unwrap();
        let json = registry.export(&graph, Format::Bland).unwrap().into_json().unwrap();

        let nodes = json["nodes"].as_array().unwrap();
        assert_eq!(nodes.len(), 5);
        assert!(nodes.iter().any(|n| n["type"] == "End Call"));
        assert_eq!(json["edges"].as_array().unwrap().len(), 5);
        assert_eq!(json["globalConfig"]["globalPrompt"], "You are the front desk of Acme Dental. Be brief.");
    }

    #[test]
    fn test_bland_to_retell_flow_keeps_global_prompt_and_end_node() {
        let registry = Registry::new();
        let graph = registry.import(bland_pathway()).unwrap();
        let json = registry.export(&graph, Format::RetellFlow).unwrap().into_json().unwrap();

        assert_eq!(json["global_prompt"], "Stay friendly and concise.");
        assert_eq!(json["start_node_id"], "1");
        assert_eq!(json["nodes"][1]["type"], "end");
        assert_eq!(json["tools"][0]["name"], "score_lead");
    }

    #[test]
    fn test_every_exporter_preserves_entry_through_reimport() {
        let registry = Registry::new();
        let graph = registry.import(vapi_squad()).unwrap();
        for format in [Format::RetellLlm, Format::RetellFlow, Format::Vapi, Format::Bland, Format::LiveKit] {
            let native = registry.export(&graph, format).unwrap();
            let payload = match native {
                Native::Json(value) => Payload::Json(value),
                Native::Source(text) => Payload::Source(text),
                Native::Table(text) => Payload::Table(text),
            };
            let again = registry.import_as(format, payload).unwrap();
            assert_eq!(again.entry_node_id(), "Intake", "entry lost through {}", format);
        }
    }
}
