//! Common test fixtures: one realistic payload per vendor format.
use serde_json::{Value, json};
use voxflow::prelude::*;

/// Four-state Retell LLM. The first state branches to two others.
#[allow(dead_code)]
pub fn retell_llm_four_states() -> Value {
    json!({
        "llm_id": "llm_5f2c",
        "model": "gpt-4o",
        "general_prompt": "You are the front desk of Acme Dental. Be brief.",
        "begin_message": "Thanks for calling Acme Dental!",
        "general_tools": [
            {
                "type": "end_call",
                "name": "end_call",
                "description": "Hang up once the caller says goodbye."
            }
        ],
        "states": [
            {
                "name": "greeting",
                "state_prompt": "Greet the caller and ask how you can help.",
                "edges": [
                    {
                        "destination_state_name": "scheduling",
                        "description": "The caller wants to book or move an appointment"
                    },
                    {
                        "destination_state_name": "billing",
                        "description": "The caller has a billing question"
                    }
                ]
            },
            {
                "name": "scheduling",
                "state_prompt": "Collect a preferred date and time.",
                "edges": [
                    {
                        "destination_state_name": "wrap_up",
                        "description": "An appointment was booked"
                    }
                ],
                "tools": [
                    {
                        "type": "custom",
                        "name": "book_slot",
                        "description": "Books an appointment slot",
                        "url": "https://api.acme.test/book",
                        "speak_during_execution": true,
                        "parameters": {
                            "type": "object",
                            "properties": { "slot": { "type": "string" } },
                            "required": ["slot"]
                        }
                    }
                ]
            },
            {
                "name": "billing",
                "state_prompt": "Answer billing questions.",
                "edges": [
                    {
                        "destination_state_name": "wrap_up",
                        "description": "The billing question is resolved"
                    }
                ]
            },
            {
                "name": "wrap_up",
                "state_prompt": "Ask if there is anything else, then call end_call."
            }
        ]
    })
}

/// A bare Retell conversation flow with a function node and an end node.
#[allow(dead_code)]
pub fn retell_flow() -> Value {
    json!({
        "conversation_flow_id": "cf_91ab",
        "start_speaker": "agent",
        "start_node_id": "start",
        "global_prompt": "You are an order-status assistant.",
        "model_choice": { "type": "cascading", "model": "gpt-4.1" },
        "tools": [
            {
                "type": "custom",
                "name": "lookup_order",
                "tool_id": "tool_lookup",
                "description": "Fetches an order by number",
                "url": "https://api.shop.test/orders"
            }
        ],
        "nodes": [
            {
                "id": "start",
                "type": "conversation",
                "name": "Start",
                "instruction": { "type": "prompt", "text": "Ask for the order number." },
                "display_position": { "x": 0, "y": 0 },
                "edges": [
                    {
                        "id": "e1",
                        "destination_node_id": "lookup",
                        "transition_condition": {
                            "type": "prompt",
                            "prompt": "The caller gave an order number"
                        }
                    },
                    {
                        "id": "e2",
                        "destination_node_id": "goodbye",
                        "transition_condition": {
                            "type": "equation",
                            "equations": [
                                { "left": "{{attempts}}", "operator": ">=", "right": "3" }
                            ],
                            "operator": "&&"
                        }
                    }
                ]
            },
            {
                "id": "lookup",
                "type": "function",
                "name": "Lookup",
                "tool_id": "tool_lookup",
                "wait_for_result": true,
                "instruction": { "type": "prompt", "text": "Read the order status back." },
                "skip_response_edge": {
                    "id": "e3",
                    "destination_node_id": "goodbye",
                    "transition_condition": { "type": "prompt", "prompt": "Skip response" }
                }
            },
            {
                "id": "goodbye",
                "type": "end",
                "name": "Goodbye",
                "instruction": { "type": "static_text", "text": "Thanks for calling, goodbye!" }
            }
        ]
    })
}

/// The UI-importable agent: agent settings with the flow nested inside.
#[allow(dead_code)]
pub fn retell_agent_envelope() -> Value {
    json!({
        "agent_name": "Order Desk",
        "voice_id": "11labs-Adrian",
        "language": "en-US",
        "response_engine": { "type": "conversation-flow" },
        "conversationFlow": retell_flow()
    })
}

/// Flow fields both at the top level and inside the wrapper.
#[allow(dead_code)]
pub fn retell_ambiguous_envelope() -> Value {
    let mut outer = retell_flow();
    if let Some(object) = outer.as_object_mut() {
        object.insert("conversationFlow".to_string(), retell_flow());
    }
    outer
}

/// A single Vapi assistant with a function tool and a transfer tool.
#[allow(dead_code)]
pub fn vapi_assistant() -> Value {
    json!({
        "name": "Receptionist",
        "firstMessage": "Hi, this is Riley. How can I help?",
        "endCallFunctionEnabled": true,
        "voice": { "provider": "11labs", "voiceId": "burt" },
        "model": {
            "provider": "openai",
            "model": "gpt-4o",
            "temperature": 0.3,
            "messages": [
                { "role": "system", "content": "You book appointments for a clinic." }
            ],
            "tools": [
                {
                    "type": "function",
                    "async": false,
                    "function": {
                        "name": "book_appointment",
                        "description": "Books a visit",
                        "parameters": {
                            "type": "object",
                            "properties": { "date": { "type": "string" } }
                        }
                    },
                    "server": { "url": "https://hooks.clinic.test/book" }
                },
                {
                    "type": "transferCall",
                    "destinations": [
                        { "type": "number", "number": "+15550100" }
                    ]
                }
            ]
        }
    })
}

/// A two-member Vapi squad; the intake assistant hands off to billing.
#[allow(dead_code)]
pub fn vapi_squad() -> Value {
    json!({
        "name": "Clinic Squad",
        "members": [
            {
                "assistant": {
                    "name": "Intake",
                    "firstMessage": "Hello! What brings you in today?",
                    "model": {
                        "model": "gpt-4o",
                        "messages": [ { "role": "system", "content": "Triage the caller." } ]
                    }
                },
                "assistantDestinations": [
                    {
                        "type": "assistant",
                        "assistantName": "Billing",
                        "description": "The caller has a question about a bill",
                        "message": "Let me connect you with billing."
                    }
                ]
            },
            {
                "assistant": {
                    "name": "Billing",
                    "model": {
                        "model": "gpt-4o-mini",
                        "messages": [ { "role": "system", "content": "Resolve billing questions." } ]
                    }
                }
            }
        ]
    })
}

/// A Bland pathway: start node, webhook tool, labelled edge to an end node.
#[allow(dead_code)]
pub fn bland_pathway() -> Value {
    json!({
        "name": "Lead Qualifier",
        "globalConfig": { "globalPrompt": "Stay friendly and concise." },
        "nodes": [
            {
                "id": "1",
                "type": "Default",
                "position": { "x": 120, "y": 40 },
                "data": {
                    "name": "Intro",
                    "isStart": true,
                    "text": "Hey there, this is Sam from Acme.",
                    "prompt": "Introduce yourself and ask about their budget.",
                    "modelOptions": { "temperature": 0.2 },
                    "tools": [
                        {
                            "name": "score_lead",
                            "type": "custom",
                            "description": "Scores the lead",
                            "url": "https://crm.test/score"
                        }
                    ]
                }
            },
            {
                "id": "2",
                "type": "End Call",
                "data": { "name": "Wrap up", "prompt": "Thank them and hang up." }
            }
        ],
        "edges": [
            { "id": "reactflow__edge-1-2", "source": "1", "target": "2", "label": "Budget captured" }
        ]
    })
}

/// A LiveKit worker with a greeter that hands off to a billing agent.
#[allow(dead_code)]
pub const LIVEKIT_SOURCE: &str = r#"from livekit.agents import Agent, AgentSession, JobContext, RunContext, WorkerOptions, cli, function_tool
from livekit.plugins import openai


class Greeter(Agent):
    def __init__(self) -> None:
        super().__init__(instructions="Greet the caller and find out what they need.")

    async def on_enter(self) -> None:
        await self.session.generate_reply(instructions="Welcome the caller warmly.")

    @function_tool()
    async def transfer_to_billing(self, context: RunContext):
        """The caller has a billing question."""
        return Billing(), "Transferring you to billing"

    @function_tool()
    async def end_call(self, context: RunContext):
        """End the call once the caller is done."""
        return None


class Billing(Agent):
    def __init__(self) -> None:
        super().__init__(
            instructions="Help with invoices and payments."
        )

    @function_tool()
    async def lookup_invoice(self, context: RunContext, invoice_id: str, year: int = 2024):
        """Look up an invoice by id."""
        return {"status": "paid"}


async def entrypoint(ctx: JobContext):
    await ctx.connect()
    session = AgentSession(llm=openai.LLM(model="gpt-4o-mini"))
    await session.start(agent=Greeter(), room=ctx.room)


if __name__ == "__main__":
    cli.run_app(WorkerOptions(entrypoint_fnc=entrypoint))
"#;

/// Source that talks to LiveKit but declares no agent class.
#[allow(dead_code)]
pub const LIVEKIT_NO_AGENT: &str = r#"from livekit import agents

async def entrypoint(ctx):
    session = agents.AgentSession(llm="openai/gpt-4o")
    await session.generate_reply(instructions="Answer questions about opening hours.")
"#;

/// Three questions; the third only applies to smokers.
#[allow(dead_code)]
pub const SURVEY_CSV: &str = "type,name,label,hint,relevant,required
select_one yes_no,smoker,Do you smoke?,,,yes
integer,age,How old are you?,In years,,yes
integer,cigarettes,How many cigarettes per day?,,${smoker} = 'yes',
";

/// A REDCap data dictionary with a group-free branching field.
#[allow(dead_code)]
pub const REDCAP_CSV: &str = "Variable / Field Name,Form Name,Field Type,Field Label,\"Choices, Calculations, OR Slider Labels\",Branching Logic (Show field only if...)
consent,intake,yesno,Do you consent to the survey?,,
age,intake,text,What is your age?,,[consent] = '1'
";

/// A canonical graph with one node whose prompt names its end-call tool.
#[allow(dead_code)]
pub fn single_node_with_end_call() -> Graph {
    let node = Node::new("main", "Help the caller, then use end_call to hang up.")
        .with_tool(Tool::new("end_call", ToolKind::EndCall));
    Graph::new(vec![node], "main").expect("valid graph")
}

/// A canonical graph with a transfer tool, an end tool and a custom tool.
#[allow(dead_code)]
pub fn support_graph() -> Graph {
    let transfer = Tool::new("transfer_to_human", ToolKind::TransferCall)
        .with_description("Warm transfer to a human agent")
        .with_metadata("transfer_destination", json!({ "type": "predefined", "number": "+15550199" }));
    let end = Tool::new("end_call", ToolKind::EndCall);
    let lookup = Tool::new("lookup_account", ToolKind::Custom).with_description("Finds an account");

    let triage = Node::new(
        "triage",
        "Find out what the caller needs. If they ask for a person, use transfer_to_human.",
    )
    .with_tool(lookup.clone())
    .with_tool(transfer.clone())
    .with_transition(Transition::new("resolve", Condition::prompt("The issue is understood")));
    let resolve = Node::new("resolve", "Resolve the issue. When done, call end_call.")
        .with_tool(lookup)
        .with_tool(end)
        .with_tool(transfer);

    Graph::new(vec![triage, resolve], "triage").expect("valid graph")
}
