//! End-to-end tests of the HTTP API over an in-memory store

mod common;

use axum::http::StatusCode;
use common::{create_test_app, create_test_app_with};
use deskbot_core::testing::MockEmbedder;
use deskbot_core::{BotConfig, BotResponse, KnowledgeEntry, PausedChannel, ResponseStatus, Ticket};
use deskbot_server::ErrorResponse;
use deskbot_server::http::{HealthResponse, ResumeResponse, TicketDetail};
use serde_json::{Value, json};

fn message_event(channel_id: &str, content: &str) -> Value {
    json!({
        "type": "message",
        "channel_id": channel_id,
        "guild_id": "g1",
        "channel_name": "suporte",
        "user_id": "u1",
        "username": "ana",
        "content": content,
    })
}

#[tokio::test]
async fn health_reports_version() {
    let app = create_test_app(false).await;

    let response = app.server.get("/api/health").await;

    response.assert_status_ok();
    let body: HealthResponse = response.json();
    assert_eq!(body.status, "ok");
    assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn knowledge_create_list_search_delete() {
    let embedder = MockEmbedder::new()
        .with_vector("Reembolso Até 30 dias", vec![1.0, 0.0])
        .with_vector("reembolso", vec![1.0, 0.0])
        .with_vector("horário", vec![0.0, 1.0]);
    let app = create_test_app_with(false, embedder).await;

    let created = app
        .server
        .post("/api/knowledge")
        .json(&json!({"subject": " Reembolso ", "information": "Até 30 dias"}))
        .await;
    created.assert_status(StatusCode::CREATED);
    let entry: KnowledgeEntry = created.json();
    assert_eq!(entry.subject, "Reembolso");
    assert!(entry.has_embedding());

    let listed: Vec<KnowledgeEntry> = app.server.get("/api/knowledge").await.json();
    assert_eq!(listed.len(), 1);

    let hits: Vec<Value> = app
        .server
        .get("/api/knowledge/search")
        .add_query_param("q", "reembolso")
        .await
        .json();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["subject"], "Reembolso");

    let misses: Vec<Value> = app
        .server
        .get("/api/knowledge/search")
        .add_query_param("q", "horário")
        .await
        .json();
    assert!(misses.is_empty());

    app.server
        .delete(&format!("/api/knowledge/{}", entry.id))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    app.server
        .delete(&format!("/api/knowledge/{}", entry.id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_knowledge_is_rejected() {
    let app = create_test_app(false).await;

    let response = app
        .server
        .post("/api/knowledge")
        .json(&json!({"subject": "   ", "information": "x"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "VALIDATION_ERROR");
}

#[tokio::test]
async fn search_provider_failure_is_bad_gateway() {
    let app = create_test_app_with(false, MockEmbedder::failing()).await;
    app.server
        .post("/api/knowledge")
        .json(&json!({"subject": "Reembolso", "information": "30 dias"}))
        .await
        .assert_status(StatusCode::CREATED);
    // the entry needs a vector so that search has to embed the query
    let working = MockEmbedder::new().with_default(vec![1.0, 0.0]);
    deskbot_core::knowledge::backfill_embeddings(app.state.store.as_ref(), &working)
        .await
        .unwrap();

    let response = app
        .server
        .get("/api/knowledge/search")
        .add_query_param("q", "reembolso")
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "PROVIDER_ERROR");
}

#[tokio::test]
async fn message_event_is_answered_and_recorded() {
    let app = create_test_app(false).await;

    let outcome: Value = app
        .server
        .post("/api/events")
        .json(&message_event("c1", "Qual o prazo de reembolso?"))
        .await
        .json();

    assert_eq!(outcome["kind"], "ingested");
    assert_eq!(outcome["result"]["outcome"], "answered");
    assert_eq!(outcome["result"]["delivery"]["delivery"], "sent");
    assert_eq!(app.sink.sent().len(), 1);

    let tickets: Vec<Ticket> = app.server.get("/api/tickets").await.json();
    assert_eq!(tickets.len(), 1);
    let detail: TicketDetail = app
        .server
        .get(&format!("/api/tickets/{}", tickets[0].id))
        .await
        .json();
    assert_eq!(detail.responses.len(), 1);
    assert_eq!(detail.responses[0].status, ResponseStatus::Sent);

    let stats: Value = app.server.get("/api/stats").await.json();
    assert_eq!(stats["total_tickets"], 1);
    assert_eq!(stats["sent_responses"], 1);
}

#[tokio::test]
async fn approval_flow_over_http() {
    let app = create_test_app(true).await;
    let outcome: Value = app
        .server
        .post("/api/events")
        .json(&message_event("c1", "Meu pedido não chegou"))
        .await
        .json();
    assert!(app.sink.sent().is_empty());

    let pending: Vec<BotResponse> = app.server.get("/api/bot-responses/pending").await.json();
    assert_eq!(pending.len(), 1);
    let id = pending[0].id;
    assert_eq!(outcome["kind"], "awaiting_approval");
    assert_eq!(outcome["buttons"][0], format!("approve_{id}"));
    assert_eq!(outcome["buttons"][1], format!("reject_{id}"));

    let delivery: Value = app
        .server
        .post(&format!("/api/bot-responses/{id}/approve"))
        .await
        .json();
    assert_eq!(delivery["delivery"], "sent");
    assert_eq!(delivery["response"]["status"], "sent");
    assert_eq!(app.sink.sent().len(), 1);

    let reject = app
        .server
        .post(&format!("/api/bot-responses/{id}/reject"))
        .await;
    reject.assert_status(StatusCode::CONFLICT);
    let body: ErrorResponse = reject.json();
    assert_eq!(body.code, "INVALID_TRANSITION");

    let pending: Vec<BotResponse> = app.server.get("/api/bot-responses/pending").await.json();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn failed_delivery_shows_up_as_undelivered() {
    let app = create_test_app(false).await;
    app.sink.set_failing(true);

    app.server
        .post("/api/events")
        .json(&message_event("c1", "oi"))
        .await
        .assert_status_ok();

    let undelivered: Vec<BotResponse> =
        app.server.get("/api/bot-responses/undelivered").await.json();
    assert_eq!(undelivered.len(), 1);
    assert_eq!(undelivered[0].status, ResponseStatus::Approved);

    app.sink.set_failing(false);
    app.server
        .post(&format!("/api/bot-responses/{}/approve", undelivered[0].id))
        .await
        .assert_status_ok();
    let undelivered: Vec<BotResponse> =
        app.server.get("/api/bot-responses/undelivered").await.json();
    assert!(undelivered.is_empty());
}

#[tokio::test]
async fn unknown_and_malformed_response_ids() {
    let app = create_test_app(true).await;

    app.server
        .post(&format!("/api/bot-responses/{}/approve", deskbot_core::ResponseId::new()))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.server
        .post("/api/bot-responses/not-a-uuid/reject")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn config_patch_is_partial_and_validated() {
    let app = create_test_app(false).await;

    let updated: BotConfig = app
        .server
        .patch("/api/config")
        .json(&json!({"require_approval": true, "max_tokens": 800}))
        .await
        .json();
    assert!(updated.require_approval);
    assert_eq!(updated.max_tokens, 800);
    assert!(updated.auto_respond);

    app.server
        .patch("/api/config")
        .json(&json!({"max_tokens": 0}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let current: BotConfig = app.server.get("/api/config").await.json();
    assert_eq!(current.max_tokens, 800);
}

#[tokio::test]
async fn paused_channel_suppresses_ingestion() {
    let app = create_test_app(false).await;
    let pause = json!({"channel_id": "c1", "guild_id": "g1", "channel_name": "suporte"});

    let first: PausedChannel = app.server.post("/api/channels/paused").json(&pause).await.json();
    let second: PausedChannel = app.server.post("/api/channels/paused").json(&pause).await.json();
    assert_eq!(first.id, second.id);

    let outcome: Value = app
        .server
        .post("/api/events")
        .json(&message_event("c1", "oi"))
        .await
        .json();
    assert_eq!(outcome["result"]["outcome"], "skipped");
    assert_eq!(outcome["result"]["reason"], "channel_paused");
    let tickets: Vec<Ticket> = app.server.get("/api/tickets").await.json();
    assert!(tickets.is_empty());

    let resumed: ResumeResponse = app.server.delete("/api/channels/paused/c1").await.json();
    assert!(resumed.resumed);
    let paused: Vec<PausedChannel> = app.server.get("/api/channels/paused").await.json();
    assert!(paused.is_empty());
}

#[tokio::test]
async fn reaction_event_records_feedback() {
    let app = create_test_app(false).await;
    app.server
        .post("/api/events")
        .json(&message_event("c1", "oi"))
        .await
        .assert_status_ok();
    let message_id = app.sink.sent()[0].message_id.clone();

    let outcome: Value = app
        .server
        .post("/api/events")
        .json(&json!({"type": "reaction", "message_id": message_id, "user_id": "u1", "emoji": "👎"}))
        .await
        .json();

    assert_eq!(outcome["kind"], "feedback_recorded");
    let feedback: Vec<Value> = app.server.get("/api/feedback").await.json();
    assert_eq!(feedback.len(), 1);
    assert_eq!(feedback[0]["rating"], 1);
}
