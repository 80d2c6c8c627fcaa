use actix_web::{delete, get, post, put, web, App, HttpResponse, HttpServer, Responder};
use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use faqmatch::{EntryDraft, EntryPatch, KnowledgeStore, SessionManager, Settings};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    conversation_id: Option<String>,
    message: String,
}

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
}

fn not_found(what: &str, id: &str) -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "error": format!("{} not found: {}", what, id) }))
}

// --- Chat endpoints ---
#[post("/chat")]
async fn chat_endpoint(
    req: web::Json<ChatRequest>,
    sessions: web::Data<SessionManager>,
) -> impl Responder {
    let req = req.into_inner();
    let turn = sessions.turn(req.conversation_id, &req.message).await;
    HttpResponse::Ok().json(turn)
}

#[get("/chat/{id}/history")]
async fn history_endpoint(
    path: web::Path<String>,
    sessions: web::Data<SessionManager>,
) -> impl Responder {
    let id = path.into_inner();
    match sessions.history(&id).await {
        Some(context) => HttpResponse::Ok().json(context),
        None => not_found("conversation", &id),
    }
}

#[delete("/chat/{id}")]
async fn end_chat_endpoint(
    path: web::Path<String>,
    sessions: web::Data<SessionManager>,
) -> impl Responder {
    let id = path.into_inner();
    if sessions.end(&id) {
        HttpResponse::NoContent().finish()
    } else {
        not_found("conversation", &id)
    }
}

// --- Knowledge management endpoints ---
#[get("/knowledge")]
async fn list_knowledge(
    params: web::Query<SearchParams>,
    sessions: web::Data<SessionManager>,
) -> impl Responder {
    let store = sessions.store().read();
    match params.q.as_deref() {
        Some(q) => HttpResponse::Ok().json(store.search(q)),
        None => HttpResponse::Ok().json(store.all()),
    }
}

#[post("/knowledge")]
async fn add_knowledge(
    draft: web::Json<EntryDraft>,
    sessions: web::Data<SessionManager>,
) -> impl Responder {
    match sessions.store().write().add(draft.into_inner()) {
        Ok(entry) => HttpResponse::Created().json(entry),
        Err(e) => HttpResponse::UnprocessableEntity().json(json!({ "error": e.to_string() })),
    }
}

#[get("/knowledge/{id}")]
async fn get_knowledge(
    path: web::Path<String>,
    sessions: web::Data<SessionManager>,
) -> impl Responder {
    let id = path.into_inner();
    match sessions.store().read().get_by_id(&id) {
        Some(entry) => HttpResponse::Ok().json(entry),
        None => not_found("knowledge entry", &id),
    }
}

#[put("/knowledge/{id}")]
async fn update_knowledge(
    path: web::Path<String>,
    patch: web::Json<EntryPatch>,
    sessions: web::Data<SessionManager>,
) -> impl Responder {
    let id = path.into_inner();
    match sessions.store().write().update(&id, patch.into_inner()) {
        Ok(Some(entry)) => HttpResponse::Ok().json(entry),
        Ok(None) => not_found("knowledge entry", &id),
        Err(e) => HttpResponse::UnprocessableEntity().json(json!({ "error": e.to_string() })),
    }
}

#[delete("/knowledge/{id}")]
async fn delete_knowledge(
    path: web::Path<String>,
    sessions: web::Data<SessionManager>,
) -> impl Responder {
    let id = path.into_inner();
    match sessions.store().write().delete(&id) {
        Some(entry) => HttpResponse::Ok().json(entry),
        None => not_found("knowledge entry", &id),
    }
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(chat_endpoint)
        .service(history_endpoint)
        .service(end_chat_endpoint)
        .service(list_knowledge)
        .service(add_knowledge)
        .service(get_knowledge)
        .service(update_knowledge)
        .service(delete_knowledge);
}

#[actix_web::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load("Config").context("Failed to load configuration")?;

    let store = match &settings.data.knowledge_file {
        Some(path) => KnowledgeStore::load_jsonl(path)
            .with_context(|| format!("Failed to load knowledge file {:?}", path))?,
        None => {
            log::warn!("No data.knowledge_file configured; starting with an empty knowledge store.");
            KnowledgeStore::new()
        }
    };

    let resolver = settings.build_resolver().context("Failed to build resolver")?;
    log::info!(
        "Initializing FAQ matcher with {} entries ({:?})...",
        store.len(),
        resolver
    );
    let sessions = SessionManager::new(
        Arc::new(RwLock::new(store)),
        resolver,
        settings.build_composer(),
    )
    .with_response_delay(settings.response_delay());
    let data = web::Data::new(sessions);

    let host = settings.server.host.clone();
    let port = settings.server.port;
    log::info!("Starting server at http://{}:{}", host, port);
    HttpServer::new(move || App::new().app_data(data.clone()).configure(routes))
    .bind((host, port))?
    .run()
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test::{call_service, init_service, read_body_json, TestRequest};
    use faqmatch::{ChatTurn, IntentResolver, KnowledgeEntry, ResponseComposer};
    use serde_json::Value;

    fn sessions() -> web::Data<SessionManager> {
        let mut store = KnowledgeStore::new();
        store
            .add(EntryDraft::new("what are your business hours", "Mon-Fri 9-5").category("hours"))
            .unwrap();
        store
            .add(EntryDraft::new("refund policy", "30 days").category("billing"))
            .unwrap();
        web::Data::new(SessionManager::new(
            Arc::new(RwLock::new(store)),
            IntentResolver::default(),
            ResponseComposer::default(),
        ))
    }

    macro_rules! app {
        ($data:expr) => {
            init_service(App::new().app_data($data.clone()).configure(routes)).await
        };
    }

    // ---- knowledge ----

    #[actix_web::test]
    async fn test_add_knowledge_created() {
        let data = sessions();
        let app = app!(data);
        let req = TestRequest::post()
            .uri("/knowledge")
            .set_json(json!({ "pattern": "shipping time", "answer": "3-5 days" }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let entry: KnowledgeEntry = read_body_json(resp).await;
        assert_eq!(entry.answer, "3-5 days");
        assert!(data.store().read().get_by_id(&entry.id).is_some());
    }

    #[actix_web::test]
    async fn test_add_knowledge_missing_answer_unprocessable() {
        let data = sessions();
        let app = app!(data);
        let req = TestRequest::post()
            .uri("/knowledge")
            .set_json(json!({ "pattern": "shipping time" }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("answer"));
        assert_eq!(data.store().read().len(), 2);
    }

    #[actix_web::test]
    async fn test_update_blank_pattern_unprocessable() {
        let data = sessions();
        let app = app!(data);
        let req = TestRequest::put()
            .uri("/knowledge/kb-1")
            .set_json(json!({ "pattern": " " }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn test_unknown_knowledge_id_not_found() {
        let data = sessions();
        let app = app!(data);
        let requests = [
            TestRequest::get().uri("/knowledge/kb-404").to_request(),
            TestRequest::put()
                .uri("/knowledge/kb-404")
                .set_json(json!({ "answer": "changed" }))
                .to_request(),
            TestRequest::delete().uri("/knowledge/kb-404").to_request(),
        ];
        for req in requests {
            let resp = call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        }
    }

    #[actix_web::test]
    async fn test_get_update_delete_knowledge() {
        let data = sessions();
        let app = app!(data);

        let req = TestRequest::put()
            .uri("/knowledge/kb-2")
            .set_json(json!({ "answer": "60 days" }))
            .to_request();
        let updated: KnowledgeEntry = read_body_json(call_service(&app, req).await).await;
        assert_eq!(updated.answer, "60 days");
        assert_eq!(updated.pattern, "refund policy");

        let req = TestRequest::get().uri("/knowledge/kb-2").to_request();
        let fetched: KnowledgeEntry = read_body_json(call_service(&app, req).await).await;
        assert_eq!(fetched, updated);

        let req = TestRequest::delete().uri("/knowledge/kb-2").to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::OK);
        assert!(data.store().read().get_by_id("kb-2").is_none());
    }

    #[actix_web::test]
    async fn test_list_knowledge_with_query() {
        let data = sessions();
        let app = app!(data);

        let req = TestRequest::get().uri("/knowledge?q=HOURS").to_request();
        let hits: Vec<KnowledgeEntry> = read_body_json(call_service(&app, req).await).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "kb-1");

        let req = TestRequest::get().uri("/knowledge").to_request();
        let all: Vec<KnowledgeEntry> = read_body_json(call_service(&app, req).await).await;
        assert_eq!(all.len(), 2);
    }

    // ---- chat ----

    #[actix_web::test]
    async fn test_chat_history_and_end() {
        let data = sessions();
        let app = app!(data);

        let req = TestRequest::post()
            .uri("/chat")
            .set_json(json!({ "message": "what are your hours" }))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let turn: ChatTurn = read_body_json(resp).await;
        assert_eq!(turn.response.text, "Mon-Fri 9-5");

        let req = TestRequest::post()
            .uri("/chat")
            .set_json(json!({ "conversationId": turn.conversation_id, "message": "refund policy" }))
            .to_request();
        let second: ChatTurn = read_body_json(call_service(&app, req).await).await;
        assert_eq!(second.conversation_id, turn.conversation_id);

        let history_uri = format!("/chat/{}/history", turn.conversation_id);
        let req = TestRequest::get().uri(&history_uri).to_request();
        let history: Value = read_body_json(call_service(&app, req).await).await;
        assert_eq!(history["identifiedIntents"], json!(["kb-1", "kb-2"]));

        let end_uri = format!("/chat/{}", turn.conversation_id);
        let req = TestRequest::delete().uri(&end_uri).to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = TestRequest::delete().uri(&end_uri).to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = TestRequest::get().uri(&history_uri).to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_unknown_conversation_history_not_found() {
        let data = sessions();
        let app = app!(data);
        let req = TestRequest::get().uri("/chat/nope/history").to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
