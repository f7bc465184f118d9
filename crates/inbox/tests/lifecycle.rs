mod common;

use common::{inbound, inbox, KeyedEmbedder, ScriptedIndex, ScriptedLlm, SUPPORT};
use pigeon_core::AppError;
use pigeon_inbox::{IngestOutcome, Inbox};
use pigeon_knowledge::embeddings::providers::MockProvider;
use pigeon_knowledge::{EmbeddingConfig, GENERATION_FAILED_REPLY};
use pigeon_llm::ChatRole;
use pigeon_store::{DeleteOutcome, NewDocument, Response};
use std::sync::Arc;
use tempfile::TempDir;

fn doc(question: &str, content: &str) -> NewDocument {
    NewDocument {
        question: question.to_string(),
        content: content.to_string(),
        ..Default::default()
    }
}

fn answered(outcome: IngestOutcome) -> (i64, i64, Response) {
    match outcome {
        IngestOutcome::Answered {
            thread_id,
            email_id,
            response,
        } => (thread_id, email_id, response),
        IngestOutcome::Duplicate { .. } => panic!("expected an answered email"),
    }
}

fn counts(inbox: &Inbox, ids: &[i64]) -> Vec<u32> {
    let docs = inbox.list_documents().unwrap();
    ids.iter()
        .map(|id| {
            docs.iter()
                .find(|d| d.id == *id)
                .map(|d| d.response_count)
                .unwrap_or(u32::MAX)
        })
        .collect()
}

#[tokio::test]
async fn test_hackmit_email_end_to_end() {
    let temp = TempDir::new().unwrap();
    let llm = Arc::new(ScriptedLlm::default());
    let index = Arc::new(ScriptedIndex::default());
    let embedder = KeyedEmbedder::default()
        .with_key("What is HackMIT?", 1.0)
        .with_key("When is the deadline?", 2.0);
    let inbox = inbox(llm.clone(), Arc::new(embedder), index.clone(), temp.path());

    let hackmit = inbox
        .add_document(&doc("what is hackmit?", "HackMIT is a hackathon."))
        .unwrap();
    index.set(1.0, &[(hackmit.id, 0.1)]);
    llm.push("['What is HackMIT?', 'When is the deadline?']", "mocked reply");

    let (thread_id, email_id, response) = answered(
        inbox
            .ingest(inbound("<1@mail>", "What is HackMIT and when is the deadline?"))
            .await
            .unwrap(),
    );

    assert_eq!(response.content, "mocked reply");
    assert_eq!(response.questions, ["What is HackMIT?", "When is the deadline?"]);
    assert_eq!(response.docs_per_question, vec![1, 0]);
    assert_eq!(response.documents[0].id, hackmit.id);
    assert_eq!(response.document_confidences, vec![0.9]);
    assert_eq!(response.confidence, 0.0);
    assert_eq!(response.revision, 0);
    assert_eq!(counts(&inbox, &[hackmit.id]), vec![1]);

    let threads = inbox.list_threads().unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].thread.id, thread_id);
    assert_eq!(threads[0].thread.last_email, Some(email_id));
    assert!(!threads[0].thread.resolved);
    assert!(!threads[0].thread.read);

    let grouped = inbox.response(email_id).unwrap().unwrap().grouped();
    assert_eq!(grouped[0].documents.len(), 1);
    assert!(grouped[1].documents.is_empty());
}

#[tokio::test]
async fn test_duplicate_message_id_is_noop() {
    let temp = TempDir::new().unwrap();
    let llm = Arc::new(ScriptedLlm::default());
    let index = Arc::new(ScriptedIndex::default());
    let inbox = inbox(
        llm.clone(),
        Arc::new(KeyedEmbedder::default().with_key("Q?", 1.0)),
        index.clone(),
        temp.path(),
    );
    let a = inbox.add_document(&doc("a", "A")).unwrap();
    index.set(1.0, &[(a.id, 0.0)]);
    llm.push("['Q?']", "reply");

    let (_, email_id, _) = answered(inbox.ingest(inbound("<1@mail>", "Q?")).await.unwrap());
    let again = inbox.ingest(inbound(" <1@mail> ", "Q?")).await.unwrap();

    assert_eq!(again, IngestOutcome::Duplicate { email_id });
    assert_eq!(llm.requests().len(), 2);
    assert_eq!(counts(&inbox, &[a.id]), vec![1]);
    assert_eq!(inbox.list_threads().unwrap()[0].emails.len(), 1);
}

#[tokio::test]
async fn test_reply_joins_thread_with_history() {
    let temp = TempDir::new().unwrap();
    let llm = Arc::new(ScriptedLlm::default());
    let inbox = inbox(
        llm.clone(),
        Arc::new(KeyedEmbedder::default()),
        Arc::new(ScriptedIndex::default()),
        temp.path(),
    );

    llm.push("['Can I come?']", "Yes!");
    let (thread_id, first_id, _) =
        answered(inbox.ingest(inbound("<1@mail>", "Can I come?")).await.unwrap());
    inbox.record_reply(first_id, "<p>Yes!</p>", "<r1@ses>").unwrap();

    llm.push("['Can I bring a friend?']", "Sure");
    let mut follow_up = inbound(
        "<2@mail>",
        "Can I bring a friend?\n________________________________\n> Yes!",
    );
    follow_up.in_reply_to = Some("<r1@ses>".to_string());
    let (joined, second_id, _) = answered(inbox.ingest(follow_up).await.unwrap());

    assert_eq!(joined, thread_id);
    let thread = &inbox.list_threads().unwrap()[0];
    assert_eq!(thread.emails.len(), 3);
    assert_eq!(thread.emails[2].body, "Can I bring a friend?");
    assert_eq!(thread.thread.last_email, Some(second_id));
    assert!(!thread.thread.resolved);

    let reply_request = &llm.requests()[3];
    assert_eq!(reply_request.messages[1].role, ChatRole::User);
    assert_eq!(reply_request.messages[1].content, "Can I come?");
    assert_eq!(reply_request.messages[2].role, ChatRole::Assistant);
    assert_eq!(reply_request.messages[2].content.trim(), "Yes!");
    assert_eq!(reply_request.messages[3].content, "Can I bring a friend?");
}

#[tokio::test]
async fn test_blank_message_id_is_rejected() {
    let temp = TempDir::new().unwrap();
    let llm = Arc::new(ScriptedLlm::default());
    let inbox = inbox(
        llm.clone(),
        Arc::new(KeyedEmbedder::default()),
        Arc::new(ScriptedIndex::default()),
        temp.path(),
    );

    for message_id in ["", "   "] {
        let result = inbox.ingest(inbound(message_id, "Hi?")).await;
        assert!(matches!(result, Err(AppError::Other(_))));
    }
    assert!(llm.requests().is_empty());
    assert!(inbox.list_threads().unwrap().is_empty());
}

#[tokio::test]
async fn test_lookalike_sender_follow_up_joins_thread() {
    let temp = TempDir::new().unwrap();
    let llm = Arc::new(ScriptedLlm::default());
    let inbox = inbox(
        llm.clone(),
        Arc::new(KeyedEmbedder::default()),
        Arc::new(ScriptedIndex::default()),
        temp.path(),
    );

    let sender = format!("no{}", SUPPORT);
    llm.push("['Is there a waitlist?']", "Yes");
    let mut first = inbound("<1@mail>", "Is there a waitlist?");
    first.sender = sender.clone();
    let (thread_id, _, _) = answered(inbox.ingest(first).await.unwrap());

    llm.push("['How long is it?']", "Short");
    let mut follow_up = inbound("<2@mail>", "How long is it?");
    follow_up.sender = format!("Nora <{}>", sender);
    follow_up.in_reply_to = Some("<1@mail>".to_string());
    let (joined, _, _) = answered(inbox.ingest(follow_up).await.unwrap());

    assert_eq!(joined, thread_id);
    let threads = inbox.list_threads().unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].emails.len(), 2);

    let reply_request = &llm.requests()[3];
    assert_eq!(reply_request.messages[1].role, ChatRole::User);
    assert_eq!(reply_request.messages[1].content, "Is there a waitlist?");
}

#[tokio::test]
async fn test_unknown_parent_opens_new_thread() {
    let temp = TempDir::new().unwrap();
    let llm = Arc::new(ScriptedLlm::default());
    let inbox = inbox(
        llm.clone(),
        Arc::new(KeyedEmbedder::default()),
        Arc::new(ScriptedIndex::default()),
        temp.path(),
    );

    llm.push("['Hi?']", "Hello");
    let mut email = inbound("<9@mail>", "Hi?");
    email.in_reply_to = Some("<never-seen@mail>".to_string());
    let (thread_id, _, _) = answered(inbox.ingest(email).await.unwrap());

    let threads = inbox.list_threads().unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].thread.id, thread_id);
    assert_eq!(threads[0].thread.first_sender, "ada@mit.edu");
}

#[tokio::test]
async fn test_regeneration_moves_citations() {
    let temp = TempDir::new().unwrap();
    let llm = Arc::new(ScriptedLlm::default());
    let index = Arc::new(ScriptedIndex::default());
    let embedder = KeyedEmbedder::default()
        .with_key("First?", 1.0)
        .with_key("Second?", 2.0);
    let inbox = inbox(llm.clone(), Arc::new(embedder), index.clone(), temp.path());

    let a = inbox.add_document(&doc("a", "A")).unwrap().id;
    let b = inbox.add_document(&doc("b", "B")).unwrap().id;
    let c = inbox.add_document(&doc("c", "C")).unwrap().id;
    index.set(1.0, &[(a, 0.1)]);
    index.set(2.0, &[(a, 0.1), (b, 0.2)]);

    llm.push("['First?']", "one");
    inbox.ingest(inbound("<1@mail>", "First?")).await.unwrap();
    llm.push("['Second?']", "two");
    let (thread_id, email_id, first) =
        answered(inbox.ingest(inbound("<2@mail>", "Second?")).await.unwrap());
    assert_eq!(counts(&inbox, &[a, b, c]), vec![2, 1, 0]);

    index.set(2.0, &[(b, 0.1), (c, 0.3)]);
    llm.push("['Second?']", "two, again");
    let regenerated = inbox.regenerate(thread_id).await.unwrap();

    assert_eq!(regenerated.id, first.id);
    assert_eq!(regenerated.email_id, email_id);
    assert_eq!(regenerated.revision, 1);
    assert_eq!(regenerated.content, "two, again");
    assert_eq!(
        regenerated.documents.iter().map(|d| d.id).collect::<Vec<_>>(),
        vec![b, c]
    );
    assert_eq!(counts(&inbox, &[a, b, c]), vec![1, 1, 1]);
}

#[tokio::test]
async fn test_regenerate_missing_thread() {
    let temp = TempDir::new().unwrap();
    let inbox = inbox(
        Arc::new(ScriptedLlm::default()),
        Arc::new(KeyedEmbedder::default()),
        Arc::new(ScriptedIndex::default()),
        temp.path(),
    );
    assert!(inbox.regenerate(42).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_deferred_deletion_completes_with_thread_delete() {
    let temp = TempDir::new().unwrap();
    let llm = Arc::new(ScriptedLlm::default());
    let index = Arc::new(ScriptedIndex::default());
    let inbox = inbox(
        llm.clone(),
        Arc::new(KeyedEmbedder::default().with_key("Q?", 1.0)),
        index.clone(),
        temp.path(),
    );
    let cited = inbox.add_document(&doc("cited", "C")).unwrap().id;
    let free = inbox.add_document(&doc("free", "F")).unwrap().id;
    index.set(1.0, &[(cited, 0.0)]);

    llm.push("['Q?', 'Q?']", "reply");
    let (thread_id, _, response) =
        answered(inbox.ingest(inbound("<1@mail>", "Q? Q?")).await.unwrap());
    // cited under both questions, counted once
    assert_eq!(response.documents.len(), 2);
    assert_eq!(counts(&inbox, &[cited]), vec![1]);

    assert_eq!(inbox.delete_document(free).unwrap(), DeleteOutcome::Deleted);
    assert_eq!(inbox.delete_document(cited).unwrap(), DeleteOutcome::Deferred);
    let pending = inbox.list_documents().unwrap();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].to_delete);

    inbox.delete_thread(thread_id).unwrap();
    assert!(inbox.list_documents().unwrap().is_empty());
    assert!(inbox.list_threads().unwrap().is_empty());
}

#[tokio::test]
async fn test_stale_citations_are_dropped() {
    let temp = TempDir::new().unwrap();
    let llm = Arc::new(ScriptedLlm::default());
    let index = Arc::new(ScriptedIndex::default());
    let inbox = inbox(
        llm.clone(),
        Arc::new(KeyedEmbedder::default().with_key("Q?", 1.0)),
        index.clone(),
        temp.path(),
    );
    let pending = inbox.add_document(&doc("old", "O")).unwrap().id;
    let live = inbox.add_document(&doc("new", "N")).unwrap().id;
    index.set(1.0, &[(999, 0.0), (pending, 0.1), (live, 0.2)]);

    // first email keeps `pending` cited so its deletion is deferred
    llm.push("['Q?']", "first");
    let (_, first_email, _) = answered(inbox.ingest(inbound("<1@mail>", "Q?")).await.unwrap());
    assert_eq!(inbox.response(first_email).unwrap().unwrap().documents.len(), 2);
    assert_eq!(inbox.delete_document(pending).unwrap(), DeleteOutcome::Deferred);

    llm.push("['Q?']", "second");
    let (_, _, response) = answered(inbox.ingest(inbound("<2@mail>", "Q?")).await.unwrap());
    assert_eq!(response.docs_per_question, vec![1]);
    assert_eq!(response.documents[0].id, live);
    assert_eq!(counts(&inbox, &[pending, live]), vec![1, 2]);
}

#[tokio::test]
async fn test_record_reply_resolves_without_releasing() {
    let temp = TempDir::new().unwrap();
    let llm = Arc::new(ScriptedLlm::default());
    let index = Arc::new(ScriptedIndex::default());
    let inbox = inbox(
        llm.clone(),
        Arc::new(KeyedEmbedder::default().with_key("Q?", 1.0)),
        index.clone(),
        temp.path(),
    );
    let a = inbox.add_document(&doc("a", "A")).unwrap().id;
    index.set(1.0, &[(a, 0.0)]);

    llm.push("['Q?']", "");
    let (thread_id, email_id, response) =
        answered(inbox.ingest(inbound("<1@mail>", "Q?")).await.unwrap());
    assert_eq!(response.content, GENERATION_FAILED_REPLY);

    let reply = inbox
        .record_reply(email_id, "<div>Here you go</div>", "<r1@ses>")
        .unwrap();
    assert!(reply.is_reply);
    assert_eq!(reply.sender, SUPPORT);
    assert_eq!(reply.subject, "Question");
    assert_eq!(reply.body.trim(), "Here you go");

    let thread = &inbox.list_threads().unwrap()[0];
    assert!(thread.thread.resolved);
    assert_eq!(thread.thread.last_email, Some(reply.id));
    assert_eq!(counts(&inbox, &[a]), vec![1]);

    // regeneration still targets the inbound email
    llm.push("['Q?']", "better");
    let regenerated = inbox.regenerate(thread_id).await.unwrap();
    assert_eq!(regenerated.email_id, email_id);
    assert_eq!(counts(&inbox, &[a]), vec![1]);
}

#[tokio::test]
async fn test_delete_email_releases_and_repoints() {
    let temp = TempDir::new().unwrap();
    let llm = Arc::new(ScriptedLlm::default());
    let index = Arc::new(ScriptedIndex::default());
    let inbox = inbox(
        llm.clone(),
        Arc::new(KeyedEmbedder::default().with_key("Q?", 1.0)),
        index.clone(),
        temp.path(),
    );
    let a = inbox.add_document(&doc("a", "A")).unwrap().id;
    index.set(1.0, &[(a, 0.0)]);

    llm.push("['Q?']", "reply");
    let (thread_id, email_id, _) = answered(inbox.ingest(inbound("<1@mail>", "Q?")).await.unwrap());
    let reply = inbox.record_reply(email_id, "ok", "<r1@ses>").unwrap();

    assert!(!inbox.delete_email(email_id).unwrap());
    assert_eq!(counts(&inbox, &[a]), vec![0]);
    let thread = &inbox.list_threads().unwrap()[0];
    assert_eq!(thread.thread.id, thread_id);
    assert_eq!(thread.thread.last_email, Some(reply.id));

    assert!(inbox.delete_email(reply.id).unwrap());
    assert!(inbox.list_threads().unwrap().is_empty());
    assert!(inbox.response(email_id).unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_reindex_skips_pending_documents() {
    let temp = TempDir::new().unwrap();
    let llm = Arc::new(ScriptedLlm::default());
    let provider = Arc::new(MockProvider::new(32));
    let index = Arc::new(pigeon_knowledge::sqlite_index::SqliteIndex::in_memory(32).unwrap());
    let index_dir = temp.path().join("index");
    let inbox = inbox(llm.clone(), provider, index.clone(), temp.path()).with_manifest(
        index_dir.clone(),
        EmbeddingConfig {
            dimensions: 32,
            ..Default::default()
        },
    );

    let kept = inbox
        .add_document(&doc("what is hackmit?", "HackMIT is a hackathon."))
        .unwrap();
    let cited = inbox
        .add_document(&doc("how do i register?", "Apply on the website."))
        .unwrap();
    inbox
        .import_documents(&[doc("where is it?", "At MIT."), doc("when?", "September.")])
        .unwrap();
    let stats = inbox.reindex().await.unwrap();
    assert_eq!(stats.documents, 4);

    llm.push("['How do I register?']", "Apply online");
    let (_, _, response) = answered(
        inbox
            .ingest(inbound("<1@mail>", "How do I register?"))
            .await
            .unwrap(),
    );
    assert_eq!(response.docs_per_question, vec![3]);

    let cited_now: Vec<i64> = response.documents.iter().map(|d| d.id).collect();
    assert!(cited_now.contains(&cited.id) || cited_now.contains(&kept.id));

    let target = cited_now[0];
    assert_eq!(inbox.delete_document(target).unwrap(), DeleteOutcome::Deferred);
    let stats = inbox.reindex().await.unwrap();
    assert_eq!(stats.documents, 3);
    assert_eq!(stats.backend, "sqlite");

    let manifest = EmbeddingConfig::load(&index_dir).unwrap().unwrap();
    assert_eq!(manifest.dimensions, 32);
}
