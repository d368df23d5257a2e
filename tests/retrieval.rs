mod common;

use std::sync::Arc;

use common::{CannedChat, DownChat, KeywordEmbedder, POLICY_CORPUS};
use policybot::{
    build_index, global_cache, retrieve_similar, split_paragraphs, AnswerComposer, Conversation,
    Index, RagError, Role, CONTEXT_SEPARATOR,
};
use pretty_assertions::assert_eq;

fn policy_index(embedder: &KeywordEmbedder) -> Index {
    build_index(embedder, split_paragraphs(POLICY_CORPUS)).expect("index")
}

#[test]
fn leave_question_ranks_leave_paragraph_first() {
    let embedder = KeywordEmbedder::policy();
    let index = policy_index(&embedder);

    let results =
        retrieve_similar(&embedder, &index, "How many leave days do I get?", 3).expect("retrieve");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].text, "Employees accrue 20 days annual leave.");
    assert!(results[0].score > results[1].score);
    assert_eq!(results[1].text, "Fees are due on the 1st of each month.");
}

#[test]
fn results_are_bounded_and_sorted_for_every_k() {
    let embedder = KeywordEmbedder::policy();
    let corpus = "Sick leave needs a note.\n\nAnnual leave is 20 days.\n\nFees are due monthly.\n\nUniform is required.\n\nEmployees get sick days.";
    let index = build_index(&embedder, split_paragraphs(corpus)).expect("index");
    let queries = ["sick leave", "fees due", "uniform", "annual days", "unrelated words"];

    for query in queries {
        for k in 0..8 {
            let results = retrieve_similar(&embedder, &index, query, k).expect("retrieve");
            assert_eq!(results.len(), k.min(index.len()), "query {query:?} k {k}");
            assert!(
                results.windows(2).all(|w| w[0].score >= w[1].score),
                "scores not sorted for {query:?}"
            );
        }
    }
}

#[test]
fn repeated_queries_return_identical_results() {
    let embedder = KeywordEmbedder::policy();
    let index = policy_index(&embedder);
    let first = retrieve_similar(&embedder, &index, "when are fees due", 2).expect("first");
    let second = retrieve_similar(&embedder, &index, "when are fees due", 2).expect("second");
    assert_eq!(first, second);
}

#[test]
fn zero_vector_chunks_score_zero_instead_of_failing() {
    let embedder = KeywordEmbedder::policy();
    let index = build_index(
        &embedder,
        split_paragraphs("Nothing in the vocabulary here.\n\nAnnual leave."),
    )
    .expect("index");
    let results = retrieve_similar(&embedder, &index, "leave", 2).expect("retrieve");
    assert_eq!(results[0].chunk_id, 1);
    assert_eq!(results[1].score, 0.0);
    assert!(results.iter().all(|r| r.score.is_finite()));
}

#[test]
fn empty_corpus_retrieves_nothing_without_embedding() {
    let embedder = KeywordEmbedder::policy();
    let index = build_index(&embedder, split_paragraphs("\n\n  \n\n")).expect("index");
    let results = retrieve_similar(&embedder, &index, "leave", 3).expect("retrieve");
    assert!(results.is_empty());
    assert_eq!(embedder.calls(), 0);
}

#[test]
fn composer_grounds_the_prompt_and_trims_the_reply() {
    let embedder = Arc::new(KeywordEmbedder::policy());
    let chat = Arc::new(CannedChat::new("  You accrue 20 days of annual leave.\n"));
    let index = policy_index(&embedder);
    let composer = AnswerComposer::new(embedder.clone(), chat.clone());

    let answer = composer
        .answer(&index, "How many leave days do I get?")
        .expect("answer");

    assert_eq!(answer.text, "You accrue 20 days of annual leave.");
    assert_eq!(answer.sources.len(), 2);
    let requests = chat.requests();
    assert_eq!(requests.len(), 1);
    let (messages, temperature) = &requests[0];
    assert_eq!(*temperature, 0.1);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(
        messages[1].content,
        format!(
            "Context from policy documents:\nEmployees accrue 20 days annual leave.{CONTEXT_SEPARATOR}Fees are due on the 1st of each month.\n\nQuestion:\nHow many leave days do I get?"
        )
    );
}

#[test]
fn session_log_records_both_turns() {
    let embedder = Arc::new(KeywordEmbedder::policy());
    let index = policy_index(&embedder);
    let composer = AnswerComposer::new(embedder, Arc::new(CannedChat::new("20 days.")));
    let mut conversation = Conversation::new();

    composer
        .answer_in(&mut conversation, &index, "leave days?")
        .expect("answer");
    composer
        .answer_in(&mut conversation, &index, "fees?")
        .expect("answer");

    let log: Vec<(Role, &str)> = conversation
        .messages()
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .collect();
    assert_eq!(
        log,
        vec![
            (Role::User, "leave days?"),
            (Role::Assistant, "20 days."),
            (Role::User, "fees?"),
            (Role::Assistant, "20 days."),
        ]
    );
}

#[test]
fn upstream_failure_propagates_and_leaves_question_unanswered() {
    let embedder = Arc::new(KeywordEmbedder::policy());
    let index = policy_index(&embedder);
    let composer = AnswerComposer::new(embedder, Arc::new(DownChat));
    let mut conversation = Conversation::new();

    let err = composer
        .answer_in(&mut conversation, &index, "leave days?")
        .unwrap_err();

    assert!(matches!(err, RagError::Upstream { service: "chat", .. }));
    assert_eq!(conversation.len(), 1);
    assert_eq!(conversation.messages()[0].role, Role::User);
}

#[test]
fn global_cache_reuses_the_built_index() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("policies.txt");
    std::fs::write(&path, POLICY_CORPUS).expect("write corpus");
    let embedder = KeywordEmbedder::policy();

    let first = global_cache().get_or_build(&path, &embedder).expect("first");
    let second = global_cache().get_or_build(&path, &embedder).expect("second");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(embedder.calls(), 1);
    assert_eq!(first.len(), 2);
}
