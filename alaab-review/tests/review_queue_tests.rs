//! Integration tests for match decisions and concepts

mod helpers;

use alaab_common::db::{MatchStatus, ReviewAction};
use alaab_common::events::AlaabEvent;
use alaab_common::Error;
use alaab_review::db::review_logs;
use alaab_review::services::{
    ConceptService, ConceptTarget, MatchGenerator, NewConcept, ReviewQueue,
};
use helpers::Fixture;
use uuid::Uuid;

/// Two identical games with one pending match between them
async fn pending_pair(fx: &Fixture) -> (Uuid, Uuid, Uuid) {
    let first = fx.seega();
    let second = fx.seega();
    fx.insert(&first).await;
    fx.insert(&second).await;

    MatchGenerator::new(fx.pool.clone(), fx.matching(), fx.event_bus.clone())
        .calculate_similarities_for_new_game(second.id)
        .await
        .unwrap();

    let similarity_id = queue(fx).get_pending_matches().await.unwrap()[0].similarity.id;
    (first.id, second.id, similarity_id)
}

fn queue(fx: &Fixture) -> ReviewQueue {
    ReviewQueue::new(fx.pool.clone(), fx.event_bus.clone())
}

fn concepts(fx: &Fixture) -> ConceptService {
    ConceptService::new(fx.pool.clone(), fx.event_bus.clone())
}

#[tokio::test]
async fn test_accept_without_concept_creates_one() {
    let fx = Fixture::new().await;
    let (first, second, similarity_id) = pending_pair(&fx).await;
    let mut events = fx.event_bus.subscribe();

    let accepted = queue(&fx)
        .accept_similarity(&fx.reviewer, similarity_id, ConceptTarget::CreateNew, None)
        .await
        .unwrap();

    assert_eq!(accepted.status, MatchStatus::Accepted);
    assert_eq!(accepted.reviewer_id, Some(fx.reviewer.id));
    assert!(accepted.reviewed_at.is_some());
    let concept_id = accepted.concept_id.unwrap();

    let detail = concepts(&fx).get_concept_with_games(concept_id).await.unwrap();
    assert_eq!(detail.concept.name, "السيجة");
    assert_eq!(detail.concept.canonical_game_id, Some(accepted.game_a_id));
    let mut members: Vec<Uuid> = detail.games.iter().map(|g| g.game_id).collect();
    members.sort();
    let mut expected = vec![first, second];
    expected.sort();
    assert_eq!(members, expected);

    assert!(matches!(events.try_recv().unwrap(), AlaabEvent::ConceptCreated { .. }));
    match events.try_recv().unwrap() {
        AlaabEvent::MatchResolved { status, concept_id: linked, .. } => {
            assert_eq!(status, MatchStatus::Accepted);
            assert_eq!(linked, Some(concept_id));
        }
        other => panic!("unexpected event {:?}", other),
    }

    assert!(queue(&fx).get_pending_matches().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_accept_into_existing_concept() {
    let fx = Fixture::new().await;
    let (first, second, similarity_id) = pending_pair(&fx).await;

    let concept = concepts(&fx)
        .create_game_concept(
            &fx.reviewer,
            NewConcept {
                name: "ألعاب الحصى".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let accepted = queue(&fx)
        .accept_similarity(
            &fx.reviewer,
            similarity_id,
            ConceptTarget::Existing(concept.id),
            Some("متطابقة".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(accepted.concept_id, Some(concept.id));
    assert_eq!(accepted.review_notes.as_deref(), Some("متطابقة"));

    let listing = concepts(&fx).get_game_concepts().await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].game_count, 2);

    let detail = concepts(&fx).get_concept_with_games(concept.id).await.unwrap();
    assert!(detail.games.iter().any(|g| g.game_id == first));
    assert!(detail.games.iter().any(|g| g.game_id == second));
}

#[tokio::test]
async fn test_accept_into_missing_concept_changes_nothing() {
    let fx = Fixture::new().await;
    let (_, _, similarity_id) = pending_pair(&fx).await;

    let result = queue(&fx)
        .accept_similarity(
            &fx.reviewer,
            similarity_id,
            ConceptTarget::Existing(Uuid::new_v4()),
            None,
        )
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));

    let pending = queue(&fx).get_pending_matches().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].similarity.status, MatchStatus::Pending);
}

#[tokio::test]
async fn test_editor_cannot_decide_matches() {
    let fx = Fixture::new().await;
    let (first, _, similarity_id) = pending_pair(&fx).await;
    let queue = queue(&fx);

    let accept = queue
        .accept_similarity(&fx.editor, similarity_id, ConceptTarget::CreateNew, None)
        .await;
    let reject = queue.reject_similarity(&fx.editor, similarity_id, None).await;
    let postpone = queue.postpone_similarity(&fx.editor, similarity_id, None).await;

    for result in [accept, reject, postpone] {
        assert!(matches!(result, Err(Error::Unauthorized(_))));
    }
    assert_eq!(queue.get_pending_matches().await.unwrap().len(), 1);
    assert_eq!(fx.review_log_count(first).await, 0);
    assert!(concepts(&fx).get_game_concepts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_postponed_match_stays_in_queue_and_can_be_decided() {
    let fx = Fixture::new().await;
    let (_, _, similarity_id) = pending_pair(&fx).await;
    let queue = queue(&fx);

    let postponed = queue
        .postpone_similarity(&fx.reviewer, similarity_id, Some("نحتاج مصدرًا".into()))
        .await
        .unwrap();
    assert_eq!(postponed.status, MatchStatus::Postponed);

    let pending = queue.get_pending_matches().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].similarity.status, MatchStatus::Postponed);

    let rejected = queue
        .reject_similarity(&fx.admin, similarity_id, None)
        .await
        .unwrap();
    assert_eq!(rejected.status, MatchStatus::Rejected);
    assert!(queue.get_pending_matches().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_decided_match_is_a_conflict() {
    let fx = Fixture::new().await;
    let (_, _, similarity_id) = pending_pair(&fx).await;
    let queue = queue(&fx);

    queue
        .reject_similarity(&fx.reviewer, similarity_id, None)
        .await
        .unwrap();

    let again = queue.reject_similarity(&fx.reviewer, similarity_id, None).await;
    let accept = queue
        .accept_similarity(&fx.reviewer, similarity_id, ConceptTarget::CreateNew, None)
        .await;
    let postpone = queue.postpone_similarity(&fx.reviewer, similarity_id, None).await;

    for result in [again, accept, postpone] {
        assert!(matches!(result, Err(Error::Conflict(_))));
    }
}

#[tokio::test]
async fn test_concurrent_decisions_on_file_database() {
    let dir = tempfile::TempDir::new().unwrap();
    let fx = Fixture::on_file(&dir.path().join("alaab.db")).await;
    let (first, second, similarity_id) = pending_pair(&fx).await;

    let accepting = queue(&fx);
    let rejecting = queue(&fx);
    let (accepted, rejected) = tokio::join!(
        accepting.accept_similarity(&fx.reviewer, similarity_id, ConceptTarget::CreateNew, None),
        rejecting.reject_similarity(&fx.admin, similarity_id, None),
    );

    let outcomes = [accepted.map(|s| s.status), rejected.map(|s| s.status)];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1, "{:?}", outcomes);
    assert_eq!(
        outcomes
            .iter()
            .filter(|r| matches!(r, Err(Error::Conflict(_))))
            .count(),
        1,
        "{:?}",
        outcomes
    );

    // Only the winning decision left an audit entry
    let audit_entries = fx.review_log_count(first).await + fx.review_log_count(second).await;
    assert_eq!(audit_entries, 1);
}

#[tokio::test]
async fn test_unknown_match_is_not_found() {
    let fx = Fixture::new().await;
    let result = queue(&fx)
        .postpone_similarity(&fx.reviewer, Uuid::new_v4(), None)
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_each_decision_writes_one_audit_entry_against_game_a() {
    let fx = Fixture::new().await;
    let (first, second, similarity_id) = pending_pair(&fx).await;
    let queue = queue(&fx);

    queue
        .postpone_similarity(&fx.reviewer, similarity_id, None)
        .await
        .unwrap();
    let accepted = queue
        .accept_similarity(&fx.reviewer, similarity_id, ConceptTarget::CreateNew, Some("نفس اللعبة".into()))
        .await
        .unwrap();

    let game_a = accepted.game_a_id;
    let game_b = if game_a == first { second } else { first };

    let logs = review_logs::list_for_game(&fx.pool, game_a).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|l| l.action == ReviewAction::Updated));
    assert!(logs.iter().all(|l| l.reviewer_id == fx.reviewer.id));
    assert_eq!(
        logs[0].notes.as_deref(),
        Some(format!("match {} postponed", similarity_id).as_str())
    );
    assert_eq!(
        logs[1].notes.as_deref(),
        Some(format!("match {} accepted: نفس اللعبة", similarity_id).as_str())
    );
    assert_eq!(fx.review_log_count(game_b).await, 0);
}

#[tokio::test]
async fn test_queue_stats_count_every_status() {
    let fx = Fixture::new().await;
    let (_, _, similarity_id) = pending_pair(&fx).await;

    let chase_a = fx.tag_game();
    let chase_b = fx.tag_game();
    fx.insert(&chase_a).await;
    fx.insert(&chase_b).await;
    MatchGenerator::new(fx.pool.clone(), fx.matching(), fx.event_bus.clone())
        .calculate_similarities_for_new_game(chase_b.id)
        .await
        .unwrap();

    let queue = queue(&fx);
    queue
        .postpone_similarity(&fx.reviewer, similarity_id, None)
        .await
        .unwrap();

    let stats = queue.queue_stats().await.unwrap();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.postponed, 1);
    assert_eq!(stats.accepted, 0);
    assert_eq!(stats.rejected, 0);
}

#[tokio::test]
async fn test_pending_matches_are_newest_first_with_summaries() {
    let fx = Fixture::new().await;
    let (_, _, older) = pending_pair(&fx).await;

    let chase_a = fx.tag_game();
    let chase_b = fx.tag_game();
    fx.insert(&chase_a).await;
    fx.insert(&chase_b).await;
    MatchGenerator::new(fx.pool.clone(), fx.matching(), fx.event_bus.clone())
        .calculate_similarities_for_new_game(chase_b.id)
        .await
        .unwrap();

    let pending = queue(&fx).get_pending_matches().await.unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[1].similarity.id, older);
    assert_eq!(pending[0].game_a.canonical_name, "طاق طاق طاقية");
    assert_eq!(pending[0].game_a.country, "المغرب");
    assert_eq!(pending[0].game_b.heritage_field, "ألعاب الجري");
}

#[tokio::test]
async fn test_concept_membership_management() {
    let fx = Fixture::new().await;
    let seega = fx.seega();
    let other = fx.tag_game();
    fx.insert(&seega).await;
    fx.insert(&other).await;
    let service = concepts(&fx);

    let concept = service
        .create_game_concept(
            &fx.reviewer,
            NewConcept {
                name: "  السيجة  ".to_string(),
                description: Some("لعبة الحصى الخليجية".to_string()),
                canonical_game_id: Some(seega.id),
            },
        )
        .await
        .unwrap();
    assert_eq!(concept.name, "السيجة");

    assert!(service.add_game_to_concept(&fx.reviewer, concept.id, other.id).await.unwrap());
    assert!(!service.add_game_to_concept(&fx.reviewer, concept.id, other.id).await.unwrap());
    assert_eq!(service.get_concept_with_games(concept.id).await.unwrap().games.len(), 2);

    service
        .remove_game_from_concept(&fx.reviewer, seega.id, concept.id)
        .await
        .unwrap();
    let detail = service.get_concept_with_games(concept.id).await.unwrap();
    assert_eq!(detail.games.len(), 1);
    assert_eq!(detail.concept.canonical_game_id, None);

    let missing = service
        .remove_game_from_concept(&fx.reviewer, seega.id, concept.id)
        .await;
    assert!(matches!(missing, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_concept_validation_and_permissions() {
    let fx = Fixture::new().await;
    let service = concepts(&fx);

    let blank = service
        .create_game_concept(
            &fx.reviewer,
            NewConcept {
                name: "   ".to_string(),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(blank, Err(Error::InvalidInput(_))));

    let by_editor = service
        .create_game_concept(
            &fx.editor,
            NewConcept {
                name: "السيجة".to_string(),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(by_editor, Err(Error::Unauthorized(_))));

    let unknown_game = service
        .create_game_concept(
            &fx.admin,
            NewConcept {
                name: "السيجة".to_string(),
                canonical_game_id: Some(Uuid::new_v4()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(unknown_game, Err(Error::NotFound(_))));
    assert!(service.get_game_concepts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_deleting_concept_keeps_accepted_match() {
    let fx = Fixture::new().await;
    let (_, _, similarity_id) = pending_pair(&fx).await;

    let accepted = queue(&fx)
        .accept_similarity(&fx.reviewer, similarity_id, ConceptTarget::CreateNew, None)
        .await
        .unwrap();
    let concept_id = accepted.concept_id.unwrap();

    concepts(&fx)
        .delete_game_concept(&fx.admin, concept_id)
        .await
        .unwrap();

    let status: String = sqlx::query_scalar("SELECT status FROM game_similarities WHERE guid = ?")
        .bind(similarity_id.to_string())
        .fetch_one(&fx.pool)
        .await
        .unwrap();
    let link: Option<String> =
        sqlx::query_scalar("SELECT concept_id FROM game_similarities WHERE guid = ?")
            .bind(similarity_id.to_string())
            .fetch_one(&fx.pool)
            .await
            .unwrap();
    assert_eq!(status, "accepted");
    assert_eq!(link, None);

    let again = concepts(&fx).delete_game_concept(&fx.admin, concept_id).await;
    assert!(matches!(again, Err(Error::NotFound(_))));
}
