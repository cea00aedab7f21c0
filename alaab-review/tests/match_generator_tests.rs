//! Integration tests for the match generator
//!
//! Covers threshold filtering, duplicate suppression for active pairs,
//! resurfacing of rejected pairs and per-candidate failure isolation.

mod helpers;

use alaab_common::config::MatchingConfig;
use alaab_common::db::{Game, MatchStatus, ReviewStatus};
use alaab_common::events::AlaabEvent;
use alaab_common::uuid_utils::canonical_pair;
use alaab_common::Error;
use alaab_review::db::{games, similarities};
use alaab_review::scoring::score_pair;
use alaab_review::services::{ConceptTarget, GameInput, MatchGenerator, ReviewQueue};
use helpers::Fixture;
use std::sync::Arc;
use uuid::Uuid;

fn generator(fx: &Fixture) -> MatchGenerator {
    MatchGenerator::new(fx.pool.clone(), fx.matching(), fx.event_bus.clone())
}

/// Keep only name, country and heritage field
fn bare(mut game: Game) -> Game {
    game.local_names.clear();
    game.description.clear();
    game.rules.clear();
    game.tools.clear();
    game.player_count = None;
    game.age_group = None;
    game.tag_ids.clear();
    game
}

/// Scoring inputs for every stored non-archived game
async fn stored_snapshots(fx: &Fixture) -> Vec<alaab_review::scoring::GameSnapshot> {
    let rows = games::load_candidate_rows(&fx.pool, Uuid::nil()).await.unwrap();
    let tags = games::load_snapshot_tags(&fx.pool).await.unwrap();
    rows.into_iter()
        .map(|row| {
            let t = tags.get(&row.guid).cloned().unwrap_or_default();
            row.into_snapshot(&t).unwrap()
        })
        .collect()
}

#[tokio::test]
async fn test_identical_games_are_proposed_with_full_score() {
    let fx = Fixture::new().await;
    let first = fx.seega();
    let second = fx.seega();
    fx.insert(&first).await;
    fx.insert(&second).await;

    let mut events = fx.event_bus.subscribe();
    let summary = generator(&fx)
        .calculate_similarities_for_new_game(second.id)
        .await
        .unwrap();

    assert_eq!(summary.candidates_scored, 1);
    assert_eq!(summary.matches_created, 1);
    assert_eq!(summary.failures, 0);

    let (a, b) = canonical_pair(first.id, second.id);
    let records = similarities::list_for_pair(&fx.pool, a, b).await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.status, MatchStatus::Pending);
    assert!(record.overall_score > 0.99, "overall = {}", record.overall_score);
    assert_eq!(record.algorithm, "lexical-overlap-v1");
    assert!(!record.ai_assisted);
    assert!(record.explanation["summary"]
        .as_str()
        .unwrap()
        .contains("same heritage field"));

    match events.try_recv().unwrap() {
        AlaabEvent::MatchProposed { similarity_id, game_a_id, game_b_id, .. } => {
            assert_eq!(similarity_id, record.id);
            assert_eq!((game_a_id, game_b_id), (a, b));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_bare_games_with_same_name_country_and_field_are_proposed() {
    let fx = Fixture::new().await;
    let first = bare(fx.seega());
    let second = bare(fx.seega());
    fx.insert(&first).await;
    fx.insert(&second).await;

    let summary = generator(&fx)
        .calculate_similarities_for_new_game(second.id)
        .await
        .unwrap();
    assert_eq!(summary.candidates_scored, 1);
    assert_eq!(summary.matches_created, 1);

    let (a, b) = canonical_pair(first.id, second.id);
    let records = similarities::list_for_pair(&fx.pool, a, b).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, MatchStatus::Pending);
    assert!(records[0].overall_score > 0.99, "overall = {}", records[0].overall_score);
    assert_eq!(records[0].explanation["structural_from_names"], true);
}

#[tokio::test]
async fn test_unrelated_games_are_not_proposed() {
    let fx = Fixture::new().await;
    let seega = fx.seega();
    let chase = fx.tag_game();
    fx.insert(&seega).await;
    fx.insert(&chase).await;

    let summary = generator(&fx)
        .calculate_similarities_for_new_game(chase.id)
        .await
        .unwrap();

    assert_eq!(summary.candidates_scored, 1);
    assert_eq!(summary.matches_created, 0);
    assert_eq!(fx.similarity_count().await, 0);

    // The pair shares nothing structural or cultural; only letters overlap
    let snapshots = stored_snapshots(&fx).await;
    let scores = score_pair(&snapshots[0], &snapshots[1], &MatchingConfig::default()).unwrap();
    assert_eq!(scores.structural, 0.0);
    assert_eq!(scores.heritage, 0.0);
    assert!(scores.overall < 0.41);
}

#[tokio::test]
async fn test_rerun_does_not_duplicate_active_pair() {
    let fx = Fixture::new().await;
    let first = fx.seega();
    let second = fx.seega();
    fx.insert(&first).await;
    fx.insert(&second).await;

    let generator = generator(&fx);
    generator.calculate_similarities_for_new_game(second.id).await.unwrap();
    let again = generator.calculate_similarities_for_new_game(second.id).await.unwrap();
    let from_other_side = generator.calculate_similarities_for_new_game(first.id).await.unwrap();

    assert_eq!(again.matches_created, 0);
    assert_eq!(again.skipped_existing, 1);
    assert_eq!(from_other_side.matches_created, 0);
    assert_eq!(fx.active_records(first.id, second.id).await, 1);
}

#[tokio::test]
async fn test_concurrent_runs_file_one_record() {
    let fx = Fixture::new().await;
    let first = fx.seega();
    let second = fx.seega();
    fx.insert(&first).await;
    fx.insert(&second).await;

    let one = generator(&fx);
    let two = generator(&fx);
    let (left, right) = tokio::join!(
        one.calculate_similarities_for_new_game(first.id),
        two.calculate_similarities_for_new_game(second.id),
    );

    let created = left.unwrap().matches_created + right.unwrap().matches_created;
    assert_eq!(created, 1);
    assert_eq!(fx.active_records(first.id, second.id).await, 1);
}

#[tokio::test]
async fn test_accepted_pair_is_never_reproposed() {
    let fx = Fixture::new().await;
    let first = fx.seega();
    let second = fx.seega();
    fx.insert(&first).await;
    fx.insert(&second).await;

    let generator = generator(&fx);
    generator.calculate_similarities_for_new_game(second.id).await.unwrap();

    let queue = ReviewQueue::new(fx.pool.clone(), fx.event_bus.clone());
    let pending = queue.get_pending_matches().await.unwrap();
    queue
        .accept_similarity(&fx.reviewer, pending[0].similarity.id, ConceptTarget::CreateNew, None)
        .await
        .unwrap();

    let summary = generator.calculate_similarities_for_new_game(first.id).await.unwrap();
    assert_eq!(summary.matches_created, 0);
    assert_eq!(summary.skipped_existing, 1);
    assert_eq!(fx.similarity_count().await, 1);
}

#[tokio::test]
async fn test_rejected_pair_returns_only_when_score_changes() {
    let fx = Fixture::new().await;
    let first = fx.seega();
    let second = fx.seega();
    fx.insert(&first).await;
    fx.insert(&second).await;

    let generator = generator(&fx);
    generator.calculate_similarities_for_new_game(second.id).await.unwrap();

    let queue = ReviewQueue::new(fx.pool.clone(), fx.event_bus.clone());
    let pending = queue.get_pending_matches().await.unwrap();
    queue
        .reject_similarity(&fx.reviewer, pending[0].similarity.id, Some("ليست نفس اللعبة".into()))
        .await
        .unwrap();

    // Same content, same score: stays rejected
    let unchanged = generator.calculate_similarities_for_new_game(second.id).await.unwrap();
    assert_eq!(unchanged.matches_created, 0);
    assert_eq!(unchanged.skipped_rejected, 1);
    assert_eq!(fx.active_records(first.id, second.id).await, 0);

    // Editing the description moves the score; the pair comes back
    let service = fx.state().games();
    let edit = GameInput {
        canonical_name: second.canonical_name.clone(),
        local_names: second.local_names.clone(),
        country_id: second.country_id,
        heritage_field_id: second.heritage_field_id,
        description: "تلعب بالحصى".to_string(),
        rules: second.rules.clone(),
        tools: second.tools.clone(),
        player_count: second.player_count.clone(),
        age_group: second.age_group.clone(),
        tag_ids: second.tag_ids.clone(),
    };
    let saved = service.update_game(&fx.editor, second.id, edit).await.unwrap();
    let matching = saved.matching.unwrap();
    assert_eq!(matching.matches_created, 1);

    let (a, b) = canonical_pair(first.id, second.id);
    let history = similarities::list_for_pair(&fx.pool, a, b).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status, MatchStatus::Rejected);
    assert_eq!(history[1].status, MatchStatus::Pending);
    assert_ne!(history[0].overall_score, history[1].overall_score);
}

#[tokio::test]
async fn test_every_created_record_meets_threshold() {
    let fx = Fixture::new().await;
    let mut ids = Vec::new();
    for game in [fx.seega(), fx.seega(), fx.tag_game(), fx.tag_game()] {
        fx.insert(&game).await;
        ids.push(game.id);
    }

    let generator = generator(&fx);
    for id in &ids {
        generator.calculate_similarities_for_new_game(*id).await.unwrap();
    }

    let threshold = MatchingConfig::default().threshold;
    let scores: Vec<f64> = sqlx::query_scalar("SELECT overall_score FROM game_similarities")
        .fetch_all(&fx.pool)
        .await
        .unwrap();
    // Two seega copies match each other, as do the two chase games
    assert_eq!(scores.len(), 2);
    for score in scores {
        assert!(score >= threshold);
    }
}

#[tokio::test]
async fn test_records_exist_exactly_for_pairs_at_threshold() {
    let fx = Fixture::new().await;

    let variants = vec![
        fx.seega(),
        bare(fx.seega()),
        bare(fx.seega()),
        Game { country_id: fx.bahrain, ..fx.seega() },
        Game {
            description: "تلعب بالحصى".to_string(),
            tools: vec!["الحصى".to_string()],
            ..fx.seega()
        },
        Game { player_count: None, ..fx.seega() },
        fx.tag_game(),
        bare(fx.tag_game()),
        Game { tools: Vec::new(), player_count: None, ..fx.tag_game() },
        Game {
            country_id: fx.morocco,
            heritage_field_id: fx.running_games,
            ..bare(fx.seega())
        },
        Game {
            canonical_name: "طاق طاق طاقية".to_string(),
            ..bare(fx.seega())
        },
    ];
    for game in &variants {
        fx.insert(game).await;
    }

    let generator = generator(&fx);
    for game in &variants {
        let summary = generator.calculate_similarities_for_new_game(game.id).await.unwrap();
        assert_eq!(summary.failures, 0);
    }

    let config = MatchingConfig::default();
    let snapshots = stored_snapshots(&fx).await;
    let mut proposed = 0;
    for (i, x) in snapshots.iter().enumerate() {
        for y in &snapshots[i + 1..] {
            let scores = score_pair(x, y, &config).unwrap();
            let expected = if scores.meets_threshold(&config) { 1 } else { 0 };
            assert_eq!(
                fx.active_records(x.id, y.id).await,
                expected,
                "{} vs {}: overall {}",
                x.canonical_name,
                y.canonical_name,
                scores.overall
            );
            proposed += expected;
        }
    }

    assert_eq!(fx.similarity_count().await, proposed);
    // The two bare seega copies at least
    assert!(proposed >= 1);
}

#[tokio::test]
async fn test_raising_threshold_suppresses_matches() {
    let fx = Fixture::new().await;
    let first = fx.seega();
    let mut second = fx.seega();
    second.country_id = fx.bahrain;
    fx.insert(&first).await;
    fx.insert(&second).await;

    // Same region but different country caps heritage at 0.75
    let strict = MatchingConfig {
        threshold: 0.99,
        ..MatchingConfig::default()
    };
    let generator = MatchGenerator::new(fx.pool.clone(), Arc::new(strict), fx.event_bus.clone());
    let summary = generator.calculate_similarities_for_new_game(second.id).await.unwrap();
    assert_eq!(summary.matches_created, 0);

    let summary = fx
        .state()
        .games()
        .calculate_similarities(&fx.reviewer, second.id)
        .await
        .unwrap();
    assert_eq!(summary.matches_created, 1);
}

#[tokio::test]
async fn test_corrupt_candidate_is_skipped() {
    let fx = Fixture::new().await;
    let subject = fx.seega();
    let broken = fx.seega();
    let healthy = fx.seega();
    for game in [&subject, &broken, &healthy] {
        fx.insert(game).await;
    }

    sqlx::query("UPDATE games SET tools = 'not json' WHERE guid = ?")
        .bind(broken.id.to_string())
        .execute(&fx.pool)
        .await
        .unwrap();

    let summary = generator(&fx)
        .calculate_similarities_for_new_game(subject.id)
        .await
        .unwrap();

    assert_eq!(summary.failures, 1);
    assert_eq!(summary.candidates_scored, 1);
    assert_eq!(summary.matches_created, 1);
    assert_eq!(fx.active_records(subject.id, healthy.id).await, 1);
    assert_eq!(fx.active_records(subject.id, broken.id).await, 0);
}

#[tokio::test]
async fn test_archived_games_are_ignored() {
    let fx = Fixture::new().await;
    let archived = fx.insert_with_status(fx.seega(), ReviewStatus::Archived).await;
    let live = fx.insert_with_status(fx.seega(), ReviewStatus::Published).await;

    let generator = generator(&fx);
    let from_live = generator.calculate_similarities_for_new_game(live.id).await.unwrap();
    assert_eq!(from_live.candidates_scored, 0);

    let from_archived = generator.calculate_similarities_for_new_game(archived.id).await.unwrap();
    assert_eq!(from_archived, Default::default());
    assert_eq!(fx.similarity_count().await, 0);
}

#[tokio::test]
async fn test_unknown_game_is_not_found() {
    let fx = Fixture::new().await;
    let result = generator(&fx).calculate_similarities_for_new_game(Uuid::new_v4()).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}
