//! Integration tests for card moves across connections

use dealflow::{
    board::{GetBoard, InitBoard},
    card::{AddCard, CardHistory, GetCard, MoveCard},
    BoardContext, BoardEvent, CardKind, DealflowConfig, DealflowError, Execute, FailPoint,
    LeadStatus,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

async fn open(path: &Path) -> BoardContext {
    let ctx = BoardContext::open(path, DealflowConfig::default()).unwrap();
    InitBoard::new().execute(&ctx).await.unwrap();
    ctx
}

async fn add(ctx: &BoardContext, title: &str, status: LeadStatus) -> String {
    let result = AddCard::lead("acme", title, status)
        .execute(ctx)
        .await
        .unwrap();
    result["id"].as_str().unwrap().to_string()
}

async fn column(ctx: &BoardContext, status: LeadStatus) -> Vec<(String, String)> {
    let board = GetBoard::new("acme", CardKind::Lead)
        .execute(ctx)
        .await
        .unwrap();
    board["columns"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == status.as_str())
        .unwrap()["cards"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| {
            (
                c["title"].as_str().unwrap().to_string(),
                c["position"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_aborted_move_invisible_to_other_connection() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("crm.db");
    let writer = open(&path).await;
    let reader = BoardContext::open(&path, DealflowConfig::default()).unwrap();

    let id = add(&writer, "Globex", LeadStatus::New).await;
    let before = GetCard::new("acme", id.as_str())
        .execute(&reader)
        .await
        .unwrap();

    for point in [FailPoint::AfterCardUpdate, FailPoint::BeforeCommit] {
        writer.set_fail_point(Some(point));
        let err = MoveCard::to_column("acme", id.as_str(), "qualified")
            .execute(&writer)
            .await
            .unwrap_err();
        assert!(matches!(err, DealflowError::FailPoint { .. }));

        let seen = GetCard::new("acme", id.as_str())
            .execute(&reader)
            .await
            .unwrap();
        assert_eq!(seen, before);

        let history = CardHistory::new("acme", id.as_str())
            .execute(&reader)
            .await
            .unwrap();
        assert_eq!(history["count"], 0);
    }

    // The writer's connection is still usable and the move goes through
    MoveCard::to_column("acme", id.as_str(), "qualified")
        .execute(&writer)
        .await
        .unwrap();
    let seen = GetCard::new("acme", id.as_str())
        .execute(&reader)
        .await
        .unwrap();
    assert_eq!(seen["column"], "qualified");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_moves_into_same_gap() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("crm.db");
    let setup = open(&path).await;

    let top = add(&setup, "top", LeadStatus::New).await;
    add(&setup, "bottom", LeadStatus::New).await;

    let mut movers = Vec::new();
    for i in 0..8 {
        let id = add(&setup, &format!("m{i}"), LeadStatus::Contacted).await;
        movers.push(id);
    }

    // Each mover uses its own connection, all aiming at the gap below `top`
    let mut handles = Vec::new();
    for id in movers {
        let ctx = Arc::new(BoardContext::open(&path, DealflowConfig::default()).unwrap());
        let top = top.clone();
        handles.push(tokio::spawn(async move {
            MoveCard::to_column("acme", id.as_str(), "new")
                .after(top.as_str())
                .execute(ctx.as_ref())
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let cards = column(&setup, LeadStatus::New).await;
    assert_eq!(cards.len(), 10);
    assert_eq!(cards.first().unwrap().0, "top");
    assert_eq!(cards.last().unwrap().0, "bottom");

    let mut ranks: Vec<&String> = cards.iter().map(|(_, rank)| rank).collect();
    let sorted = ranks.windows(2).all(|w| w[0] < w[1]);
    assert!(sorted, "ranks not strictly increasing: {ranks:?}");
    ranks.dedup();
    assert_eq!(ranks.len(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_board_read_never_sees_half_a_move() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("crm.db");
    let setup = open(&path).await;
    let id = add(&setup, "shuttle", LeadStatus::New).await;
    add(&setup, "anchor", LeadStatus::Qualified).await;

    let writer = Arc::new(BoardContext::open(&path, DealflowConfig::default()).unwrap());
    let done = Arc::new(AtomicBool::new(false));
    let mover = {
        let done = done.clone();
        tokio::spawn(async move {
            for round in 0..200 {
                let target = if round % 2 == 0 { "qualified" } else { "new" };
                MoveCard::to_column("acme", id.as_str(), target)
                    .execute(writer.as_ref())
                    .await
                    .unwrap();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let reader = BoardContext::open(&path, DealflowConfig::default()).unwrap();
    let mut reads = 0;
    while !done.load(Ordering::SeqCst) || reads == 0 {
        let board = GetBoard::new("acme", CardKind::Lead)
            .execute(&reader)
            .await
            .unwrap();
        let seen = board["columns"]
            .as_array()
            .unwrap()
            .iter()
            .flat_map(|c| c["cards"].as_array().unwrap().iter())
            .filter(|card| card["title"] == "shuttle")
            .count();
        assert_eq!(seen, 1, "board read {reads} saw the card {seen} times");
        reads += 1;
        tokio::task::yield_now().await;
    }
    mover.await.unwrap();
}

#[tokio::test]
async fn test_exhaustion_triggers_renormalization() {
    let temp = TempDir::new().unwrap();
    let config = DealflowConfig::default().with_max_rank_len(3);
    let ctx = BoardContext::open(temp.path().join("crm.db"), config).unwrap();
    InitBoard::new().execute(&ctx).await.unwrap();
    let mut events = ctx.subscribe();

    let top = add(&ctx, "top", LeadStatus::Qualified).await;
    add(&ctx, "bottom", LeadStatus::Qualified).await;

    let mut renormalized_at = None;
    for i in 0..200 {
        let id = add(&ctx, &format!("c{i}"), LeadStatus::New).await;
        let result = MoveCard::to_column("acme", id.as_str(), "qualified")
            .after(top.as_str())
            .execute(&ctx)
            .await
            .unwrap();
        let rank = result["position"].as_str().unwrap();
        assert!(rank.len() <= 3, "rank {rank} exceeds the bound");
        if result["renormalized"] == true {
            renormalized_at = Some(i);
            break;
        }
    }
    assert!(renormalized_at.is_some());

    // Order survives the re-ranking: top, newest insert, ..., oldest insert, bottom
    let cards = column(&ctx, LeadStatus::Qualified).await;
    assert_eq!(cards.first().unwrap().0, "top");
    assert_eq!(cards.last().unwrap().0, "bottom");
    let newest = format!("c{}", renormalized_at.unwrap());
    assert_eq!(cards[1].0, newest);

    let mut saw_renormalized = false;
    while let Ok(event) = events.try_recv() {
        if let BoardEvent::CardMoved { renormalized, .. } = event {
            saw_renormalized |= renormalized;
        }
    }
    assert!(saw_renormalized);
}
