//! Position resolver: turns neighbor ids into a rank

use crate::error::{DealflowError, Result};
use crate::store;
use crate::types::{Card, CardId, CardKind, ColumnId, Rank, TeamId};
use rusqlite::Connection;
use tracing::warn;

/// Rank for a card placed relative to `after`/`before` among `siblings`
/// (live cards of the target column ordered by rank, without the placed card).
///
/// - neither neighbor: end of the column
/// - `after`: immediately after it, below its current successor
/// - only `before`: immediately before it, above its current predecessor
///
/// Neighbors are looked up among the current siblings, not the client's view.
pub(crate) fn resolve_rank(
    siblings: &[Card],
    after: Option<&CardId>,
    before: Option<&CardId>,
    max_len: usize,
) -> Result<Rank> {
    let index_of = |id: &CardId| {
        siblings
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| DealflowError::invalid_ordering(format!("card {id} is not in the target column")))
    };

    let rank = match (after, before) {
        (None, None) => Rank::between(siblings.last().map(|c| &c.position), None, max_len)?,
        (Some(after), before) => {
            let ai = index_of(after)?;
            if let Some(before) = before {
                let bi = index_of(before)?;
                if bi <= ai {
                    return Err(DealflowError::invalid_ordering(format!(
                        "card {after} does not sort before card {before}"
                    )));
                }
            }
            let upper = siblings.get(ai + 1).map(|c| &c.position);
            Rank::between(Some(&siblings[ai].position), upper, max_len)?
        }
        (None, Some(before)) => {
            let bi = index_of(before)?;
            let lower = bi.checked_sub(1).map(|i| &siblings[i].position);
            Rank::between(lower, Some(&siblings[bi].position), max_len)?
        }
    };

    Ok(rank)
}

/// Outcome of [`place`]
pub(crate) struct Placement {
    pub rank: Rank,
    /// The column was re-ranked to make room
    pub renormalized: bool,
}

/// Resolve a rank inside the caller's transaction, re-ranking the column once
/// when the gap is exhausted. `card` is left out of the siblings; if it
/// currently sits in `column` it loses its rank during re-ranking and the
/// caller must write the returned one.
#[allow(clippy::too_many_arguments)]
pub(crate) fn place(
    conn: &Connection,
    team: &TeamId,
    kind: CardKind,
    column: &ColumnId,
    card: Option<&CardId>,
    after: Option<&CardId>,
    before: Option<&CardId>,
    max_len: usize,
) -> Result<Placement> {
    let siblings = store::column_cards(conn, team, kind, column, card)?;

    match resolve_rank(&siblings, after, before, max_len) {
        Ok(rank) => Ok(Placement {
            rank,
            renormalized: false,
        }),
        Err(DealflowError::RankExhausted { .. }) => {
            warn!(
                %column,
                kind = %kind,
                cards = siblings.len(),
                "rank space exhausted, re-ranking column"
            );
            let ids: Vec<CardId> = siblings.iter().map(|c| c.id.clone()).collect();
            store::rewrite_ranks(conn, team, kind, column, &ids)?;

            let siblings = store::column_cards(conn, team, kind, column, card)?;
            let rank = resolve_rank(&siblings, after, before, max_len)?;
            Ok(Placement {
                rank,
                renormalized: true,
            })
        }
        Err(e) => Err(e),
    }
}

/// Check that a neighbor id names a live card of the same board in `column`
pub(crate) fn check_neighbor(
    conn: &Connection,
    team: &TeamId,
    moving: Option<&CardId>,
    kind: CardKind,
    column: &ColumnId,
    neighbor: &CardId,
) -> Result<()> {
    if moving == Some(neighbor) {
        return Err(DealflowError::invalid_ordering(format!(
            "card {neighbor} cannot be its own neighbor"
        )));
    }

    let card = match store::find_card(conn, team, neighbor) {
        Err(DealflowError::CardNotFound { .. }) => {
            return Err(DealflowError::not_found("neighbor card", neighbor.as_str()))
        }
        other => other?,
    };
    if card.kind != kind || &card.column != column {
        return Err(DealflowError::invalid_ordering(format!(
            "card {neighbor} is in column {} of the {} board, not {column}",
            card.column, card.kind
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use crate::types::{time, LeadStatus};

    fn card(rank: &str) -> Card {
        let now = time::now();
        Card {
            id: CardId::from_string(format!("card-{rank}")),
            team_id: TeamId::from_string("acme"),
            kind: CardKind::Lead,
            title: rank.to_string(),
            column: LeadStatus::New.column_id(),
            position: Rank::parse(rank).unwrap(),
            owner_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn id(rank: &str) -> CardId {
        CardId::from_string(format!("card-{rank}"))
    }

    #[test]
    fn test_empty_column_gets_initial_rank() {
        let rank = resolve_rank(&[], None, None, 8).unwrap();
        assert_eq!(rank, Rank::initial());
    }

    #[test]
    fn test_no_neighbors_appends() {
        let siblings = vec![card("F"), card("V")];
        let rank = resolve_rank(&siblings, None, None, 8).unwrap();
        assert!(rank > siblings[1].position);
    }

    #[test]
    fn test_after_lands_before_successor() {
        let siblings = vec![card("F"), card("V"), card("k")];
        let rank = resolve_rank(&siblings, Some(&id("F")), None, 8).unwrap();
        assert!(rank > siblings[0].position && rank < siblings[1].position);
    }

    #[test]
    fn test_before_lands_after_predecessor() {
        let siblings = vec![card("F"), card("V")];
        let rank = resolve_rank(&siblings, None, Some(&id("V")), 8).unwrap();
        assert!(rank > siblings[0].position && rank < siblings[1].position);

        let first = resolve_rank(&siblings, None, Some(&id("F")), 8).unwrap();
        assert!(first < siblings[0].position);
    }

    #[test]
    fn test_stale_gap_uses_current_successor() {
        // Client saw F and k adjacent; V slipped in between since
        let siblings = vec![card("F"), card("V"), card("k")];
        let rank = resolve_rank(&siblings, Some(&id("F")), Some(&id("k")), 8).unwrap();
        assert!(rank > siblings[0].position && rank < siblings[1].position);
    }

    #[test]
    fn test_reversed_neighbors_rejected() {
        let siblings = vec![card("F"), card("V")];
        let err = resolve_rank(&siblings, Some(&id("V")), Some(&id("F")), 8).unwrap_err();
        assert!(matches!(err, DealflowError::InvalidOrdering { .. }));
    }

    #[test]
    fn test_unknown_neighbor_rejected() {
        let siblings = vec![card("F")];
        let err = resolve_rank(&siblings, Some(&id("zz")), None, 8).unwrap_err();
        assert!(matches!(err, DealflowError::InvalidOrdering { .. }));
    }

    #[test]
    fn test_exhausted_gap_is_explicit() {
        let siblings = vec![card("V"), card("V1")];
        let err = resolve_rank(&siblings, Some(&id("V")), None, 2).unwrap_err();
        assert!(matches!(err, DealflowError::RankExhausted { max_len: 2 }));
    }

    #[test]
    fn test_neighbor_lookup_keeps_database_errors() {
        let mut conn = Connection::open_in_memory().unwrap();
        schema::migrate(&mut conn).unwrap();
        let team = TeamId::from_string("acme");
        let column = LeadStatus::New.column_id();

        let err = check_neighbor(&conn, &team, None, CardKind::Lead, &column, &id("gone"))
            .unwrap_err();
        assert!(matches!(err, DealflowError::NotFound { .. }));

        conn.execute_batch("DROP TABLE opportunities").unwrap();
        let err = check_neighbor(&conn, &team, None, CardKind::Lead, &column, &id("gone"))
            .unwrap_err();
        assert!(matches!(err, DealflowError::Database(_)), "{err}");
    }
}
