//! Maps parsed commands onto library operations

use crate::cli::{CardCommands, Cli, Commands, RecordCommands, StageCommands};
use anyhow::Result;
use dealflow::{
    board::{GetBoard, InitBoard},
    card::{AddCard, CardHistory, DeleteCard, GetCard, MoveCard, RebalanceColumn},
    column::{AddStage, ListColumns},
    feed::FetchFeed,
    record::AddRecord,
    BoardContext, BoardOperationProcessor, CardKind, OperationProcessor,
};
use serde_json::Value;

/// Run one command through the processor and return its JSON result
pub async fn dispatch(
    cli: &Cli,
    ctx: &BoardContext,
    processor: &BoardOperationProcessor,
) -> Result<Value> {
    let team = cli.team.as_str();
    let value = match &cli.command {
        Commands::Init => processor.process(&InitBoard::new(), ctx).await?,

        Commands::Stage { action } => match action {
            StageCommands::Add { label, color } => {
                let mut op = AddStage::new(team, label.as_str());
                op.color = color.clone();
                processor.process(&op, ctx).await?
            }
            StageCommands::List { kind } => {
                let op = ListColumns::new(team, CardKind::from(*kind));
                processor.process(&op, ctx).await?
            }
        },

        Commands::Card { action } => match action {
            CardCommands::Add {
                title,
                kind,
                column,
                owner,
            } => {
                let mut op = AddCard::new(team, CardKind::from(*kind), title.as_str());
                op.column = column.as_deref().map(Into::into);
                op.owner = owner.as_deref().map(Into::into);
                processor.process(&op, ctx).await?
            }
            CardCommands::Get { id } => {
                processor
                    .process(&GetCard::new(team, id.as_str()), ctx)
                    .await?
            }
            CardCommands::Move {
                id,
                column,
                after,
                before,
            } => {
                let mut op = MoveCard::to_column(team, id.as_str(), column.as_str());
                op.after = after.as_deref().map(Into::into);
                op.before = before.as_deref().map(Into::into);
                processor.process(&op, ctx).await?
            }
            CardCommands::Delete { id } => {
                processor
                    .process(&DeleteCard::new(team, id.as_str()), ctx)
                    .await?
            }
            CardCommands::Rebalance { column, kind } => {
                let op = RebalanceColumn::new(team, CardKind::from(*kind), column.as_str());
                processor.process(&op, ctx).await?
            }
            CardCommands::History { id } => {
                processor
                    .process(&CardHistory::new(team, id.as_str()), ctx)
                    .await?
            }
        },

        Commands::Board { kind } => {
            processor
                .process(&GetBoard::new(team, CardKind::from(*kind)), ctx)
                .await?
        }

        Commands::Record { action } => match action {
            RecordCommands::Add {
                kind,
                title,
                owner,
                at,
            } => {
                let mut op = AddRecord::new(team, (*kind).into(), title.as_str());
                op.owner = owner.as_deref().map(Into::into);
                op.occurred_at = *at;
                processor.process(&op, ctx).await?
            }
        },

        Commands::Feed {
            kinds,
            owner,
            from,
            to,
            page,
            page_size,
            after,
        } => {
            let mut op = FetchFeed::new(team).with_range(*from, *to);
            op.kinds = kinds.clone();
            op.owner = owner.as_deref().map(Into::into);
            op.page = *page;
            op.page_size = *page_size;
            op.after = after.clone();
            processor.process(&op, ctx).await?
        }

        Commands::Log { limit } => serde_json::to_value(ctx.read_operation_log(*limit)?)?,
    };

    Ok(value)
}
