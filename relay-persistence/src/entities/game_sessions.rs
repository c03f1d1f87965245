use sea_orm::entity::prelude::*;

/// Durable record of one game session. Players and chains are stored as JSON
/// so the whole aggregate persists as a single row, mirroring the one-document
/// shape the game mutates under its per-code lock.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "game_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub host_nickname: String,
    pub status: String,
    pub current_round: i32,
    pub total_rounds: i32,
    #[sea_orm(column_type = "Text")]
    pub players: String,
    #[sea_orm(column_type = "Text")]
    pub chains: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub finished_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
