//! Response entity: one row per (poll, respondent email).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::poll::PollKind;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "response")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub poll_id: String,

    /// Kind of the latest submission (mirrors the poll's kind at that time)
    pub kind: PollKind,

    /// Selected option index, present iff kind = mcq
    #[sea_orm(nullable)]
    pub option_index: Option<i32>,

    /// Free-text body, present iff kind = text
    #[sea_orm(column_type = "Text", nullable)]
    pub text: Option<String>,

    pub name: String,

    /// Respondent identity key, stored trimmed and lowercased.
    /// Unique per poll (enforced by `idx_response_poll_email`).
    #[sea_orm(indexed)]
    pub email: String,

    /// Correlation id supplied by the audience client (e.g. a cookie uuid)
    #[sea_orm(nullable, indexed)]
    pub audience_id: Option<String>,

    /// hash(client ip + secret), never the raw IP
    #[sea_orm(nullable)]
    #[serde(skip_serializing)]
    pub ip_hash: Option<String>,

    #[sea_orm(nullable)]
    #[serde(skip_serializing)]
    pub user_agent: Option<String>,

    /// First-submission time, never overwritten by revisions
    pub created_at: DateTimeWithTimeZone,

    /// Latest revision time
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::poll::Entity",
        from = "Column::PollId",
        to = "super::poll::Column::Id",
        on_delete = "Cascade"
    )]
    Poll,
}

impl Related<super::poll::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Poll.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
