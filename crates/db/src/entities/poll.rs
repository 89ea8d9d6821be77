//! Poll entity with denormalized response counters.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Poll kinds.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PollKind {
    /// Multiple choice: responses carry an option index.
    #[sea_orm(string_value = "mcq")]
    Mcq,
    /// Free text: responses carry a text body.
    #[sea_orm(string_value = "text")]
    Text,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "poll")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Poll title shown on the dashboard
    pub title: String,

    /// The question shown to the audience
    pub question: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub kind: PollKind,

    /// Option labels (JSON array of strings; empty for text polls)
    #[sea_orm(column_type = "JsonBinary")]
    pub options: JsonValue,

    /// 6-digit numeric join code
    #[sea_orm(unique)]
    pub code: String,

    /// Whether the poll is currently accepting responses
    pub is_live: bool,

    /// Owning creator
    #[sea_orm(indexed)]
    pub created_by: String,

    /// Total unique respondents (denormalized)
    pub total_responses: i32,

    /// Responses per option, index-aligned with `options` (denormalized;
    /// empty for text polls)
    #[sea_orm(column_type = "JsonBinary")]
    pub option_counts: JsonValue,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,

    #[sea_orm(has_many = "super::response::Entity")]
    Responses,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::response::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Responses.def()
    }
}

impl Model {
    /// Option labels decoded from the JSON column.
    #[must_use]
    pub fn option_labels(&self) -> Vec<String> {
        serde_json::from_value(self.options.clone()).unwrap_or_default()
    }

    /// Denormalized per-option counts decoded from the JSON column.
    #[must_use]
    pub fn counts(&self) -> Vec<i64> {
        serde_json::from_value(self.option_counts.clone()).unwrap_or_default()
    }
}

impl ActiveModelBehavior for ActiveModel {}
