//! User relation entity (favorite recipe, shopping cart recipe, followed author).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of a user → target relation.
///
/// The object of `Favorite` and `Cart` is a recipe; the object of `Follow` is
/// another user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    #[sea_orm(string_value = "favorite")]
    Favorite,
    #[sea_orm(string_value = "cart")]
    Cart,
    #[sea_orm(string_value = "follow")]
    Follow,
}

impl RelationKind {
    /// Whether the relation targets a recipe (as opposed to a user).
    #[must_use]
    pub const fn targets_recipe(self) -> bool {
        matches!(self, Self::Favorite | Self::Cart)
    }

    /// Human readable name used in error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Favorite => "favorites",
            Self::Cart => "shopping cart",
            Self::Follow => "subscriptions",
        }
    }
}

/// Existence of a row is the relation; unique per (kind, subject, object).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_relation")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub kind: RelationKind,

    /// The user holding the relation
    pub subject_id: String,

    /// Recipe ID or user ID, depending on `kind`
    pub object_id: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SubjectId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Subject,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subject.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
