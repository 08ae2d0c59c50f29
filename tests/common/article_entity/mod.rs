use crudlink::{Fillable, Pivot, PivotRelations};
use sea_orm::Value;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "articles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub body: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl PivotRelations for Model {
    fn pivot(name: &str) -> Option<Pivot> {
        match name {
            "tags" => Some(Pivot::new("article_tag", "article_id", "tag_id")),
            _ => None,
        }
    }

    fn pivot_key(&self) -> Value {
        self.id.into()
    }
}

impl Fillable for Model {
    fn fillable() -> &'static [&'static str] {
        &["title"]
    }
}
