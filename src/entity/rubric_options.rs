//! 评分选项实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "rubric_options")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub criterion_id: i64,
    pub order_num: i32,
    pub name: String,
    pub label: String,
    pub points: i32,
    #[sea_orm(column_type = "Text")]
    pub explanation: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rubric_criteria::Entity",
        from = "Column::CriterionId",
        to = "super::rubric_criteria::Column::Id"
    )]
    Criterion,
}

impl Related<super::rubric_criteria::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Criterion.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_rubric_option(self) -> crate::models::rubrics::entities::RubricOption {
        crate::models::rubrics::entities::RubricOption {
            id: self.id,
            order_num: self.order_num,
            name: self.name,
            label: self.label,
            points: self.points,
            explanation: self.explanation,
        }
    }
}
