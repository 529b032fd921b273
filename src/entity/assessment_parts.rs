//! 评审明细实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assessment_parts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub assessment_id: i64,
    pub criterion_id: i64,
    pub option_id: Option<i64>,
    #[sea_orm(column_type = "Text")]
    pub feedback: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::assessments::Entity",
        from = "Column::AssessmentId",
        to = "super::assessments::Column::Id"
    )]
    Assessment,
}

impl Related<super::assessments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assessment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_part(self) -> crate::models::assessments::entities::AssessmentPart {
        crate::models::assessments::entities::AssessmentPart {
            criterion_id: self.criterion_id,
            option_id: self.option_id,
            feedback: self.feedback,
        }
    }
}
