//! 评审记录实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assessments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub submission_uuid: String,
    pub rubric_id: i64,
    pub scorer_id: String,
    pub score_type: String,
    pub scored_at: i64,
    #[sea_orm(column_type = "Text")]
    pub feedback: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rubrics::Entity",
        from = "Column::RubricId",
        to = "super::rubrics::Column::Id"
    )]
    Rubric,
    #[sea_orm(has_many = "super::assessment_parts::Entity")]
    Parts,
}

impl Related<super::rubrics::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rubric.def()
    }
}

impl Related<super::assessment_parts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Parts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_assessment(
        self,
        parts: Vec<crate::models::assessments::entities::AssessmentPart>,
    ) -> crate::models::assessments::entities::Assessment {
        use chrono::{DateTime, Utc};

        crate::models::assessments::entities::Assessment {
            id: self.id,
            submission_uuid: self.submission_uuid,
            rubric_id: self.rubric_id,
            scorer_id: self.scorer_id,
            score_type: self.score_type,
            scored_at: DateTime::<Utc>::from_timestamp(self.scored_at, 0).unwrap_or_default(),
            feedback: self.feedback,
            parts,
        }
    }
}
