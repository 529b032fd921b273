//! 评审租约实体
//!
//! 同一 (评审者, 提交) 可能因并发存在多条记录，以最近开始的一条为准。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "peer_workflow_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub scorer_id: i64,
    pub author_id: i64,
    pub submission_uuid: String,
    pub started_at: i64,
    pub assessment_id: Option<i64>,
    pub scored: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::peer_workflows::Entity",
        from = "Column::ScorerId",
        to = "super::peer_workflows::Column::Id"
    )]
    Scorer,
    #[sea_orm(
        belongs_to = "super::peer_workflows::Entity",
        from = "Column::AuthorId",
        to = "super::peer_workflows::Column::Id"
    )]
    Author,
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
    pub fn into_peer_workflow_item(self) -> crate::models::peer::entities::PeerWorkflowItem {
        use chrono::{DateTime, Utc};

        crate::models::peer::entities::PeerWorkflowItem {
            id: self.id,
            scorer_id: self.scorer_id,
            author_id: self.author_id,
            submission_uuid: self.submission_uuid,
            started_at: DateTime::<Utc>::from_timestamp(self.started_at, 0).unwrap_or_default(),
            assessment_id: self.assessment_id,
            scored: self.scored,
        }
    }
}
