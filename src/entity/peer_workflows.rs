//! 互评台账实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "peer_workflows")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: String,
    pub course_id: String,
    pub item_id: String,
    #[sea_orm(unique)]
    pub submission_uuid: String,
    pub created_at: i64,
    pub completed_at: Option<i64>,
    pub grading_completed_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn into_peer_workflow(self) -> crate::models::peer::entities::PeerWorkflow {
        use chrono::{DateTime, Utc};

        crate::models::peer::entities::PeerWorkflow {
            id: self.id,
            student_id: self.student_id,
            course_id: self.course_id,
            item_id: self.item_id,
            submission_uuid: self.submission_uuid,
            created_at: DateTime::<Utc>::from_timestamp(self.created_at, 0).unwrap_or_default(),
            completed_at: self
                .completed_at
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
            grading_completed_at: self
                .grading_completed_at
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
        }
    }
}
