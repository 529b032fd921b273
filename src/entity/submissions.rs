//! 提交实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "submissions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub uuid: String,
    pub student_item_id: i64,
    pub attempt_number: i32,
    #[sea_orm(column_type = "Text")]
    pub answer: String,
    pub submitted_at: i64,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::student_items::Entity",
        from = "Column::StudentItemId",
        to = "super::student_items::Column::Id"
    )]
    StudentItem,
}

impl Related<super::student_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudentItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn into_submission(self) -> crate::models::submissions::entities::Submission {
        use crate::models::submissions::entities::Submission;
        use chrono::{DateTime, Utc};

        Submission {
            uuid: self.uuid,
            student_item_id: self.student_item_id,
            attempt_number: self.attempt_number,
            // 作答内容入库前已序列化，解析失败时按原始字符串返回
            answer: serde_json::from_str(&self.answer)
                .unwrap_or(serde_json::Value::String(self.answer)),
            submitted_at: DateTime::<Utc>::from_timestamp(self.submitted_at, 0).unwrap_or_default(),
            created_at: DateTime::<Utc>::from_timestamp(self.created_at, 0).unwrap_or_default(),
        }
    }
}
