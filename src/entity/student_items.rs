//! 学生作答项实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "student_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: String,
    pub course_id: String,
    pub item_id: String,
    pub item_type: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::submissions::Entity")]
    Submissions,
}

impl Related<super::submissions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submissions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_student_item(self) -> crate::models::submissions::entities::StudentItem {
        crate::models::submissions::entities::StudentItem {
            student_id: self.student_id,
            course_id: self.course_id,
            item_id: self.item_id,
            item_type: self.item_type,
        }
    }
}
