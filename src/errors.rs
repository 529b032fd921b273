//! 统一错误处理模块
//!
//! 使用宏自动生成错误类型，支持错误代码、类型名称和错误分类。
//!
//! 错误分为三类（见 [`ErrorCategory`]）：
//! - `Request`: 调用方输入有误或前置条件不满足，修正后可重试
//! - `Workflow`: 依赖当前流程状态的前置条件失败（例如没有可关闭的评审任务）
//! - `Internal`: 存储或其他意外错误，仅记录日志并返回通用提示

use std::fmt;

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Request,
    Workflow,
    Internal,
}

/// 定义错误类型的宏
///
/// 自动生成：
/// - enum 定义
/// - code() 方法 - 返回错误代码
/// - error_type() 方法 - 返回错误类型名称
/// - category() 方法 - 返回错误分类
/// - message() 方法 - 返回错误详情
/// - 便捷构造函数
macro_rules! define_peerflow_errors {
    ($(
        $variant:ident($code:literal, $type_name:literal, $category:ident)
    ),* $(,)?) => {
        #[derive(Debug, Clone)]
        pub enum PeerFlowError {
            $($variant(String),)*
        }

        impl PeerFlowError {
            /// 获取错误代码
            pub fn code(&self) -> &'static str {
                match self {
                    $(PeerFlowError::$variant(_) => $code,)*
                }
            }

            /// 获取错误类型名称
            pub fn error_type(&self) -> &'static str {
                match self {
                    $(PeerFlowError::$variant(_) => $type_name,)*
                }
            }

            /// 获取错误分类
            pub fn category(&self) -> ErrorCategory {
                match self {
                    $(PeerFlowError::$variant(_) => ErrorCategory::$category,)*
                }
            }

            /// 获取错误详情
            pub fn message(&self) -> &str {
                match self {
                    $(PeerFlowError::$variant(msg) => msg,)*
                }
            }
        }

        // 生成便捷构造函数
        paste::paste! {
            impl PeerFlowError {
                $(
                    pub fn [<$variant:snake>]<T: Into<String>>(msg: T) -> Self {
                        PeerFlowError::$variant(msg.into())
                    }
                )*
            }
        }
    };
}

define_peerflow_errors! {
    CacheConnection("E001", "Cache Connection Error", Internal),
    CachePluginNotFound("E002", "Cache Plugin Not Found", Internal),
    DatabaseConfig("E003", "Database Configuration Error", Internal),
    DatabaseConnection("E004", "Database Connection Error", Internal),
    DatabaseOperation("E005", "Database Operation Error", Internal),
    Serialization("E006", "Serialization Error", Internal),
    Internal("E007", "Peer Assessment Internal Error", Internal),
    Validation("E008", "Validation Error", Request),
    NotFound("E009", "Resource Not Found", Request),
    Request("E010", "Peer Assessment Request Error", Request),
    InvalidRubricSelection("E011", "Invalid Rubric Selection", Request),
    Workflow("E012", "Peer Assessment Workflow Error", Workflow),
}

impl PeerFlowError {
    /// 格式化为彩色输出（用于开发环境）
    #[cfg(debug_assertions)]
    pub fn format_colored(&self) -> String {
        format!(
            "\x1b[1;31m[ERROR]\x1b[0m \x1b[33m{}\x1b[0m \x1b[31m{}\x1b[0m\n  {}",
            self.code(),
            self.error_type(),
            self.message()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }

    pub fn is_request_error(&self) -> bool {
        self.category() == ErrorCategory::Request
    }

    pub fn is_workflow_error(&self) -> bool {
        self.category() == ErrorCategory::Workflow
    }

    pub fn is_internal_error(&self) -> bool {
        self.category() == ErrorCategory::Internal
    }
}

impl fmt::Display for PeerFlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for PeerFlowError {}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for PeerFlowError {
    fn from(err: sea_orm::DbErr) -> Self {
        PeerFlowError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for PeerFlowError {
    fn from(err: std::io::Error) -> Self {
        PeerFlowError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for PeerFlowError {
    fn from(err: serde_json::Error) -> Self {
        PeerFlowError::Serialization(err.to_string())
    }
}

/// 判断数据库错误是否为唯一约束冲突
///
/// 并发创建时由唯一索引兜底，冲突视为幂等成功。
pub fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    )
}

pub type Result<T> = std::result::Result<T, PeerFlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(PeerFlowError::cache_connection("test").code(), "E001");
        assert_eq!(PeerFlowError::database_config("test").code(), "E003");
        assert_eq!(PeerFlowError::request("test").code(), "E010");
        assert_eq!(PeerFlowError::workflow("test").code(), "E012");
    }

    #[test]
    fn test_error_types() {
        assert_eq!(
            PeerFlowError::workflow("test").error_type(),
            "Peer Assessment Workflow Error"
        );
        assert_eq!(
            PeerFlowError::invalid_rubric_selection("test").error_type(),
            "Invalid Rubric Selection"
        );
    }

    #[test]
    fn test_error_categories() {
        assert!(PeerFlowError::request("bad").is_request_error());
        assert!(PeerFlowError::invalid_rubric_selection("bad").is_request_error());
        assert!(PeerFlowError::not_found("missing").is_request_error());
        assert!(PeerFlowError::workflow("no item").is_workflow_error());
        assert!(PeerFlowError::database_operation("boom").is_internal_error());
        assert!(PeerFlowError::internal("boom").is_internal_error());
    }

    #[test]
    fn test_db_err_is_internal() {
        let err: PeerFlowError = sea_orm::DbErr::Custom("disk full".to_string()).into();
        assert_eq!(err.category(), ErrorCategory::Internal);
        assert!(err.message().contains("disk full"));
    }

    #[test]
    fn test_format_simple() {
        let err = PeerFlowError::request("Invalid submission uuid");
        let formatted = err.format_simple();
        assert!(formatted.contains("Peer Assessment Request Error"));
        assert!(formatted.contains("Invalid submission uuid"));
    }
}
