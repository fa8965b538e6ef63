pub mod app_config;
pub mod availability;
pub mod catalog;
pub mod config;
pub mod grades;
pub mod orders;

pub use app_config::{AppConfig, Environment};
pub use availability::{
    evaluate_grade, is_variant_offerable, offerable_colors, GradeEvaluation, TemplateLine,
    VariantStock,
};
pub use catalog::{ItemType, OrderStatus, StockType};
pub use config::{load_app_config, load_app_config_from_env};
pub use grades::{
    load_sample_grades, parse_sample_grades, retain_positive_rows, SampleGrade,
    SampleGradesFile, TemplateInput,
};
pub use orders::{
    validate_order_request, CustomerInput, GradeLine, OrderItemInput, OrderNotification,
    OrderRequest, OrderRuleError, ValidatedOrder, VariantKey,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read sample grades file {path}: {source}")]
    SampleGradesIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse sample grades file: {0}")]
    SampleGradesParse(#[source] serde_yaml::Error),
    #[error("config validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid stock type: {0}")]
    InvalidStockType(String),
    #[error("invalid order status: {0}")]
    InvalidOrderStatus(String),
}
