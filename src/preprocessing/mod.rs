/// Модуль предобработки данных

pub mod cleaning;
pub mod encoding;
pub mod feature_engineering;
pub mod imputation;
pub mod normalization;
pub mod pipeline;
pub mod roles;

pub use cleaning::DataCleaner;
pub use encoding::{CategoricalEncoder, EncoderState, UNKNOWN_CODE};
pub use feature_engineering::{FeatureEngineer, FeatureRules};
pub use imputation::{ImputerState, KnnImputer};
pub use normalization::{FeatureScaler, FeatureSet, ScalerState};
pub use pipeline::{FittedPreprocessor, PreparedData, PreprocessingOptions, Preprocessor};
pub use roles::{ColumnRoleResolver, RoleRule};
