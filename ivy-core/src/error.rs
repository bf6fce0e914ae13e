use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("parsing failed with {errors} error(s)")]
    ParseFailed { errors: usize },
    #[error("code generation failed with {errors} error(s)")]
    CodegenFailed { errors: usize },
}
