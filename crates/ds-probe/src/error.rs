use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("{0} backend support was not compiled into this binary")]
    BackendNotCompiled(&'static str),
    #[error(transparent)]
    Backend(#[from] ds_tensor::TensorError),
}

pub type Result<T> = std::result::Result<T, ProbeError>;
