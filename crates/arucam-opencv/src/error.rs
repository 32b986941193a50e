use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum OpenCvBackendError {
    #[error(transparent)]
    OpenCv(#[from] opencv::Error),

    #[error("camera {index} could not be opened")]
    CameraUnavailable { index: i32 },

    #[error("failed to read image {}", path.display())]
    ImageRead { path: PathBuf },

    #[error("invalid detector output: {0}")]
    Geometry(#[from] arucam::core::GeometryError),

    #[error("detector returned negative marker id {0}")]
    InvalidId(i32),

    #[error(transparent)]
    Composite(#[from] arucam::CompositeError),
}
