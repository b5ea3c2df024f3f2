use docevent_resolve::ResolveError;

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("prediction has {pred} instances but gold has {gold}")]
    CountMismatch { pred: usize, gold: usize },
    #[error("instance {index} is misaligned: predicted {pred}, gold {gold}")]
    MisalignedDocuments {
        index: usize,
        pred: String,
        gold: String,
    },
    #[error(transparent)]
    Annotation(#[from] ResolveError),
}
