//! Error types raised by the local repository.

/// Failure of a repository operation.
///
/// Validation and not-found errors carry their own HTTP-style status so the
/// dispatch boundary and the REST layer can branch on them uniformly; a
/// storage failure has none.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepoError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl RepoError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RepoError::Validation(_) => Some(400),
            RepoError::NotFound(_) => Some(404),
            RepoError::StorageUnavailable(_) => None,
        }
    }

    pub(crate) fn storage(err: anyhow::Error) -> Self {
        RepoError::StorageUnavailable(format!("{:#}", err))
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CategoryValidationError {
    #[error("Category name is required")]
    NameRequired,
    #[error("Category name cannot be empty")]
    EmptyName,
    #[error("The fallback category cannot be deleted")]
    FallbackNotDeletable,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpenseValidationError {
    #[error("Title is required")]
    TitleRequired,
    #[error("Amount must be >= 0")]
    InvalidAmount,
}

impl From<CategoryValidationError> for RepoError {
    fn from(err: CategoryValidationError) -> Self {
        RepoError::Validation(err.to_string())
    }
}

impl From<ExpenseValidationError> for RepoError {
    fn from(err: ExpenseValidationError) -> Self {
        RepoError::Validation(err.to_string())
    }
}
