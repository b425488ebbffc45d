/// Readiness probe failure for one backing store
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("{store} health check failed: {reason}")]
    HealthCheckFailed { store: &'static str, reason: String },
}

impl DatabaseError {
    pub fn unhealthy(store: &'static str, reason: impl ToString) -> Self {
        Self::HealthCheckFailed {
            store,
            reason: reason.to_string(),
        }
    }
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;
