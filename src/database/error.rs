use std::fmt::{self, Display};

use thiserror::Error;

/// Outcome of one storage operation. Raw sqlx errors never leave this
/// module: full detail is logged, callers get a redacted message plus an
/// extracted technical detail string.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("No data found.")]
    NotFound,

    #[error("Duplicate value violates {constraint}.")]
    Conflict { constraint: String },

    #[error("{message}")]
    Internal {
        message: String,
        details: Option<String>,
    },
}

impl QueryError {
    pub fn new(message: String) -> Self {
        Self::Internal {
            message,
            details: None,
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Internal { details, .. } => details.as_deref(),
            _ => None,
        }
    }

}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = value {
            return Self::NotFound;
        }

        if let sqlx::Error::Database(e) = &value {
            if let Some(constraint) = e.constraint() {
                log::error!("constraint violation on {constraint}: {e}");
                return Self::Conflict {
                    constraint: constraint.to_string(),
                };
            }
        }

        let details = describe_sqlx_error(&value);
        log::error!("query failed: {details}");

        Self::Internal {
            message: String::from("Database query failed."),
            details: Some(details),
        }
    }
}

fn describe_sqlx_error(value: &sqlx::Error) -> String {
    match value {
        sqlx::Error::Configuration(e) => format!("{e}"),
        sqlx::Error::Database(e) => format!("{e}"),
        sqlx::Error::Io(e) => format!("{e}"),
        sqlx::Error::Tls(e) => format!("{e}"),
        sqlx::Error::Protocol(e) => format!("{e}"),
        sqlx::Error::RowNotFound => format!("RowNotFound"),
        sqlx::Error::TypeNotFound { type_name } => format!("Type not found: {type_name}"),
        sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
            format!("Column index out of bounds {index} ({len})")
        }
        sqlx::Error::ColumnNotFound(e) => format!("{e}"),
        sqlx::Error::ColumnDecode { index, source } => format!("Column decode {index} ({source})"),
        sqlx::Error::Decode(e) => format!("{e}"),
        sqlx::Error::AnyDriverError(e) => format!("{e}"),
        sqlx::Error::PoolTimedOut => format!("Pool timed out"),
        sqlx::Error::PoolClosed => format!("Pool closed"),
        sqlx::Error::WorkerCrashed => format!("Worker crashed"),
        sqlx::Error::Migrate(e) => format!("{e}"),
        _ => format!("Unknown error"),
    }
}

/// Child tables owned by one recipe row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildCollection {
    Ingredients,
    Steps,
    Tags,
    Footnotes,
}

impl ChildCollection {
    pub fn table(&self) -> &'static str {
        match self {
            Self::Ingredients => "ingredients",
            Self::Steps => "steps",
            Self::Tags => "tags",
            Self::Footnotes => "footnotes",
        }
    }
}

impl Display for ChildCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Failure of a multi-table recipe write. Every variant implies the whole
/// transaction was rolled back; collection failures name the table that
/// broke the write.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("No recipe id returned.")]
    NoIdReturned,

    #[error("Error adding recipe to recipes table.")]
    Header(#[source] QueryError),

    #[error("Error updating recipes table.")]
    HeaderUpdate(#[source] QueryError),

    #[error("Recipe not found")]
    NotFound,

    #[error("Error adding {collection} to {collection} table.")]
    Collection {
        collection: ChildCollection,
        #[source]
        source: QueryError,
    },

    #[error("You must include data to update in the request body.")]
    EmptyPayload,

    #[error("{0}")]
    Transaction(QueryError),
}

impl WriteError {
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Header(source)
            | Self::HeaderUpdate(source)
            | Self::Collection { source, .. }
            | Self::Transaction(source) => source.details(),
            _ => None,
        }
    }
}

/// Boundary-side payload shape error. Carries the user-facing message.
#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.info)
    }
}

impl std::error::Error for TypeError {}
