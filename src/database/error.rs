use std::fmt::{self, Display};

use warp::reject::Reject;

use crate::schema::{Id, SetKind};

#[derive(Debug)]
pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(e),
            sqlx::Error::RowNotFound => Self::new(String::from("RowNotFound")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(e),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(String::from("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            e => Self::new(format!("{e}")),
        }
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Query failed: {}", self.info)
    }
}

impl std::error::Error for QueryError {}

#[derive(Debug)]
pub struct CacheError {
    info: String,
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        Self {
            info: format!("{:?} - {:?}", value.code(), value.detail()),
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(value: serde_json::Error) -> Self {
        Self {
            info: format!("Malformed cached value: {value}"),
        }
    }
}

impl Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cache failed: {}", self.info)
    }
}

impl std::error::Error for CacheError {}

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
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

/// Every way a single operation can be rejected.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("The list of {0} must not be empty")]
    EmptyList(&'static str),

    #[error("Ingredient {0} is listed more than once")]
    DuplicateIngredient(Id),

    #[error("Tag {0} is listed more than once")]
    DuplicateTag(Id),

    #[error("Unknown ingredients: {0:?}")]
    UnknownIngredient(Vec<Id>),

    #[error("Unknown tags: {0:?}")]
    UnknownTag(Vec<Id>),

    #[error("Amount {amount} of ingredient {ingredient_id} is out of range")]
    InvalidAmount { ingredient_id: Id, amount: i32 },

    #[error("Invalid {field}: {info}")]
    InvalidField { field: &'static str, info: String },

    #[error("Field '{0}' is required")]
    MissingField(&'static str),

    #[error("Recipe is already in your {0}")]
    AlreadyMember(SetKind),

    #[error("Recipe is not in your {0}")]
    NotMember(SetKind),

    #[error("You cannot subscribe to yourself")]
    SelfFollow,

    #[error("You are already subscribed to user {0}")]
    AlreadyFollowing(Id),

    #[error("You are not subscribed to user {0}")]
    NotFollowing(Id),

    #[error("No recipe exists with id {0}")]
    RecipeNotFound(Id),

    #[error("No user exists with id {0}")]
    UserNotFound(Id),

    #[error("No ingredient exists with id {0}")]
    IngredientNotFound(Id),

    #[error("No tag exists with id {0}")]
    TagNotFound(Id),

    #[error("A recipe named '{0}' already exists")]
    DuplicateRecipeName(String),

    #[error("A user with this email or username already exists")]
    DuplicateUser,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication credentials were not provided or are invalid")]
    Unauthenticated,

    #[error("You don't have permission to perform this action")]
    Forbidden,

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn invalid(field: &'static str, info: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            info: info.into(),
        }
    }

    /// HTTP status the rejection is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::RecipeNotFound(_)
            | Error::UserNotFound(_)
            | Error::IngredientNotFound(_)
            | Error::TagNotFound(_) => 404,
            Error::Unauthenticated => 401,
            Error::Forbidden => 403,
            Error::Query(_) | Error::Cache(_) | Error::Internal(_) => 500,
            _ => 400,
        }
    }
}

impl Reject for Error {}
