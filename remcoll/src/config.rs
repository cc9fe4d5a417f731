use serde::Deserialize;

use crate::error::CollectionError;

const DEFAULT_PORT: u16 = 6379;
const DEFAULT_BUFFER_CAPACITY: usize = 256;

/// How a remote list removes or inserts at a position
///
/// The store primitive only addresses entries by value. `ByValue` uses the
/// payload at the position directly, which hits the first equal payload when
/// the list holds duplicates. `Positional` first overwrites the slot with a
/// unique tombstone and then targets the tombstone, at the cost of extra
/// round trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalMode {
    #[default]
    Positional,
    ByValue,
}

/// Where the store connection comes from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreSource {
    /// Backend specific connection string, e.g. `redis://host:6379/0`
    ConnectionString(String),
    /// Structured endpoint description
    Options(StoreEndpoint),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreEndpoint {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database: u32,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

impl StoreEndpoint {
    /// Render as a URL with the given scheme
    #[must_use]
    pub fn to_url(&self, scheme: &str) -> String {
        let auth = match (&self.username, &self.password) {
            (Some(user), Some(pass)) => format!("{user}:{pass}@"),
            (Some(user), None) => format!("{user}@"),
            (None, Some(pass)) => format!(":{pass}@"),
            (None, None) => String::new(),
        };
        format!(
            "{scheme}://{auth}{}:{}/{}",
            self.host, self.port, self.database
        )
    }
}

impl StoreSource {
    /// Connection string for this source, rendering structured options with `scheme`
    #[must_use]
    pub fn to_connection_string(&self, scheme: &str) -> String {
        match self {
            Self::ConnectionString(s) => s.clone(),
            Self::Options(endpoint) => endpoint.to_url(scheme),
        }
    }
}

/// Options for one remote collection
///
/// The comparer of a sorted collection is not configurable from data; pass
/// it in code with `SortedList::with_comparator`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListOptions {
    pub list_key: String,
    #[serde(default)]
    pub removal: RemovalMode,
    #[serde(default = "default_buffer_capacity")]
    pub initial_buffer_capacity: usize,
    #[serde(default)]
    pub store: Option<StoreSource>,
}

impl ListOptions {
    #[must_use]
    pub fn new(list_key: impl Into<String>) -> Self {
        Self {
            list_key: list_key.into(),
            removal: RemovalMode::default(),
            initial_buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            store: None,
        }
    }

    /// Parse and validate options from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if:
    /// - The JSON input is invalid or malformed
    /// - `list_key` is empty or `initial_buffer_capacity` is zero
    pub fn from_slice(json: &[u8]) -> Result<Self, CollectionError> {
        let options: Self = serde_json::from_slice(json).map_err(|e| {
            CollectionError::InvalidArgument(format!("Failed to parse list options JSON: {e}"))
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Read options from a reader until EOF.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if:
    /// - There are I/O errors reading from the provided reader
    /// - The content is rejected by [`ListOptions::from_slice`]
    pub fn from_reader(mut reader: impl embedded_io::Read) -> Result<Self, CollectionError> {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            match embedded_io::Read::read(&mut reader, &mut chunk) {
                Ok(0) => break,
                Ok(n) => buffer.extend_from_slice(&chunk[..n]),
                Err(e) => {
                    return Err(CollectionError::InvalidArgument(format!(
                        "Failed to read list options: {e:?}"
                    )))
                }
            }
        }
        Self::from_slice(&buffer)
    }

    /// # Errors
    /// `InvalidArgument` for an empty key or a zero buffer capacity
    pub fn validate(&self) -> Result<(), CollectionError> {
        if self.list_key.is_empty() {
            return Err(CollectionError::InvalidArgument(
                "list_key must not be empty".to_string(),
            ));
        }
        if self.initial_buffer_capacity == 0 {
            return Err(CollectionError::InvalidArgument(
                "initial_buffer_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
