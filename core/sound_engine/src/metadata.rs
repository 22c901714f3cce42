use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde_json::Value;

/// Free-form user metadata attached to a sound.
pub type UserMetadata = BTreeMap<String, Value>;

/// Persistent sound attributes, kept by whatever stores the segments.
///
/// Consulted only when a [`crate::LogicalSound`] is built.
pub trait MetadataStore {
    fn fs(&self) -> Option<f64>;
    fn set_fs(&mut self, fs: f64);

    fn origintime(&self) -> Option<f64>;
    fn set_origintime(&mut self, origintime: f64);

    fn startdatetime(&self) -> Option<NaiveDateTime>;
    fn set_startdatetime(&mut self, startdatetime: Option<NaiveDateTime>);

    fn user_metadata(&self) -> UserMetadata;
    fn set_user_metadata(&mut self, key: &str, value: Value);
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryMetadataStore {
    fs: Option<f64>,
    origintime: Option<f64>,
    startdatetime: Option<NaiveDateTime>,
    user: UserMetadata,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn fs(&self) -> Option<f64> {
        self.fs
    }

    fn set_fs(&mut self, fs: f64) {
        self.fs = Some(fs);
    }

    fn origintime(&self) -> Option<f64> {
        self.origintime
    }

    fn set_origintime(&mut self, origintime: f64) {
        self.origintime = Some(origintime);
    }

    fn startdatetime(&self) -> Option<NaiveDateTime> {
        self.startdatetime
    }

    fn set_startdatetime(&mut self, startdatetime: Option<NaiveDateTime>) {
        self.startdatetime = startdatetime;
    }

    fn user_metadata(&self) -> UserMetadata {
        self.user.clone()
    }

    fn set_user_metadata(&mut self, key: &str, value: Value) {
        self.user.insert(key.to_owned(), value);
    }
}
