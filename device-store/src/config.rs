use serde::Deserialize;
use std::path::PathBuf;

#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum StoreType {
    Sqlite { path: PathBuf },
    Memory,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct StoreConfig {
    #[serde(flatten)]
    pub r#type: StoreType,
}
