use serde::{Deserialize, Serialize};

/// Read-only projection of a vendor row. The agent never mutates these.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorRecord {
    pub name: String,
    pub company: String,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub cities: Vec<String>,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub contact: Vec<String>,
    #[serde(default)]
    pub email: Vec<String>,
}

/// Structured extraction output produced by the LLM from manual text,
/// before it is reviewed and persisted as a vendor row.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorDraft {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contact: Vec<String>,
    #[serde(default)]
    pub email: Vec<String>,
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub cities: Vec<String>,
    #[serde(default)]
    pub countries: Vec<String>,
}
