//! Demo records used by the CLI.

use std::net::IpAddr;

use csvbind::CsvRecord;
use serde::{Deserialize, Serialize};

/// Person row addressed by column index.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, CsvRecord)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[csv(index = 0)]
    pub id: Option<u32>,

    #[csv(index = 1)]
    pub first_name: Option<String>,

    #[csv(index = 2)]
    pub last_name: Option<String>,

    #[csv(index = 3)]
    pub email: Option<String>,

    #[csv(index = 4)]
    pub gender: Option<String>,

    #[csv(index = 5)]
    pub ip: Option<IpAddr>,
}

/// Same person, addressed by header name.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, CsvRecord)]
#[serde(rename_all = "camelCase")]
pub struct NamedPerson {
    #[csv(header = "id")]
    pub id: Option<u32>,

    #[csv(header = "first_name")]
    pub first_name: Option<String>,

    #[csv(header = "last_name")]
    pub last_name: Option<String>,

    #[csv(header = "email")]
    pub email: Option<String>,

    #[csv(header = "gender")]
    pub gender: Option<String>,

    #[csv(header = "ip_address")]
    pub ip: Option<IpAddr>,
}
