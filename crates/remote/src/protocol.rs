//! JSON bodies exchanged with the point store.
//!
//! Field casing is fixed by the service: reads return `Name`/`WKT`, create
//! sends a lowercase `name`, update sends `id`/`WKT`/`Name`.

use formats::ParseError;
use scene::{Entity, EntityId};
use serde::{Deserialize, Deserializer, Serialize};

/// Item of `GET /point` and body of the `POST /point` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub id: i64,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "WKT")]
    pub wkt: String,
}

impl PointRecord {
    pub fn into_entity(self) -> Result<Entity, ParseError> {
        let geometry = formats::parse(&self.wkt)?;
        Ok(Entity::new(self.name.unwrap_or_default(), geometry).with_id(EntityId(self.id)))
    }
}

/// Body of `GET /point/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointDetail {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Type", default)]
    pub kind: Option<String>,
    #[serde(rename = "WKT")]
    pub wkt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatePoint<'a> {
    pub name: &'a str,
    #[serde(rename = "WKT")]
    pub wkt: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdatePoint<'a> {
    pub id: i64,
    #[serde(rename = "WKT")]
    pub wkt: &'a str,
    #[serde(rename = "Name")]
    pub name: &'a str,
}

/// Body of the `PUT /point/{id}` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdateAck {
    #[serde(default, deserialize_with = "lenient_opt_id")]
    pub id: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

impl RawId {
    fn into_i64<E: serde::de::Error>(self) -> Result<i64, E> {
        match self {
            RawId::Number(n) => Ok(n),
            RawId::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("record id {s:?} is not an integer"))),
        }
    }
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    RawId::deserialize(deserializer)?.into_i64()
}

fn lenient_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Option::<RawId>::deserialize(deserializer)?
        .map(|raw| raw.into_i64::<D::Error>())
        .transpose()
}
