//! Data models for catalog entries, checkpoints and scan modes.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Record`]: One harvested catalog entry, as stored in the dataset file
//! - [`Dimension`]: One available size of a sign with its IMP code
//! - [`CheckpointEntry`]: Whether a CID was already probed and had an image
//! - [`ScanMode`]: How prior checkpoint state influences a scan
//!
//! The dataset file keeps the column names of the historical harvest
//! (`Numero`, `Reference_Tome_V`, ...), hence the `serde(rename)` attributes.

use std::fmt;

use clap::ValueEnum;
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DimensionsError;
use crate::pyrepr;

/// Integer key identifying one catalog entry.
pub type Cid = u32;

/// Sentinel stored for any field whose label is absent from the detail page.
pub const NOT_AVAILABLE: &str = "N/A";

/// How prior checkpoint state decides whether a CID is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScanMode {
    /// Ignore prior state and (re)fetch every CID.
    Full,
    /// Skip every CID that already has a checkpoint entry.
    Minimal,
    /// Skip only CIDs checkpointed without an image.
    Partial,
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanMode::Full => "full",
            ScanMode::Minimal => "minimal",
            ScanMode::Partial => "partial",
        };
        f.write_str(s)
    }
}

/// One row of the checkpoint file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct CheckpointEntry {
    pub cid: Cid,
    #[serde(deserialize_with = "deserialize_flag")]
    pub has_image: bool,
}

/// One available size of a sign.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Dimension {
    #[serde(rename = "Dimensions_mm")]
    pub dimensions_mm: String,
    #[serde(rename = "Code_IMP")]
    pub code_imp: String,
}

/// The text fields of a [`Record`] filled from labelled spans on the detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Numero,
    Nom,
    ReferenceTomeV,
    ReferenceVhr,
    Description,
    Usages,
    Couleur,
    TypePellicule,
}

impl Field {
    /// Column name in the dataset file.
    pub fn column(self) -> &'static str {
        match self {
            Field::Numero => "Numero",
            Field::Nom => "Nom",
            Field::ReferenceTomeV => "Reference_Tome_V",
            Field::ReferenceVhr => "Reference_VHR",
            Field::Description => "Description",
            Field::Usages => "Usages",
            Field::Couleur => "Couleur",
            Field::TypePellicule => "Type_Pellicule",
        }
    }
}

/// A harvested catalog entry.
///
/// A later fetch of the same CID replaces the whole record; fields are never
/// merged individually.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Record {
    pub cid: Cid,
    #[serde(rename = "Numero", deserialize_with = "deserialize_text")]
    pub numero: String,
    #[serde(rename = "Nom", deserialize_with = "deserialize_text")]
    pub nom: String,
    #[serde(rename = "Reference_Tome_V", deserialize_with = "deserialize_text")]
    pub reference_tome_v: String,
    #[serde(rename = "Reference_VHR", deserialize_with = "deserialize_text")]
    pub reference_vhr: String,
    #[serde(rename = "Description", deserialize_with = "deserialize_text")]
    pub description: String,
    #[serde(rename = "Usages", deserialize_with = "deserialize_text")]
    pub usages: String,
    #[serde(rename = "Couleur", deserialize_with = "deserialize_text")]
    pub couleur: String,
    #[serde(rename = "Type_Pellicule", deserialize_with = "deserialize_text")]
    pub type_pellicule: String,
    #[serde(
        rename = "Dimensions",
        serialize_with = "serialize_dimensions",
        deserialize_with = "deserialize_dimensions"
    )]
    pub dimensions: Vec<Dimension>,
}

impl Record {
    /// A record for `cid` with every field marked not available.
    pub fn new(cid: Cid) -> Self {
        let na = || NOT_AVAILABLE.to_string();
        Record {
            cid,
            numero: na(),
            nom: na(),
            reference_tome_v: na(),
            reference_vhr: na(),
            description: na(),
            usages: na(),
            couleur: na(),
            type_pellicule: na(),
            dimensions: Vec::new(),
        }
    }

    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Numero => &self.numero,
            Field::Nom => &self.nom,
            Field::ReferenceTomeV => &self.reference_tome_v,
            Field::ReferenceVhr => &self.reference_vhr,
            Field::Description => &self.description,
            Field::Usages => &self.usages,
            Field::Couleur => &self.couleur,
            Field::TypePellicule => &self.type_pellicule,
        }
    }

    pub fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Numero => &mut self.numero,
            Field::Nom => &mut self.nom,
            Field::ReferenceTomeV => &mut self.reference_tome_v,
            Field::ReferenceVhr => &mut self.reference_vhr,
            Field::Description => &mut self.description,
            Field::Usages => &mut self.usages,
            Field::Couleur => &mut self.couleur,
            Field::TypePellicule => &mut self.type_pellicule,
        }
    }
}

/// Parse the textual `Dimensions` column.
///
/// Accepts `N/A` or an empty cell (no dimensions), a JSON array, or the
/// Python list literal written by older harvests.
pub fn parse_dimensions(raw: &str) -> Result<Vec<Dimension>, DimensionsError> {
    let raw = raw.trim();
    if raw.is_empty() || raw == NOT_AVAILABLE {
        return Ok(Vec::new());
    }
    match serde_json::from_str(raw) {
        Ok(dims) => Ok(dims),
        Err(_) => pyrepr::parse_dimension_list(raw),
    }
}

fn serialize_dimensions<S: Serializer>(dims: &[Dimension], s: S) -> Result<S::Ok, S::Error> {
    if dims.is_empty() {
        return s.serialize_str(NOT_AVAILABLE);
    }
    let json = serde_json::to_string(dims).map_err(S::Error::custom)?;
    s.serialize_str(&json)
}

fn deserialize_dimensions<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Dimension>, D::Error> {
    let raw = String::deserialize(d)?;
    parse_dimensions(&raw).map_err(D::Error::custom)
}

/// Older harvests left empty cells where a label was missing.
fn deserialize_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let raw = String::deserialize(d)?;
    if raw.trim().is_empty() {
        Ok(NOT_AVAILABLE.to_string())
    } else {
        Ok(raw)
    }
}

fn deserialize_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(d)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(D::Error::custom(format!("invalid has_image value {other:?}"))),
    }
}
