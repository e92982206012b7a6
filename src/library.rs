//! Per-library display schemas
//!
//! Every library tags its documents with its own metadata fields in the search
//! index. This module maps each library to the fields shown in the document
//! view and in the result table.

use crate::document::{Document, ResultKey};
use serde::Serialize;
use std::fmt;

/// A displayed field: column label and the index field it reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub label: &'static str,
    pub field: &'static str,
}

const fn f(label: &'static str, field: &'static str) -> FieldSpec {
    FieldSpec { label, field }
}

/// Fields every document carries
pub const BASE_FIELDS: &[&str] = &[
    "DocumentName",
    "Library",
    "merged_content",
    "people",
    "organizations",
    "locations",
];

const GENERAL: &[FieldSpec] = &[
    f("Document Type", "Doc_Type_General"),
    f("Date", "Date_General"),
    f("Remarks", "Remarks_General"),
];

const HR: &[FieldSpec] = &[
    f("Employee Number", "Employee_No_HR"),
    f("Department", "Department_HR"),
    f("Document Type", "Document_Type_HR"),
    f("Name", "Name_HR"),
    f("Date", "Date_HR"),
    f("Country", "Country_HR"),
];

const HR_TABLE: &[FieldSpec] = &[
    f("Emp #", "Employee_No_HR"),
    f("Department", "Department_HR"),
    f("Document Type", "Document_Type_HR"),
    f("Name", "Name_HR"),
    f("Date", "Date_HR"),
];

const FLORIX: &[FieldSpec] = &[
    f("Document Type", "Document_Type_Florix"),
    f("Remarks", "Remarks_Florix"),
];

const DFTROPIO: &[FieldSpec] = &[
    f("Serial No", "SERIAL_NO_DFTROPIO"),
    f("Name", "Name_DFTROPIO"),
    f("DOB", "DOB_DFTROPIO"),
    f("Book Category", "BOOK_CATEGORY_DFTROPIO"),
    f("Description", "DESCRIPTION_DFTROPIO"),
    f("Volume Number", "VOLUME_NUMBER_DFTROPIO"),
    f("Serial Range", "SERIAL_RANGE_DFTROPIO"),
    f("Act Number", "ACT_NUMBER_DFTROPIO"),
];

const DFTROPIO_TABLE: &[FieldSpec] = &[
    f("Serial No", "SERIAL_NO_DFTROPIO"),
    f("Name", "Name_DFTROPIO"),
    f("DOB", "DOB_DFTROPIO"),
    f("Book Category", "BOOK_CATEGORY_DFTROPIO"),
    f("Description", "DESCRIPTION_DFTROPIO"),
    f("Volume No", "VOLUME_NUMBER_DFTROPIO"),
    f("Serial Range", "SERIAL_RANGE_DFTROPIO"),
    f("Act Number", "ACT_NUMBER_DFTROPIO"),
];

const FINANCE: &[FieldSpec] = &[
    f("Document ID", "Document_ID_Finance"),
    f("Document Type", "Document_Type_Finance"),
    f("Date", "Date_Finance"),
    f("Info", "Info_Finance"),
];

const AYALA_ANNUAL_REPORT: &[FieldSpec] = &[
    f("Name", "Name_Ayala_Annual_Report"),
    f("Year", "Year_Ayala_Annual_Report"),
    f("Document Type", "DocumentType_Ayala_Annual_Report"),
    f("Remarks", "Remarks_Ayala_Annual_Report"),
];

const AYALA_LEGAL_DOCS: &[FieldSpec] = &[
    f("Name", "Name_Ayala_Legal_Docs"),
    f("Document Type", "DocumentType_Ayala_Legal_Docs"),
    f("Remarks", "Remarks_Ayala_Legal_Docs"),
];

/// Document libraries known to the index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Library {
    General,
    Hr,
    Florix,
    Dftropio,
    Finance,
    AyalaAnnualReport,
    AyalaLegalDocs,
    Other(String),
}

impl Library {
    pub const KNOWN: [Library; 7] = [
        Library::General,
        Library::Hr,
        Library::Florix,
        Library::Dftropio,
        Library::Finance,
        Library::AyalaAnnualReport,
        Library::AyalaLegalDocs,
    ];

    pub fn parse(name: &str) -> Self {
        match name {
            "General" => Library::General,
            "HR" => Library::Hr,
            "Florix" => Library::Florix,
            "DFTROPIO" => Library::Dftropio,
            "Finance" => Library::Finance,
            "Ayala_Annual_Report" => Library::AyalaAnnualReport,
            "Ayala_Legal_Docs" => Library::AyalaLegalDocs,
            other => Library::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Library::General => "General",
            Library::Hr => "HR",
            Library::Florix => "Florix",
            Library::Dftropio => "DFTROPIO",
            Library::Finance => "Finance",
            Library::AyalaAnnualReport => "Ayala_Annual_Report",
            Library::AyalaLegalDocs => "Ayala_Legal_Docs",
            Library::Other(name) => name,
        }
    }

    /// Fields shown in the document view; `None` for libraries without a schema.
    pub fn metadata_fields(&self) -> Option<&'static [FieldSpec]> {
        match self {
            Library::General => Some(GENERAL),
            Library::Hr => Some(HR),
            Library::Florix => Some(FLORIX),
            Library::Dftropio => Some(DFTROPIO),
            Library::Finance => Some(FINANCE),
            Library::AyalaAnnualReport => Some(AYALA_ANNUAL_REPORT),
            Library::AyalaLegalDocs => Some(AYALA_LEGAL_DOCS),
            Library::Other(_) => None,
        }
    }

    /// Columns of the result table
    pub fn table_fields(&self) -> Option<&'static [FieldSpec]> {
        match self {
            Library::Hr => Some(HR_TABLE),
            Library::Dftropio => Some(DFTROPIO_TABLE),
            other => other.metadata_fields(),
        }
    }
}

impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The index `$select` list: base fields followed by every library's fields.
pub fn select_fields() -> Vec<&'static str> {
    let mut fields: Vec<&'static str> = BASE_FIELDS.to_vec();
    for library in Library::KNOWN.iter() {
        for column in library.metadata_fields().unwrap_or_default() {
            if !fields.contains(&column.field) {
                fields.push(column.field);
            }
        }
    }
    fields
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataRow {
    pub label: String,
    pub value: String,
}

/// Labelled metadata for the document view, or `None` when the library has no schema.
pub fn metadata_rows(doc: &Document) -> Option<Vec<MetadataRow>> {
    let fields = Library::parse(doc.library_name()).metadata_fields()?;
    Some(
        fields
            .iter()
            .map(|column| MetadataRow {
                label: column.label.to_string(),
                value: doc.display_field(column.field),
            })
            .collect(),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub key: String,
    pub name: String,
    pub cells: Vec<String>,
}

/// One library's block of search results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryTable {
    pub library: String,
    /// False when the library has no schema and only names are listed
    pub custom_layout: bool,
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl LibraryTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn table_rows(library: &str, docs: &[Document]) -> LibraryTable {
    let fields = Library::parse(library).table_fields();
    let rows = docs
        .iter()
        .enumerate()
        .map(|(idx, doc)| {
            let name = doc
                .name
                .clone()
                .unwrap_or_else(|| format!("Document {}", idx + 1));
            let cells = match fields {
                Some(fields) => fields.iter().map(|column| doc.display_field(column.field)).collect(),
                None => vec![name.clone()],
            };
            TableRow {
                key: ResultKey::new(library, idx).to_string(),
                name,
                cells,
            }
        })
        .collect();

    LibraryTable {
        library: library.to_string(),
        custom_layout: fields.is_some(),
        columns: match fields {
            Some(fields) => fields.iter().map(|column| column.label.to_string()).collect(),
            None => vec!["Document".to_string()],
        },
        rows,
    }
}
