//! Spreadsheet import and export of contacts.
//!
//! Excel files are read with calamine and written with rust_xlsxwriter; CSV
//! goes through the csv crate. Rows are addressed by their sheet row number,
//! with the header on row 1.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use calamine::{open_workbook_auto_from_rs, Reader};
use chrono::Utc;
use diesel::prelude::*;
use log::{info, warn};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::contacts::caller_profile_id;
use super::status::ContactStatus;
use super::types::{Contact, ContactProduct};
use crate::core::shared::error::{ApiError, ApiPath, ApiQuery};
use crate::core::shared::schema::{contact_products, contacts, products};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::{non_blank, with_conn};
use crate::institution::access::require_member;
use crate::institution::products::load_product;
use crate::institution::types::ProductStatus;
use crate::security::auth::AuthenticatedUser;

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const CONTACTS_SHEET: &str = "Contacts";
const TEMPLATE_COLUMNS: [&str; 6] = [
    "name",
    "phone_number",
    "country",
    "country_code",
    "product_name",
    "status",
];
const REQUIRED_COLUMNS: [&str; 2] = ["name", "phone_number"];
const EXPORT_COLUMNS: [&str; 8] = [
    "uuid",
    "name",
    "phone_number",
    "country",
    "country_code",
    "product_name",
    "status",
    "remarks",
];

// ===== Reading =====

/// A parsed sheet: lowercased headers plus data rows tagged with their row number.
#[derive(Debug, Default, PartialEq)]
pub struct SheetRows {
    pub headers: Vec<String>,
    pub rows: Vec<(usize, Vec<String>)>,
}

impl SheetRows {
    fn from_grid(grid: Vec<Vec<String>>, first_row: usize) -> Self {
        let mut lines = grid.into_iter().enumerate();
        let headers = lines
            .next()
            .map(|(_, header)| {
                header
                    .into_iter()
                    .map(|h| h.trim().trim_start_matches('\u{feff}').to_lowercase())
                    .collect()
            })
            .unwrap_or_default();
        let rows = lines
            .map(|(idx, cells)| (first_row + idx, cells))
            .collect();
        Self { headers, rows }
    }

    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|c| !self.headers.iter().any(|h| h == *c))
            .map(|c| c.to_string())
            .collect()
    }

    /// Trimmed cell under `column`, empty when absent.
    pub fn cell<'a>(&self, cells: &'a [String], column: &str) -> &'a str {
        self.headers
            .iter()
            .position(|h| h == column)
            .and_then(|idx| cells.get(idx))
            .map(|v| v.trim())
            .unwrap_or("")
    }
}

pub fn is_blank_row(cells: &[String]) -> bool {
    cells.iter().all(|c| c.trim().is_empty())
}

fn read_excel(bytes: Vec<u8>) -> Result<SheetRows, String> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| format!("Error processing file: {}", e))?;

    let names = workbook.sheet_names();
    let sheet = names
        .iter()
        .find(|n| n.as_str() == CONTACTS_SHEET)
        .or_else(|| names.first())
        .cloned()
        .ok_or_else(|| "The workbook has no sheets.".to_string())?;

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| format!("Error processing file: {}", e))?;
    let first_row = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
    let grid = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();
    Ok(SheetRows::from_grid(grid, first_row))
}

fn read_csv(bytes: &[u8]) -> Result<SheetRows, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| format!("Error processing file: {}", e))?;
        grid.push(record.iter().map(str::to_string).collect());
    }
    Ok(SheetRows::from_grid(grid, 1))
}

pub fn read_rows(file_name: &str, bytes: Vec<u8>) -> Result<SheetRows, ApiError> {
    let lower = file_name.to_lowercase();
    let parsed = if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
        read_excel(bytes)
    } else if lower.ends_with(".csv") {
        read_csv(&bytes)
    } else {
        return Err(ApiError::Validation(
            "Invalid file type. Please upload an Excel file (.xlsx or .xls) or a CSV file (.csv)."
                .into(),
        ));
    };
    parsed.map_err(ApiError::Validation)
}

// ===== Writing =====

fn write_table(
    workbook: &mut Workbook,
    name: &str,
    headers: &[&str],
    rows: &[Vec<String>],
) -> Result<(), XlsxError> {
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(name)?;
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    for (row_idx, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            sheet.write_string(row_idx as u32 + 1, col as u16, value)?;
        }
    }
    Ok(())
}

fn xlsx_error(e: XlsxError) -> ApiError {
    ApiError::Internal(format!("Failed to build spreadsheet: {}", e))
}

pub fn build_template(
    product_name: &str,
    available: &[(String, Option<String>)],
) -> Result<Vec<u8>, ApiError> {
    let examples = vec![
        vec![
            "John Doe".to_string(),
            "+1234567890".to_string(),
            "USA".to_string(),
            "+1".to_string(),
            product_name.to_string(),
            ContactStatus::New.as_str().to_string(),
        ],
        vec![
            "Jane Smith".to_string(),
            "+0987654321".to_string(),
            "UK".to_string(),
            "+44".to_string(),
            String::new(),
            ContactStatus::New.as_str().to_string(),
        ],
    ];
    let products: Vec<Vec<String>> = available
        .iter()
        .map(|(name, description)| vec![name.clone(), description.clone().unwrap_or_default()])
        .collect();
    let statuses = ContactStatus::ALL
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let instructions: Vec<Vec<String>> = [
        ("name", "Full name of the contact".to_string(), "Yes"),
        ("phone_number", "Phone number with country code".to_string(), "Yes"),
        ("country", "Country name".to_string(), "No"),
        ("country_code", "Country calling code".to_string(), "No"),
        (
            "product_name",
            "Product name from the Available_Products sheet. Leave blank to use the product this template was downloaded for".to_string(),
            "No",
        ),
        (
            "status",
            format!("One of: {}. Anything else becomes new", statuses),
            "No",
        ),
    ]
    .into_iter()
    .map(|(field, description, required)| {
        vec![field.to_string(), description, required.to_string()]
    })
    .collect();

    let mut workbook = Workbook::new();
    write_table(&mut workbook, CONTACTS_SHEET, &TEMPLATE_COLUMNS, &examples).map_err(xlsx_error)?;
    write_table(
        &mut workbook,
        "Available_Products",
        &["product_name", "product_description"],
        &products,
    )
    .map_err(xlsx_error)?;
    write_table(
        &mut workbook,
        "Instructions",
        &["Field", "Description", "Required"],
        &instructions,
    )
    .map_err(xlsx_error)?;
    workbook.save_to_buffer().map_err(xlsx_error)
}

fn attachment(content_type: &str, file_name: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
        .into_response()
}

// ===== Handlers =====

pub async fn download_template(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(product_uuid): ApiPath<Uuid>,
) -> Result<Response, ApiError> {
    let (product_name, available) = with_conn(&state.conn, move |conn| {
        let product = load_product(conn, product_uuid)?;
        require_member(conn, &auth, product.institution_id)?;
        let available: Vec<(String, Option<String>)> = products::table
            .filter(products::institution_id.eq(product.institution_id))
            .filter(products::status.eq(ProductStatus::Active.as_str()))
            .select((products::name, products::descriptions))
            .order(products::name.asc())
            .load(conn)?;
        Ok((product.name, available))
    })
    .await?;

    let bytes = build_template(&product_name, &available)?;
    Ok(attachment(
        XLSX_CONTENT_TYPE,
        &format!("contacts_template_{}.xlsx", product_uuid),
        bytes,
    ))
}

#[derive(Debug, Serialize)]
pub struct CreatedContact {
    pub uuid: Uuid,
    pub name: String,
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
pub struct BulkUploadResult {
    pub created_count: usize,
    pub error_count: usize,
    pub created_contacts: Vec<CreatedContact>,
    pub errors: Vec<String>,
}

/// A contact ready to insert, or the reason the row was rejected.
fn prepare_row(
    sheet: &SheetRows,
    cells: &[String],
    default_product: Uuid,
    products_by_name: &HashMap<String, Uuid>,
    available_names: &str,
) -> Result<(String, String, Option<String>, Option<String>, ContactStatus, Uuid), String> {
    let name = sheet.cell(cells, "name");
    if name.is_empty() {
        return Err("Name is required".into());
    }
    let phone = sheet.cell(cells, "phone_number");
    if phone.is_empty() {
        return Err("Phone number is required".into());
    }

    let product_name = sheet.cell(cells, "product_name");
    let product = if product_name.is_empty() {
        default_product
    } else {
        *products_by_name
            .get(&product_name.to_lowercase())
            .ok_or_else(|| {
                format!(
                    "Product \"{}\" not found. Available products: {}",
                    product_name, available_names
                )
            })?
    };

    let status = ContactStatus::parse(sheet.cell(cells, "status")).unwrap_or(ContactStatus::New);
    let optional = |column: &str| non_blank(Some(sheet.cell(cells, column).to_string()));

    Ok((
        name.to_string(),
        phone.to_string(),
        optional("country"),
        optional("country_code"),
        status,
        product,
    ))
}

fn error_message(err: ApiError) -> String {
    match err {
        ApiError::Validation(msg)
        | ApiError::NotFound(msg)
        | ApiError::Conflict(msg) => msg,
        other => other.to_string(),
    }
}

pub async fn bulk_upload(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(product_uuid): ApiPath<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<BulkUploadResult>), ApiError> {
    let member = auth.clone();
    let product = with_conn(&state.conn, move |conn| {
        let product = load_product(conn, product_uuid)?;
        require_member(conn, &member, product.institution_id)?;
        Ok(product)
    })
    .await?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.body_text()))?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(e.body_text()))?;
            upload = Some((file_name, bytes.to_vec()));
        }
    }
    let (file_name, bytes) =
        upload.ok_or_else(|| ApiError::Validation("No file provided.".into()))?;

    let sheet = read_rows(&file_name, bytes)?;
    let missing = sheet.missing_columns(&REQUIRED_COLUMNS);
    if !missing.is_empty() {
        return Err(ApiError::Validation(format!(
            "Missing required columns: {}",
            missing.join(", ")
        )));
    }

    let result = with_conn(&state.conn, move |conn| {
        let institution_id = product.institution_id;

        let catalogue: Vec<(Uuid, String)> = products::table
            .filter(products::institution_id.eq(institution_id))
            .select((products::uuid, products::name))
            .order(products::name.asc())
            .load(conn)?;
        let products_by_name: HashMap<String, Uuid> = catalogue
            .iter()
            .map(|(uuid, name)| (name.trim().to_lowercase(), *uuid))
            .collect();
        let available_names = catalogue
            .iter()
            .map(|(_, name)| name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let profile_id = caller_profile_id(conn, &auth)?;

        let mut result = BulkUploadResult {
            created_count: 0,
            error_count: 0,
            created_contacts: Vec::new(),
            errors: Vec::new(),
        };

        for (row_number, cells) in &sheet.rows {
            if is_blank_row(cells) {
                continue;
            }
            let prepared = prepare_row(
                &sheet,
                cells,
                product.uuid,
                &products_by_name,
                &available_names,
            );
            let (name, phone_number, country, country_code, status, product_uuid) = match prepared
            {
                Ok(row) => row,
                Err(msg) => {
                    result.errors.push(format!("Row {}: {}", row_number, msg));
                    continue;
                }
            };

            let now = Utc::now();
            let contact = Contact {
                uuid: Uuid::new_v4(),
                institution_id,
                name,
                phone_number,
                country,
                country_code,
                status: status.as_str().to_string(),
                remarks: None,
                created_at: now,
                updated_at: now,
            };
            let inserted = conn.transaction(|conn| {
                diesel::insert_into(contacts::table)
                    .values(&contact)
                    .execute(conn)?;
                diesel::insert_into(contact_products::table)
                    .values(&ContactProduct {
                        uuid: Uuid::new_v4(),
                        contact_uuid: contact.uuid,
                        product_uuid,
                        created_by: profile_id,
                        created_at: now,
                    })
                    .execute(conn)?;
                Ok::<_, ApiError>(())
            });

            match inserted {
                Ok(()) => result.created_contacts.push(CreatedContact {
                    uuid: contact.uuid,
                    name: contact.name,
                    phone_number: contact.phone_number,
                }),
                Err(e) => {
                    warn!("Bulk upload row {} failed: {}", row_number, e);
                    result
                        .errors
                        .push(format!("Row {}: {}", row_number, error_message(e)));
                }
            }
        }

        result.created_count = result.created_contacts.len();
        result.error_count = result.errors.len();
        Ok(result)
    })
    .await?;

    info!(
        "Bulk upload for product {}: {} created, {} errors",
        product_uuid, result.created_count, result.error_count
    );
    let status = if result.created_count > 0 {
        StatusCode::CREATED
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(result)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    pub format: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn parse(value: Option<&str>) -> Result<Self, ApiError> {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("xlsx") => Ok(Self::Xlsx),
            Some("csv") => Ok(Self::Csv),
            Some(other) => Err(ApiError::Validation(format!(
                "Unsupported export format '{}'. Use xlsx or csv.",
                other
            ))),
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }

    fn content_type(&self) -> &'static str {
        match self {
            Self::Xlsx => XLSX_CONTENT_TYPE,
            Self::Csv => "text/csv; charset=utf-8",
        }
    }
}

pub fn export_row(contact: &Contact, product_names: &str) -> Vec<String> {
    vec![
        contact.uuid.to_string(),
        contact.name.clone(),
        contact.phone_number.clone(),
        contact.country.clone().unwrap_or_default(),
        contact.country_code.clone().unwrap_or_default(),
        product_names.to_string(),
        contact.status.clone(),
        contact.remarks.clone().unwrap_or_default(),
    ]
}

pub fn render_export(format: ExportFormat, rows: &[Vec<String>]) -> Result<Vec<u8>, ApiError> {
    match format {
        ExportFormat::Xlsx => {
            let mut workbook = Workbook::new();
            write_table(&mut workbook, CONTACTS_SHEET, &EXPORT_COLUMNS, rows).map_err(xlsx_error)?;
            workbook.save_to_buffer().map_err(xlsx_error)
        }
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            let csv_error = |e: csv::Error| ApiError::Internal(format!("Failed to write CSV: {}", e));
            writer.write_record(EXPORT_COLUMNS).map_err(csv_error)?;
            for row in rows {
                writer.write_record(row).map_err(csv_error)?;
            }
            writer
                .into_inner()
                .map_err(|e| ApiError::Internal(format!("Failed to write CSV: {}", e)))
        }
    }
}

pub async fn export_contacts(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
    ApiQuery(params): ApiQuery<ExportParams>,
) -> Result<Response, ApiError> {
    let format = ExportFormat::parse(params.format.as_deref())?;
    let status = match non_blank(params.status) {
        Some(raw) => ContactStatus::parse(&raw)
            .ok_or_else(|| ApiError::field("status", format!("Invalid status '{}'.", raw)))?,
        None => ContactStatus::ReadyToExport,
    };

    let (rows, exported) = with_conn(&state.conn, move |conn| {
        require_member(conn, &auth, institution_id)?;
        conn.transaction(|conn| {
            let selected: Vec<Contact> = contacts::table
                .filter(contacts::institution_id.eq(institution_id))
                .filter(contacts::status.eq(status.as_str()))
                .select(Contact::as_select())
                .order(contacts::created_at.asc())
                .load(conn)?;
            let uuids: Vec<Uuid> = selected.iter().map(|c| c.uuid).collect();

            let mut names: HashMap<Uuid, Vec<String>> = HashMap::new();
            let links: Vec<(Uuid, String)> = contact_products::table
                .inner_join(products::table)
                .filter(contact_products::contact_uuid.eq_any(&uuids))
                .select((contact_products::contact_uuid, products::name))
                .order(products::name.asc())
                .load(conn)?;
            for (contact, name) in links {
                names.entry(contact).or_default().push(name);
            }

            let rows: Vec<Vec<String>> = selected
                .iter()
                .map(|c| {
                    let products = names.get(&c.uuid).map(|n| n.join(", ")).unwrap_or_default();
                    export_row(c, &products)
                })
                .collect();

            let exported = diesel::update(
                contacts::table
                    .filter(contacts::uuid.eq_any(&uuids))
                    .filter(contacts::status.eq(ContactStatus::ReadyToExport.as_str())),
            )
            .set((
                contacts::status.eq(ContactStatus::Exported.as_str()),
                contacts::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;

            Ok::<_, ApiError>((rows, exported))
        })
    })
    .await?;

    let body = render_export(format, &rows)?;
    info!(
        "Exported {} contacts of institution {} ({} marked exported)",
        rows.len(),
        institution_id,
        exported
    );
    let file_name = format!(
        "contacts_export_{}_{}.{}",
        institution_id,
        Utc::now().format("%Y%m%d%H%M%S"),
        format.extension()
    );
    Ok(attachment(format.content_type(), &file_name, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_csv_rows_and_numbering() {
        let csv = "\u{feff}Name,Phone_Number,product_name\nAma,+233201234567,\n,,\nKofi,+233501234567,Loans\n";
        let sheet = read_rows("contacts.CSV", csv.as_bytes().to_vec()).unwrap();
        assert_eq!(sheet.headers, ["name", "phone_number", "product_name"]);
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.rows[0].0, 2);
        assert!(is_blank_row(&sheet.rows[1].1));
        assert_eq!(sheet.rows[2].0, 4);
        assert_eq!(sheet.cell(&sheet.rows[2].1, "product_name"), "Loans");
        assert_eq!(sheet.cell(&sheet.rows[2].1, "country"), "");
    }

    #[test]
    fn test_rejects_unknown_file_type() {
        match read_rows("contacts.pdf", Vec::new()) {
            Err(ApiError::Validation(msg)) => assert_eq!(
                msg,
                "Invalid file type. Please upload an Excel file (.xlsx or .xls) or a CSV file (.csv)."
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_columns() {
        let sheet = SheetRows::from_grid(grid(&[&["name", "country"]]), 1);
        assert_eq!(sheet.missing_columns(&REQUIRED_COLUMNS), ["phone_number"]);
    }

    #[test]
    fn test_prepare_row() {
        let sheet = SheetRows::from_grid(
            grid(&[&["name", "phone_number", "product_name", "status", "country"]]),
            1,
        );
        let default_product = Uuid::new_v4();
        let loans = Uuid::new_v4();
        let catalogue = HashMap::from([("loans".to_string(), loans)]);

        let cells = grid(&[&["Ama", "+233201234567", "", "flagged", "Ghana"]]).remove(0);
        let (name, _, country, _, status, product) =
            prepare_row(&sheet, &cells, default_product, &catalogue, "Loans").unwrap();
        assert_eq!(name, "Ama");
        assert_eq!(country.as_deref(), Some("Ghana"));
        assert_eq!(status, ContactStatus::Flagged);
        assert_eq!(product, default_product);

        let cells = grid(&[&["Kofi", "+233501234567", "LOANS", "verified", ""]]).remove(0);
        let (_, _, country, _, status, product) =
            prepare_row(&sheet, &cells, default_product, &catalogue, "Loans").unwrap();
        assert_eq!(country, None);
        assert_eq!(status, ContactStatus::New);
        assert_eq!(product, loans);

        let cells = grid(&[&["Esi", "+233", "Savings", "", ""]]).remove(0);
        assert_eq!(
            prepare_row(&sheet, &cells, default_product, &catalogue, "Loans").unwrap_err(),
            "Product \"Savings\" not found. Available products: Loans"
        );

        let cells = grid(&[&["", "+233", "", "", ""]]).remove(0);
        assert_eq!(
            prepare_row(&sheet, &cells, default_product, &catalogue, "Loans").unwrap_err(),
            "Name is required"
        );
    }

    #[test]
    fn test_template_round_trips_through_calamine() {
        let bytes = build_template(
            "Loans",
            &[("Loans".to_string(), Some("Personal loans".to_string()))],
        )
        .unwrap();
        let sheet = read_rows("template.xlsx", bytes).unwrap();
        assert_eq!(sheet.headers, TEMPLATE_COLUMNS);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.cell(&sheet.rows[0].1, "product_name"), "Loans");
    }

    #[test]
    fn test_export_formats() {
        assert_eq!(ExportFormat::parse(None).unwrap(), ExportFormat::Xlsx);
        assert_eq!(ExportFormat::parse(Some("CSV")).unwrap(), ExportFormat::Csv);
        assert!(ExportFormat::parse(Some("pdf")).is_err());

        let rows = vec![vec![
            "id".to_string(),
            "Ama, Jr".to_string(),
            "+233".to_string(),
            String::new(),
            String::new(),
            "Loans".to_string(),
            "ready_to_export".to_string(),
            String::new(),
        ]];
        let csv = String::from_utf8(render_export(ExportFormat::Csv, &rows).unwrap()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("uuid,name,phone_number,country,country_code,product_name,status,remarks")
        );
        assert_eq!(lines.next(), Some("id,\"Ama, Jr\",+233,,,Loans,ready_to_export,"));
    }
}
