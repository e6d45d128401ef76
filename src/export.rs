use rust_xlsxwriter::{Format, Workbook};

use crate::error::Result;
use crate::listing::Row;

pub const FILE_NAME: &str = "invitees.xlsx";
const SHEET_NAME: &str = "Invitees";

const HEADERS: [&str; 8] = [
    "Full Name",
    "Unique ID",
    "Token",
    "Attendance",
    "Attending",
    "Max Count",
    "Updated Count",
    "URL",
];

/// One sheet, one row per guest, returned as xlsx bytes.
pub fn workbook(rows: &[Row]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    for (col, title) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let line = i as u32 + 1;
        let guest = &row.guest;
        sheet.write_string(line, 0, &guest.full_name)?;
        sheet.write_string(line, 1, &guest.id)?;
        sheet.write_string(line, 2, &guest.token)?;
        sheet.write_string(line, 3, row.status)?;
        sheet.write_string(line, 4, row.attending)?;
        sheet.write_number(line, 5, guest.attendance_max_count)?;
        sheet.write_number(line, 6, guest.attendance_updated_count)?;
        sheet.write_string(line, 7, &row.url)?;
    }
    sheet.autofit();

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::ShareLinks;
    use crate::listing::{self, Order};
    use crate::models::Guest;

    #[test]
    fn produces_an_xlsx_archive() {
        let guests = vec![
            Guest::invite("g1".into(), "Ada".into(), "AB12".into(), 3),
            Guest::invite("g2".into(), "Grace".into(), "CD34".into(), 1),
        ];
        let listing = listing::build(guests, None, None, Order::Asc, &ShareLinks::new("http://x"));

        let bytes = workbook(&listing.rows).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn empty_guest_list_still_exports_headers() {
        let bytes = workbook(&[]).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
