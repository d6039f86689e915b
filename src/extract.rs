//! Pure HTML extraction for the portal's listing and result pages.
//!
//! The portal is a JSF application: its form carries a server-issued
//! `javax.faces.ViewState` token plus field names namespaced by a prefix the
//! server regenerates per request, and its results land in a table with a
//! fixed generated id. Everything in this module is stateless string-in,
//! value-out parsing; no I/O happens here.
//!
//! # Extraction points
//!
//! | Element | Selector | Yields |
//! |---------|----------|--------|
//! | View state token | `input[name="javax.faces.ViewState"]` | [`SessionForm::token`] |
//! | Prefix carrier | `input[name$=":appcat_focus"]` | [`SessionForm::field_prefix`] |
//! | Result table | `table[id="j_idt6:j_idt8"]` | [`OutageRecord`] rows |

use crate::errors::ProtocolError;
use crate::models::{OutageRecord, SessionForm};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, warn};

static VIEWSTATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"input[name="javax.faces.ViewState"]"#).unwrap());
static PREFIX_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"input[name$=":appcat_focus"]"#).unwrap());
static OUTAGE_TABLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"table[id="j_idt6:j_idt8"]"#).unwrap());
static ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static CELL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());

/// Extract the session token and form field prefix from the listing page.
///
/// The prefix is derived from the name of the `*:appcat_focus` input by
/// splitting on the first `:`. Token and prefix are only valid together,
/// so both come out of one parse of one page.
///
/// # Errors
///
/// [`ProtocolError::MissingToken`] or [`ProtocolError::MissingFieldPrefix`]
/// when the respective input is absent. Neither is retryable: the listing
/// page rendering without its form means the portal changed shape.
pub fn extract_session(markup: &str) -> Result<SessionForm, ProtocolError> {
    let document = Html::parse_document(markup);

    let token = document
        .select(&VIEWSTATE_SELECTOR)
        .next()
        .and_then(|input| input.value().attr("value"))
        .ok_or(ProtocolError::MissingToken)?
        .to_string();

    let field_prefix = document
        .select(&PREFIX_SELECTOR)
        .next()
        .and_then(|input| input.value().attr("name"))
        .and_then(|name| name.split(':').next())
        .filter(|prefix| !prefix.is_empty())
        .ok_or(ProtocolError::MissingFieldPrefix)?
        .to_string();

    debug!(%field_prefix, token_len = token.len(), "Extracted session form");
    Ok(SessionForm {
        token,
        field_prefix,
    })
}

/// Parse the outage result table out of a submit response.
///
/// Skips the header row, trims every cell, and maps the first eight cells
/// of each remaining row positionally onto an [`OutageRecord`]. Rows with
/// fewer cells (spacer and colspan rows in the portal's markup) are skipped
/// and counted rather than treated as parse errors. A present table with
/// zero data rows is a valid empty result.
///
/// # Errors
///
/// [`ProtocolError::MissingTable`] when the result table is absent, which
/// during the submit loop means the portal rejected the challenge answer
/// and re-rendered its form instead of the results.
pub fn extract_outages(markup: &str) -> Result<Vec<OutageRecord>, ProtocolError> {
    let document = Html::parse_document(markup);
    let table = document
        .select(&OUTAGE_TABLE_SELECTOR)
        .next()
        .ok_or(ProtocolError::MissingTable)?;

    let mut outages = Vec::new();
    let mut skipped = 0usize;
    for row in table.select(&ROW_SELECTOR).skip(1) {
        let cells: Vec<String> = row
            .select(&CELL_SELECTOR)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();

        // Spacer and colspan rows carry fewer cells; skip them rather than
        // failing the whole table. Extra cells beyond the eighth are ignored.
        let [date, town, substation, feeder, location, work_type, from_time, to_time, ..] =
            cells.as_slice()
        else {
            skipped += 1;
            continue;
        };

        outages.push(OutageRecord {
            date: date.clone(),
            town: town.clone(),
            substation: substation.clone(),
            feeder: feeder.clone(),
            location: location.clone(),
            work_type: work_type.clone(),
            from_time: from_time.clone(),
            to_time: to_time.clone(),
        });
    }

    if skipped > 0 {
        warn!(skipped, "Skipped outage rows with too few cells");
    }
    debug!(count = outages.len(), "Parsed outage table");
    Ok(outages)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_PAGE: &str = r#"
        <html><body>
        <form id="frm1">
            <input type="hidden" name="javax.faces.ViewState" value="-716243:99021" />
            <input type="text" name="frm1:appcat_focus" value="" />
            <input type="text" name="frm1:appcat_input" value="" />
        </form>
        </body></html>
    "#;

    fn result_page(rows: &str) -> String {
        format!(
            r#"<html><body><table id="j_idt6:j_idt8">
               <tr><th>Date</th><th>Town</th><th>Substation</th><th>Feeder</th>
                   <th>Location</th><th>Work</th><th>From</th><th>To</th></tr>
               {rows}
               </table></body></html>"#
        )
    }

    #[test]
    fn test_extract_session() {
        let form = extract_session(LISTING_PAGE).unwrap();
        assert_eq!(form.token, "-716243:99021");
        assert_eq!(form.field_prefix, "frm1");
    }

    #[test]
    fn test_extract_session_missing_token() {
        let markup = r#"<input name="frm1:appcat_focus" value="" />"#;
        assert_eq!(
            extract_session(markup).unwrap_err(),
            ProtocolError::MissingToken
        );
    }

    #[test]
    fn test_extract_session_missing_prefix() {
        let markup = r#"<input name="javax.faces.ViewState" value="abc" />"#;
        assert_eq!(
            extract_session(markup).unwrap_err(),
            ProtocolError::MissingFieldPrefix
        );
    }

    #[test]
    fn test_header_only_table_is_empty_result() {
        let outages = extract_outages(&result_page("")).unwrap();
        assert!(outages.is_empty());
    }

    #[test]
    fn test_missing_table_is_protocol_error() {
        let markup = r#"<html><body><form>re-rendered captcha form</form></body></html>"#;
        assert_eq!(
            extract_outages(markup).unwrap_err(),
            ProtocolError::MissingTable
        );
    }

    #[test]
    fn test_rows_map_positionally() {
        let rows = r#"
            <tr><td> 05-08-2026 </td><td>Chennai</td><td>Adyar SS</td><td>F12</td>
                <td>Besant Nagar</td><td>Line maintenance</td><td>09:00</td><td>17:00</td></tr>
        "#;
        let outages = extract_outages(&result_page(rows)).unwrap();
        assert_eq!(outages.len(), 1);
        let record = &outages[0];
        assert_eq!(record.date, "05-08-2026");
        assert_eq!(record.town, "Chennai");
        assert_eq!(record.substation, "Adyar SS");
        assert_eq!(record.feeder, "F12");
        assert_eq!(record.location, "Besant Nagar");
        assert_eq!(record.work_type, "Line maintenance");
        assert_eq!(record.from_time, "09:00");
        assert_eq!(record.to_time, "17:00");
    }

    #[test]
    fn test_short_rows_skipped_without_error() {
        let rows = r#"
            <tr><td colspan="8">spacer</td></tr>
            <tr><td>06-08-2026</td><td>Madurai</td><td>Anna Nagar SS</td><td>F3</td>
                <td>KK Nagar</td><td>Tree trimming</td><td>10:00</td><td>15:00</td></tr>
        "#;
        let outages = extract_outages(&result_page(rows)).unwrap();
        assert_eq!(outages.len(), 1);
        assert_eq!(outages[0].town, "Madurai");
    }

    #[test]
    fn test_extra_cells_ignored() {
        let rows = r#"
            <tr><td>06-08-2026</td><td>Salem</td><td>Suramangalam SS</td><td>F7</td>
                <td>Five Roads</td><td>Breaker replacement</td><td>08:30</td><td>13:30</td>
                <td>extra</td></tr>
        "#;
        let outages = extract_outages(&result_page(rows)).unwrap();
        assert_eq!(outages.len(), 1);
        assert_eq!(outages[0].to_time, "13:30");
    }
}
