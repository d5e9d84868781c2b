//! Field extractor for the RSR sign detail page.
//!
//! Each detail page (`Details.aspx?cid=N`) exposes its fields as `span`
//! elements with fixed ids, an `img` inside `div#Image220Centrer` when the
//! sign has a figure, and a table of available sizes with their IMP codes.
//!
//! The span lookups are a table ([`FIELD_SPANS`]); adding a field means adding
//! a row, not a branch.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::error::ExtractError;
use crate::models::{Cid, Dimension, Field, NOT_AVAILABLE, Record};

/// Span id holding each text field on the detail page.
pub const FIELD_SPANS: [(Field, &str); 8] = [
    (Field::Numero, "ctl00_cphContenu_FicheDetails_txtNumero"),
    (Field::Nom, "ctl00_cphContenu_FicheDetails_txtNom"),
    (Field::ReferenceTomeV, "ctl00_cphContenu_FicheDetails_txtReferenceTomeV"),
    (Field::ReferenceVhr, "ctl00_cphContenu_FicheDetails_txtReferenceVHR"),
    (Field::Description, "ctl00_cphContenu_FicheDetails_txtDescription"),
    (Field::Usages, "ctl00_cphContenu_FicheDetails_txtUsage"),
    (Field::Couleur, "ctl00_cphContenu_FicheDetails_txtCouleur"),
    (Field::TypePellicule, "ctl00_cphContenu_FicheDetails_txtTypePellicule"),
];

const DIMENSIONS_TABLE_SUMMARY: &str =
    "Dimensions disponibles en milimètres pour ce dispositif suivi du code IMP correspondant.";

static FIELD_SELECTORS: Lazy<Vec<(Field, Selector)>> = Lazy::new(|| {
    FIELD_SPANS
        .iter()
        .map(|(field, id)| (*field, Selector::parse(&format!("span#{id}")).unwrap()))
        .collect()
});
static IMAGE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div#Image220Centrer img").unwrap());
static DIMENSIONS_TABLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(&format!(r#"table[summary="{DIMENSIONS_TABLE_SUMMARY}"]"#)).unwrap()
});
static ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static CELL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());

/// Result of reading one detail page.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// The entry has no figure; it is checkpointed without a record.
    NoImage,
    /// The entry has a figure: its record and where to download the image.
    Entry { record: Record, image_url: Url },
}

/// Read a detail page into an [`Extraction`].
///
/// Every field whose span is missing is left as `N/A`; only a page whose
/// image or dimension markup is malformed is an error.
pub fn extract(cid: Cid, page_url: &Url, body: &str) -> Result<Extraction, ExtractError> {
    let document = Html::parse_document(body);

    let Some(img) = document.select(&IMAGE_SELECTOR).next() else {
        return Ok(Extraction::NoImage);
    };
    let src = img
        .value()
        .attr("src")
        .ok_or(ExtractError::MissingImageSource)?;
    let image_url = page_url
        .join(src.trim())
        .map_err(|source| ExtractError::InvalidImageUrl {
            src: src.to_string(),
            source,
        })?;

    let mut record = Record::new(cid);
    for (field, selector) in FIELD_SELECTORS.iter() {
        if let Some(el) = document.select(selector).next() {
            *record.field_mut(*field) = element_text(el);
        }
    }
    record.dimensions = extract_dimensions(&document)?;

    let img_id = image_url
        .query_pairs()
        .find(|(k, _)| k == "imgId")
        .map(|(_, v)| v.into_owned());
    let missing: Vec<&str> = FIELD_SPANS
        .iter()
        .filter(|(field, _)| record.field(*field) == NOT_AVAILABLE)
        .map(|(field, _)| field.column())
        .collect();
    debug!(cid, numero = %record.numero, ?img_id, ?missing, dimensions = record.dimensions.len(), "Extracted entry");

    Ok(Extraction::Entry { record, image_url })
}

fn extract_dimensions(document: &Html) -> Result<Vec<Dimension>, ExtractError> {
    let Some(table) = document.select(&DIMENSIONS_TABLE_SELECTOR).next() else {
        return Ok(Vec::new());
    };

    let mut dimensions = Vec::new();
    // First row is the column header.
    for (row_idx, row) in table.select(&ROW_SELECTOR).enumerate().skip(1) {
        let cells: Vec<ElementRef> = row.select(&CELL_SELECTOR).collect();
        match cells.as_slice() {
            [] => continue,
            [_] => {
                return Err(ExtractError::MalformedDimensionRow {
                    row: row_idx,
                    cells: 1,
                });
            }
            [size, code, ..] => dimensions.push(Dimension {
                dimensions_mm: element_text(*size),
                code_imp: element_text(*code),
            }),
        }
    }
    Ok(dimensions)
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://www.rsr.transports.gouv.qc.ca/Dispositifs/Details.aspx?cid=101").unwrap()
    }

    const FULL_PAGE: &str = r#"<html><body>
        <span id="ctl00_cphContenu_FicheDetails_txtNumero"> P-010-1 </span>
        <span id="ctl00_cphContenu_FicheDetails_txtNom">Arrêt</span>
        <span id="ctl00_cphContenu_FicheDetails_txtReferenceTomeV">2.1</span>
        <span id="ctl00_cphContenu_FicheDetails_txtDescription">Obligation de s'immobiliser</span>
        <span id="ctl00_cphContenu_FicheDetails_txtUsage">Intersections</span>
        <span id="ctl00_cphContenu_FicheDetails_txtCouleur">Rouge et <b>blanc</b></span>
        <span id="ctl00_cphContenu_FicheDetails_txtTypePellicule">Type XI</span>
        <div id="Image220Centrer"><img src="../Gestionnaires/ObtenirImage.ashx?imgId=4521" /></div>
        <table summary="Dimensions disponibles en milimètres pour ce dispositif suivi du code IMP correspondant.">
          <tr><th>Dimensions</th><th>Code IMP</th></tr>
          <tr class="gris"><td>600 x 600</td><td>P-010-1-060</td></tr>
          <tr><td>750 x 750</td><td>P-010-1-075</td></tr>
        </table>
    </body></html>"#;

    fn entry(body: &str) -> (Record, Url) {
        match extract(101, &page_url(), body).unwrap() {
            Extraction::Entry { record, image_url } => (record, image_url),
            Extraction::NoImage => panic!("expected an entry"),
        }
    }

    #[test]
    fn test_extracts_all_present_fields() {
        let (record, image_url) = entry(FULL_PAGE);
        assert_eq!(record.cid, 101);
        assert_eq!(record.numero, "P-010-1");
        assert_eq!(record.nom, "Arrêt");
        assert_eq!(record.reference_tome_v, "2.1");
        assert_eq!(record.couleur, "Rouge et blanc");
        assert_eq!(record.type_pellicule, "Type XI");
        // No span for it on this page.
        assert_eq!(record.reference_vhr, NOT_AVAILABLE);
        assert_eq!(
            image_url.as_str(),
            "https://www.rsr.transports.gouv.qc.ca/Gestionnaires/ObtenirImage.ashx?imgId=4521"
        );
    }

    #[test]
    fn test_extracts_dimensions_skipping_header() {
        let (record, _) = entry(FULL_PAGE);
        assert_eq!(record.dimensions.len(), 2);
        assert_eq!(record.dimensions[0].dimensions_mm, "600 x 600");
        assert_eq!(record.dimensions[1].code_imp, "P-010-1-075");
    }

    #[test]
    fn test_missing_nom_label_keeps_other_fields() {
        let body = FULL_PAGE.replace(
            r#"<span id="ctl00_cphContenu_FicheDetails_txtNom">Arrêt</span>"#,
            "",
        );
        let (record, _) = entry(&body);
        assert_eq!(record.nom, NOT_AVAILABLE);
        assert_eq!(record.numero, "P-010-1");
        assert_eq!(record.usages, "Intersections");
        assert_eq!(record.dimensions.len(), 2);
    }

    #[test]
    fn test_no_image_container() {
        let body = r#"<html><body><span id="ctl00_cphContenu_FicheDetails_txtNumero">X</span></body></html>"#;
        assert_eq!(extract(100, &page_url(), body).unwrap(), Extraction::NoImage);
    }

    #[test]
    fn test_empty_image_container() {
        let body = r#"<div id="Image220Centrer"></div>"#;
        assert_eq!(extract(100, &page_url(), body).unwrap(), Extraction::NoImage);
    }

    #[test]
    fn test_image_without_src_is_extraction_error() {
        let body = r#"<div id="Image220Centrer"><img alt="x"></div>"#;
        let err = extract(100, &page_url(), body).unwrap_err();
        assert!(matches!(err, ExtractError::MissingImageSource));
    }

    #[test]
    fn test_single_cell_dimension_row_is_extraction_error() {
        let body = r#"<div id="Image220Centrer"><img src="/img.ashx?imgId=1"></div>
            <table summary="Dimensions disponibles en milimètres pour ce dispositif suivi du code IMP correspondant.">
              <tr><th>Dimensions</th><th>Code IMP</th></tr>
              <tr><td>600 x 600</td></tr>
            </table>"#;
        let err = extract(100, &page_url(), body).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedDimensionRow { row: 1, cells: 1 }));
    }

    #[test]
    fn test_page_without_any_label_is_all_not_available() {
        let body = r#"<div id="Image220Centrer"><img src="/img.ashx?imgId=9"></div>"#;
        let (record, _) = entry(body);
        for (field, _) in FIELD_SPANS {
            assert_eq!(record.field(field), NOT_AVAILABLE, "{}", field.column());
        }
        assert!(record.dimensions.is_empty());
    }
}
