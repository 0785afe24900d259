//! PDF receipt rendering.
//!
//! Lays a transaction out on a single fixed-size A4 page. When the content
//! would run past the bottom margin the whole layout is scaled down
//! proportionally so the receipt always fits one page. Two themes exist;
//! they differ only in palette.

use printpdf::{BuiltinFont, Color, Line, Mm, PdfDocument, Point, Rgb};

use crate::ClientError;

/// Everything that ends up on the paper.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub id: String,
    pub timestamp: String,
    pub tx_type: String,
    pub status: String,
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Classic,
    Midnight,
}

struct Palette {
    heading: (f64, f64, f64),
    body: (f64, f64, f64),
    accent: (f64, f64, f64),
}

impl Theme {
    fn palette(&self) -> Palette {
        match self {
            Theme::Classic => Palette {
                heading: (0.13, 0.17, 0.23),
                body: (0.25, 0.25, 0.25),
                accent: (0.00, 0.45, 0.33),
            },
            Theme::Midnight => Palette {
                heading: (0.10, 0.09, 0.25),
                body: (0.20, 0.20, 0.30),
                accent: (0.36, 0.31, 0.71),
            },
        }
    }
}

const PAGE_W: f64 = 210.0; // A4, mm
const PAGE_H: f64 = 297.0;
const MARGIN: f64 = 18.0;

const HEADER_H: f64 = 34.0;
const ROW_H: f64 = 14.0;
const FOOTER_H: f64 = 16.0;

/// Scale factor that fits `rows` field rows plus header and footer onto one
/// page. 1.0 when everything already fits.
fn layout_scale(rows: usize) -> f64 {
    let needed = HEADER_H + rows as f64 * ROW_H + FOOTER_H;
    let available = PAGE_H - 2.0 * MARGIN;
    if needed <= available {
        1.0
    } else {
        available / needed
    }
}

fn rgb(c: (f64, f64, f64)) -> Color {
    Color::Rgb(Rgb::new(c.0 as f32, c.1 as f32, c.2 as f32, None))
}

/// Render the receipt to PDF bytes.
pub fn render_pdf(receipt: &Receipt, theme: Theme) -> Result<Vec<u8>, ClientError> {
    let palette = theme.palette();

    let mut rows: Vec<(&str, String)> = vec![
        ("Receipt No.", receipt.id.clone()),
        ("Date", receipt.timestamp.clone()),
        ("Type", receipt.tx_type.clone()),
        ("Status", receipt.status.clone()),
        ("From", receipt.sender.clone()),
        ("To", receipt.recipient.clone()),
        ("Amount", format!("${:.2}", receipt.amount)),
    ];
    if let Some(memo) = &receipt.memo {
        rows.push(("Memo", memo.clone()));
    }

    let scale = layout_scale(rows.len());

    let (doc, page, layer) =
        PdfDocument::new("Transaction Receipt", Mm(PAGE_W as f32), Mm(PAGE_H as f32), "receipt");
    let layer = doc.get_page(page).get_layer(layer);

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ClientError::Receipt(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ClientError::Receipt(e.to_string()))?;

    let mut y = PAGE_H - MARGIN;

    // Title block
    y -= 10.0 * scale;
    layer.set_fill_color(rgb(palette.heading));
    layer.use_text(
        "Transaction Receipt",
        (20.0 * scale) as f32,
        Mm(MARGIN as f32),
        Mm(y as f32),
        &bold,
    );

    y -= 8.0 * scale;
    layer.set_fill_color(rgb(palette.body));
    layer.use_text(
        "Official record of account activity",
        (10.0 * scale) as f32,
        Mm(MARGIN as f32),
        Mm(y as f32),
        &regular,
    );

    // Accent rule under the header
    y -= 6.0 * scale;
    layer.set_outline_color(rgb(palette.accent));
    layer.set_outline_thickness((1.2 * scale) as f32);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(MARGIN as f32), Mm(y as f32)), false),
            (Point::new(Mm((PAGE_W - MARGIN) as f32), Mm(y as f32)), false),
        ],
        is_closed: false,
    });

    // Field rows
    for (label, value) in &rows {
        y -= ROW_H * scale;
        layer.set_fill_color(rgb(palette.accent));
        layer.use_text(*label, (9.0 * scale) as f32, Mm(MARGIN as f32), Mm(y as f32), &bold);
        layer.set_fill_color(rgb(palette.body));
        layer.use_text(
            value.as_str(),
            (11.0 * scale) as f32,
            Mm((MARGIN + 45.0) as f32),
            Mm(y as f32),
            &regular,
        );
    }

    // Footer rule and fine print
    y -= 8.0 * scale;
    layer.set_outline_color(rgb(palette.body));
    layer.set_outline_thickness((0.4 * scale) as f32);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(MARGIN as f32), Mm(y as f32)), false),
            (Point::new(Mm((PAGE_W - MARGIN) as f32), Mm(y as f32)), false),
        ],
        is_closed: false,
    });

    y -= 6.0 * scale;
    layer.use_text(
        "Keep this receipt for your records.",
        (8.0 * scale) as f32,
        Mm(MARGIN as f32),
        Mm(y as f32),
        &regular,
    );

    doc.save_to_bytes()
        .map_err(|e| ClientError::Receipt(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Receipt {
        Receipt {
            id: "9f1c2d3e".into(),
            timestamp: "2025-06-01 12:30:00".into(),
            tx_type: "Transfer".into(),
            status: "Completed".into(),
            sender: "Alice A".into(),
            recipient: "Bob B".into(),
            amount: 250.0,
            memo: Some("rent".into()),
        }
    }

    #[test]
    fn test_short_receipt_is_unscaled() {
        assert_eq!(layout_scale(8), 1.0);
    }

    #[test]
    fn test_overflowing_layout_scales_to_fit() {
        let scale = layout_scale(40);
        assert!(scale < 1.0);
        let needed = HEADER_H + 40.0 * ROW_H + FOOTER_H;
        let fitted = needed * scale;
        assert!(fitted <= PAGE_H - 2.0 * MARGIN + 1e-9);
    }

    #[test]
    fn test_renders_pdf_bytes() {
        let bytes = render_pdf(&sample(), Theme::Classic).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_themes_produce_different_documents() {
        let classic = render_pdf(&sample(), Theme::Classic).unwrap();
        let midnight = render_pdf(&sample(), Theme::Midnight).unwrap();
        assert_ne!(classic, midnight);
    }

    #[test]
    fn test_memo_is_optional() {
        let mut receipt = sample();
        receipt.memo = None;
        assert!(render_pdf(&receipt, Theme::Midnight).is_ok());
    }
}
