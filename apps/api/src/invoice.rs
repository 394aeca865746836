//! Invoice PDF rendering.
//!
//! Pure function of a joined order: no state is read or written.
//!
//! ## Page Layout (A4, points from the top edge)
//! ```text
//!   50 ┌ TAILORCRAFT                          Invoice #: ORD-...   ┐
//!      │ Invoice                              Date: 05/03/2025     │
//!  120 │ Bill To:                  Order Details:                  │  first page only
//!      │ name / address / city     status / method / date          │
//!  250 │ Item              Qty   Price        Total                │
//!      │ ...rows (a "Custom:" line under customized items)...      │  continues on
//!      │ ──────────────────────────────────────────────────────────│  new pages
//!      │                       Subtotal / Discount / Total         │
//!      │                       Advance Paid / Balance Due          │
//!  790 └ Thank you for your business!              Page n of N     ┘
//! ```
//!
//! Text is set in the built-in Helvetica faces, so amounts are written as
//! `Rs. 1234.50` and characters outside printable ASCII are replaced.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use tailor_core::{OrderDetail, OrderItem};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const LEFT: i64 = 50;
const RIGHT: i64 = 545;
const FIRST_TABLE_TOP: i64 = 250;
const NEXT_TABLE_TOP: i64 = 60;
/// Rows and totals must end above this line; the footer sits below it.
const CONTENT_BOTTOM: i64 = 760;
const ROW_HEIGHT: i64 = 25;
const CUSTOM_LINE_HEIGHT: i64 = 15;
const TOTALS_HEIGHT: i64 = 110;
const NOTE_HEIGHT: i64 = 15;

/// Printed under the items when the rounded line totals miss the subtotal.
pub const ROUNDING_NOTE: &str =
    "Line totals are rounded per line; the subtotal is computed from exact prices.";

#[derive(Debug, thiserror::Error)]
pub enum InvoiceError {
    #[error("PDF encoding failed: {0}")]
    Encoding(String),
}

#[derive(Debug, Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Content operations of one page, addressed in top-down coordinates.
#[derive(Default)]
struct Page {
    ops: Vec<Operation>,
}

impl Page {
    fn text(&mut self, font: Font, size: i64, x: i64, top: i64, text: &str) {
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new(
            "Tf",
            vec![font.resource().into(), size.into()],
        ));
        self.ops
            .push(Operation::new("Td", vec![x.into(), (PAGE_HEIGHT - top).into()]));
        self.ops.push(Operation::new(
            "Tj",
            vec![Object::string_literal(pdf_text(text))],
        ));
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn gray(&mut self) {
        self.fill([0.45, 0.45, 0.45]);
    }

    fn black(&mut self) {
        self.fill([0.0, 0.0, 0.0]);
    }

    fn fill(&mut self, rgb: [f32; 3]) {
        self.ops.push(Operation::new("rg", real_components(rgb)));
    }

    fn rule(&mut self, top: i64) {
        let y = PAGE_HEIGHT - top;
        self.ops.push(Operation::new("RG", real_components([0.8, 0.8, 0.8])));
        self.ops.push(Operation::new("w", vec![Object::Integer(1)]));
        self.ops.push(Operation::new("m", vec![LEFT.into(), y.into()]));
        self.ops.push(Operation::new("l", vec![RIGHT.into(), y.into()]));
        self.ops.push(Operation::new("S", vec![]));
    }
}

/// Renders the invoice for a joined order.
pub fn render_invoice(detail: &OrderDetail) -> Result<Vec<u8>, InvoiceError> {
    let pages = lay_out(detail);
    encode(pages)
}

fn lay_out(detail: &OrderDetail) -> Vec<Page> {
    let order = &detail.order;
    let mut pages = Vec::new();
    let mut page = Page::default();

    // Header
    page.fill([0.26, 0.38, 0.93]);
    page.text(Font::Bold, 25, LEFT, 70, "TAILORCRAFT");
    page.black();
    page.text(Font::Regular, 10, LEFT, 90, "Invoice");
    page.text(
        Font::Regular,
        10,
        380,
        60,
        &format!("Invoice #: {}", order.order_number),
    );
    page.text(
        Font::Regular,
        10,
        380,
        75,
        &format!("Date: {}", order.created_at.format("%d/%m/%Y")),
    );

    // Bill to
    let address = &order.shipping_address;
    page.text(Font::Bold, 12, LEFT, 120, "Bill To:");
    let mut line_top = 140;
    for line in [
        address.full_name.clone(),
        address.address.clone(),
        format!("{}, {} {}", address.city, address.state, address.zip_code),
        address.email.clone().unwrap_or_default(),
        address.phone.clone().unwrap_or_default(),
    ] {
        if !line.trim().is_empty() {
            page.text(Font::Regular, 10, LEFT, line_top, &truncate(&line, 40));
            line_top += 15;
        }
    }

    // Order details
    page.text(Font::Bold, 12, 300, 120, "Order Details:");
    page.text(
        Font::Regular,
        10,
        300,
        140,
        &format!("Status: {}", order.status.as_str().to_ascii_uppercase()),
    );
    page.text(
        Font::Regular,
        10,
        300,
        155,
        &format!("Payment Method: {}", order.payment_method.display_name()),
    );
    page.text(
        Font::Regular,
        10,
        300,
        170,
        &format!("Order Date: {}", order.created_at.format("%d/%m/%Y")),
    );

    // Items
    table_header(&mut page, FIRST_TABLE_TOP);
    let mut top = FIRST_TABLE_TOP + 20;

    for item in &detail.items {
        let custom = item
            .customization
            .as_ref()
            .filter(|c| !c.is_empty())
            .map(|c| c.summary());
        let height = ROW_HEIGHT + if custom.is_some() { CUSTOM_LINE_HEIGHT } else { 0 };

        if top + height > CONTENT_BOTTOM {
            pages.push(std::mem::take(&mut page));
            table_header(&mut page, NEXT_TABLE_TOP);
            top = NEXT_TABLE_TOP + 20;
        }

        item_row(&mut page, item, top);
        if let Some(summary) = custom {
            top += CUSTOM_LINE_HEIGHT;
            page.gray();
            page.text(
                Font::Regular,
                8,
                LEFT,
                top,
                &truncate(&format!("Custom: {summary}"), 90),
            );
            page.black();
        }
        top += ROW_HEIGHT;
    }
    page.rule(top);

    // Totals
    let note = !detail.line_totals_add_up();
    let note_height = if note { NOTE_HEIGHT } else { 0 };
    if top + note_height + 20 + TOTALS_HEIGHT > CONTENT_BOTTOM {
        pages.push(std::mem::take(&mut page));
        top = NEXT_TABLE_TOP;
    }
    if note {
        top += NOTE_HEIGHT;
        page.gray();
        page.text(Font::Regular, 8, LEFT, top, ROUNDING_NOTE);
        page.black();
    }
    let totals_top = top + 20;
    let rows = [
        ("Subtotal:", order.subtotal_paise, Font::Regular),
        ("Discount:", order.discount_paise, Font::Regular),
        ("Total:", order.total_paise, Font::Bold),
        ("Advance Paid:", order.advance_paise, Font::Regular),
        ("Balance Due:", order.due_paise, Font::Bold),
    ];
    for (i, (label, paise, font)) in rows.into_iter().enumerate() {
        let row_top = totals_top + 20 * i as i64;
        page.text(font, 10, 350, row_top, label);
        page.text(font, 10, 460, row_top, &rupees(paise));
    }
    pages.push(page);

    // Footer on every page
    let count = pages.len();
    for (i, page) in pages.iter_mut().enumerate() {
        page.gray();
        page.text(Font::Regular, 8, LEFT, 780, "Thank you for your business!");
        page.text(
            Font::Regular,
            8,
            LEFT,
            792,
            "For any queries, contact: support@tailorcraft.com",
        );
        page.text(Font::Regular, 8, LEFT, 804, "Terms & Conditions apply");
        page.text(
            Font::Regular,
            8,
            480,
            804,
            &format!("Page {} of {}", i + 1, count),
        );
        page.black();
    }

    pages
}

fn table_header(page: &mut Page, top: i64) {
    page.text(Font::Bold, 10, LEFT, top, "Item");
    page.text(Font::Bold, 10, 300, top, "Qty");
    page.text(Font::Bold, 10, 350, top, "Price");
    page.text(Font::Bold, 10, 450, top, "Total");
}

fn item_row(page: &mut Page, item: &OrderItem, top: i64) {
    let name = if item.product_name.trim().is_empty() {
        format!("Product {}", item.product_id)
    } else {
        item.product_name.clone()
    };
    page.text(Font::Regular, 9, LEFT, top, &truncate(&name, 45));
    page.text(Font::Regular, 9, 300, top, &item.quantity.to_string());
    page.text(Font::Regular, 9, 350, top, &rupees(item.unit_price_paise));
    page.text(Font::Regular, 9, 450, top, &rupees(item.line_total().paise()));
}

fn encode(pages: Vec<Page>) -> Result<Vec<u8>, InvoiceError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let content = Content {
            operations: page.ops,
        };
        let bytes = content
            .encode()
            .map_err(|e| InvoiceError::Encoding(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, bytes));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| InvoiceError::Encoding(e.to_string()))?;
    Ok(out)
}

fn real_components(rgb: [f32; 3]) -> Vec<Object> {
    rgb.into_iter().map(|c| Object::Real(c.into())).collect()
}

/// `Rs. 1234.50`, with a leading minus for credits.
fn rupees(paise: i64) -> String {
    let sign = if paise < 0 { "-" } else { "" };
    let abs = paise.unsigned_abs();
    format!("{sign}Rs. {}.{:02}", abs / 100, abs % 100)
}

/// Keeps printable ASCII; anything the base fonts can't show becomes `?`.
fn pdf_text(text: &str) -> String {
    text.chars()
        .map(|c| if c == ' ' || c.is_ascii_graphic() { c } else { '?' })
        .collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tailor_core::{
        Customization, Order, OrderStatus, PaymentMethod, ShippingAddress,
    };

    fn detail(item_count: usize) -> OrderDetail {
        let now = Utc::now();
        let items = (0..item_count)
            .map(|i| OrderItem {
                id: format!("i-{i}"),
                order_id: "o-1".to_string(),
                product_id: format!("p-{i}"),
                product_name: format!("Silk Kurta {i}"),
                product_image: None,
                quantity: 1,
                unit_price_paise: 150_050,
                price_multiplier_bps: 10_000,
                customization: (i % 2 == 0).then(|| Customization {
                    size: Some("L".to_string()),
                    ..Default::default()
                }),
                created_at: now,
            })
            .collect();

        OrderDetail {
            order: Order {
                id: "o-1".to_string(),
                user_id: "u-1".to_string(),
                order_number: "ORD-1700000000000-ABC123XYZ".to_string(),
                subtotal_paise: 150_050 * item_count as i64,
                discount_paise: 0,
                total_paise: 150_050 * item_count as i64,
                advance_paise: 0,
                due_paise: 150_050 * item_count as i64,
                shipping_address: ShippingAddress {
                    full_name: "Ravi Kumar".to_string(),
                    address: "12 MG Road".to_string(),
                    city: "Pune".to_string(),
                    state: "MH".to_string(),
                    zip_code: "411001".to_string(),
                    email: None,
                    phone: None,
                },
                payment_method: PaymentMethod::Cod,
                status: OrderStatus::Processing,
                notes: None,
                coupon_code: None,
                estimated_delivery: None,
                tracking_number: None,
                created_at: now,
                updated_at: now,
            },
            items,
            payments: Vec::new(),
        }
    }

    #[test]
    fn test_single_page_invoice() {
        let bytes = render_invoice(&detail(2)).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_long_orders_continue_on_new_pages() {
        let layout = lay_out(&detail(40));
        assert!(layout.len() >= 3);

        let bytes = render_invoice(&detail(40)).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), layout.len());
    }

    fn texts(pages: &[Page]) -> Vec<String> {
        pages
            .iter()
            .flat_map(|page| &page.ops)
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_rounding_note_only_when_lines_miss_subtotal() {
        let exact = texts(&lay_out(&detail(2)));
        assert!(!exact.iter().any(|t| t == ROUNDING_NOTE));

        // 3 × ₹999.99 at ×1.2: exact 359996.4 → subtotal 359996, lines 3 × 119999
        let mut custom = detail(1);
        custom.items[0].quantity = 3;
        custom.items[0].unit_price_paise = 119_999;
        custom.items[0].price_multiplier_bps = 12_000;
        custom.order.subtotal_paise = 359_996;
        custom.order.total_paise = 359_996;
        custom.order.due_paise = 359_996;

        let rounded = texts(&lay_out(&custom));
        assert!(rounded.iter().any(|t| t == ROUNDING_NOTE));
        assert!(rounded.iter().any(|t| t == "Rs. 3599.97"));
        assert!(rounded.iter().any(|t| t == "Rs. 3599.96"));
    }

    #[test]
    fn test_text_helpers() {
        assert_eq!(rupees(150_050), "Rs. 1500.50");
        assert_eq!(rupees(-500), "-Rs. 5.00");
        assert_eq!(pdf_text("Kurta ₹"), "Kurta ?");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
    }
}
