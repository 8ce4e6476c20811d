//! Server-side HTML for the reviewer portal.
//!
//! The card markup is shared between the portal page and the standalone print
//! document, so what the reviewer sees is what lands on paper. All record
//! values pass through `html_escape` before interpolation.

use html_escape::{encode_double_quoted_attribute, encode_safe};

use crate::types::Applicant;

const BRAND: &str = "Van Tech Contracting";
const PORTAL_TITLE: &str = "HVAC Applicants Portal";

const BASE_STYLES: &str = "\
* { margin: 0; padding: 0; box-sizing: border-box; }
body { font-family: 'Inter', sans-serif; color: #1A1A1A; background: #F1F5F9; }
h1, h2, h3 { font-family: 'Poppins', sans-serif; font-weight: 700; }
.print-page { width: 210mm; height: 297mm; padding: 2rem; background: white; display: flex; flex-direction: column; justify-content: space-between; page-break-after: always; }
.print-page:last-child { page-break-after: avoid; }
.accent-line { height: 4px; background: linear-gradient(90deg, #0F3460 0%, #00D9FF 50%, #0F3460 100%); border-radius: 2px; margin-bottom: 2rem; }
.card-title { font-size: 28px; color: #0F3460; margin-bottom: 0.5rem; }
.card-subtitle { font-size: 12px; color: #4A5568; margin-bottom: 1.5rem; }
.name-panel { background: linear-gradient(135deg, #0F3460 0%, #1a4d7a 100%); color: white; border-radius: 8px; padding: 1.5rem; margin-bottom: 1.5rem; }
.name-panel .field-label { color: #00D9FF; }
.name-panel h2 { font-size: 26px; }
.field-grid { display: grid; grid-template-columns: 1fr 1fr; gap: 1.5rem; margin-bottom: 1.5rem; }
.field { border-left: 4px solid #00D9FF; padding-left: 1rem; }
.field-label { font-size: 10px; font-weight: 600; color: #4A5568; text-transform: uppercase; letter-spacing: 0.5px; margin-bottom: 0.5rem; }
.field-value { font-size: 14px; font-weight: 500; word-break: break-all; }
.mono { font-family: 'IBM Plex Mono', monospace; }
.badge { display: inline-block; padding: 0.4rem 0.8rem; border-radius: 20px; font-size: 12px; font-weight: 600; background: #E8EEF5; color: #0F3460; }
.status-pending { background: #FEF3C7; color: #92400E; }
.status-reviewed { background: #E0F2FE; color: #075985; }
.status-shortlisted { background: #DCFCE7; color: #166534; }
.status-rejected { background: #FEE2E2; color: #991B1B; }
.card-footer { border-top: 2px solid #E8EEF5; padding-top: 1rem; text-align: center; font-size: 8px; color: #A0AEC0; }
";

const PORTAL_STYLES: &str = "\
header { position: sticky; top: 0; background: white; border-bottom: 1px solid #E2E8F0; padding: 1rem 1.5rem; display: flex; justify-content: space-between; align-items: center; }
header h1 { font-size: 24px; color: #0F3460; }
header p { font-size: 14px; color: #64748B; }
.print-button { border: 1px solid #0F3460; color: #0F3460; padding: 0.5rem 1rem; border-radius: 6px; text-decoration: none; }
.layout { display: grid; grid-template-columns: 1fr 3fr; gap: 1.5rem; max-width: 80rem; margin: 0 auto; padding: 2rem 1.5rem; }
.sidebar { background: white; border-radius: 8px; overflow: hidden; }
.sidebar h2 { background: #0F3460; color: white; font-size: 14px; padding: 0.75rem 1rem; }
.sidebar a { display: block; padding: 0.75rem 1rem; border-left: 4px solid transparent; color: inherit; text-decoration: none; }
.sidebar a.selected { border-left-color: #00D9FF; background: #E6FBFF; }
.sidebar .name { font-size: 14px; font-weight: 500; }
.sidebar .title { font-size: 12px; color: #64748B; }
.empty { background: white; border-radius: 8px; padding: 3rem; text-align: center; color: #64748B; }
";

const PRINT_STYLES: &str = "\
@page { size: A4; margin: 0; }
body { background: white; }
.no-print { display: none !important; }
";

/// Renders the A4 card fragment for a single applicant.
pub fn render_card(applicant: &Applicant, year: i32) -> String {
    let status = applicant.status;
    let mut html = String::new();
    html.push_str("<article class=\"print-page\">\n");
    html.push_str("<div class=\"accent-line\"></div>\n");
    html.push_str("<section>\n");
    html.push_str("<h1 class=\"card-title\">Applicant Profile</h1>\n");
    html.push_str("<p class=\"card-subtitle\">Position: HVAC MAINTENANCE ENGINEER</p>\n");
    html.push_str("</section>\n");

    html.push_str("<section class=\"name-panel\">\n");
    html.push_str("<p class=\"field-label\">Full Name</p>\n");
    html.push_str(&format!("<h2>{}</h2>\n", encode_safe(&applicant.full_name)));
    html.push_str("</section>\n");

    html.push_str("<section class=\"field-grid\">\n");
    push_field(&mut html, "Phone", &applicant.phone, "field-value mono");
    push_field(&mut html, "Email", &applicant.email, "field-value");
    html.push_str("</section>\n");

    html.push_str("<section class=\"field-grid\">\n");
    push_field(&mut html, "Current Job Title", &applicant.job_title, "field-value");
    html.push_str("<div class=\"field\">\n<p class=\"field-label\">Application Source</p>\n");
    html.push_str(&format!(
        "<span class=\"badge\">{} {}</span>\n</div>\n",
        applicant.platform.icon(),
        encode_safe(&applicant.platform.label())
    ));
    html.push_str("</section>\n");

    html.push_str("<section class=\"field-grid\">\n");
    html.push_str("<div class=\"field\">\n<p class=\"field-label\">Review Status</p>\n");
    html.push_str(&format!(
        "<span class=\"badge status-{}\">{}</span>\n</div>\n",
        status.as_str(),
        status.label()
    ));
    if let Some(notes) = applicant.notes.as_deref().filter(|notes| !notes.is_empty()) {
        push_field(&mut html, "Reviewer Notes", notes, "field-value");
    }
    html.push_str("</section>\n");

    html.push_str("<footer class=\"card-footer\">\n");
    html.push_str(&format!("<p>{BRAND} &copy; {year} | {PORTAL_TITLE}</p>\n"));
    html.push_str("</footer>\n");
    html.push_str("</article>\n");
    html
}

/// Renders a standalone A4 document containing only the applicant's card.
///
/// The document opens the platform print dialog as soon as it loads.
pub fn render_print_document(applicant: &Applicant, year: i32) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n");
    html.push_str(&format!(
        "<title>Applicant - {}</title>\n",
        encode_safe(&applicant.full_name)
    ));
    html.push_str("<style>\n");
    html.push_str(BASE_STYLES);
    html.push_str(PRINT_STYLES);
    html.push_str("</style>\n</head>\n<body onload=\"window.print()\">\n");
    html.push_str(&render_card(applicant, year));
    html.push_str("</body>\n</html>\n");
    html
}

/// Renders the reviewer portal: applicant selector plus the selected card.
///
/// `selected` falls back to the first applicant when absent.
pub fn render_portal_page(
    applicants: &[Applicant],
    selected: Option<&Applicant>,
    year: i32,
) -> String {
    let selected = selected.or_else(|| applicants.first());

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n");
    html.push_str(&format!("<title>{PORTAL_TITLE}</title>\n"));
    html.push_str("<style>\n");
    html.push_str(BASE_STYLES);
    html.push_str(PORTAL_STYLES);
    html.push_str("</style>\n</head>\n<body>\n");

    html.push_str("<header class=\"no-print\">\n<div>\n");
    html.push_str(&format!("<h1>{PORTAL_TITLE}</h1>\n<p>{BRAND}</p>\n</div>\n"));
    if let Some(applicant) = selected {
        html.push_str(&format!(
            "<a class=\"print-button\" href=\"/applicants/{}/print\" target=\"_blank\">Print A4</a>\n",
            applicant.id
        ));
    }
    html.push_str("</header>\n");

    html.push_str("<div class=\"layout\">\n<aside class=\"sidebar no-print\">\n");
    html.push_str(&format!("<h2>Applicants ({})</h2>\n", applicants.len()));
    for applicant in applicants {
        let class = if selected.is_some_and(|current| current.id == applicant.id) {
            " class=\"selected\""
        } else {
            ""
        };
        html.push_str(&format!(
            "<a href=\"/?selected={}\"{class} title=\"{}\">\n<p class=\"name\">{}</p>\n<p class=\"title\">{}</p>\n</a>\n",
            applicant.id,
            encode_double_quoted_attribute(&applicant.full_name),
            encode_safe(&applicant.full_name),
            encode_safe(&applicant.job_title)
        ));
    }
    html.push_str("</aside>\n<main>\n");

    match selected {
        Some(applicant) => html.push_str(&render_card(applicant, year)),
        None => html.push_str("<div class=\"empty\">Select an applicant to view details</div>\n"),
    }

    html.push_str("</main>\n</div>\n</body>\n</html>\n");
    html
}

fn push_field(html: &mut String, label: &str, value: &str, value_class: &str) {
    html.push_str(&format!(
        "<div class=\"field\">\n<p class=\"field-label\">{label}</p>\n<p class=\"{value_class}\">{}</p>\n</div>\n",
        encode_safe(value)
    ));
}
